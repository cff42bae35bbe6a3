#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

mod app;
mod tools;
mod util;

fn main() -> eframe::Result {
    env_logger::init();

    let toolchain = tools::toolchain::Toolchain::from_env();
    log::info!(
        "Using python={}, java={}, config={}",
        toolchain.python,
        toolchain.java,
        toolchain.config_file.display()
    );

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Cars 2 Modding Tool",
        native_options,
        Box::new(|cc| Ok(Box::new(app::EguiApp::new(cc, toolchain)))),
    )
}
