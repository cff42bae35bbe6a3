use std::path::PathBuf;

use egui_modal::{Icon, Modal};
use strum::IntoEnumIterator;

use crate::tools::{
    config::{ConfigStore, Configuration},
    executor::ProcessExecutor,
    operations::{OperationKind, OperationRequest, Operations},
    resolver::DependencyResolver,
    setup::SetupFlow,
    toolchain::Toolchain,
};

#[derive(PartialEq, Clone, Default, strum::Display, strum::EnumIter)]
enum AppTabs {
    #[default]
    Decode,
    Encode,
    #[strum(to_string = "Pack .zip")]
    PackZip,
    #[strum(to_string = "Decrypt .lua")]
    DecryptLua,
    #[strum(to_string = "Offsetting Decode")]
    OffsettingDecode,
    #[strum(to_string = "Offsetting Encode")]
    OffsettingEncode,
}

#[derive(Default)]
struct SceneContext {
    input: String,
    output: String,
    textures: String,
}

#[derive(Default)]
struct PackContext {
    name: String,
    folder: String,
}

#[derive(Default)]
struct SingleFileContext {
    input: String,
}

pub struct EguiApp {
    toolchain: Toolchain,
    store: ConfigStore,
    config: Configuration,
    resolver: DependencyResolver,
    executor: ProcessExecutor,
    setup: SetupFlow,

    current_tab: AppTabs,
    output: String,
    titled_ready: Option<bool>,

    decode_ctx: SceneContext,
    encode_ctx: SceneContext,
    pack_ctx: PackContext,
    decrypt_ctx: SingleFileContext,
    offsetting_decode_ctx: SingleFileContext,
    offsetting_encode_ctx: SingleFileContext,
}

impl EguiApp {
    pub fn new(cc: &eframe::CreationContext<'_>, toolchain: Toolchain) -> Self {
        // Set UI zoom
        cc.egui_ctx.set_pixels_per_point(1.25);

        // Set up general style used everywhere
        cc.egui_ctx.style_mut(|style| {
            style.spacing.scroll.floating = false;
            style.spacing.item_spacing = [10.0, 10.0].into();
        });

        let store = ConfigStore::new(toolchain.config_file.clone());
        let config = store.load();
        let resolver = DependencyResolver::new(toolchain.clone());
        let setup = SetupFlow::start(&resolver, &config);

        Self {
            toolchain,
            store,
            config,
            resolver,
            executor: ProcessExecutor,
            setup,
            current_tab: AppTabs::default(),
            output: String::new(),
            titled_ready: None,
            decode_ctx: SceneContext::default(),
            encode_ctx: SceneContext::default(),
            pack_ctx: PackContext::default(),
            decrypt_ctx: SingleFileContext::default(),
            offsetting_decode_ctx: SingleFileContext::default(),
            offsetting_encode_ctx: SingleFileContext::default(),
        }
    }

    fn log(&mut self, line: impl AsRef<str>) {
        self.output.push_str(line.as_ref());
        self.output.push('\n');
    }

    fn draw_setup(&mut self, ctx: &egui::Context, modal: &Modal) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.with_layout(egui::Layout::top_down(egui::Align::Center), |ui| {
                ui.heading("Welcome! Let's set up the modding tools.");
                ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                ui.add_space(10.);

                ui.label("Select unluac.jar location:");
                ui.add(egui::TextEdit::singleline(&mut self.setup.jar_entry).desired_width(450.));

                ui.horizontal(|ui| {
                    if ui.button("Browse").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("JAR files", &["jar"])
                            .set_title("Select unluac.jar")
                            .pick_file()
                        {
                            log::info!("Selected unluac.jar: {}", path.display());
                            self.setup.select_jar(path.display().to_string());
                        }
                    }

                    if ui
                        .button("Install")
                        .on_hover_ui(|ui| {
                            ui.label("Downloads unluac.jar next to this program.");
                        })
                        .clicked()
                    {
                        self.install_unluac(modal);
                    }
                });

                ui.add_space(10.);
                if ui.button("Install c2ditools").clicked() {
                    self.install_c2ditools(modal);
                }
                if ui.button("Install Offsetting").clicked() {
                    self.install_offsetting(modal);
                }

                ui.add_space(10.);
                if ui.button("Finish Setup").clicked() {
                    self.finish_setup(modal);
                }

                ui.add_space(10.);
                ui.small(format!("Setup status: {}", self.setup.state()));
                ui.small("unluac.jar can be installed automatically using the 'Install' buttons above.");
            });
        });
    }

    fn install_unluac(&mut self, modal: &Modal) {
        let destination = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));

        match self.resolver.fetch_decompiler_jar(&destination) {
            Ok(path) => {
                let updated = self.config.with_unluac_path(&path);

                match self.store.save(&updated) {
                    Ok(()) => {
                        self.setup.select_jar(updated.unluac_path.clone());
                        self.config = updated;
                        notify(
                            modal,
                            "Success",
                            "unluac.jar downloaded and installed successfully!",
                            Icon::Success,
                        );
                    }
                    Err(err) => notify(modal, "Error", err.to_string(), Icon::Error),
                }
            }
            Err(err) => notify(
                modal,
                "Error",
                format!("Failed to download unluac.jar: {err}"),
                Icon::Error,
            ),
        }
    }

    fn install_c2ditools(&mut self, modal: &Modal) {
        let report = self.resolver.install_scene_codec_library(&self.executor);
        self.setup.touched();

        match report.into_result() {
            Ok(()) => notify(
                modal,
                "Success",
                "c2ditools installed successfully!",
                Icon::Success,
            ),
            Err(err) => notify(
                modal,
                "Error",
                format!("Failed to install c2ditools:\n{}", err.stderr),
                Icon::Error,
            ),
        }
    }

    fn install_offsetting(&mut self, modal: &Modal) {
        let destination = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        match self.resolver.fetch_container_codec_binary(
            &destination,
            &mut self.config,
            &self.store,
        ) {
            Ok(_) => {
                self.setup.touched();
                notify(
                    modal,
                    "Success",
                    "Offsetting installed successfully!",
                    Icon::Success,
                );
            }
            Err(err) => notify(
                modal,
                "Error",
                format!("Failed to install offsetting: {err}"),
                Icon::Error,
            ),
        }
    }

    fn finish_setup(&mut self, modal: &Modal) {
        match self.setup.finish(&self.resolver, &self.store, &self.config) {
            Ok(updated) => {
                self.config = updated;
                log::info!("Setup completed, transitioning to main UI");
            }
            Err(err) => notify(modal, "Error", err.to_string(), Icon::Error),
        }
    }

    fn draw_tab_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("tab-bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                for tab in AppTabs::iter() {
                    ui.selectable_value(&mut self.current_tab, tab.clone(), tab.to_string());
                }
            });
            ui.add_space(1.);
        });
    }

    fn draw_output_panel(&mut self, ctx: &egui::Context, modal: &Modal) {
        egui::TopBottomPanel::bottom("output-panel").show(ctx, |ui| {
            ui.add_space(5.);
            egui::ScrollArea::vertical()
                .max_height(180.)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    ui.add(
                        egui::TextEdit::multiline(&mut self.output.as_str())
                            .desired_rows(10)
                            .desired_width(f32::INFINITY)
                            .font(egui::TextStyle::Monospace),
                    );
                });

            ui.horizontal(|ui| {
                if ui.button("Check Dependencies").clicked() {
                    self.check_dependencies(modal);
                }
                if ui.button("Clear Output").clicked() {
                    self.output.clear();
                }
                if ui.button("Restart Setup").clicked() {
                    self.setup.restart(&self.config);
                }
                if ui.button("Exit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
            ui.add_space(5.);
        });
    }

    fn check_dependencies(&mut self, modal: &Modal) {
        self.output.clear();
        let status = self.resolver.status(&self.config);

        for line in status.lines(&self.config) {
            self.log(line);
        }

        let missing = status.missing();
        if missing.is_empty() {
            notify(
                modal,
                "Dependencies",
                "All required tools are installed!",
                Icon::Info,
            );
        } else {
            notify(
                modal,
                "Missing Dependencies",
                missing.join("\n\n"),
                Icon::Warning,
            );
        }
    }

    fn run_operation(&mut self, modal: &Modal, request: OperationRequest) {
        let kind = request.kind();
        let ops = Operations::new(
            &self.toolchain,
            &self.executor,
            self.resolver.scene_codec(),
        );
        let outcome = ops.execute(&self.config, &request);

        match outcome {
            Ok(outcome) => {
                for note in &outcome.notes {
                    self.log(note);
                }
                if !outcome.result.stdout.trim().is_empty() {
                    self.log(outcome.result.stdout.trim_end());
                }
                if !outcome.result.stderr.trim().is_empty() {
                    self.log(outcome.result.stderr.trim_end());
                }
                if let Some(path) = &outcome.output {
                    self.log(format!("{kind}: wrote {}", path.display()));
                }

                if kind == OperationKind::ZipPack {
                    let name = outcome
                        .output
                        .map(|path| path.display().to_string())
                        .unwrap_or_default();
                    notify(
                        modal,
                        "Success",
                        format!("Packed {name} successfully."),
                        Icon::Success,
                    );
                }
            }
            Err(err) => {
                self.log(format!("{kind} failed: {err}"));
                notify(modal, "Error", err.to_string(), Icon::Error);
            }
        }
    }

    fn draw_scene_tab(&mut self, modal: &Modal, ui: &mut egui::Ui, encode: bool) {
        let (ctx, input_label, output_label) = if encode {
            (&mut self.encode_ctx, "Input XML File:", "Output OCT File:")
        } else {
            (&mut self.decode_ctx, "Input OCT File:", "Output XML File:")
        };

        egui::Grid::new(if encode { "encode-grid" } else { "decode-grid" })
            .num_columns(3)
            .show(ui, |ui| {
                path_row(ui, input_label, &mut ctx.input, || {
                    rfd::FileDialog::new().pick_file()
                });
                path_row(ui, output_label, &mut ctx.output, || {
                    rfd::FileDialog::new().save_file()
                });
                path_row(ui, "Textures Directory:", &mut ctx.textures, || {
                    rfd::FileDialog::new().pick_folder()
                });
            });

        let request = if encode {
            OperationRequest::SceneEncode {
                input: ctx.input.clone(),
                output: ctx.output.clone(),
                textures: ctx.textures.clone(),
            }
        } else {
            OperationRequest::SceneDecode {
                input: ctx.input.clone(),
                output: ctx.output.clone(),
                textures: ctx.textures.clone(),
            }
        };

        if ui.button(if encode { "Encode" } else { "Decode" }).clicked() {
            self.run_operation(modal, request);
        }
    }

    fn draw_pack_tab(&mut self, modal: &Modal, ui: &mut egui::Ui) {
        egui::Grid::new("pack-grid").num_columns(3).show(ui, |ui| {
            ui.label("Output name:");
            ui.add(egui::TextEdit::singleline(&mut self.pack_ctx.name).desired_width(350.));
            ui.end_row();

            path_row(ui, "Input Folder:", &mut self.pack_ctx.folder, || {
                rfd::FileDialog::new().pick_folder()
            });
        });

        if ui.button("Pack .zip").clicked() {
            let request = OperationRequest::ZipPack {
                folder: self.pack_ctx.folder.clone(),
                name: self.pack_ctx.name.clone(),
            };
            self.run_operation(modal, request);
        }
    }

    fn draw_decrypt_tab(&mut self, modal: &Modal, ui: &mut egui::Ui) {
        egui::Grid::new("decrypt-grid").num_columns(3).show(ui, |ui| {
            path_row(ui, "Input .lua File:", &mut self.decrypt_ctx.input, || {
                rfd::FileDialog::new()
                    .add_filter("LUA files", &["lua"])
                    .pick_file()
            });
        });

        if ui.button("Decrypt .lua").clicked() {
            let request = OperationRequest::LuaDecrypt {
                input: self.decrypt_ctx.input.clone(),
            };
            self.run_operation(modal, request);
        }
    }

    fn draw_offsetting_tab(&mut self, modal: &Modal, ui: &mut egui::Ui, encode: bool) {
        let (ctx, label, filter, extension) = if encode {
            (
                &mut self.offsetting_encode_ctx,
                "Input JSON File:",
                "JSON files",
                "json",
            )
        } else {
            (
                &mut self.offsetting_decode_ctx,
                "Input OCT File:",
                "OCT files",
                "oct",
            )
        };

        egui::Grid::new(if encode { "offsetting-encode-grid" } else { "offsetting-decode-grid" })
            .num_columns(3)
            .show(ui, |ui| {
                path_row(ui, label, &mut ctx.input, || {
                    rfd::FileDialog::new()
                        .add_filter(filter, &[extension])
                        .pick_file()
                });
            });

        let input = ctx.input.clone();
        if ui.button(if encode { "Encode" } else { "Decode" }).clicked() {
            let request = if encode {
                OperationRequest::ContainerEncode { input }
            } else {
                OperationRequest::ContainerDecode { input }
            };
            self.run_operation(modal, request);
        }
    }

    fn draw_current_tab(&mut self, modal: &Modal, ui: &mut egui::Ui) {
        match self.current_tab {
            AppTabs::Decode => self.draw_scene_tab(modal, ui, false),
            AppTabs::Encode => self.draw_scene_tab(modal, ui, true),
            AppTabs::PackZip => self.draw_pack_tab(modal, ui),
            AppTabs::DecryptLua => self.draw_decrypt_tab(modal, ui),
            AppTabs::OffsettingDecode => self.draw_offsetting_tab(modal, ui, false),
            AppTabs::OffsettingEncode => self.draw_offsetting_tab(modal, ui, true),
        }
    }
}

impl eframe::App for EguiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut modal = Modal::new(ctx, "modrod-dialog");
        modal.show_dialog();

        let ready = self.setup.is_ready();
        if self.titled_ready != Some(ready) {
            let title = if ready {
                "Cars 2 Modding Tool"
            } else {
                "Cars 2 Modding Tool - Setup"
            };
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.to_string()));
            self.titled_ready = Some(ready);
        }

        if !ready {
            self.draw_setup(ctx, &modal);
            return;
        }

        self.draw_tab_bar(ctx);
        self.draw_output_panel(ctx, &modal);

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_current_tab(&modal, ui);
        });
    }
}

/// Label, path entry and a Browse button filling one grid row.
fn path_row(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut String,
    browse: impl FnOnce() -> Option<PathBuf>,
) {
    ui.label(label);
    ui.add(egui::TextEdit::singleline(value).desired_width(350.));
    if ui.button("Browse").clicked() {
        if let Some(path) = browse() {
            log::info!("Browsed and selected: {}", path.display());
            *value = path.display().to_string();
        }
    }
    ui.end_row();
}

fn notify(modal: &Modal, title: &str, body: impl Into<String>, icon: Icon) {
    modal
        .dialog()
        .with_title(title)
        .with_body(body.into())
        .with_icon(icon)
        .open();
}
