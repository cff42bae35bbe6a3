use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use reqwest::blocking::Client;
use tempfile::NamedTempFile;

use super::config::{ConfigStore, Configuration};
use super::error::{ConfigSaveError, DownloadError, InstallError, SetupError};
use super::executor::Executor;
use super::toolchain::{
    DownloadSources, Toolchain, OFFSETTING_ASSET, SCENE_CODEC_MODULE, SCENE_CODEC_SOURCE,
    UNLUAC_JAR_NAME,
};

/// Something the modding tools need before they can run.
pub trait Dependency {
    fn name(&self) -> &str;
    fn is_available(&self) -> bool;
}

/// A Python module, probed by importing it.
#[derive(Debug, Clone)]
pub struct PythonModule {
    interpreter: String,
    module: String,
}

impl PythonModule {
    pub fn new(interpreter: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            module: module.into(),
        }
    }

    pub fn scene_codec(toolchain: &Toolchain) -> Self {
        Self::new(&toolchain.python, SCENE_CODEC_MODULE)
    }
}

impl Dependency for PythonModule {
    fn name(&self) -> &str {
        &self.module
    }

    fn is_available(&self) -> bool {
        let found = probe(
            Command::new(&self.interpreter)
                .arg("-c")
                .arg(format!("import {}", self.module)),
        );
        log::debug!("{} importable: {found}", self.module);
        found
    }
}

/// A file that only has to exist, like the decompiler jar or the container binary.
#[derive(Debug, Clone)]
pub struct ToolFile {
    name: &'static str,
    path: PathBuf,
}

impl ToolFile {
    pub fn new(name: &'static str, path: impl Into<PathBuf>) -> Self {
        Self {
            name,
            path: path.into(),
        }
    }

    pub fn unluac(config: &Configuration) -> Self {
        Self::new(UNLUAC_JAR_NAME, &config.unluac_path)
    }

    pub fn offsetting(config: &Configuration) -> Self {
        Self::new("offsetting", &config.offsetting_path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Dependency for ToolFile {
    fn name(&self) -> &str {
        self.name
    }

    fn is_available(&self) -> bool {
        !self.path.as_os_str().is_empty() && self.path.is_file()
    }
}

/// A runtime that answers a version query.
#[derive(Debug, Clone)]
pub struct Runtime {
    program: String,
    version_arg: &'static str,
}

impl Runtime {
    pub fn java(toolchain: &Toolchain) -> Self {
        Self {
            program: toolchain.java.clone(),
            version_arg: "-version",
        }
    }
}

impl Dependency for Runtime {
    fn name(&self) -> &str {
        &self.program
    }

    fn is_available(&self) -> bool {
        probe(Command::new(&self.program).arg(self.version_arg))
    }
}

fn probe(command: &mut Command) -> bool {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Snapshot of every dependency. Recomputed on demand, never cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DependencyStatus {
    pub scene_codec: bool,
    pub java: bool,
    pub unluac: bool,
    pub offsetting: bool,
}

impl DependencyStatus {
    /// One status line per dependency, as shown in the output log.
    pub fn lines(&self, config: &Configuration) -> Vec<String> {
        let installed = |found| if found { "Installed" } else { "Not installed" };

        vec![
            format!("{SCENE_CODEC_MODULE}: {}", installed(self.scene_codec)),
            format!("Java: {}", installed(self.java)),
            if self.unluac {
                format!("unluac.jar: Found at {}", config.unluac_path)
            } else {
                format!("unluac.jar: Not found at {}", config.unluac_path)
            },
            if self.offsetting {
                format!("offsetting: Found at {}", config.offsetting_path)
            } else {
                format!("offsetting: Not found at {}", config.offsetting_path)
            },
        ]
    }

    /// Hints for whatever is missing; empty when everything is in place.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut messages = Vec::new();
        if !self.scene_codec {
            messages.push("c2ditools is missing. Install it from the setup screen.");
        }
        if !self.java {
            messages.push("Java is missing. Install Java to use Unluac for .lua decryption.");
        }
        if !self.unluac {
            messages.push("unluac.jar location is invalid. Re-run setup.");
        }
        if !self.offsetting {
            messages.push("offsetting location is invalid. Re-run setup.");
        }
        messages
    }
}

/// Outcome of installing the scene-codec module. A failed install is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub success: bool,
    pub log: String,
}

impl InstallReport {
    pub fn into_result(self) -> Result<(), InstallError> {
        if self.success {
            Ok(())
        } else {
            Err(InstallError { stderr: self.log })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Save(#[from] ConfigSaveError),
}

/// Checks, downloads and installs the external tools.
pub struct DependencyResolver {
    toolchain: Toolchain,
    sources: DownloadSources,
    client: Client,
    scene_codec: Box<dyn Dependency>,
}

impl DependencyResolver {
    pub fn new(toolchain: Toolchain) -> Self {
        Self {
            scene_codec: Box::new(PythonModule::scene_codec(&toolchain)),
            toolchain,
            sources: DownloadSources::default(),
            client: Client::new(),
        }
    }

    pub fn with_sources(mut self, sources: DownloadSources) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_scene_codec(mut self, scene_codec: Box<dyn Dependency>) -> Self {
        self.scene_codec = scene_codec;
        self
    }

    pub fn scene_codec(&self) -> &dyn Dependency {
        self.scene_codec.as_ref()
    }

    /// Whether the main screen may be shown.
    ///
    /// Only the scene-codec module and the decompiler jar gate this; the container
    /// binary is reported by [`Self::status`] but never blocks setup.
    pub fn check_ready(&self, config: &Configuration) -> bool {
        let library = self.scene_codec.is_available();
        let jar = ToolFile::unluac(config).is_available();
        log::info!(
            "Setup check: {}={library}, unluac_path={} exists={jar}",
            self.scene_codec.name(),
            config.unluac_path
        );
        library && jar
    }

    pub fn status(&self, config: &Configuration) -> DependencyStatus {
        DependencyStatus {
            scene_codec: self.scene_codec.is_available(),
            java: Runtime::java(&self.toolchain).is_available(),
            unluac: ToolFile::unluac(config).is_available(),
            offsetting: ToolFile::offsetting(config).is_available(),
        }
    }

    /// Downloads `unluac.jar` into `destination_dir`, replacing any existing copy.
    pub fn fetch_decompiler_jar(&self, destination_dir: &Path) -> Result<PathBuf, DownloadError> {
        self.download(&self.sources.unluac, &destination_dir.join(UNLUAC_JAR_NAME))
    }

    /// Downloads the container codec and records it in the saved configuration.
    pub fn fetch_container_codec_binary(
        &self,
        destination_dir: &Path,
        config: &mut Configuration,
        store: &ConfigStore,
    ) -> Result<PathBuf, FetchError> {
        let path = self.download(
            &self.sources.offsetting,
            &destination_dir.join(OFFSETTING_ASSET),
        )?;
        mark_executable(&path)?;

        let mut updated = config.clone();
        updated.offsetting_path = path.display().to_string();
        store.save(&updated)?;
        *config = updated;

        Ok(path)
    }

    pub fn install_scene_codec_library(&self, executor: &dyn Executor) -> InstallReport {
        let argv = vec![
            self.toolchain.python.clone(),
            "-m".to_string(),
            "pip".to_string(),
            "install".to_string(),
            SCENE_CODEC_SOURCE.to_string(),
        ];
        log::info!("Starting {SCENE_CODEC_MODULE} installation");

        match executor.run(&argv, false) {
            Ok(result) if result.success() => {
                log::info!("{SCENE_CODEC_MODULE} installed successfully");
                InstallReport {
                    success: true,
                    log: result.stderr,
                }
            }
            Ok(result) => {
                log::error!("{SCENE_CODEC_MODULE} installation failed: {}", result.stderr);
                InstallReport {
                    success: false,
                    log: result.stderr,
                }
            }
            Err(err) => {
                log::error!("pip execution failed: {err}");
                InstallReport {
                    success: false,
                    log: err.to_string(),
                }
            }
        }
    }

    /// Validates the jar chosen on the setup screen and returns the configuration to save.
    pub fn finalize_setup(
        &self,
        config: &Configuration,
        jar_path: &str,
    ) -> Result<Configuration, SetupError> {
        log::info!("Finishing setup with unluac_path={jar_path}");

        if !ToolFile::new(UNLUAC_JAR_NAME, jar_path).is_available() {
            return Err(SetupError::MissingJar);
        }
        if !self.scene_codec.is_available() {
            return Err(SetupError::MissingLibrary);
        }

        Ok(Configuration {
            unluac_path: jar_path.to_string(),
            ..config.clone()
        })
    }

    /// Streams `url` into a temporary file beside `destination` and renames it into
    /// place only once the whole body arrived.
    fn download(&self, url: &str, destination: &Path) -> Result<PathBuf, DownloadError> {
        log::info!("Downloading {url} to {}", destination.display());

        let io_err = |source: std::io::Error| DownloadError::Io {
            path: destination.to_path_buf(),
            source,
        };
        let transport = |source: reqwest::Error| DownloadError::Transport {
            url: url.to_string(),
            source,
        };

        let mut response = self.client.get(url).send().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            log::error!("Download of {url} failed with HTTP {status}");
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let dir = destination.parent().unwrap_or(Path::new("."));
        let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;
        response.copy_to(temp.as_file_mut()).map_err(transport)?;
        temp.persist(destination).map_err(|err| io_err(err.error))?;

        let written = std::path::absolute(destination).map_err(io_err)?;
        log::info!("Downloaded {}", written.display());
        Ok(written)
    }
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<(), DownloadError> {
    use std::os::unix::fs::PermissionsExt;

    let io_err = |source: std::io::Error| DownloadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut permissions = fs::metadata(path).map_err(io_err)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    fs::set_permissions(path, permissions).map_err(io_err)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<(), DownloadError> {
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tools::error::ExecutionError;
    use crate::tools::executor::CommandResult;
    use tempfile::TempDir;

    pub(crate) struct Fixed(pub bool);

    impl Dependency for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn is_available(&self) -> bool {
            self.0
        }
    }

    struct Canned(Result<CommandResult, ()>);

    impl Executor for Canned {
        fn run(&self, argv: &[String], use_shell: bool) -> Result<CommandResult, ExecutionError> {
            assert!(!use_shell);
            assert_eq!(argv[1..4], ["-m", "pip", "install"]);
            assert_eq!(argv[4], SCENE_CODEC_SOURCE);
            self.0.clone().map_err(|()| ExecutionError::Launch {
                program: argv[0].clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no python"),
            })
        }
    }

    fn resolver(library: bool) -> DependencyResolver {
        DependencyResolver::new(Toolchain::default()).with_scene_codec(Box::new(Fixed(library)))
    }

    fn mock_sources(server: &mockito::ServerGuard) -> DownloadSources {
        DownloadSources {
            unluac: format!("{}/unluac.jar", server.url()),
            offsetting: format!("{}/offsetting", server.url()),
        }
    }

    fn config_with_jar(dir: &TempDir) -> Configuration {
        let jar = dir.path().join(UNLUAC_JAR_NAME);
        fs::write(&jar, b"PK").unwrap();
        Configuration {
            unluac_path: jar.display().to_string(),
            offsetting_path: String::new(),
        }
    }

    #[test]
    fn ready_needs_both_library_and_jar() {
        let dir = TempDir::new().unwrap();
        let with_jar = config_with_jar(&dir);
        let without_jar = Configuration {
            unluac_path: dir.path().join("gone.jar").display().to_string(),
            ..Default::default()
        };

        assert!(resolver(true).check_ready(&with_jar));
        assert!(!resolver(false).check_ready(&with_jar));
        assert!(!resolver(true).check_ready(&without_jar));
        assert!(!resolver(false).check_ready(&without_jar));
        assert!(!resolver(true).check_ready(&Configuration::default()));
    }

    #[test]
    fn ready_ignores_container_codec() {
        let dir = TempDir::new().unwrap();
        let mut config = config_with_jar(&dir);
        config.offsetting_path = dir.path().join("missing.exe").display().to_string();

        assert!(resolver(true).check_ready(&config));
        assert!(!resolver(true).status(&config).offsetting);
    }

    #[test]
    fn jar_directory_does_not_count_as_jar() {
        let dir = TempDir::new().unwrap();
        let config = Configuration {
            unluac_path: dir.path().display().to_string(),
            ..Default::default()
        };
        assert!(!resolver(true).check_ready(&config));
    }

    #[test]
    fn finalize_reports_missing_jar_before_library() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.jar").display().to_string();

        assert_eq!(
            resolver(false).finalize_setup(&Configuration::default(), &missing),
            Err(SetupError::MissingJar)
        );
        assert_eq!(
            resolver(false).finalize_setup(&Configuration::default(), ""),
            Err(SetupError::MissingJar)
        );
    }

    #[test]
    fn finalize_requires_library() {
        let dir = TempDir::new().unwrap();
        let jar = config_with_jar(&dir).unluac_path;

        assert_eq!(
            resolver(false).finalize_setup(&Configuration::default(), &jar),
            Err(SetupError::MissingLibrary)
        );
    }

    #[test]
    fn finalize_keeps_container_path() {
        let dir = TempDir::new().unwrap();
        let jar = config_with_jar(&dir).unluac_path;
        let config = Configuration {
            unluac_path: "old.jar".into(),
            offsetting_path: "offsetting.exe".into(),
        };

        let updated = resolver(true).finalize_setup(&config, &jar).unwrap();
        assert_eq!(updated.unluac_path, jar);
        assert_eq!(updated.offsetting_path, "offsetting.exe");
    }

    #[test]
    fn status_lines_and_hints() {
        let config = Configuration {
            unluac_path: "tools/unluac.jar".into(),
            offsetting_path: "tools/off".into(),
        };
        let status = DependencyStatus {
            scene_codec: true,
            java: false,
            unluac: true,
            offsetting: false,
        };

        assert_eq!(
            status.lines(&config),
            [
                "c2ditools: Installed",
                "Java: Not installed",
                "unluac.jar: Found at tools/unluac.jar",
                "offsetting: Not found at tools/off",
            ]
        );
        assert_eq!(status.missing().len(), 2);
        assert!(DependencyStatus {
            scene_codec: true,
            java: true,
            unluac: true,
            offsetting: true
        }
        .missing()
        .is_empty());
    }

    #[test]
    fn fetch_jar_writes_body_and_returns_absolute_path() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/unluac.jar")
            .with_status(200)
            .with_body(b"jar bytes")
            .expect(1)
            .create();
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(UNLUAC_JAR_NAME), b"stale").unwrap();

        let path = resolver(true)
            .with_sources(mock_sources(&server))
            .fetch_decompiler_jar(dir.path())
            .unwrap();

        mock.assert();
        assert!(path.is_absolute());
        assert_eq!(path.file_name().unwrap(), UNLUAC_JAR_NAME);
        assert_eq!(fs::read(&path).unwrap(), b"jar bytes");
    }

    #[test]
    fn fetch_jar_on_http_error_leaves_nothing_behind() {
        let mut server = mockito::Server::new();
        let _m = server.mock("GET", "/unluac.jar").with_status(404).create();
        let dir = TempDir::new().unwrap();

        let result = resolver(true)
            .with_sources(mock_sources(&server))
            .fetch_decompiler_jar(dir.path());

        assert!(matches!(
            result,
            Err(DownloadError::Status { status: 404, .. })
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn fetch_jar_on_http_error_keeps_previous_file() {
        let mut server = mockito::Server::new();
        let _m = server.mock("GET", "/unluac.jar").with_status(500).create();
        let dir = TempDir::new().unwrap();
        let existing = dir.path().join(UNLUAC_JAR_NAME);
        fs::write(&existing, b"previous jar").unwrap();

        let result = resolver(true)
            .with_sources(mock_sources(&server))
            .fetch_decompiler_jar(dir.path());

        assert!(result.is_err());
        assert_eq!(fs::read(&existing).unwrap(), b"previous jar");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn fetch_jar_on_transport_error() {
        let dir = TempDir::new().unwrap();
        let sources = DownloadSources {
            unluac: "http://127.0.0.1:1/unluac.jar".into(),
            offsetting: "http://127.0.0.1:1/offsetting".into(),
        };

        let result = resolver(true)
            .with_sources(sources)
            .fetch_decompiler_jar(dir.path());

        assert!(matches!(result, Err(DownloadError::Transport { .. })));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn fetch_container_codec_saves_config() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/offsetting")
            .with_status(200)
            .with_body(b"binary")
            .create();
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.txt"));
        let mut config = Configuration {
            unluac_path: "unluac.jar".into(),
            offsetting_path: String::new(),
        };

        let path = resolver(true)
            .with_sources(mock_sources(&server))
            .fetch_container_codec_binary(dir.path(), &mut config, &store)
            .unwrap();

        assert_eq!(path.file_name().unwrap(), OFFSETTING_ASSET);
        assert_eq!(fs::read(&path).unwrap(), b"binary");
        assert_eq!(config.offsetting_path, path.display().to_string());
        assert_eq!(store.load(), config);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn fetch_container_codec_failure_keeps_config() {
        let mut server = mockito::Server::new();
        let _m = server.mock("GET", "/offsetting").with_status(503).create();
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.txt"));
        let mut config = Configuration::default();

        let result = resolver(true)
            .with_sources(mock_sources(&server))
            .fetch_container_codec_binary(dir.path(), &mut config, &store);

        assert!(matches!(
            result,
            Err(FetchError::Download(DownloadError::Status { status: 503, .. }))
        ));
        assert_eq!(config, Configuration::default());
        assert!(!store.path().exists());
        assert!(!dir.path().join(OFFSETTING_ASSET).exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn install_reports_exit_status_and_stderr() {
        let ok = resolver(true).install_scene_codec_library(&Canned(Ok(CommandResult {
            code: Some(0),
            ..Default::default()
        })));
        assert!(ok.success);
        assert!(ok.into_result().is_ok());

        let failed = resolver(true).install_scene_codec_library(&Canned(Ok(CommandResult {
            code: Some(1),
            stdout: String::new(),
            stderr: "ERROR: git not found".into(),
        })));
        assert!(!failed.success);
        assert_eq!(failed.log, "ERROR: git not found");
        let err = failed.into_result().unwrap_err();
        assert!(err.to_string().contains("git not found"));

        let not_launched = resolver(true).install_scene_codec_library(&Canned(Err(())));
        assert!(!not_launched.success);
        assert!(not_launched.log.contains("no python"));
    }
}
