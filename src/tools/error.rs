use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Reading `config.txt` failed for a reason other than the file being absent.
/// Never surfaced to the user; `ConfigStore::load` falls back to defaults.
#[derive(Debug, Error)]
#[error("could not read {path}: {source}")]
pub struct ConfigLoadError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Error)]
pub enum ConfigSaveError {
    #[error("value for '{key}' contains a line break and cannot be saved")]
    LineBreak { key: &'static str },

    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Package install exited non-zero; carries the captured stderr.
#[derive(Debug, Error)]
#[error("package install failed:\n{stderr}")]
pub struct InstallError {
    pub stderr: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("Please select or install a valid unluac.jar file.")]
    MissingJar,

    #[error("c2ditools is not installed. Please click 'Install c2ditools' first.")]
    MissingLibrary,
}

/// Finishing setup either failed validation or could not persist the result.
#[derive(Debug, Error)]
pub enum FinishError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Save(#[from] ConfigSaveError),
}

/// The external process could not be started at all.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("no command given")]
    EmptyCommand,

    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("c2ditools is not installed. Check setup.")]
    MissingSceneCodec,

    #[error("unluac.jar path is invalid. Re-run setup. (looked at '{}')", .0.display())]
    MissingDecompilerJar(PathBuf),

    #[error("offsetting binary not found at '{}'. Re-run setup.", .0.display())]
    MissingContainerCodec(PathBuf),

    #[error("{0}")]
    EmptyField(&'static str),

    #[error("'{}' is not a .{expected} file", .path.display())]
    UnexpectedExtension { path: PathBuf, expected: &'static str },

    #[error("could not stage unluac.jar at {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Command failed (exit code {}):\n{stderr}", .code.map_or("none".to_string(), |code| code.to_string()))]
    CommandFailure { code: Option<i32>, stderr: String },
}
