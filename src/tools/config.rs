use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::error::{ConfigLoadError, ConfigSaveError};

pub const DEFAULT_CONFIG_FILE: &str = "config.txt";

const UNLUAC_KEY: &str = "unluac_path";
const OFFSETTING_KEY: &str = "offsetting_path";

/// Where the external tools live on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    pub unluac_path: String,
    pub offsetting_path: String,
}

impl Configuration {
    /// Copy of this configuration pointing at a different decompiler jar.
    pub fn with_unluac_path(&self, path: &Path) -> Self {
        Self {
            unluac_path: path.display().to_string(),
            ..self.clone()
        }
    }

    /// Parses the `key=value` format line by line, skipping anything it does not know.
    pub fn parse(contents: &str) -> Self {
        let mut config = Self::default();

        for line in contents.lines() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };

            match key {
                UNLUAC_KEY => config.unluac_path = value.to_string(),
                OFFSETTING_KEY => config.offsetting_path = value.to_string(),
                _ => log::debug!("Ignoring unknown config line: {line}"),
            }
        }

        config
    }

    pub fn render(&self) -> Result<String, ConfigSaveError> {
        for (key, value) in [
            (UNLUAC_KEY, &self.unluac_path),
            (OFFSETTING_KEY, &self.offsetting_path),
        ] {
            if value.contains(['\n', '\r']) {
                return Err(ConfigSaveError::LineBreak { key });
            }
        }

        Ok(format!(
            "{UNLUAC_KEY}={}\n{OFFSETTING_KEY}={}\n",
            self.unluac_path, self.offsetting_path
        ))
    }
}

/// Sole owner of the backing `config.txt`.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_FILE)
    }
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration, falling back to defaults on any read failure.
    pub fn load(&self) -> Configuration {
        match self.try_load() {
            Ok(Some(config)) => {
                log::info!(
                    "Loaded config: unluac_path={}, offsetting_path={}",
                    config.unluac_path,
                    config.offsetting_path
                );
                config
            }
            Ok(None) => {
                log::info!(
                    "No {} found, starting fresh setup",
                    self.path.display()
                );
                Configuration::default()
            }
            Err(err) => {
                log::warn!("{err}; using defaults");
                Configuration::default()
            }
        }
    }

    fn try_load(&self) -> Result<Option<Configuration>, ConfigLoadError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(Configuration::parse(&contents))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigLoadError {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Replaces the backing file with both keys in one rename.
    pub fn save(&self, config: &Configuration) -> Result<(), ConfigSaveError> {
        let contents = config.render()?;
        let io_err = |source: io::Error| ConfigSaveError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;
        temp.write_all(contents.as_bytes()).map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;
        temp.persist(&self.path).map_err(|err| io_err(err.error))?;

        log::info!(
            "Saved config: unluac_path={}, offsetting_path={}",
            config.unluac_path,
            config.offsetting_path
        );
        Ok(())
    }
}
