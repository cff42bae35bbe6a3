use std::env;
use std::path::PathBuf;

use super::config::DEFAULT_CONFIG_FILE;

pub const SCENE_CODEC_MODULE: &str = "c2ditools";
pub const SCENE_CODEC_SOURCE: &str =
    "git+https://github.com/TKFRvisionOfficial/Cars2TheVideoGameModding.git";

pub const UNLUAC_JAR_NAME: &str = "unluac.jar";
pub const UNLUAC_URL: &str =
    "https://github.com/Gh0styTongue/public-api/raw/refs/heads/main/C2/unluac.jar";

#[cfg(windows)]
pub const OFFSETTING_ASSET: &str = "offsetting_windows.exe";
#[cfg(target_os = "macos")]
pub const OFFSETTING_ASSET: &str = "offsetting_macos";
#[cfg(all(not(windows), not(target_os = "macos")))]
pub const OFFSETTING_ASSET: &str = "offsetting_linux";

const OFFSETTING_RELEASES: &str = "https://github.com/offsetting/offsetting/releases/latest/download";

/// Programs used to drive the external tools. Read once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub python: String,
    pub java: String,
    pub config_file: PathBuf,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            java: "java".to_string(),
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }
}

impl Toolchain {
    /// Defaults overridden by `MODROD_PYTHON`, `MODROD_JAVA` and `MODROD_CONFIG`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            python: non_empty("MODROD_PYTHON").unwrap_or(defaults.python),
            java: non_empty("MODROD_JAVA").unwrap_or(defaults.java),
            config_file: non_empty("MODROD_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_file),
        }
    }

    /// `<python> -m c2ditools`, the prefix of every scene-codec command.
    pub fn scene_codec_prefix(&self) -> Vec<String> {
        vec![
            self.python.clone(),
            "-m".to_string(),
            SCENE_CODEC_MODULE.to_string(),
        ]
    }
}

/// Remote locations of the downloadable tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSources {
    pub unluac: String,
    pub offsetting: String,
}

impl Default for DownloadSources {
    fn default() -> Self {
        Self {
            unluac: UNLUAC_URL.to_string(),
            offsetting: format!("{OFFSETTING_RELEASES}/{OFFSETTING_ASSET}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_overrides_defaults() {
        let vars: HashMap<&str, &str> = [("MODROD_PYTHON", "python3"), ("MODROD_JAVA", "  ")]
            .into_iter()
            .collect();
        let toolchain = Toolchain::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(toolchain.python, "python3");
        assert_eq!(toolchain.java, "java");
        assert_eq!(toolchain.config_file, PathBuf::from("config.txt"));
    }

    #[test]
    fn offsetting_url_ends_with_platform_asset() {
        let sources = DownloadSources::default();
        assert!(sources.offsetting.ends_with(OFFSETTING_ASSET));
        assert!(sources.offsetting.starts_with("https://github.com/offsetting/"));
    }
}
