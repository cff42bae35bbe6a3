use super::config::{ConfigStore, Configuration};
use super::error::FinishError;
use super::resolver::DependencyResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum SetupState {
    #[default]
    #[strum(to_string = "not ready")]
    NotReady,
    #[strum(to_string = "pending validation")]
    PendingValidation,
    #[strum(to_string = "ready")]
    Ready,
}

/// NotReady -> PendingValidation -> Ready, and back to NotReady on restart.
#[derive(Debug, Clone, Default)]
pub struct SetupFlow {
    state: SetupState,
    pub jar_entry: String,
}

impl SetupFlow {
    pub fn start(resolver: &DependencyResolver, config: &Configuration) -> Self {
        let state = if resolver.check_ready(config) {
            SetupState::Ready
        } else {
            SetupState::NotReady
        };

        Self {
            state,
            jar_entry: config.unluac_path.clone(),
        }
    }

    pub fn state(&self) -> SetupState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SetupState::Ready
    }

    /// The user browsed for, or installed, something on the setup screen.
    pub fn touched(&mut self) {
        if self.state == SetupState::NotReady {
            self.transition(SetupState::PendingValidation);
        }
    }

    pub fn select_jar(&mut self, path: impl Into<String>) {
        self.jar_entry = path.into();
        self.touched();
    }

    /// Validates the setup screen and saves the result. Only a saved
    /// configuration moves the flow to `Ready`.
    pub fn finish(
        &mut self,
        resolver: &DependencyResolver,
        store: &ConfigStore,
        config: &Configuration,
    ) -> Result<Configuration, FinishError> {
        let updated = resolver.finalize_setup(config, self.jar_entry.trim())?;
        store.save(&updated)?;
        self.transition(SetupState::Ready);
        Ok(updated)
    }

    pub fn restart(&mut self, config: &Configuration) {
        self.jar_entry = config.unluac_path.clone();
        self.transition(SetupState::NotReady);
    }

    fn transition(&mut self, next: SetupState) {
        log::info!("Setup: {} -> {next}", self.state);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::error::SetupError;
    use crate::tools::resolver::tests::Fixed;
    use crate::tools::toolchain::Toolchain;
    use tempfile::TempDir;

    fn resolver(library: bool) -> DependencyResolver {
        DependencyResolver::new(Toolchain::default()).with_scene_codec(Box::new(Fixed(library)))
    }

    #[test]
    fn starts_ready_when_everything_is_present() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("unluac.jar");
        std::fs::write(&jar, b"").unwrap();
        let config = Configuration {
            unluac_path: jar.display().to_string(),
            offsetting_path: String::new(),
        };

        assert!(SetupFlow::start(&resolver(true), &config).is_ready());
        assert_eq!(
            SetupFlow::start(&resolver(false), &config).state(),
            SetupState::NotReady
        );
    }

    #[test]
    fn walks_through_every_state() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("unluac.jar");
        std::fs::write(&jar, b"").unwrap();
        let resolver = resolver(true);
        let store = ConfigStore::new(dir.path().join("config.txt"));
        let config = Configuration::default();

        let mut flow = SetupFlow::start(&resolver, &config);
        assert_eq!(flow.state(), SetupState::NotReady);

        flow.select_jar(jar.display().to_string());
        assert_eq!(flow.state(), SetupState::PendingValidation);

        let updated = flow.finish(&resolver, &store, &config).unwrap();
        assert_eq!(flow.state(), SetupState::Ready);
        assert_eq!(updated.unluac_path, jar.display().to_string());
        assert_eq!(store.load(), updated);

        flow.restart(&updated);
        assert_eq!(flow.state(), SetupState::NotReady);
        assert_eq!(flow.jar_entry, updated.unluac_path);
    }

    #[test]
    fn failed_finish_keeps_state() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.txt"));
        let resolver = resolver(true);
        let mut flow = SetupFlow::default();
        flow.select_jar("nowhere/unluac.jar");

        let result = flow.finish(&resolver, &store, &Configuration::default());

        assert!(matches!(result, Err(FinishError::Setup(SetupError::MissingJar))));
        assert_eq!(flow.state(), SetupState::PendingValidation);
        assert!(!store.path().exists());
    }

    #[test]
    fn failed_save_keeps_state() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("unluac.jar");
        std::fs::write(&jar, b"").unwrap();
        // A directory where config.txt should be cannot be replaced.
        let blocked = dir.path().join("config.txt");
        std::fs::create_dir(&blocked).unwrap();
        let store = ConfigStore::new(blocked.clone());
        let resolver = resolver(true);
        let mut flow = SetupFlow::default();
        flow.select_jar(jar.display().to_string());

        let result = flow.finish(&resolver, &store, &Configuration::default());

        assert!(matches!(result, Err(FinishError::Save(_))));
        assert_eq!(flow.state(), SetupState::PendingValidation);
        assert!(blocked.is_dir());
    }
}
