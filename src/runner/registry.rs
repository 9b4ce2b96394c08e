//! Action to runner dispatch table.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::SdkConfig;
use crate::error::Result;
use crate::manifest::Action;

use super::echo::EchoRunner;
use super::shell::{ExecutableRunner, ShellRunner};
use super::ActionRunner;

/// Settings shared by the built-in runners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Shell used to run command lines.
    pub shell: PathBuf,
    /// Mirror action output to this process's streams.
    pub mirror_output: bool,
    /// Print manifests instead of executing them.
    pub dry_run: bool,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self::from(&SdkConfig::default())
    }
}

impl From<&SdkConfig> for RunnerSettings {
    fn from(config: &SdkConfig) -> Self {
        Self {
            shell: config.shell.clone(),
            mirror_output: config.mirror_output,
            dry_run: config.dry_run,
        }
    }
}

/// Selects the runner for each action.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    settings: RunnerSettings,
    overrides: HashMap<Action, Arc<dyn ActionRunner>>,
}

impl ActionRegistry {
    /// Creates a registry with the built-in runners.
    #[must_use]
    pub fn new(settings: RunnerSettings) -> Self {
        Self {
            settings,
            overrides: HashMap::new(),
        }
    }

    /// Uses `runner` for `action` instead of the built-in one.
    #[must_use]
    pub fn with_runner(mut self, action: Action, runner: Arc<dyn ActionRunner>) -> Self {
        self.overrides.insert(action, runner);
        self
    }

    /// Settings of the built-in runners.
    #[must_use]
    pub const fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Runner for `action`.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::ExecutableNotFound`](crate::error::ApplyError::ExecutableNotFound)
    /// if the action's executable is not on the search path.
    pub fn runner_for(&self, action: Action) -> Result<Arc<dyn ActionRunner>> {
        if let Some(runner) = self.overrides.get(&action) {
            return Ok(Arc::clone(runner));
        }
        if self.settings.dry_run {
            return Ok(Arc::new(EchoRunner::new()));
        }

        let shell = ShellRunner::new(self.settings.shell.clone())
            .with_mirror(self.settings.mirror_output);
        let runner: Arc<dyn ActionRunner> = match action {
            Action::Cmd => Arc::new(shell),
            tool => Arc::new(ExecutableRunner::locate(tool.as_str(), shell)?),
        };
        Ok(runner)
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let overridden: Vec<_> = self.overrides.keys().collect();
        f.debug_struct("ActionRegistry")
            .field("settings", &self.settings)
            .field("overrides", &overridden)
            .finish()
    }
}
