use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the interpreter does when a node faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// The faulting node returns `Failed`; interpretation continues.
    #[default]
    TreatAsFailure,
    /// The whole instance halts until the host resumes or resets it.
    PauseForInspection,
    /// Every stack is torn down and the tick returns the fault.
    Propagate,
}

/// Per-tree interpreter settings, read once when an instance is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub error_policy: ErrorPolicy,
    /// Trampoline steps one call stack may take per host call.
    pub max_steps_per_tick: u32,
    /// Re-enter the root on the tick after the main stack completes.
    pub restart_on_complete: bool,
    /// Seed of the instance's weighted-selection RNG.
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::default(),
            max_steps_per_tick: 1024,
            restart_on_complete: false,
            seed: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid tree config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl TreeConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }
}
