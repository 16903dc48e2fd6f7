use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Compute budget granted to one update run.
///
/// The budget is supplied by the caller; the core never inspects the host it
/// runs on.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResourceBudget {
    /// Number of CPU cores the merge engine may occupy.
    #[serde(default = "default_cpu_cores")]
    pub cpu_cores: u32,
    /// Memory budget in gigabytes. Reported to the operator; the engine
    /// sizes its own buffers.
    #[serde(default = "default_memory_gb")]
    pub memory_gb: u32,
}

impl ResourceBudget {
    /// Default CPU core budget.
    pub const DEFAULT_CPU_CORES: u32 = 8;

    /// Default memory budget in gigabytes.
    pub const DEFAULT_MEMORY_GB: u32 = 16;

    /// Validates the resource budget.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cpu_cores == 0 {
            return Err(ValidationError::invalid(
                "resources.cpu_cores",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Default for ResourceBudget {
    fn default() -> Self {
        Self {
            cpu_cores: default_cpu_cores(),
            memory_gb: default_memory_gb(),
        }
    }
}

fn default_cpu_cores() -> u32 {
    ResourceBudget::DEFAULT_CPU_CORES
}

fn default_memory_gb() -> u32 {
    ResourceBudget::DEFAULT_MEMORY_GB
}
