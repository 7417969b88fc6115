//! Configuration precedence: CLI flags > environment > file > defaults.

use crate::config::PipelineConfig;

/// Sparse CLI-flag overrides, the highest-precedence layer. Every field is
/// optional; only flags the user actually passed are `Some`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CliOverrides {
    pub alpha: Option<f64>,
    pub gamma: Option<f64>,
    pub max_episodes: Option<u32>,
    pub checkpoint_every: Option<u32>,
}

impl CliOverrides {
    #[must_use]
    pub fn apply(self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(v) = self.alpha {
            config.alpha = v;
        }
        if let Some(v) = self.gamma {
            config.gamma = v;
        }
        if let Some(v) = self.max_episodes {
            config.max_episodes = v;
        }
        if let Some(v) = self.checkpoint_every {
            config.checkpoint_every = v;
        }
        config
    }
}

/// Resolves the final configuration: start from a file-loaded (or
/// default) config, layer environment overrides, then CLI overrides.
#[must_use]
pub fn merge_configs(file_config: PipelineConfig, cli: CliOverrides) -> PipelineConfig {
    let with_env = crate::loader::apply_env_overrides(file_config);
    cli.apply(with_env)
}
