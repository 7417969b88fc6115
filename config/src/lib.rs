//! Configuration for the adaptive-pathway RL pipeline: recognized keys,
//! layered precedence (CLI > env > file > defaults), validation, and file
//! hot-reload.

pub mod config;
pub mod file_loader;
pub mod hot_reload;
pub mod loader;
pub mod precedence;
pub mod validator;

pub use config::{
    ClusterCurveOverride, EngagementThresholds, LearningCurveChoice, PipelineConfig,
    QuarterThresholds, RewardConfig,
};
pub use file_loader::{load_from_file, load_from_toml, load_from_yaml};
pub use hot_reload::watch_config;
pub use loader::{apply_env_overrides, load_from_env};
pub use precedence::{merge_configs, CliOverrides};
pub use validator::validate;
