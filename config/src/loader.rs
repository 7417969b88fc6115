//! Environment variable overrides, `PW_*`-prefixed, following 12-factor
//! app conventions.

use crate::config::PipelineConfig;
use std::env;

/// Applies `PW_*` environment variable overrides onto an existing config,
/// returning the updated value. Unset variables leave the existing field
/// untouched.
pub fn apply_env_overrides(mut config: PipelineConfig) -> PipelineConfig {
    if let Some(v) = parse_env("PW_ALPHA") {
        config.alpha = v;
    }
    if let Some(v) = parse_env("PW_GAMMA") {
        config.gamma = v;
    }
    if let Some(v) = parse_env("PW_EPSILON_START") {
        config.epsilon_start = v;
    }
    if let Some(v) = parse_env("PW_EPSILON_END") {
        config.epsilon_end = v;
    }
    if let Some(v) = parse_env("PW_EPSILON_DECAY") {
        config.epsilon_decay = v;
    }
    if let Some(v) = parse_env("PW_MAX_EPISODES") {
        config.max_episodes = v;
    }
    if let Some(v) = parse_env("PW_CHECKPOINT_EVERY") {
        config.checkpoint_every = v;
    }
    if let Some(v) = parse_env("PW_FALLBACK_HAMMING_PENALTY") {
        config.fallback_hamming_penalty = v;
    }
    if let Some(v) = parse_env("PW_SHAP_BACKGROUND_SIZE") {
        config.shap_background_size = v;
    }
    if let Some(v) = parse_env("PW_RECENT_WINDOW") {
        config.recent_window = v;
    }
    if let Ok(raw) = env::var("PW_CLUSTER_EXCLUSION_SET") {
        config.cluster_exclusion_set = raw
            .split(',')
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.trim().parse::<i64>().ok())
            .collect();
    }
    config
}

/// Loads config purely from the environment, layered over defaults.
pub fn load_from_env() -> PipelineConfig {
    apply_env_overrides(PipelineConfig::default())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn overrides_apply_only_when_set() {
        unsafe {
            env::set_var("PW_ALPHA", "0.3");
            env::remove_var("PW_GAMMA");
        }
        let config = load_from_env();
        assert_eq!(config.alpha, 0.3);
        assert_eq!(config.gamma, PipelineConfig::default().gamma);
        unsafe {
            env::remove_var("PW_ALPHA");
        }
    }

    #[test]
    #[serial]
    fn cluster_exclusion_set_parses_csv() {
        unsafe {
            env::set_var("PW_CLUSTER_EXCLUSION_SET", "3, 7,9");
        }
        let config = load_from_env();
        assert_eq!(config.cluster_exclusion_set, vec![3, 7, 9]);
        unsafe {
            env::remove_var("PW_CLUSTER_EXCLUSION_SET");
        }
    }
}
