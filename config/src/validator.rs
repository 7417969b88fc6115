//! Configuration validation, thin wrapper over `validator`'s derive on
//! [`PipelineConfig`] plus the cross-field checks the derive can't express.

use crate::config::PipelineConfig;
use validator::Validate;

/// Validates a [`PipelineConfig`]: per-field ranges via the `validator`
/// derive, plus the cross-field invariant that `epsilon_start >=
/// epsilon_end` (a decaying schedule must decay toward, not away from,
/// its floor).
pub fn validate(config: &PipelineConfig) -> Result<(), validator::ValidationErrors> {
    config.validate()?;
    if config.epsilon_start < config.epsilon_end {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            "epsilon_start",
            validator::ValidationError::new("epsilon_start must be >= epsilon_end"),
        );
        return Err(errors);
    }
    Ok(())
}
