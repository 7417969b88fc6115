//! # Error kinds
//!
//! Every fallible component in the pipeline exposes its own `thiserror` enum
//! (named-field variants throughout), and every variant maps onto one of the
//! seven closed [`PipelineErrorKind`]s so CLI drivers can decide exit codes
//! without matching on component internals.

use thiserror::Error;

/// The closed set of error kinds surfaced across the pipeline boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineErrorKind {
    InputMalformed,
    RegistryMiss,
    UpstreamUnavailable,
    Conflict,
    PolicyMissing,
    NumericalError,
    Cancelled,
}

impl std::fmt::Display for PipelineErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineErrorKind::InputMalformed => "input_malformed",
            PipelineErrorKind::RegistryMiss => "registry_miss",
            PipelineErrorKind::UpstreamUnavailable => "upstream_unavailable",
            PipelineErrorKind::Conflict => "conflict",
            PipelineErrorKind::PolicyMissing => "policy_missing",
            PipelineErrorKind::NumericalError => "numerical_error",
            PipelineErrorKind::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Implemented by every component error so callers can recover the closed
/// error kind without downcasting to a concrete type.
pub trait PipelineError {
    fn kind(&self) -> PipelineErrorKind;
}

/// Errors from the log enricher.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("event missing required field: {field}")]
    Malformed { field: String },

    #[error("unknown module referenced: {module_id}")]
    UnknownModule { module_id: i64 },

    #[error("LMS call for module {module_id} failed: {reason}")]
    UpstreamUnavailable { module_id: i64, reason: String },

    #[error("retry budget exhausted for module {module_id} after {attempts} attempts")]
    RetryBudgetExhausted { module_id: i64, attempts: u32 },
}

impl PipelineError for EnrichError {
    fn kind(&self) -> PipelineErrorKind {
        match self {
            EnrichError::Malformed { .. } => PipelineErrorKind::InputMalformed,
            EnrichError::UnknownModule { .. } => PipelineErrorKind::RegistryMiss,
            EnrichError::UpstreamUnavailable { .. } | EnrichError::RetryBudgetExhausted { .. } => {
                PipelineErrorKind::UpstreamUnavailable
            }
        }
    }
}

/// Errors from the state builder.
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("summary missing required field: {field}")]
    MissingField { field: String },

    #[error("cluster excluded: {cluster_id}")]
    ClusterExcluded { cluster_id: i64 },

    #[error("unknown cluster: {cluster_id}")]
    UnknownCluster { cluster_id: i64 },

    #[error("unknown module: {module_id}")]
    UnknownModule { module_id: i64 },
}

impl PipelineError for BuilderError {
    fn kind(&self) -> PipelineErrorKind {
        match self {
            BuilderError::MissingField { .. } => PipelineErrorKind::InputMalformed,
            BuilderError::ClusterExcluded { .. }
            | BuilderError::UnknownCluster { .. }
            | BuilderError::UnknownModule { .. } => PipelineErrorKind::RegistryMiss,
        }
    }
}

/// Errors from the state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("write conflict for learner {learner_id} module {module_id}")]
    Conflict { learner_id: i64, module_id: i64 },

    #[error("batch upsert failed at index {index}: {reason}")]
    BatchFailed { index: usize, reason: String },

    #[error("backend error: {reason}")]
    Backend { reason: String },

    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

impl PipelineError for StoreError {
    fn kind(&self) -> PipelineErrorKind {
        match self {
            StoreError::Conflict { .. } => PipelineErrorKind::Conflict,
            StoreError::BatchFailed { .. }
            | StoreError::Backend { .. }
            | StoreError::Serialization { .. } => PipelineErrorKind::UpstreamUnavailable,
        }
    }
}

/// Errors from the learner simulator.
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("cluster {cluster_id} missing curve parameters")]
    MissingCurveParams { cluster_id: i64 },

    #[error("cluster {cluster_id} excluded from simulation")]
    ClusterExcluded { cluster_id: i64 },

    #[error("module {module_id} unknown to course structure registry")]
    UnknownModule { module_id: i64 },

    #[error("numerical error: {reason}")]
    Numerical { reason: String },
}

impl PipelineError for SimulatorError {
    fn kind(&self) -> PipelineErrorKind {
        match self {
            SimulatorError::MissingCurveParams { .. }
            | SimulatorError::ClusterExcluded { .. }
            | SimulatorError::UnknownModule { .. } => PipelineErrorKind::RegistryMiss,
            SimulatorError::Numerical { .. } => PipelineErrorKind::NumericalError,
        }
    }
}

/// Errors from the Q-learning trainer.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("numerical error during update: {reason}")]
    Numerical { reason: String },

    #[error("checkpoint write failed: {reason}")]
    CheckpointFailed { reason: String },

    #[error("training cancelled after {episodes} episodes")]
    Cancelled { episodes: usize },
}

impl PipelineError for TrainerError {
    fn kind(&self) -> PipelineErrorKind {
        match self {
            TrainerError::Numerical { .. } => PipelineErrorKind::NumericalError,
            TrainerError::CheckpointFailed { .. } => PipelineErrorKind::UpstreamUnavailable,
            TrainerError::Cancelled { .. } => PipelineErrorKind::Cancelled,
        }
    }
}

/// Errors from the recommender.
#[derive(Debug, Error)]
pub enum RecommenderError {
    #[error("no policy artifact available")]
    PolicyMissing,

    #[error("registry miss resolving activity for module {module_id}")]
    RegistryMiss { module_id: i64 },
}

impl PipelineError for RecommenderError {
    fn kind(&self) -> PipelineErrorKind {
        match self {
            RecommenderError::PolicyMissing => PipelineErrorKind::PolicyMissing,
            RecommenderError::RegistryMiss { .. } => PipelineErrorKind::RegistryMiss,
        }
    }
}

/// Errors from the explainer.
#[derive(Debug, Error)]
pub enum ExplainerError {
    #[error("no policy artifact available")]
    PolicyMissing,

    #[error("attribution does not match bound policy version: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error("numerical error computing attribution: {reason}")]
    Numerical { reason: String },
}

impl PipelineError for ExplainerError {
    fn kind(&self) -> PipelineErrorKind {
        match self {
            ExplainerError::PolicyMissing => PipelineErrorKind::PolicyMissing,
            ExplainerError::VersionMismatch { .. } => PipelineErrorKind::Conflict,
            ExplainerError::Numerical { .. } => PipelineErrorKind::NumericalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrich_error_kinds() {
        assert_eq!(
            EnrichError::Malformed {
                field: "score".into()
            }
            .kind(),
            PipelineErrorKind::InputMalformed
        );
        assert_eq!(
            EnrichError::UnknownModule { module_id: 7 }.kind(),
            PipelineErrorKind::RegistryMiss
        );
    }

    #[test]
    fn pipeline_error_kind_display() {
        assert_eq!(PipelineErrorKind::Conflict.to_string(), "conflict");
        assert_eq!(
            PipelineErrorKind::NumericalError.to_string(),
            "numerical_error"
        );
    }

    #[test]
    fn recommender_policy_missing_maps_to_policy_missing_kind() {
        assert_eq!(
            RecommenderError::PolicyMissing.kind(),
            PipelineErrorKind::PolicyMissing
        );
    }
}
