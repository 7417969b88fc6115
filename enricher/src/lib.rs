//! Log Enricher: turns heterogeneous LMS events into per-module
//! events carrying progress, score, and time.

use backoff::backoff::Backoff;
use pw_core::traits::{CourseStructureRegistry, LmsClient, LmsClientError};
use pw_core::{ActionToken, ClusterId, CourseId, LearnerId, LogEvent, ModuleId};
use pw_errors::EnrichError;
use std::time::Duration;

/// A raw, not-yet-normalized event as received from the LMS ingest
/// surface. `action` is free text; `score`/`score_max` are reported
/// separately so the enricher can normalize into `[0,1]`.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub learner_id: LearnerId,
    pub module_id: Option<ModuleId>,
    pub course_id: CourseId,
    pub action: String,
    pub timestamp: i64,
    pub score: Option<f64>,
    pub score_max: Option<f64>,
    pub progress: Option<f64>,
    pub time_spent: i64,
    pub success: Option<bool>,
    pub cluster_id: Option<ClusterId>,
}

impl RawEvent {
    /// Course-level classification: action token contains both
    /// "course" and "viewed" (case-insensitive) and no module is named.
    #[must_use]
    pub fn is_course_level(&self) -> bool {
        if self.module_id.is_some() {
            return false;
        }
        let lower = self.action.to_lowercase();
        lower.contains("course") && lower.contains("viewed")
    }
}

/// What a single call to [`Enricher::enrich`] produced: the events it
/// managed to emit, plus warnings for modules that failed in isolation
///.
#[derive(Debug, Clone, Default)]
pub struct EnrichOutcome {
    pub events: Vec<LogEvent>,
    pub warnings: Vec<String>,
}

/// Retry budget applied to each per-module LMS call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_elapsed: Duration,
    pub initial_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_elapsed: Duration::from_secs(5),
            initial_interval: Duration::from_millis(50),
        }
    }
}

pub struct Enricher<L, R> {
    lms: L,
    csr: R,
    retry_policy: RetryPolicy,
}

impl<L, R> Enricher<L, R>
where
    L: LmsClient,
    R: CourseStructureRegistry,
{
    pub fn new(lms: L, csr: R) -> Self {
        Self {
            lms,
            csr,
            retry_policy: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Expands one raw event into 0..N normalized events.
    #[tracing::instrument(skip(self, raw), fields(learner_id = raw.learner_id.value()))]
    pub async fn enrich(&self, raw: RawEvent) -> Result<EnrichOutcome, EnrichError> {
        if raw.is_course_level() {
            return Ok(self.enrich_course_level(raw).await);
        }
        self.enrich_single(raw).map(|event| EnrichOutcome {
            events: vec![event],
            warnings: Vec::new(),
        })
    }

    async fn enrich_course_level(&self, raw: RawEvent) -> EnrichOutcome {
        let modules = self.csr.visible_modules(raw.course_id);
        let mut outcome = EnrichOutcome::default();
        for module in modules {
            match self.query_module_with_retry(raw.learner_id, module.id).await {
                Ok(progress) => {
                    let event = LogEvent {
                        learner_id: raw.learner_id,
                        module_id: Some(module.id),
                        course_id: raw.course_id,
                        action: ActionToken::ModuleProgressUpdated,
                        timestamp: raw.timestamp,
                        score: LogEvent::normalize_score(progress.raw_score, progress.raw_score_max),
                        progress: Some(progress.progress.clamp(0.0, 1.0)),
                        time_spent: progress.time_spent.max(0),
                        success: None,
                        cluster_id: raw.cluster_id,
                        metadata: Default::default(),
                    };
                    metrics::counter!(pw_observability::metrics::ENRICH_EVENTS_EMITTED).increment(1);
                    outcome.events.push(event);
                }
                Err(err) => {
                    let warning = format!("module {} skipped: {err}", module.id);
                    tracing::warn!(module_id = module.id.value(), %err, "per-module enrichment failed, skipping");
                    metrics::counter!(pw_observability::metrics::ENRICH_EVENTS_FAILED).increment(1);
                    outcome.warnings.push(warning);
                }
            }
        }
        outcome
    }

    fn enrich_single(&self, raw: RawEvent) -> Result<LogEvent, EnrichError> {
        let module_id = raw.module_id.ok_or_else(|| EnrichError::Malformed {
            field: "module_id".to_string(),
        })?;
        let action = ActionToken::normalize(&raw.action).map_err(|_| EnrichError::Malformed {
            field: "action".to_string(),
        })?;

        let progress = raw
            .progress
            .or_else(|| action.min_progress_hint())
            .map(|p| p.clamp(0.0, 1.0));

        let score = match (raw.score, raw.score_max) {
            (Some(score), Some(max)) => LogEvent::normalize_score(score, max),
            (Some(score), None) => Some(score.clamp(0.0, 1.0)),
            _ => None,
        };

        metrics::counter!(pw_observability::metrics::ENRICH_EVENTS_EMITTED).increment(1);
        Ok(LogEvent {
            learner_id: raw.learner_id,
            module_id: Some(module_id),
            course_id: raw.course_id,
            action,
            timestamp: raw.timestamp,
            score,
            progress,
            time_spent: raw.time_spent.max(0),
            success: raw.success,
            cluster_id: raw.cluster_id,
            metadata: Default::default(),
        })
    }

    async fn query_module_with_retry(
        &self,
        learner_id: LearnerId,
        module_id: ModuleId,
    ) -> Result<pw_core::ModuleProgress, EnrichError> {
        let mut backoff = backoff::ExponentialBackoffBuilder::new()
            .with_initial_interval(self.retry_policy.initial_interval)
            .with_max_elapsed_time(Some(self.retry_policy.max_elapsed))
            .build();

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.lms.module_progress(learner_id, module_id).await {
                Ok(progress) => return Ok(progress),
                Err(err) => {
                    let Some(wait) = backoff.next_backoff() else {
                        return Err(EnrichError::RetryBudgetExhausted {
                            module_id: module_id.value(),
                            attempts,
                        });
                    };
                    tracing::debug!(attempt = attempts, ?wait, %err, "retrying LMS call");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
