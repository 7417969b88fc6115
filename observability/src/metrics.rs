//! Named metric series recorded across the pipeline. Centralized
//! here so call sites record consistent names instead of ad-hoc strings.

/// Enriched events successfully emitted.
pub const ENRICH_EVENTS_EMITTED: &str = "enrich_events_emitted";
/// Per-module enrichment failures, isolated and counted.
pub const ENRICH_EVENTS_FAILED: &str = "enrich_events_failed";
/// States successfully built by the State Builder.
pub const STATES_BUILT: &str = "states_built";
/// Inputs that produced no state (excluded cluster, missing field).
pub const STATES_SKIPPED: &str = "states_skipped";
/// Successful State Store writes.
pub const STORE_WRITES: &str = "store_writes";
/// State Store write conflicts surfaced to the caller.
pub const STORE_CONFLICTS: &str = "store_conflicts";
/// Per-episode cumulative reward, recorded as a histogram.
pub const TRAINER_EPISODE_REWARD: &str = "trainer_episode_reward";
/// Per-episode step count, recorded as a histogram.
pub const TRAINER_EPISODE_LENGTH: &str = "trainer_episode_length";
/// Recommender invocations that fell back to the nearest Hamming-distance
/// state.
pub const RECOMMEND_FALLBACK_USED: &str = "recommend_fallback_used";
