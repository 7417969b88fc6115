//! Ingest-boundary types: the normalized [`LogEvent`] and the derived
//! [`UserLogSummary`] window it aggregates into.

use super::ids::{ClusterId, CourseId, LearnerId, ModuleId};
use super::vocabulary::ActionToken;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single normalized learner-activity event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub learner_id: LearnerId,
    pub module_id: Option<ModuleId>,
    pub course_id: CourseId,
    pub action: ActionToken,
    /// Epoch seconds.
    pub timestamp: i64,
    pub score: Option<f64>,
    pub progress: Option<f64>,
    pub time_spent: i64,
    pub success: Option<bool>,
    pub cluster_id: Option<ClusterId>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl LogEvent {
    /// Clamps `score` into `[0,1]` by dividing by a reported max, the
    /// normalization step the enricher requires before the event reaches
    /// the builder.
    #[must_use]
    pub fn normalize_score(raw_score: f64, raw_max: f64) -> Option<f64> {
        if raw_max <= 0.0 {
            return None;
        }
        Some((raw_score / raw_max).clamp(0.0, 1.0))
    }
}

/// A recorded action within a [`UserLogSummary`]'s recent-action window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecentAction {
    pub action: ActionToken,
    pub timestamp: i64,
}

/// Upper bound on the recent-actions window tracked per `(learner, module)`.
pub const RECENT_WINDOW_MAX: usize = 10;

/// A derived, idempotently recomputable aggregate over the event set
/// covering `[window_start, window_end]` for one `(learner, module)` pair
///.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLogSummary {
    pub learner_id: LearnerId,
    pub module_id: ModuleId,
    pub counts: HashMap<ActionToken, u32>,
    pub avg_score: f64,
    pub progress: f64,
    pub total_time: i64,
    /// Ordered oldest-to-newest, capped at [`RECENT_WINDOW_MAX`].
    pub recent_actions: Vec<RecentAction>,
    pub window_start: i64,
    pub window_end: i64,
    /// Every score recorded for this pair in `[window_start, window_end]`,
    /// oldest first; `avg_score` is the mean of this list — each attempt's
    /// score is retained.
    pub scores: Vec<f64>,
    pub distinct_active_days: u32,
}

impl UserLogSummary {
    #[must_use]
    pub fn new(learner_id: LearnerId, module_id: ModuleId, window_start: i64, window_end: i64) -> Self {
        Self {
            learner_id,
            module_id,
            counts: HashMap::new(),
            avg_score: 0.0,
            progress: 0.0,
            total_time: 0,
            recent_actions: Vec::new(),
            window_start,
            window_end,
            scores: Vec::new(),
            distinct_active_days: 0,
        }
    }

    /// Whether any activity at all has been recorded for this pair.
    #[must_use]
    pub fn has_activity(&self) -> bool {
        !self.recent_actions.is_empty()
    }

    /// Folds one enriched event into the summary. Progress is monotonic
    /// non-decreasing; score list grows; recent-actions window is capped at
    /// [`RECENT_WINDOW_MAX`], dropping the oldest entry.
    pub fn apply_event(&mut self, event: &LogEvent) {
        *self.counts.entry(event.action).or_insert(0) += 1;

        if let Some(progress) = event.progress {
            self.progress = self.progress.max(progress);
        }

        if let Some(score) = event.score {
            self.scores.push(score);
            self.avg_score = self.scores.iter().sum::<f64>() / self.scores.len() as f64;
        }

        self.total_time += event.time_spent.max(0);

        self.recent_actions.push(RecentAction {
            action: event.action,
            timestamp: event.timestamp,
        });
        if self.recent_actions.len() > RECENT_WINDOW_MAX {
            self.recent_actions.remove(0);
        }

        self.window_end = self.window_end.max(event.timestamp);
        self.window_start = if self.window_start == 0 {
            event.timestamp
        } else {
            self.window_start.min(event.timestamp)
        };
    }

    /// Recomputes `distinct_active_days` from a day-length in seconds
    /// (separated from `apply_event` since it requires scanning the full
    /// window rather than folding one event at a time; callers recompute
    /// it once after replaying a batch).
    pub fn recompute_distinct_active_days(&mut self, all_timestamps: &[i64], day_seconds: i64) {
        use std::collections::HashSet;
        let days: HashSet<i64> = all_timestamps.iter().map(|t| t.div_euclid(day_seconds)).collect();
        self.distinct_active_days = days.len() as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(action: ActionToken, progress: Option<f64>, score: Option<f64>, ts: i64) -> LogEvent {
        LogEvent {
            learner_id: LearnerId::new(1),
            module_id: Some(ModuleId::new(1)),
            course_id: CourseId::new(1),
            action,
            timestamp: ts,
            score,
            progress,
            time_spent: 60,
            success: None,
            cluster_id: None,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn progress_is_monotonic_non_decreasing() {
        let mut summary = UserLogSummary::new(LearnerId::new(1), ModuleId::new(1), 0, 0);
        summary.apply_event(&event(ActionToken::WatchVideo, Some(0.3), None, 100));
        summary.apply_event(&event(ActionToken::AttemptQuiz, Some(0.2), None, 200));
        assert_eq!(summary.progress, 0.3);
        summary.apply_event(&event(ActionToken::SubmitAssignment, Some(0.6), None, 300));
        assert_eq!(summary.progress, 0.6);
    }

    #[test]
    fn recent_actions_window_caps_at_ten() {
        let mut summary = UserLogSummary::new(LearnerId::new(1), ModuleId::new(1), 0, 0);
        for i in 0..15 {
            summary.apply_event(&event(ActionToken::ViewContent, None, None, i));
        }
        assert_eq!(summary.recent_actions.len(), RECENT_WINDOW_MAX);
        assert_eq!(summary.recent_actions[0].timestamp, 5);
    }

    #[test]
    fn avg_score_is_mean_of_retained_scores() {
        let mut summary = UserLogSummary::new(LearnerId::new(1), ModuleId::new(1), 0, 0);
        summary.apply_event(&event(ActionToken::AttemptQuiz, None, Some(0.4), 1));
        summary.apply_event(&event(ActionToken::AttemptQuiz, None, Some(0.6), 2));
        assert!((summary.avg_score - 0.5).abs() < 1e-9);
    }
}
