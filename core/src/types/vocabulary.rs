//! The closed action vocabulary and the single lookup table that
//! drives phase classification, engagement weighting, and progress
//! inference from it.
//!
//! This replaces the "dynamic event dispatch on action strings" pattern
//! flagged in the design notes: every caller that needs to know how an
//! action token behaves reads `ActionToken::phase_class`, `::weight`, or
//! `::min_progress_hint` instead of re-deriving the mapping from the raw
//! string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a raw action string does not normalize to a member
/// of the closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized action token: {0}")]
pub struct UnknownActionToken(pub String);

/// The closed, normalized action vocabulary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum ActionToken {
    ViewContent,
    ReadResource,
    WatchVideo,
    DoQuiz,
    AttemptQuiz,
    SubmitAssignment,
    ReviewQuiz,
    ReviewContent,
    ParticipateForum,
    ViewReport,
    ModuleProgressUpdated,
}

/// The pedagogical phase a recent-action window is classified into.
/// Variant order is significant: ties in the phase vote break
/// `Pre < Active < Reflective`, matching the derived `Ord`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PhaseClass {
    Pre,
    Active,
    Reflective,
}

impl fmt::Display for PhaseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PhaseClass::Pre => "pre",
            PhaseClass::Active => "active",
            PhaseClass::Reflective => "reflective",
        };
        write!(f, "{s}")
    }
}

impl ActionToken {
    /// Normalizes a raw LMS action token to the closed vocabulary.
    ///
    /// Matching is case-insensitive and tolerant of `-`/` ` in place of `_`.
    pub fn normalize(raw: &str) -> Result<Self, UnknownActionToken> {
        let canon = raw.to_lowercase().replace(['-', ' '], "_");
        match canon.as_str() {
            "view_content" => Ok(Self::ViewContent),
            "read_resource" => Ok(Self::ReadResource),
            "watch_video" => Ok(Self::WatchVideo),
            "do_quiz" => Ok(Self::DoQuiz),
            "attempt_quiz" => Ok(Self::AttemptQuiz),
            "submit_assignment" => Ok(Self::SubmitAssignment),
            "review_quiz" => Ok(Self::ReviewQuiz),
            "review_content" => Ok(Self::ReviewContent),
            "participate_forum" => Ok(Self::ParticipateForum),
            "view_report" => Ok(Self::ViewReport),
            "module_progress_updated" => Ok(Self::ModuleProgressUpdated),
            _ => Err(UnknownActionToken(raw.to_string())),
        }
    }

    /// The wire representation, always one of the closed vocabulary tokens.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewContent => "view_content",
            Self::ReadResource => "read_resource",
            Self::WatchVideo => "watch_video",
            Self::DoQuiz => "do_quiz",
            Self::AttemptQuiz => "attempt_quiz",
            Self::SubmitAssignment => "submit_assignment",
            Self::ReviewQuiz => "review_quiz",
            Self::ReviewContent => "review_content",
            Self::ParticipateForum => "participate_forum",
            Self::ViewReport => "view_report",
            Self::ModuleProgressUpdated => "module_progress_updated",
        }
    }

    /// The phase class an occurrence of this token votes for.
    /// `ModuleProgressUpdated` is a synthetic bookkeeping event and casts
    /// no phase vote.
    #[must_use]
    pub fn phase_class(self) -> Option<PhaseClass> {
        match self {
            Self::ViewContent | Self::ReadResource | Self::WatchVideo => Some(PhaseClass::Pre),
            Self::DoQuiz | Self::AttemptQuiz | Self::SubmitAssignment => {
                Some(PhaseClass::Active)
            }
            Self::ReviewQuiz | Self::ReviewContent | Self::ParticipateForum | Self::ViewReport => {
                Some(PhaseClass::Reflective)
            }
            Self::ModuleProgressUpdated => None,
        }
    }

    /// The engagement weight for this token. Weight tracks phase depth: passive viewing weighs least,
    /// reflective work weighs most.
    #[must_use]
    pub fn engagement_weight(self) -> f64 {
        match self.phase_class() {
            Some(PhaseClass::Pre) => 1.0,
            Some(PhaseClass::Active) => 2.0,
            Some(PhaseClass::Reflective) => 3.0,
            None => 0.0,
        }
    }

    /// A progress floor to infer when an event carries this action but no
    /// explicit `progress` field. Returns `None` when the token
    /// carries no progress signal on its own.
    #[must_use]
    pub fn min_progress_hint(self) -> Option<f64> {
        match self {
            Self::DoQuiz | Self::AttemptQuiz => Some(0.4),
            Self::SubmitAssignment => Some(0.5),
            Self::ReviewQuiz | Self::ReviewContent => Some(0.75),
            _ => None,
        }
    }
}

impl FromStr for ActionToken {
    type Err = UnknownActionToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The RL agent's action set: the same pedagogical verbs as the ingest
/// vocabulary, minus the synthetic `module_progress_updated` bookkeeping
/// token, plus `Advance` — the terminal "move the learner to the next
/// module" decision. See DESIGN.md for the resolution of this naming gap
/// between the prose description and the closed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewContent,
    ReadResource,
    WatchVideo,
    DoQuiz,
    AttemptQuiz,
    SubmitAssignment,
    ReviewQuiz,
    ReviewContent,
    ParticipateForum,
    ViewReport,
    Advance,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewContent => "view_content",
            Self::ReadResource => "read_resource",
            Self::WatchVideo => "watch_video",
            Self::DoQuiz => "do_quiz",
            Self::AttemptQuiz => "attempt_quiz",
            Self::SubmitAssignment => "submit_assignment",
            Self::ReviewQuiz => "review_quiz",
            Self::ReviewContent => "review_content",
            Self::ParticipateForum => "participate_forum",
            Self::ViewReport => "view_report",
            Self::Advance => "advance",
        }
    }

    /// The corresponding ingest-vocabulary token this action resolves
    /// activities through, if any (`Advance` has none: it is not tied to a
    /// CSR activity type, only to the reward shaping's progress-bin gate).
    #[must_use]
    pub fn as_action_token(self) -> Option<ActionToken> {
        match self {
            Self::ViewContent => Some(ActionToken::ViewContent),
            Self::ReadResource => Some(ActionToken::ReadResource),
            Self::WatchVideo => Some(ActionToken::WatchVideo),
            Self::DoQuiz => Some(ActionToken::DoQuiz),
            Self::AttemptQuiz => Some(ActionToken::AttemptQuiz),
            Self::SubmitAssignment => Some(ActionToken::SubmitAssignment),
            Self::ReviewQuiz => Some(ActionToken::ReviewQuiz),
            Self::ReviewContent => Some(ActionToken::ReviewContent),
            Self::ParticipateForum => Some(ActionToken::ParticipateForum),
            Self::ViewReport => Some(ActionToken::ViewReport),
            Self::Advance => None,
        }
    }

    /// All actions, in a fixed deterministic order (used wherever a stable
    /// iteration order matters: Q-table initialization, ranked output).
    #[must_use]
    pub fn all() -> [Action; 11] {
        [
            Action::ViewContent,
            Action::ReadResource,
            Action::WatchVideo,
            Action::DoQuiz,
            Action::AttemptQuiz,
            Action::SubmitAssignment,
            Action::ReviewQuiz,
            Action::ReviewContent,
            Action::ParticipateForum,
            Action::ViewReport,
            Action::Advance,
        ]
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
