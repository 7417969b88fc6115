//! The 6-D [`State`] tuple — the unit of indexing in the Q-table.

use super::ids::ClusterId;
use super::vocabulary::PhaseClass;
use serde::{Deserialize, Serialize};

/// Progress/score bin, quantized by the ceiling of quarter-thresholds
///.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuarterBin {
    Q25,
    Q50,
    Q75,
    Q100,
}

impl QuarterBin {
    #[must_use]
    pub fn value(self) -> f64 {
        match self {
            QuarterBin::Q25 => 0.25,
            QuarterBin::Q50 => 0.5,
            QuarterBin::Q75 => 0.75,
            QuarterBin::Q100 => 1.0,
        }
    }

    /// Quantizes a raw value in `[0,1]` by rounding up to the next quarter,
    /// using the default `0.25/0.5/0.75` thresholds. Returns `None` for
    /// `0.0` — the caller decides whether "no activity yet" should
    /// suppress state emission.
    #[must_use]
    pub fn quantize(raw: f64) -> Option<Self> {
        Self::quantize_with(raw, 0.25, 0.5, 0.75)
    }

    /// Same as [`Self::quantize`] but with caller-supplied thresholds,
    /// as set by the `progress_bin_thresholds` config key.
    #[must_use]
    pub fn quantize_with(raw: f64, q1: f64, q2: f64, q3: f64) -> Option<Self> {
        if raw <= 0.0 {
            return None;
        }
        let clamped = raw.min(1.0);
        if clamped <= q1 {
            Some(Self::Q25)
        } else if clamped <= q2 {
            Some(Self::Q50)
        } else if clamped <= q3 {
            Some(Self::Q75)
        } else {
            Some(Self::Q100)
        }
    }

    /// All bins in ascending order; used for Q-table pre-population and
    /// Hamming-distance scans.
    #[must_use]
    pub fn all() -> [QuarterBin; 4] {
        [Self::Q25, Self::Q50, Self::Q75, Self::Q100]
    }
}

/// The engagement bucket, thresholded at `<8` Low, `8..16` Medium, `>=16` High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engagement {
    Low,
    Medium,
    High,
}

impl Engagement {
    #[must_use]
    pub fn bucketize(score: f64, low_high_threshold: f64, high_threshold: f64) -> Self {
        if score >= high_threshold {
            Self::High
        } else if score >= low_high_threshold {
            Self::Medium
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn all() -> [Engagement; 3] {
        [Self::Low, Self::Medium, Self::High]
    }
}

/// The 6-dimensional discrete state fed to the policy. Pure
/// function of a `UserLogSummary` and the registries; reproducible
/// byte-for-byte from the same inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub cluster_id: ClusterId,
    pub module_idx: u32,
    pub progress_bin: QuarterBin,
    pub score_bin: QuarterBin,
    pub phase: PhaseClass,
    pub engagement: Engagement,
}

impl State {
    /// Hamming distance over the 6 dimensions, used by the recommender's
    /// fallback lookup: the count of dimensions that differ, each weighted
    /// equally.
    #[must_use]
    pub fn hamming_distance(&self, other: &State) -> u32 {
        let mut distance = 0;
        if self.cluster_id != other.cluster_id {
            distance += 1;
        }
        if self.module_idx != other.module_idx {
            distance += 1;
        }
        if self.progress_bin != other.progress_bin {
            distance += 1;
        }
        if self.score_bin != other.score_bin {
            distance += 1;
        }
        if self.phase != other.phase {
            distance += 1;
        }
        if self.engagement != other.engagement {
            distance += 1;
        }
        distance
    }
}
