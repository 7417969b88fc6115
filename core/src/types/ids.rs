//! Arena-style integer/string ids. No back-pointers: every relation between
//! learners, modules, and learning outcomes is expressed as a mapping over
//! these ids (replacing the cyclic-reference pattern flagged in the design
//! notes).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! int_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            #[must_use]
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            #[must_use]
            pub fn value(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

int_id!(LearnerId, "Identifies a learner, unique across the deployment.");
int_id!(ModuleId, "Identifies a module within a course (CSR key).");
int_id!(CourseId, "Identifies a course in the LMS.");
int_id!(ClusterId, "Identifies a behavioral cluster (CPR key).");

/// A Learning Outcome identifier. LOs are free-form strings in the source
/// LMS (e.g. `"LO1.2"`), so this stays a string newtype rather than an int.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoId(pub String);

impl LoId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LoId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
