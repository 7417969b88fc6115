//! A structured, user-facing error: what failed, why, and how to fix it.
//! Printed to stderr only; never affects the JSON on stdout.

#[derive(Debug)]
pub struct UxError {
    pub what: String,
    pub why: Option<String>,
    pub how_to_fix: Vec<String>,
}

impl UxError {
    pub fn new(what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            why: None,
            how_to_fix: Vec::new(),
        }
    }

    pub fn why(mut self, reason: impl Into<String>) -> Self {
        self.why = Some(reason.into());
        self
    }

    pub fn fix(mut self, suggestion: impl Into<String>) -> Self {
        self.how_to_fix.push(suggestion.into());
        self
    }

    pub fn display(&self) {
        tracing::error!("{}", self.what);
        if let Some(why) = &self.why {
            tracing::error!("  {why}");
        }
        for (i, fix) in self.how_to_fix.iter().enumerate() {
            tracing::error!("  {}. {fix}", i + 1);
        }
    }
}

impl std::fmt::Display for UxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.what)
    }
}

impl std::error::Error for UxError {}

pub fn policy_missing(path: &str) -> UxError {
    UxError::new(format!("no policy artifact at '{path}'"))
        .why("recommend/explain require a committed artifact from `train`")
        .fix("run `train --config CFG --csr CSR --cpr CPR --out ARTIFACT` first")
}

pub fn registry_load_failed(kind: &str, path: &str, reason: &str) -> UxError {
    UxError::new(format!("failed to load {kind} artifact at '{path}'"))
        .why(reason.to_string())
        .fix(format!("check that '{path}' is valid {kind} JSON"))
}

pub fn store_unreadable(path: &str, reason: &str) -> UxError {
    UxError::new(format!("failed to read state store at '{path}'"))
        .why(reason.to_string())
        .fix("run `build-states` to produce a store file first")
}

pub fn no_state_for_pair(learner_id: i64, module_id: i64) -> UxError {
    UxError::new(format!(
        "no stored state for learner {learner_id}, module {module_id}"
    ))
    .why("the pair has never been written by `build-states`, or was skipped")
    .fix("check build-states' reported skip count for this input")
}
