//! Human-facing log lines. Everything here writes to stderr; stdout is
//! reserved for the machine-readable JSON each subcommand emits.

pub fn info(msg: &str) {
    tracing::info!("{msg}");
}

pub fn warn(msg: &str) {
    tracing::warn!("{msg}");
}

pub fn error(msg: &str) {
    tracing::error!("{msg}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_helpers_do_not_panic() {
        info("built 3 states");
        warn("1 input skipped");
        error("store write failed");
    }
}
