//! Process-wide tracing and metrics bootstrap, invoked once from each CLI
//! subcommand entry point.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes a `tracing` subscriber writing structured logs to stderr,
/// honoring `RUST_LOG` (default `info`). stdout is reserved for
/// the machine-readable JSON each CLI subcommand emits.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Installs a Prometheus metrics recorder and returns its render handle.
/// Returns `None` if a recorder is already installed for this process
/// (idempotent across repeated calls within tests).
pub fn init_metrics(listen_port: u16) -> Option<metrics_exporter_prometheus::PrometheusHandle> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], listen_port))
        .install_recorder()
        .ok()
}
