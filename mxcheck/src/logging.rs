//! Diagnostic tracing for debugging the verifier.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Dev diagnostics via `RUST_LOG`, output to stderr.
//!   Not persisted, not part of the verifier's product output.
//!
//! - **Reports (`io/report`)**: The per-snapshot verdict blocks. Always written,
//!   unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber for diagnostic logging.
///
/// Reads `RUST_LOG` env var. Defaults to `warn` if unset, so incomplete
/// snapshots and duplicate sections are still surfaced.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=mxcheck=debug mxcheck check --dir snapshots -n 3
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
