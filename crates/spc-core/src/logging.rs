//! Structured logging bootstrap.
//!
//! stdout is reserved for command payloads (JSON output); all log output
//! goes to stderr. The `SPC_LOG` environment variable overrides the
//! verbosity-derived filter with a full tracing directive string.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Verbosity maps -v counts to levels: 0 = warn, 1 = info, 2 = debug,
/// 3+ = trace. Quiet mode drops to errors only. Calling twice is a no-op.
pub fn init_logging(verbosity: u8, quiet: bool) {
    let default_directive = if quiet {
        "error"
    } else {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_env("SPC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
