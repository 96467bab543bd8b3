// src/logging.rs
//
// Opt-in tracing output for embedders and tests.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::time::FormatTime;

/// Filter directive, e.g. `SABLE_LOG=sable::sema=debug`
pub const LOG_ENV: &str = "SABLE_LOG";
/// `compact` (default) or `full`
pub const LOG_STYLE_ENV: &str = "SABLE_LOG_STYLE";

/// A timer that outputs nothing but still enables span timing calculation
struct NoTimestamp;

impl FormatTime for NoTimestamp {
    fn format_time(&self, _w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        Ok(())
    }
}

/// Install a stderr subscriber when `SABLE_LOG` is set. Returns whether
/// this call installed it; later calls and an already-set global
/// subscriber leave things as they are.
pub fn init_from_env() -> bool {
    let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) else {
        return false;
    };
    let style = std::env::var(LOG_STYLE_ENV).unwrap_or_default();
    let installed = if style == "full" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_timer(NoTimestamp)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    };
    if installed {
        tracing::debug!(style = %style, "tracing initialized");
    }
    installed
}
