//! Observability - ログ初期化と span
//!
//! tracing-subscriber の registry に EnvFilter（`RUST_LOG`、既定 `info`）と
//! pretty / JSON の fmt layer を載せます。

use std::sync::Once;

use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::category::JobCategory;
use crate::domain::ids::JobId;

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Span wrapping one consume call. `state` is recorded as the job moves
/// through the consume state machine.
#[must_use]
pub fn consume_span(job_id: &JobId, category: JobCategory) -> Span {
    tracing::info_span!(
        "consume",
        job_id = %job_id,
        category = %category,
        state = tracing::field::Empty,
    )
}
