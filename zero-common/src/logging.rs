//! Logging setup for Zero scoring services.
//!
//! Logs always go to stderr so report output on stdout stays parseable.
//! `json` format emits one object per event plus a close event for every
//! span, which gives batch timings for free; `pretty` is for terminals.
//!
//! Library targets that chatter at `info` (the rayon pool, mostly) are
//! pinned to `warn` unless `RUST_LOG` says otherwise.

use std::any::Any;
use std::panic;
use std::sync::Once;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Targets held at `warn` regardless of the configured level.
pub const QUIET_TARGETS: &[&str] = &["rayon", "rayon_core"];

/// Filter directive: base level, then `target=warn` for each quiet target.
fn directives(level: &str, extra_quiet: &[String]) -> String {
    std::iter::once(level.to_string())
        .chain(
            QUIET_TARGETS
                .iter()
                .map(|t| t.to_string())
                .chain(extra_quiet.iter().cloned())
                .map(|t| format!("{t}=warn")),
        )
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber described by `config`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_from_config(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(&config.log_level, &config.excluded_targets)));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.log_format.as_str() {
        "json" => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        _ => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .compact(),
            )
            .try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(
            level = %config.log_level,
            format = %config.log_format,
            quiet_targets = QUIET_TARGETS.len() + config.excluded_targets.len(),
            "Logging initialized"
        );
    }
}

/// Text of a panic payload (`&str` or `String`), or a placeholder.
fn payload_text(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Route panic reports through `tracing` so they share the log format.
///
/// Until a subscriber is installed the previous hook still runs, so early
/// panics are not lost. Only the first call installs anything.
pub fn install_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let fallback = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !tracing::dispatcher::has_been_set() {
                fallback(info);
                return;
            }
            let thread = std::thread::current();
            let location = info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_default();
            tracing::error!(
                target: "panic",
                thread = thread.name().unwrap_or("<unnamed>"),
                location = %location,
                "Panic: {}",
                payload_text(info.payload())
            );
        }));
    });
}

/// Install a subscriber from a bare level and format.
pub fn init_logging(level: &str, format: &str) {
    init_from_config(&ObservabilityConfig {
        log_level: level.to_string(),
        log_format: format.to_string(),
        excluded_targets: Vec::new(),
    });
}

/// Fresh trace id for one scoring batch.
pub fn generate_trace_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `info` span named `score_batch` carrying the batch trace id.
///
/// ```ignore
/// let span = batch_span!(trace_id, instruments = bundles.len());
/// let _enter = span.enter();
/// ```
#[macro_export]
macro_rules! batch_span {
    ($trace_id:expr) => {
        tracing::info_span!("score_batch", trace_id = %$trace_id)
    };
    ($trace_id:expr, $($field:tt)*) => {
        tracing::info_span!("score_batch", trace_id = %$trace_id, $($field)*)
    };
}
