//! Tracing setup: compact console output plus daily-rotated log files

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file prefix, giving files like `streammux.2026-10-16.log`
const LOG_PREFIX: &str = "streammux";

/// Crates logged at debug unless `RUST_LOG` says otherwise
const DEBUG_CRATES: &[&str] = &[
    "streammux_core",
    "streammux_transport",
    "streammux_monitoring",
    "streammux_storage",
    "streammux",
];

fn default_filter() -> EnvFilter {
    DEBUG_CRATES
        .iter()
        .filter_map(|name| format!("{}=debug", name).parse::<Directive>().ok())
        .fold(EnvFilter::new("info"), EnvFilter::add_directive)
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer and must be kept alive for the
/// lifetime of the process. File logging is skipped if `logs_dir` cannot be
/// used.
pub fn init_tracing(logs_dir: &Path) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());

    let console_layer = fmt::layer()
        .with_ansi(true)
        .compact()
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let file_appender = std::fs::create_dir_all(logs_dir)
        .map_err(|e| e.to_string())
        .and_then(|_| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_PREFIX)
                .filename_suffix("log")
                .build(logs_dir)
                .map_err(|e| e.to_string())
        });

    match file_appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .init();
            tracing::warn!(logs_dir = ?logs_dir, error = %e, "[Cli] File logging disabled");
            None
        }
    }
}
