use std::path::Path;

use labpresence_core::presence::TRANSPORT_LOG_TARGET;
use labpresence_types::RpcLogLevel;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log to stderr, and to a daily file in `log_dir` when given. `RUST_LOG`
/// overrides the default `info` level; the presence transport target
/// follows `rpc_level`.
///
/// Keep the returned guard alive until exit or buffered file output is
/// lost.
pub fn init_logging(log_dir: Option<&Path>, rpc_level: RpcLogLevel) -> Option<WorkerGuard> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();
    if let Ok(directive) = format!("{TRANSPORT_LOG_TARGET}={}", rpc_level.filter_directive()).parse() {
        filter = filter.add_directive(directive);
    }

    let console_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("Warning: Failed to create log directory {}: {}", dir.display(), e);
            }
            let appender = tracing_appender::rolling::daily(dir, "labpresence.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_target(true).with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}
