//! Shared logging setup.
use tracing::Level;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::FmtSubscriber;

/// Output format of the global logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    HumanReadable,
    Json,
}

/// Configure the global tracing subscriber.
///
/// `RUST_LOG` directives take precedence over `default_level`. Calling this
/// more than once is fine, only the first call installs a subscriber. Later
/// calls log the refusal at debug level through the installed subscriber.
pub fn configure_global_logger(default_level: Level, format: LogFormat) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let builder = FmtSubscriber::builder()
        .with_test_writer()
        .with_env_filter(env_filter)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    let result = match format {
        LogFormat::HumanReadable => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };

    if let Err(e) = result {
        // Already set by an earlier call, keep that subscriber.
        tracing::debug!(%e, "global logger already configured");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_twice() {
        configure_global_logger(Level::DEBUG, LogFormat::HumanReadable);
        configure_global_logger(Level::INFO, LogFormat::Json);
        assert!(tracing::dispatcher::has_been_set());
        tracing::debug!("logger configured");
    }
}
