use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info";

/// Initialise structured logging.
/// Emits JSON to stdout; `RUST_LOG` controls the level.
pub fn init_telemetry() {
    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(formatting_layer)
        .init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        // The global subscriber can only be installed once per process, so
        // only the filter construction is exercised here.
        let filter = EnvFilter::new(DEFAULT_LOG_FILTER);
        assert_eq!(filter.to_string(), "info");
    }
}
