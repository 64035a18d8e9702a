// Path: crates/telemetry/src/init.rs
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Output format of the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event, for log shippers.
    #[default]
    Json,
    /// Human-readable lines, for interactive use.
    Text,
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes the global `tracing` subscriber for structured JSON logging.
pub fn init_tracing() -> Result<(), anyhow::Error> {
    init_tracing_with(LogFormat::Json)
}

/// Initializes the global `tracing` subscriber in the requested format.
pub fn init_tracing_with(format: LogFormat) -> Result<(), anyhow::Error> {
    tracing_log::LogTracer::init()?;
    match format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339());
            let subscriber = Registry::default().with(filter()).with(fmt_layer);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Text => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false);
            let subscriber = Registry::default().with(filter()).with(fmt_layer);
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}
