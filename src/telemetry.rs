use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Initialize structured JSON logging on stderr, leaving stdout to command output.
///
/// `RUST_LOG` wins over `default_level` when set.
pub fn init_telemetry(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(filter)
        .try_init()?;

    tracing::info!("da-desk telemetry initialized with structured logging");
    Ok(())
}

/// Generate a correlation ID for linking everything one panel does
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping every action dispatched on one order's panel
pub fn create_panel_span(order_id: &str, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "delivery_panel",
        order.id = order_id,
        correlation.id = correlation_id,
    )
}
