//! Tracing setup.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,eventhub=debug,sqlx=warn";

/// Install the global subscriber: `filter` directives and the fmt layer.
///
/// A filter that does not parse falls back to [`DEFAULT_FILTER`]. Calling
/// it again after a subscriber is installed has no effect.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
