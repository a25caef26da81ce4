//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` overrides `default_filter`. Calling this more than once is
/// harmless; later calls leave the first subscriber in place.
pub fn init_tracing(default_filter: &str) {
    let filter = default_filter.to_string();
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();
}
