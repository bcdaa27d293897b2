//! Logging initialization and configuration.
//!
//! Everything goes to stderr so the binary's stdout carries only the reply
//! and the optional event dump. Security events are emitted on the
//! `secure_gateway::security` target and can be filtered separately, e.g.
//! `RUST_LOG=secure_gateway=warn,secure_gateway::security=off`.

use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

const DEFAULT_DIRECTIVE: &str = "secure_gateway=info";

/// Try to install the global subscriber, filtered by `RUST_LOG` or
/// `secure_gateway=info` when it is unset.
///
/// Returns `Err` if a subscriber is already installed.
pub fn try_init() -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    install(filter)
}

/// Like [`try_init`] with an explicit filter such as `debug` or
/// `secure_gateway=trace,reqwest=debug`.
///
/// A bare level applies to this crate only. An unparsable filter falls back
/// to the default.
pub fn try_init_with(filter: &str) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_new(directive(filter)).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    install(filter)
}

fn directive(filter: &str) -> String {
    let filter = filter.trim();
    if filter.is_empty() {
        DEFAULT_DIRECTIVE.to_string()
    } else if filter.contains('=') || filter.contains(',') {
        filter.to_string()
    } else {
        format!("secure_gateway={}", filter)
    }
}

fn install(filter: EnvFilter) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init()
}
