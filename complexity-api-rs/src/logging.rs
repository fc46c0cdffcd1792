//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Install the global subscriber. `RUST_LOG` overrides the default `info` filter;
/// `json` selects flattened JSON events instead of human-readable text.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default().with(filter);

    let result = if json {
        subscriber
            .with(fmt::layer().json().flatten_event(true).with_target(true))
            .try_init()
    } else {
        subscriber.with(fmt::layer().with_target(true)).try_init()
    };

    if let Err(err) = result {
        eprintln!("Tracing subscriber already installed: {}", err);
    }
}

/// Whether `LOG_FORMAT` asks for JSON output.
pub fn json_requested() -> bool {
    std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
