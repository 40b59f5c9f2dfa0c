//! Tracing Subscriber Setup
//!
//! Configures structured logging for the client binary.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter (default: `alpaca_stream_client=info`)
//!
//! # Usage
//!
//! ```ignore
//! use alpaca_stream_client::infrastructure::telemetry;
//!
//! // Initialize at startup.
//! telemetry::init();
//! tracing::info!("ready");
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the tracing subscriber.
///
/// Safe to call more than once; subsequent calls are no-ops.
#[allow(clippy::expect_used)]
pub fn init() {
    let env_filter = EnvFilter::from_default_env().add_directive(
        "alpaca_stream_client=info"
            .parse()
            .expect("static directive 'alpaca_stream_client=info' is valid"),
    );

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
