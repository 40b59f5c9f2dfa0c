//! Alpaca Stream Client Binary
//!
//! Subscribes to a set of symbols and logs every market event — a console
//! stream dumper for smoke-testing credentials and connectivity.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p alpaca-stream-client
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `ALPACA_KEY`: Alpaca API key
//! - `ALPACA_SECRET`: Alpaca API secret
//!
//! ## Optional
//! - `ALPACA_FEED`: Market data feed - "iex" | "sip" (default: iex)
//! - `ALPACA_STREAM_URL`: Explicit stream endpoint override
//! - `STREAM_SYMBOLS`: Comma-separated symbols to watch (default: AAPL)
//! - `STREAM_CLIENT_MAX_RECONNECT_ATTEMPTS`: Reconnect budget (default: 5)
//! - `RUST_LOG`: Log level (default: info)

use alpaca_stream_client::infrastructure::telemetry;
use alpaca_stream_client::{ClientEvent, ClientSettings, MarketEvent, StreamClient, consumer};
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();
    telemetry::init();

    tracing::info!("Starting Alpaca stream client");

    let settings = ClientSettings::from_env()?;
    log_config(&settings);

    let (client, mut events) = StreamClient::connect(settings);

    let symbols = std::env::var("STREAM_SYMBOLS").unwrap_or_else(|_| "AAPL".to_string());
    for symbol in symbols.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let tag = symbol.to_string();
        client.subscribe(
            symbol,
            consumer(move |event: MarketEvent| {
                tracing::info!(
                    symbol = %tag,
                    close = %event.close,
                    volume = event.volume,
                    timestamp = %event.timestamp,
                    "market event"
                );
            }),
        )?;
    }

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
            event = events.recv() => {
                match event {
                    Some(ClientEvent::ReconnectsExhausted) => {
                        tracing::error!("stream gave up reconnecting; exiting");
                        break;
                    }
                    Some(event) => tracing::debug!(?event, "client event"),
                    None => break,
                }
            }
        }
    }

    client.close();
    tracing::info!("Stream client stopped");
    Ok(())
}

/// Load .env file from the current directory, if present.
fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Log the parsed configuration.
fn log_config(settings: &ClientSettings) {
    tracing::info!(
        feed = settings.feed.as_str(),
        url = %settings.stream_url(),
        max_reconnect_attempts = settings.websocket.max_reconnect_attempts,
        "Configuration loaded"
    );
}
