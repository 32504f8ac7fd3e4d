//! Multilingual WebSocket chat relay.
//!
//! Relays chat messages between room members and delivers machine
//! translations into each reader's language as they complete.
//!
//! Run with:
//! ```not_rust
//! JWT_SECRET=... OPENAI_API_KEY=... cargo run --bin tsuyaku-server -- --port 8080
//! ```

use clap::Parser;
use tsuyaku_server::Config;
use tsuyaku_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let config = Config::parse();

    // Run the server
    if let Err(e) = tsuyaku_server::run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
