//! Line client for the Hiroba chat relay.
//!
//! Connects to a server, prints whatever it sends and forwards stdin lines.
//! No reconnection: when the connection ends, so does the client.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-client
//! cargo run --bin hiroba-client -- --address 127.0.0.1:3000
//! ```

use clap::Parser;

use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-client")]
#[command(about = "Line client for the Hiroba chat relay", long_about = None)]
struct Args {
    /// Server address (host:port)
    #[arg(short = 'a', long, default_value = "127.0.0.1:8080")]
    address: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "warn");

    let args = Args::parse();

    if let Err(e) = hiroba_client::run_client_session(&args.address).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
