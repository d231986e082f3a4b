//! Multi-room line chat relay server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --host 127.0.0.1 --port 3000
//! cargo run --bin hiroba-server -- --config hiroba.toml --history file
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use hiroba_server::{
    config::ServerConfig,
    domain::{HistoryBackend, OverflowPolicy, RoomRetention, SessionIdAllocator},
    infrastructure::{history::build_history_sink, repository::InMemoryChatroomRegistry},
    ui::{AppState, Server},
    usecase::{JoinRoomUseCase, LeaveRoomUseCase, SendMessageUseCase},
};
use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "Multi-room TCP line chat relay", long_about = None)]
struct Args {
    /// Path to a TOML config file (defaults are used if it does not exist)
    #[arg(short = 'c', long, default_value = "hiroba.toml")]
    config: PathBuf,

    /// Host address to bind the server to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port number to bind the server to
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// What to do with a member's queue when it is full
    #[arg(long, value_enum)]
    overflow_policy: Option<OverflowPolicy>,

    /// Whether empty rooms are kept or removed
    #[arg(long, value_enum)]
    room_retention: Option<RoomRetention>,

    /// Where relayed lines are recorded
    #[arg(long, value_enum)]
    history: Option<HistoryBackend>,

    /// Directory for file history
    #[arg(long)]
    history_dir: Option<PathBuf>,

    /// Maximum simultaneous connections
    #[arg(long)]
    max_connections: Option<usize>,
}

impl Args {
    fn apply(self, mut config: ServerConfig) -> ServerConfig {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(policy) = self.overflow_policy {
            config.overflow_policy = policy;
        }
        if let Some(retention) = self.room_retention {
            config.room_retention = retention;
        }
        if let Some(history) = self.history {
            config.history = history;
        }
        if let Some(dir) = self.history_dir {
            config.history_dir = dir;
        }
        if self.max_connections.is_some() {
            config.max_connections = self.max_connections;
        }
        config
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let config = match ServerConfig::load_or_default(&args.config) {
        Ok(config) => args.apply(config),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!("Effective configuration: {:?}", config);

    // Initialize dependencies in order:
    // 1. Registry
    // 2. HistorySink
    // 3. UseCases
    // 4. AppState
    // 5. Server

    // 1. Create Registry (in-memory)
    let registry = Arc::new(InMemoryChatroomRegistry::new(config.room_retention));

    // 2. Create HistorySink (optional)
    let history = build_history_sink(config.history, config.history_dir.clone());
    tracing::info!("History backend: {:?}", config.history);

    // 3. Create UseCases
    let join_room_usecase = Arc::new(JoinRoomUseCase::new(registry.clone()));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(history));
    let leave_room_usecase = Arc::new(LeaveRoomUseCase::new(registry.clone()));

    // 4. Create AppState
    let app_state = Arc::new(AppState {
        join_room_usecase,
        send_message_usecase,
        leave_room_usecase,
        session_ids: SessionIdAllocator::new(),
        settings: config.session_settings(),
    });

    // 5. Create and run the server
    let server = Server::new(app_state).with_max_connections(config.max_connections);
    if let Err(e) = server.run(&config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
