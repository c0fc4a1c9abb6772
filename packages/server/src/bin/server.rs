//! Tsudoi chat server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsudoi-server -- --tokens-file tokens.json
//! cargo run --bin tsudoi-server -- --tokens-file tokens.json --data-file data/tsudoi.json --port 3000
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tsudoi_server::{
    domain::Repositories,
    infrastructure::{
        identity::StaticTokenVerifier,
        repository::{InMemoryDirectory, JsonFileDirectory},
    },
    ui::{AppState, Server},
};
use tsudoi_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "tsudoi-server")]
#[command(about = "Real-time messaging and presence server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// JSON file mapping bearer tokens to users
    #[arg(short = 't', long)]
    tokens_file: PathBuf,

    /// JSON snapshot file for persistent storage (in-memory when omitted)
    #[arg(short = 'd', long)]
    data_file: Option<PathBuf>,

    /// Default log level (overridden by RUST_LOG)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    // Initialize dependencies in order:
    // 1. Identity Verifier
    // 2. Directory Store
    // 3. AppState (domain services and use cases)
    // 4. Server

    // 1. Identity Verifier (static token table)
    let verifier = match StaticTokenVerifier::from_json_file(&args.tokens_file).await {
        Ok(verifier) => verifier,
        Err(e) => {
            tracing::error!(
                "Failed to load tokens from '{}': {}",
                args.tokens_file.display(),
                e
            );
            std::process::exit(1);
        }
    };

    // 2. Directory Store
    let repositories = match &args.data_file {
        Some(path) => match JsonFileDirectory::open(path).await {
            Ok(store) => {
                tracing::info!("Using JSON file store at '{}'", store.path().display());
                Repositories::from_store(Arc::new(store))
            }
            Err(e) => {
                tracing::error!("Failed to open data file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::info!("Using in-memory store");
            Repositories::from_store(Arc::new(InMemoryDirectory::new()))
        }
    };

    // 3. AppState
    let state = AppState::new(repositories, Arc::new(verifier), Arc::new(SystemClock));

    // 4. Create and run the server
    let server = Server::new(Arc::new(state));
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
