use std::sync::Arc;

use clap::Parser;
use lib::{config::ServerArgs, data_store::DataStore, server::Server};
use tokio::net::TcpListener;
use tracing::info;

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber for logging.
    init_tracing();

    // Parse command-line arguments.
    let args = ServerArgs::parse();
    let addr = args.listen_addr();

    // Bind a TCP listener to the specified address.
    let listener = TcpListener::bind(&addr).await?;
    let store = Arc::new(DataStore::with_channel_capacity(args.channel_capacity));
    let server = Server::new(listener, store, args.connection_options());
    info!("Server listening on {}", server.local_addr()?);

    server.run_until_ctrl_c().await;
    Ok(())
}
