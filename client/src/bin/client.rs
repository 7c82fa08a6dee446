use clap::Parser;
use common::codec::TextCodec;
use futures::{SinkExt, StreamExt};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{error, info, warn};

/// Interactive client: every stdin line is sent as one command and the reply
/// is printed as-is.
#[derive(Parser, Debug)]
#[clap(author, version, about = "Line client for the rayo-kv server", long_about = None)]
struct ClientArgs {
    /// Hostname or IP address of the server.
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to connect on.
    #[clap(short, long, default_value = "6380")]
    port: u16,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber for logging.
    init_tracing();

    // Parse command-line arguments.
    let args = ClientArgs::parse();
    let addr = format!("{}:{}", args.host, args.port);

    // Connect to the server.
    let stream = TcpStream::connect(&addr).await?;
    info!("Successfully connected to {}", addr);
    let mut framed = Framed::new(stream, TextCodec::new());

    let stdin = io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    // Main input loop.
    while let Some(line) = lines.next_line().await? {
        let command_text = line.trim();
        if command_text.is_empty() {
            continue;
        }

        framed.send(command_text).await?;

        // Every non-blank line gets exactly one reply line.
        match framed.next().await {
            Some(Ok(reply)) => println!("{}", reply),
            Some(Err(e)) => {
                error!("Error reading response: {}", e);
                return Err(e.into());
            }
            None => {
                warn!("Server closed the connection");
                break;
            }
        }
    }
    Ok(())
}
