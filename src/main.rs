//! httpwire server binary
//!
//! Binds the configured address and answers every request with the
//! default handler: `200 OK` for GET, `501 Not Implemented` otherwise.

use clap::Parser;
use httpwire::config::{ServerConfig, DEFAULT_LISTEN_ADDRESS};
use httpwire::http::DefaultHandler;
use httpwire::net::Listener;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "httpwire")]
#[command(about = "Single-request HTTP/1.1 server", long_about = None)]
struct Args {
    /// Address to listen on, host:port
    #[arg(short, long, env = "HTTP_DOMAIN", default_value = DEFAULT_LISTEN_ADDRESS)]
    listen: String,

    /// Per-read timeout in milliseconds (0 disables it)
    #[arg(short = 't', long, env = "HTTP_READ_TIMEOUT_MS", default_value_t = 4000)]
    read_timeout_ms: u64,

    /// Answer malformed requests with 400/431 instead of closing silently
    #[arg(long, env = "HTTP_REJECT_MALFORMED")]
    reject_malformed: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "httpwire=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match ServerConfig::builder()
        .listen_address(args.listen)
        .read_timeout_millis(args.read_timeout_ms)
        .reject_malformed(args.reject_malformed)
        .build()
    {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        listen_address = %config.listen_address,
        read_timeout = ?config.read_timeout,
        reject_malformed = config.reject_malformed,
        "httpwire v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let listener = match Listener::bind(&config) {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "failed to start listener");
            return ExitCode::FAILURE;
        }
    };

    listener.serve(DefaultHandler);
    ExitCode::SUCCESS
}
