//! routemock - CLI entry point

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use routemock::{build_server, load_routes, ServerConfig};
use routemock::server::DEFAULT_PORT;

#[derive(Parser, Debug)]
#[command(
    name = "routemock",
    about = "Configuration-driven HTTP mock server serving canned JSON responses",
    version
)]
struct Args {
    /// Path to the JSON route file
    #[arg(short, long, default_value = "routes.json")]
    routes: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Send permissive cross-origin headers and answer preflight requests
    #[arg(long)]
    cors: bool,

    /// Maximum number of concurrent connections
    #[arg(long, default_value_t = 1024)]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Loading routes from {}", args.routes.display());
    let declarations = load_routes(&args.routes);

    let config = ServerConfig {
        addr: SocketAddr::new(args.host, args.port),
        max_connections: args.max_connections,
        cors: args.cors,
        ..ServerConfig::default()
    };
    let addr = config.addr;

    build_server(config, declarations)
        .start()
        .await
        .with_context(|| format!("Mock server failed on {addr}"))?;

    Ok(())
}
