use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use location_distance_map::{
    cli::{Cli, Command, ServeArgs},
    client,
    registry::LocationRegistry,
    server::Server,
};

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await?,
        Command::Client(args) => client::run(args).await?,
    }

    Ok(())
}

async fn serve(args: ServeArgs) -> Result<()> {
    let registry = match &args.data {
        Some(path) => LocationRegistry::open(path)
            .await
            .with_context(|| format!("failed to open registry at {}", path.display()))?,
        None => LocationRegistry::in_memory(),
    };

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    let server = Server::new(listener, registry);
    let addr = server.local_addr()?;
    info!("server listening on {}", addr);
    if let Err(err) = server.run_until_ctrl_c().await {
        warn!("server exited with error: {err:?}");
        return Err(err);
    }
    Ok(())
}
