// donelist-relay entry point.

use anyhow::Context;
use clap::{Parser, Subcommand};
use donelist_common::types::{Role, UserId};
use donelist_relay::{auth::jwt::JwtAccessTokenService, config::RelayConfig, store::TodoStore};
use tokio::net::TcpListener;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "donelist-relay", about = "Todo mutation service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a development access token
    IssueToken {
        /// User id to embed; a fresh one is generated when omitted.
        #[arg(long)]
        user: Option<Uuid>,
        /// Grant the admin role.
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = RelayConfig::from_env();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::IssueToken { user, admin } => {
            let service = JwtAccessTokenService::new(&config.jwt_secret)
                .context("invalid relay JWT secret")?;
            let user_id = user.map(UserId::from_uuid).unwrap_or_else(UserId::new_v4);
            let role = if admin { Role::Admin } else { Role::Member };
            println!("{}", service.issue_token(user_id, role)?);
            Ok(())
        }
    }
}

async fn serve(config: RelayConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .init();

    if config.is_dev_jwt_secret() {
        warn!("using the development JWT secret; set DONELIST_RELAY_JWT_SECRET in production");
    }

    let store = TodoStore::new().with_write_delay(config.write_delay);
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind relay listener on {}", config.listen_addr))?;

    info!(listen_addr = %config.listen_addr, "starting relay server");

    donelist_relay::serve(listener, &config, store, shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
