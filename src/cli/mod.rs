use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::auth::{generate_jwt, Claims};
use crate::config;
use crate::database::DatabaseManager;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "creche-api")]
#[command(about = "Creche API - multi-tenant school and childcare management backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides CRECHE_API_PORT / PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Apply database migrations and exit")]
    Migrate,

    #[command(about = "Mint a local JWT for testing")]
    Token {
        #[arg(long, help = "User id placed in the sub claim")]
        user_id: i32,
        #[arg(long, help = "Email claim")]
        email: String,
        #[arg(long, help = "Tenant id claim")]
        tenant_id: Option<i32>,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(port).await,
        Commands::Migrate => {
            let pool = DatabaseManager::connect(&config::config().database)?;
            DatabaseManager::migrate(&pool).await?;
            println!("Migrations applied");
            Ok(())
        }
        Commands::Token { user_id, email, tenant_id } => {
            let token = generate_jwt(&Claims::new(user_id, email, tenant_id))?;
            println!("{}", token);
            Ok(())
        }
    }
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let config = config::config();
    tracing::info!("Starting Creche API in {:?} mode", config.environment);
    if crate::is_production!() && config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set in production");
    }

    let pool = DatabaseManager::connect(&config.database)?;
    if config.database.auto_migrate {
        if let Err(e) = DatabaseManager::migrate(&pool).await {
            // Keep serving so /health can report the outage
            tracing::error!("Automatic migration failed: {}", e);
        }
    }

    let app = crate::app(AppState::new(pool));

    let bind_addr = format!("0.0.0.0:{}", port.unwrap_or(config.api.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Creche API listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
