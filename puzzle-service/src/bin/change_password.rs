//! `change-password`: set a user's password, looked up by email.

use std::time::Duration;

use clap::Parser;
use puzzle_service::{
    config::DatabaseConfig,
    db,
    services::{Database, Store},
    utils::Credential,
};

#[derive(Parser, Debug)]
#[command(name = "change-password", about = "Set a puzzle API user's password")]
struct Cli {
    /// PostgreSQL connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[arg(long)]
    email: String,

    /// New plaintext password, 8 to 72 bytes.
    #[arg(long, env = "PUZZLE_USER_PASSWORD", hide_env_values = true)]
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    // Validates the length bounds before hashing.
    let credential = Credential::set(&cli.password)?;

    let pool = db::create_pool(&DatabaseConfig {
        url: cli.database_url,
        max_connections: 1,
        min_connections: 1,
        idle_timeout_seconds: 60,
        query_timeout_seconds: 10,
    })
    .await?;
    let store = Database::new(pool, Duration::from_secs(10));

    let mut user = store
        .get_user_by_email(&cli.email)
        .await
        .map_err(|e| anyhow::anyhow!("no user with email {}: {}", cli.email, e))?;
    user.credential = credential;
    store.update_user(&mut user).await?;

    println!("password changed for {}", user.email);
    Ok(())
}
