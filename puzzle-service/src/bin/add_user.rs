//! `add-user`: create an activated account with the standard permissions.
//!
//! Usage:
//!   add-user --email <email> --full-name <name> --display-name <name> --password <pw>
//!
//! The database is taken from `--database-url` or `DATABASE_URL`.

use std::time::Duration;

use clap::Parser;
use puzzle_service::{
    config::DatabaseConfig,
    db,
    models::{
        user::{trim_profile_field, validate_new_user},
        NewUser, PermissionCode,
    },
    services::{Database, Store},
    utils::Credential,
};
use service_core::validation::FieldValidator;

#[derive(Parser, Debug)]
#[command(name = "add-user", about = "Create an activated puzzle API user")]
struct Cli {
    /// PostgreSQL connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[arg(long)]
    email: String,

    #[arg(long)]
    full_name: String,

    #[arg(long)]
    display_name: String,

    /// Plaintext password, 8 to 72 bytes.
    #[arg(long, env = "PUZZLE_USER_PASSWORD", hide_env_values = true)]
    password: String,

    /// Also grant `users:create`, allowing this account to add others.
    #[arg(long)]
    allow_user_creation: bool,
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

    let mut cli = Cli::parse();
    cli.email = trim_profile_field(&cli.email);
    cli.full_name = trim_profile_field(&cli.full_name);
    cli.display_name = trim_profile_field(&cli.display_name);

    let mut v = FieldValidator::new();
    validate_new_user(
        &mut v,
        &cli.email,
        &cli.full_name,
        &cli.display_name,
        &cli.password,
    );
    if !v.valid() {
        anyhow::bail!("invalid user: {}", v.errors());
    }

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

    let user = store
        .insert_user(&NewUser {
            email: cli.email,
            full_name: cli.full_name,
            display_name: cli.display_name,
            credential,
            activated: true,
        })
        .await?;

    let mut codes = PermissionCode::STANDARD.to_vec();
    if cli.allow_user_creation {
        codes.push(PermissionCode::UsersCreate);
    }
    store.add_permissions_for_user(user.id, &codes).await?;

    println!("created user {} <{}> with id {}", user.display_name, user.email, user.id);
    Ok(())
}
