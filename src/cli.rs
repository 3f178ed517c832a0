use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::models::auth_types::UserRecord;
use crate::store::{decode_rows, local::hash_password, to_row, Query, Store};

/// Clinic booking backend: REST API for bookings, services, gallery and settings
#[derive(Parser, Clone, Debug)]
#[command(name = "clinic_booking_backend")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clinic booking API server with store management")]
#[command(long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, default_value = ".env")]
    pub config: String,

    /// Server port override
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Server host override
    #[arg(long)]
    pub host: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum Commands {
    /// Start the web server (default action)
    Serve,
    /// Store management commands
    Db {
        #[command(subcommand)]
        action: DbCommands,
    },
    /// Account management commands
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum DbCommands {
    /// Check that the configured store answers
    Test,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum UserCommands {
    /// Create an admin account in the local store
    AddAdmin(AddAdminArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct AddAdminArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub password: String,
    #[arg(long, default_value = "Administrator")]
    pub full_name: String,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn is_server_mode(&self) -> bool {
        matches!(self.command, None | Some(Commands::Serve))
    }
}

/// Creates an admin account. Usernames are unique among stored accounts.
pub async fn add_admin(store: &dyn Store, args: &AddAdminArgs) -> Result<UserRecord> {
    let username = args.username.trim();
    if username.is_empty() {
        bail!("username must not be empty");
    }
    if args.password.len() < 8 {
        bail!("password must be at least 8 characters");
    }

    let existing = store
        .select(&Query::table("users").eq("username", username).limit(1))
        .await
        .context("reading users")?;
    if !existing.is_empty() {
        bail!("user '{}' already exists", username);
    }

    let hash = hash_password(&args.password).map_err(|e| anyhow::anyhow!("hashing password: {e}"))?;
    let admin = UserRecord::new_admin(username, args.full_name.trim(), hash);
    let stored = store
        .insert("users", vec![to_row(&admin)?])
        .await
        .context("inserting admin user")?;
    decode_rows::<UserRecord>(stored)?
        .into_iter()
        .next()
        .context("insert returned no row")
}

pub async fn test_connection(store: &dyn Store) -> Result<()> {
    store.ping().await.context("store did not answer")?;
    Ok(())
}
