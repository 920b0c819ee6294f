//! # Command Line Interface
//!
//! clap definitions and one `cmd_*` function per command. Every flag can
//! also come from a `SCHOOLHUB_*` environment variable.

use crate::api::{self, AppConfig, AppState};
use crate::auth::{AuthError, TokenKeys, hash_password};
use crate::sms::{DEFAULT_BASE_URL, SmsGateway};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use schoolhub_core::seed::{self, SampleLogins, SeedReport};
use schoolhub_core::users::{self, NewLogin, NewUser, Role, UserView};
use schoolhub_core::{CoreError, Store, TABLES};
use serde_json::json;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SAMPLE_TEACHER_PASSWORD: &str = "teacher123";
const SAMPLE_PARENT_PASSWORD: &str = "parent123";

// =============================================================================
// ARGUMENTS
// =============================================================================

#[derive(Debug, Parser)]
#[command(name = "schoolhub", version, about = "School administration server")]
pub struct Cli {
    /// Database file
    #[arg(long, env = "SCHOOLHUB_DB", default_value = "schoolhub.redb", global = true)]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the database and the default admin account
    Init {
        /// Replace an existing database
        #[arg(long)]
        force: bool,
        /// Password for the `admin` account
        #[arg(long, env = "SCHOOLHUB_ADMIN_PASSWORD", default_value = "admin123")]
        admin_password: String,
        /// Also load the demonstration dataset
        #[arg(long)]
        sample_data: bool,
    },
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Record counts per table
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Manage login accounts
    User {
        #[command(subcommand)]
        action: UserCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create a login account
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// ADMIN, TEACHER or PARENT
        #[arg(long)]
        role: String,
        #[arg(long)]
        full_name: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "SCHOOLHUB_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,
    /// HMAC secret for bearer tokens. Random per process when unset.
    #[arg(long, env = "SCHOOLHUB_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,
    #[arg(long, env = "SCHOOLHUB_TOKEN_TTL_HOURS", default_value_t = 24)]
    pub token_ttl_hours: u32,
    /// Fast2SMS API key. Demo mode when unset.
    #[arg(long, env = "SCHOOLHUB_SMS_API_KEY", hide_env_values = true)]
    pub sms_api_key: Option<String>,
    #[arg(long, env = "SCHOOLHUB_SMS_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub sms_base_url: String,
    /// Signature for SMS templates when no school profile is saved
    #[arg(long, env = "SCHOOLHUB_SCHOOL_NAME", default_value = "School")]
    pub school_name: String,
    /// Login attempts allowed per username per minute
    #[arg(long, env = "SCHOOLHUB_LOGIN_RATE", default_value_t = 30)]
    pub login_rate_per_minute: u32,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Database already exists: {0} (use --force to replace it)")]
    AlreadyExists(PathBuf),
    #[error("Database not found: {0} (run `schoolhub init` first)")]
    Missing(PathBuf),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn open_existing(db: &Path) -> Result<Store, CliError> {
    if !db.exists() {
        return Err(CliError::Missing(db.to_path_buf()));
    }
    Ok(Store::open(db)?)
}

// =============================================================================
// COMMANDS
// =============================================================================

/// What `init` did.
#[derive(Debug, Clone)]
pub struct InitReport {
    pub admin_created: bool,
    pub sample: Option<SeedReport>,
}

pub fn cmd_init(
    db: &Path,
    force: bool,
    admin_password: &str,
    sample_data: bool,
) -> Result<InitReport, CliError> {
    if db.exists() {
        if !force {
            return Err(CliError::AlreadyExists(db.to_path_buf()));
        }
        std::fs::remove_file(db)?;
        warn!(path = %db.display(), "existing database replaced");
    }
    let store = Store::open(db)?;

    let admin_hash = hash_password(admin_password)?;
    let logins = if sample_data {
        Some(SampleLogins {
            teacher_hash: hash_password(SAMPLE_TEACHER_PASSWORD)?,
            parent_hash: hash_password(SAMPLE_PARENT_PASSWORD)?,
        })
    } else {
        None
    };
    let today = Local::now().date_naive();

    let report = store.write(|tx| {
        let admin_created = seed::ensure_admin(tx, admin_hash)?;
        let sample = match &logins {
            Some(logins) => Some(seed::sample_data(tx, logins, today)?),
            None => None,
        };
        Ok(InitReport {
            admin_created,
            sample,
        })
    })?;
    info!(path = %db.display(), admin_created = report.admin_created, "database initialized");
    Ok(report)
}

/// Record counts per table, rendered as text or JSON.
pub fn cmd_status(db: &Path, as_json: bool) -> Result<String, CliError> {
    let store = open_existing(db)?;
    let snapshot = store.snapshot()?;
    let mut counts = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        counts.push((*table, snapshot.count(table)?));
    }

    if as_json {
        let tables: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(name, n)| ((*name).to_string(), json!(n)))
            .collect();
        return Ok(serde_json::to_string_pretty(&json!({
            "database": db.display().to_string(),
            "tables": tables,
        }))?);
    }

    let mut out = format!("Database: {}\n", db.display());
    for (name, n) in counts {
        let _ = writeln!(out, "  {name:<20} {n}");
    }
    Ok(out)
}

pub fn cmd_user_add(
    db: &Path,
    username: &str,
    password: &str,
    role: &str,
    full_name: Option<String>,
) -> Result<UserView, CliError> {
    let role: Role = role.parse()?;
    if password.trim().is_empty() {
        return Err(CoreError::validation("Password is required").into());
    }
    let store = open_existing(db)?;
    let mut new = NewUser::new(
        NewLogin {
            username: username.to_string(),
            password_hash: hash_password(password)?,
        },
        role,
    );
    new.full_name = full_name;
    let user = store.write(|tx| users::create_user(tx, new))?;
    info!(username = %user.username, role = %user.role, "user created");
    Ok(UserView::from(&user))
}

pub async fn cmd_serve(db: &Path, args: ServeArgs) -> Result<(), CliError> {
    let store = Store::open(db)?;
    let has_users = store.read(|r| seed::has_users(r))?;
    if !has_users {
        warn!("no user accounts exist; run `schoolhub init` to create the admin account");
    }

    let keys = match args.token_secret.filter(|s| !s.is_empty()) {
        Some(secret) => TokenKeys::new(secret.into_bytes(), args.token_ttl_hours),
        None => {
            warn!("no token secret configured; tokens will not survive a restart");
            TokenKeys::ephemeral(args.token_ttl_hours)
        }
    };
    let sms = SmsGateway::new(args.sms_api_key, args.sms_base_url);
    if !sms.is_configured() {
        warn!("SMS API key not configured; messages are logged in demo mode only");
    }

    let state = AppState::new(
        store,
        AppConfig {
            keys,
            sms,
            school_name: args.school_name,
            login_rate_per_minute: args.login_rate_per_minute,
        },
    );
    api::serve(state, args.bind).await?;
    Ok(())
}
