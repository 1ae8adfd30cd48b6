//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::mail::MailDispatcher;
use crate::{password, temp_token};
use clap::Parser;
use tracing::{error, info};
use uuid::Uuid;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "teambuilder", about = "Team builder backend with JWT session management")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "teambuilder.db")]
    pub database: String,

    /// Public origin the API is served from (e.g., "https://api.example.com").
    /// Secure cookies are enabled when this uses HTTPS
    #[arg(long, default_value = "http://localhost:8080")]
    pub public_origin: String,

    /// Path to file containing the access-token secret.
    /// Prefer using the ACCESS_TOKEN_SECRET env var instead
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh-token secret.
    /// Prefer using the REFRESH_TOKEN_SECRET env var instead
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Base URL of the mail dispatch service
    #[arg(long, env = "MAIL_SERVICE_URL")]
    pub mail_service_url: Option<String>,

    /// Shared token for the mail dispatch service
    #[arg(long, env = "MAIL_SERVICE_TOKEN", hide_env_values = true)]
    pub mail_service_token: Option<String>,

    /// Create an admin account with this email on startup and print its
    /// generated password
    #[arg(long, value_name = "EMAIL")]
    pub create_admin: Option<String>,

    /// Disable per-IP rate limiting on auth endpoints
    #[arg(long)]
    pub no_rate_limit: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load a token secret from the given environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_token_secret(env_var: &str, secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking.
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            "{} is required. Set the environment variable (recommended) or pass a secret file",
            env_var
        );
        return None;
    };

    if secret.len() < MIN_TOKEN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_var, MIN_TOKEN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Validate the public origin and derive whether cookies must be Secure.
/// Returns None and logs an error on an unsupported scheme.
pub fn validate_public_origin(origin: &str) -> Option<bool> {
    if origin.starts_with("https://") {
        Some(true)
    } else if origin.starts_with("http://") {
        Some(false)
    } else {
        error!(origin = %origin, "Public origin must start with http:// or https://");
        None
    }
}

/// Handle the --create-admin flag: create an admin account and print its
/// generated password, or report the existing account.
pub async fn handle_create_admin(db: &Database, email: &str) {
    match db.users().get_by_email(email).await {
        Ok(Some(existing)) => {
            println!();
            println!("Account already exists: {} ({})", existing.email, existing.role.as_str());
            println!();
        }
        Ok(None) => {
            let uuid = Uuid::new_v4().to_string();
            let username = email.split('@').next().unwrap_or(email);
            // Random one-time password; the admin should change it after login
            let generated = temp_token::generate().unhashed;

            let password_hash = match password::hash_password(&generated) {
                Ok(hash) => hash,
                Err(e) => {
                    error!(error = %e, "Failed to hash admin password");
                    std::process::exit(1);
                }
            };

            match db
                .users()
                .create_admin(&uuid, email, username, &password_hash)
                .await
            {
                Ok(_) => {
                    println!();
                    println!("Admin user created: {}", email);
                    println!("Password: {}", generated);
                    println!();
                }
                Err(e) => {
                    error!(error = %e, "Failed to create admin user");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing admin");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    access_token_secret: String,
    refresh_token_secret: String,
    secure_cookies: bool,
    mail: MailDispatcher,
    rate_limiting: bool,
) -> ServerConfig {
    ServerConfig {
        db,
        access_token_secret: access_token_secret.into_bytes(),
        refresh_token_secret: refresh_token_secret.into_bytes(),
        secure_cookies,
        mail,
        rate_limiting,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
