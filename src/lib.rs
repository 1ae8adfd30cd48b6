pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod mail;
pub mod password;
pub mod rate_limit;
pub mod temp_token;

use api::create_api_router;
use axum::{Router, routing::get};
use db::Database;
use jwt::JwtKeys;
use mail::MailDispatcher;
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Everything the application needs, constructed once at startup and passed
/// down explicitly. No module-level connections or process-wide singletons.
pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing access tokens
    pub access_token_secret: Vec<u8>,
    /// Secret for signing refresh tokens
    pub refresh_token_secret: Vec<u8>,
    /// Whether to set the Secure flag on cookies (true when serving HTTPS)
    pub secure_cookies: bool,
    /// Mail dispatch collaborator
    pub mail: MailDispatcher,
    /// Whether to throttle auth endpoints per client IP
    pub rate_limiting: bool,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtKeys::new(
        &config.access_token_secret,
        &config.refresh_token_secret,
    ));

    let rate_limits = config
        .rate_limiting
        .then(|| Arc::new(RateLimitConfig::new()));

    let api_router = create_api_router(
        config.db.clone(),
        jwt,
        config.mail.clone(),
        config.secure_cookies,
        rate_limits,
    );

    Router::new()
        .route("/", get(|| async { "Server is running" }))
        .nest("/api/v1", api_router)
}

/// Run cleanup tasks and spawn the background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}

/// Run the server on the given listener until shutdown is requested, then
/// close the store. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let db = config.db.clone();
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Listener is closed before the store
    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
}

/// Start the server on the given port in a background task. Use port 0 to
/// let the OS choose a random port. Returns the actual listening address.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    init_cleanup(&config.db).await;

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}
