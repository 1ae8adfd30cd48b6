mod auth;
mod cohorts;
mod error;
mod healthcheck;
mod profiles;
mod teams;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtKeys;
use crate::mail::MailDispatcher;
use crate::rate_limit::RateLimitConfig;

pub use error::ApiError;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtKeys>,
    mail: MailDispatcher,
    secure_cookies: bool,
    rate_limits: Option<Arc<RateLimitConfig>>,
) -> Router {
    let auth_state = auth::AuthApiState {
        db: db.clone(),
        jwt: jwt.clone(),
        mail,
        secure_cookies,
    };

    let profiles_state = profiles::ProfilesState {
        db: db.clone(),
        jwt: jwt.clone(),
        secure_cookies,
    };

    let cohorts_state = cohorts::CohortsState {
        db: db.clone(),
        jwt: jwt.clone(),
        secure_cookies,
    };

    let teams_state = teams::TeamsState {
        db,
        jwt,
        secure_cookies,
    };

    Router::new()
        .nest("/healthcheck", healthcheck::router())
        .nest("/auth", auth::router(auth_state, rate_limits))
        .nest("/profiles", profiles::router(profiles_state))
        .nest("/cohorts", cohorts::router(cohorts_state))
        .nest("/teams", teams::router(teams_state))
}
