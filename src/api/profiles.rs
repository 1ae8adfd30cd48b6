//! Member profile endpoints.
//!
//! Every route requires authentication. Callers manage their own profile
//! under `/me`; any authenticated member may browse the rest.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;

use super::error::{ApiError, ResultExt, validate_uuid};
use crate::auth::Auth;
use crate::db::{Database, ProfileData};
use crate::impl_has_auth_state;
use crate::jwt::JwtKeys;

#[derive(Clone)]
pub struct ProfilesState {
    pub db: Database,
    pub jwt: Arc<JwtKeys>,
    pub secure_cookies: bool,
}

impl_has_auth_state!(ProfilesState);

pub fn router(state: ProfilesState) -> Router {
    Router::new()
        .route("/", post(create_profile).get(list_profiles))
        .route("/me", get(my_profile).put(update_profile).delete(delete_profile))
        .route("/{user_uuid}", get(get_profile))
        .with_state(state)
}

async fn create_profile(
    State(state): State<ProfilesState>,
    Auth(auth): Auth,
    Json(data): Json<ProfileData>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state
        .db
        .profiles()
        .get_by_user_id(auth.identity.id)
        .await
        .db_err("Failed to check existing profile")?;
    if existing.is_some() {
        return Err(ApiError::conflict("Profile already exists"));
    }

    state
        .db
        .profiles()
        .create(auth.identity.id, &data)
        .await
        .db_err("Failed to create profile")?;

    let profile = state
        .db
        .profiles()
        .get_by_user_id(auth.identity.id)
        .await
        .db_err("Failed to load profile")?
        .ok_or_else(|| ApiError::internal("Failed to load profile"))?;

    Ok((StatusCode::CREATED, Json(profile)))
}

async fn list_profiles(
    State(state): State<ProfilesState>,
    Auth(_auth): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let profiles = state
        .db
        .profiles()
        .list()
        .await
        .db_err("Failed to list profiles")?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "profiles": profiles })),
    ))
}

async fn my_profile(
    State(state): State<ProfilesState>,
    Auth(auth): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .db
        .profiles()
        .get_by_user_id(auth.identity.id)
        .await
        .db_err("Failed to load profile")?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;

    Ok((StatusCode::OK, Json(profile)))
}

async fn update_profile(
    State(state): State<ProfilesState>,
    Auth(auth): Auth,
    Json(data): Json<ProfileData>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .db
        .profiles()
        .update(auth.identity.id, &data)
        .await
        .db_err("Failed to update profile")?;
    if !updated {
        return Err(ApiError::not_found("Profile not found"));
    }

    let profile = state
        .db
        .profiles()
        .get_by_user_id(auth.identity.id)
        .await
        .db_err("Failed to load profile")?
        .ok_or_else(|| ApiError::internal("Failed to load profile"))?;

    Ok((StatusCode::OK, Json(profile)))
}

async fn delete_profile(
    State(state): State<ProfilesState>,
    Auth(auth): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .profiles()
        .delete(auth.identity.id)
        .await
        .db_err("Failed to delete profile")?;
    if !deleted {
        return Err(ApiError::not_found("Profile not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn get_profile(
    State(state): State<ProfilesState>,
    Auth(_auth): Auth,
    Path(user_uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&user_uuid)?;

    let profile = state
        .db
        .profiles()
        .get_by_user_uuid(&user_uuid)
        .await
        .db_err("Failed to load profile")?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;

    Ok((StatusCode::OK, Json(profile)))
}
