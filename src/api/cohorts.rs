//! Cohort endpoints.
//!
//! Creation, mutation, and membership management are admin-only; any
//! authenticated member may browse cohorts and their member lists.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;

use super::error::{ApiError, ResultExt, validate_uuid};
use crate::auth::{AdminAuth, Auth};
use crate::db::{Cohort, CohortData, Database};
use crate::impl_has_auth_state;
use crate::jwt::JwtKeys;

#[derive(Clone)]
pub struct CohortsState {
    pub db: Database,
    pub jwt: Arc<JwtKeys>,
    pub secure_cookies: bool,
}

impl_has_auth_state!(CohortsState);

pub fn router(state: CohortsState) -> Router {
    Router::new()
        .route("/", post(create_cohort).get(list_cohorts))
        .route(
            "/{uuid}",
            get(get_cohort).put(update_cohort).delete(delete_cohort),
        )
        .route("/{uuid}/members", get(list_members))
        .route(
            "/{uuid}/members/{user_uuid}",
            post(add_member).delete(remove_member),
        )
        .with_state(state)
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation(vec![
            "Cohort name cannot be empty".to_string(),
        ]));
    }
    if name.len() > 100 {
        return Err(ApiError::validation(vec![
            "Cohort name cannot be longer than 100 characters".to_string(),
        ]));
    }
    Ok(())
}

/// Load a cohort by path UUID or 404.
async fn load_cohort(state: &CohortsState, uuid: &str) -> Result<Cohort, ApiError> {
    validate_uuid(uuid)?;
    state
        .db
        .cohorts()
        .get_by_uuid(uuid)
        .await
        .db_err("Failed to load cohort")?
        .ok_or_else(|| ApiError::not_found("Cohort not found"))
}

async fn create_cohort(
    State(state): State<CohortsState>,
    AdminAuth(_admin): AdminAuth,
    Json(data): Json<CohortData>,
) -> Result<impl IntoResponse, ApiError> {
    validate_name(&data.name)?;

    let taken = state
        .db
        .cohorts()
        .name_exists(&data.name)
        .await
        .db_err("Failed to check cohort name")?;
    if taken {
        return Err(ApiError::conflict("Cohort name is already taken"));
    }

    let uuid = uuid::Uuid::new_v4().to_string();
    state
        .db
        .cohorts()
        .create(&uuid, &data)
        .await
        .db_err("Failed to create cohort")?;

    let cohort = load_cohort(&state, &uuid).await?;
    Ok((StatusCode::CREATED, Json(cohort)))
}

async fn list_cohorts(
    State(state): State<CohortsState>,
    Auth(_auth): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let cohorts = state
        .db
        .cohorts()
        .list()
        .await
        .db_err("Failed to list cohorts")?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "cohorts": cohorts })),
    ))
}

async fn get_cohort(
    State(state): State<CohortsState>,
    Auth(_auth): Auth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cohort = load_cohort(&state, &uuid).await?;
    Ok((StatusCode::OK, Json(cohort)))
}

async fn update_cohort(
    State(state): State<CohortsState>,
    AdminAuth(_admin): AdminAuth,
    Path(uuid): Path<String>,
    Json(data): Json<CohortData>,
) -> Result<impl IntoResponse, ApiError> {
    validate_name(&data.name)?;

    let cohort = load_cohort(&state, &uuid).await?;

    if data.name != cohort.name {
        let taken = state
            .db
            .cohorts()
            .name_exists(&data.name)
            .await
            .db_err("Failed to check cohort name")?;
        if taken {
            return Err(ApiError::conflict("Cohort name is already taken"));
        }
    }

    state
        .db
        .cohorts()
        .update(cohort.id, &data)
        .await
        .db_err("Failed to update cohort")?;

    let updated = load_cohort(&state, &uuid).await?;
    Ok((StatusCode::OK, Json(updated)))
}

async fn delete_cohort(
    State(state): State<CohortsState>,
    AdminAuth(_admin): AdminAuth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cohort = load_cohort(&state, &uuid).await?;

    state
        .db
        .cohorts()
        .delete(cohort.id)
        .await
        .db_err("Failed to delete cohort")?;

    Ok(StatusCode::NO_CONTENT)
}

async fn list_members(
    State(state): State<CohortsState>,
    Auth(_auth): Auth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cohort = load_cohort(&state, &uuid).await?;

    let members = state
        .db
        .cohorts()
        .list_members(cohort.id)
        .await
        .db_err("Failed to list cohort members")?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "members": members })),
    ))
}

async fn add_member(
    State(state): State<CohortsState>,
    AdminAuth(_admin): AdminAuth,
    Path((uuid, user_uuid)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let cohort = load_cohort(&state, &uuid).await?;

    validate_uuid(&user_uuid)?;
    let member = state
        .db
        .users()
        .identity_by_uuid(&user_uuid)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let added = state
        .db
        .cohorts()
        .add_member(cohort.id, member.id)
        .await
        .db_err("Failed to add cohort member")?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "added": added }))))
}

async fn remove_member(
    State(state): State<CohortsState>,
    AdminAuth(_admin): AdminAuth,
    Path((uuid, user_uuid)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let cohort = load_cohort(&state, &uuid).await?;

    validate_uuid(&user_uuid)?;
    let member = state
        .db
        .users()
        .identity_by_uuid(&user_uuid)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let removed = state
        .db
        .cohorts()
        .remove_member(cohort.id, member.id)
        .await
        .db_err("Failed to remove cohort member")?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "removed": removed })),
    ))
}
