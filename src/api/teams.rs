//! Team endpoints.
//!
//! Teams are self-organized: any authenticated member may create one and
//! becomes its leader. Mutation is gated on being a leader of that team (or
//! a global admin). Non-members join through the request/approve flow.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt, validate_uuid};
use crate::auth::{Auth, AuthenticatedUser};
use crate::db::{Database, Identity, JoinRequestRecord, JoinRequestStatus, Team, TeamRole, UserRole};
use crate::impl_has_auth_state;
use crate::jwt::JwtKeys;

#[derive(Clone)]
pub struct TeamsState {
    pub db: Database,
    pub jwt: Arc<JwtKeys>,
    pub secure_cookies: bool,
}

impl_has_auth_state!(TeamsState);

pub fn router(state: TeamsState) -> Router {
    Router::new()
        .route("/", post(create_team).get(list_teams))
        .route("/{uuid}", get(get_team).delete(delete_team))
        .route(
            "/{uuid}/members/{user_uuid}",
            post(add_member).delete(remove_member),
        )
        .route("/{uuid}/join", post(request_to_join))
        .route("/{uuid}/requests", get(list_join_requests))
        .route("/{uuid}/requests/{id}/approve", post(approve_join_request))
        .route("/{uuid}/requests/{id}/reject", post(reject_join_request))
        .with_state(state)
}

/// Load a team by path UUID or 404.
async fn load_team(state: &TeamsState, uuid: &str) -> Result<Team, ApiError> {
    validate_uuid(uuid)?;
    state
        .db
        .teams()
        .get_by_uuid(uuid)
        .await
        .db_err("Failed to load team")?
        .ok_or_else(|| ApiError::not_found("Team not found"))
}

/// Require the caller to be a leader of the team or a global admin.
async fn require_leader(
    state: &TeamsState,
    team: &Team,
    auth: &AuthenticatedUser,
) -> Result<(), ApiError> {
    if auth.identity.role == UserRole::Admin {
        return Ok(());
    }

    let role = state
        .db
        .teams()
        .member_role(team.id, auth.identity.id)
        .await
        .db_err("Failed to check team role")?;

    match role {
        Some(TeamRole::Leader) => Ok(()),
        _ => Err(ApiError::forbidden(
            "Only a team leader can perform this action",
        )),
    }
}

async fn load_member(state: &TeamsState, user_uuid: &str) -> Result<Identity, ApiError> {
    validate_uuid(user_uuid)?;
    state
        .db
        .users()
        .identity_by_uuid(user_uuid)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

#[derive(Deserialize)]
struct CreateTeamRequest {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

async fn create_team(
    State(state): State<TeamsState>,
    Auth(auth): Auth,
    Json(payload): Json<CreateTeamRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation(vec![
            "Team name cannot be empty".to_string(),
        ]));
    }
    if name.len() > 100 {
        return Err(ApiError::validation(vec![
            "Team name cannot be longer than 100 characters".to_string(),
        ]));
    }

    let taken = state
        .db
        .teams()
        .name_exists(name)
        .await
        .db_err("Failed to check team name")?;
    if taken {
        return Err(ApiError::conflict("Team name is already taken"));
    }

    let uuid = uuid::Uuid::new_v4().to_string();
    state
        .db
        .teams()
        .create(&uuid, name, payload.description.as_deref(), auth.identity.id)
        .await
        .db_err("Failed to create team")?;

    let team = load_team(&state, &uuid).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

async fn list_teams(
    State(state): State<TeamsState>,
    Auth(_auth): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let teams = state.db.teams().list().await.db_err("Failed to list teams")?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "teams": teams }))))
}

async fn get_team(
    State(state): State<TeamsState>,
    Auth(_auth): Auth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let team = load_team(&state, &uuid).await?;

    let members = state
        .db
        .teams()
        .list_members(team.id)
        .await
        .db_err("Failed to list team members")?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "team": team, "members": members })),
    ))
}

async fn delete_team(
    State(state): State<TeamsState>,
    Auth(auth): Auth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let team = load_team(&state, &uuid).await?;
    require_leader(&state, &team, &auth).await?;

    state
        .db
        .teams()
        .delete(team.id)
        .await
        .db_err("Failed to delete team")?;

    Ok(StatusCode::NO_CONTENT)
}

async fn add_member(
    State(state): State<TeamsState>,
    Auth(auth): Auth,
    Path((uuid, user_uuid)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let team = load_team(&state, &uuid).await?;
    require_leader(&state, &team, &auth).await?;

    let member = load_member(&state, &user_uuid).await?;

    let added = state
        .db
        .teams()
        .add_member(team.id, member.id, TeamRole::Member)
        .await
        .db_err("Failed to add team member")?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "added": added }))))
}

async fn remove_member(
    State(state): State<TeamsState>,
    Auth(auth): Auth,
    Path((uuid, user_uuid)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let team = load_team(&state, &uuid).await?;

    // Members may remove themselves; everyone else needs leader rights
    if auth.identity.uuid != user_uuid {
        require_leader(&state, &team, &auth).await?;
    }

    let member = load_member(&state, &user_uuid).await?;

    let removed = state
        .db
        .teams()
        .remove_member(team.id, member.id)
        .await
        .db_err("Failed to remove team member")?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "removed": removed })),
    ))
}

async fn request_to_join(
    State(state): State<TeamsState>,
    Auth(auth): Auth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let team = load_team(&state, &uuid).await?;

    let existing_role = state
        .db
        .teams()
        .member_role(team.id, auth.identity.id)
        .await
        .db_err("Failed to check team role")?;
    if existing_role.is_some() {
        return Err(ApiError::conflict("You are already a member of this team"));
    }

    let pending = state
        .db
        .teams()
        .has_pending_request(team.id, auth.identity.id)
        .await
        .db_err("Failed to check join requests")?;
    if pending {
        return Err(ApiError::conflict("Join request already pending"));
    }

    let request_id = state
        .db
        .teams()
        .create_join_request(team.id, auth.identity.id)
        .await
        .db_err("Failed to create join request")?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "requestId": request_id })),
    ))
}

async fn list_join_requests(
    State(state): State<TeamsState>,
    Auth(auth): Auth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let team = load_team(&state, &uuid).await?;
    require_leader(&state, &team, &auth).await?;

    let requests = state
        .db
        .teams()
        .list_join_requests(team.id)
        .await
        .db_err("Failed to list join requests")?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "requests": requests })),
    ))
}

/// Load a pending join request belonging to the team or fail.
async fn load_pending_request(
    state: &TeamsState,
    team: &Team,
    request_id: i64,
) -> Result<JoinRequestRecord, ApiError> {
    let request = state
        .db
        .teams()
        .get_join_request(request_id)
        .await
        .db_err("Failed to load join request")?
        .filter(|r| r.team_id == team.id)
        .ok_or_else(|| ApiError::not_found("Join request not found"))?;

    if request.status != JoinRequestStatus::Pending {
        return Err(ApiError::conflict("Join request already resolved"));
    }

    Ok(request)
}

async fn approve_join_request(
    State(state): State<TeamsState>,
    Auth(auth): Auth,
    Path((uuid, request_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let team = load_team(&state, &uuid).await?;
    require_leader(&state, &team, &auth).await?;

    let request = load_pending_request(&state, &team, request_id).await?;

    let resolved = state
        .db
        .teams()
        .resolve_join_request(request.id, JoinRequestStatus::Approved)
        .await
        .db_err("Failed to resolve join request")?;
    if !resolved {
        return Err(ApiError::conflict("Join request already resolved"));
    }

    state
        .db
        .teams()
        .add_member(team.id, request.user_id, TeamRole::Member)
        .await
        .db_err("Failed to add team member")?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "status": JoinRequestStatus::Approved })),
    ))
}

async fn reject_join_request(
    State(state): State<TeamsState>,
    Auth(auth): Auth,
    Path((uuid, request_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let team = load_team(&state, &uuid).await?;
    require_leader(&state, &team, &auth).await?;

    let request = load_pending_request(&state, &team, request_id).await?;

    let resolved = state
        .db
        .teams()
        .resolve_join_request(request.id, JoinRequestStatus::Rejected)
        .await
        .db_err("Failed to resolve join request")?;
    if !resolved {
        return Err(ApiError::conflict("Join request already resolved"));
    }

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "status": JoinRequestStatus::Rejected })),
    ))
}
