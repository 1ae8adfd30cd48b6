//! Tests for team endpoints: creation, leader gating, membership, and the
//! join-request flow.

mod common;

use axum::http::StatusCode;
use common::*;

const PASSWORD: &str = "Password@123";

/// Create a team and return its uuid.
async fn create_team(t: &TestApp, access: &str, name: &str) -> String {
    let response = request(
        &t.app,
        "POST",
        "/api/v1/teams",
        Some(&access_cookie(access)),
        Some(serde_json::json!({ "name": name, "description": "a team" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["uuid"].as_str().unwrap().to_string()
}

/// File a join request and return its id.
async fn request_join(t: &TestApp, access: &str, team_uuid: &str) -> i64 {
    let response = request(
        &t.app,
        "POST",
        &format!("/api/v1/teams/{}/join", team_uuid),
        Some(&access_cookie(access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["requestId"].as_i64().unwrap()
}

#[tokio::test]
async fn test_create_team_creator_becomes_leader() {
    let t = spawn_app().await;
    let (alice_uuid, access, _) = register_and_login(&t.app, "alice@example.com", PASSWORD).await;

    let team_uuid = create_team(&t, &access, "rustaceans").await;

    let response = request(
        &t.app,
        "GET",
        &format!("/api/v1/teams/{}", team_uuid),
        Some(&access_cookie(&access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["team"]["name"], "rustaceans");
    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["uuid"], alice_uuid);
    assert_eq!(members[0]["role"], "leader");
}

#[tokio::test]
async fn test_duplicate_team_name_conflicts() {
    let t = spawn_app().await;
    let (_, access, _) = register_and_login(&t.app, "alice@example.com", PASSWORD).await;

    create_team(&t, &access, "rustaceans").await;

    let response = request(
        &t.app,
        "POST",
        "/api/v1/teams",
        Some(&access_cookie(&access)),
        Some(serde_json::json!({ "name": "rustaceans" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_team_requires_authentication() {
    let t = spawn_app().await;

    let response = request(
        &t.app,
        "POST",
        "/api/v1/teams",
        None,
        Some(serde_json::json!({ "name": "rustaceans" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_join_request_approval_adds_member() {
    let t = spawn_app().await;
    let (_, leader_access, _) = register_and_login(&t.app, "lead@example.com", PASSWORD).await;
    let (bob_uuid, bob_access, _) = register_and_login(&t.app, "bob@example.com", PASSWORD).await;

    let team_uuid = create_team(&t, &leader_access, "rustaceans").await;
    let request_id = request_join(&t, &bob_access, &team_uuid).await;

    // Leader sees the pending request
    let response = request(
        &t.app,
        "GET",
        &format!("/api/v1/teams/{}/requests", team_uuid),
        Some(&access_cookie(&leader_access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let requests = body["requests"].as_array().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["userUuid"], bob_uuid);
    assert_eq!(requests[0]["status"], "PENDING");

    // Approve it
    let response = request(
        &t.app,
        "POST",
        &format!("/api/v1/teams/{}/requests/{}/approve", team_uuid, request_id),
        Some(&access_cookie(&leader_access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Bob is now a member
    let response = request(
        &t.app,
        "GET",
        &format!("/api/v1/teams/{}", team_uuid),
        Some(&access_cookie(&bob_access)),
        None,
    )
    .await;
    let body = body_json(response).await;
    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.iter().any(|m| m["uuid"] == bob_uuid && m["role"] == "member"));

    // Requests resolve exactly once
    let response = request(
        &t.app,
        "POST",
        &format!("/api/v1/teams/{}/requests/{}/approve", team_uuid, request_id),
        Some(&access_cookie(&leader_access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_join_request_rejection() {
    let t = spawn_app().await;
    let (_, leader_access, _) = register_and_login(&t.app, "lead@example.com", PASSWORD).await;
    let (bob_uuid, bob_access, _) = register_and_login(&t.app, "bob@example.com", PASSWORD).await;

    let team_uuid = create_team(&t, &leader_access, "rustaceans").await;
    let request_id = request_join(&t, &bob_access, &team_uuid).await;

    let response = request(
        &t.app,
        "POST",
        &format!("/api/v1/teams/{}/requests/{}/reject", team_uuid, request_id),
        Some(&access_cookie(&leader_access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "REJECTED");

    // Bob is not a member
    let response = request(
        &t.app,
        "GET",
        &format!("/api/v1/teams/{}", team_uuid),
        Some(&access_cookie(&bob_access)),
        None,
    )
    .await;
    let body = body_json(response).await;
    assert!(!body["members"].as_array().unwrap().iter().any(|m| m["uuid"] == bob_uuid));

    // A rejected request does not block filing a new one
    request_join(&t, &bob_access, &team_uuid).await;
}

#[tokio::test]
async fn test_duplicate_pending_join_request_conflicts() {
    let t = spawn_app().await;
    let (_, leader_access, _) = register_and_login(&t.app, "lead@example.com", PASSWORD).await;
    let (_, bob_access, _) = register_and_login(&t.app, "bob@example.com", PASSWORD).await;

    let team_uuid = create_team(&t, &leader_access, "rustaceans").await;
    request_join(&t, &bob_access, &team_uuid).await;

    let response = request(
        &t.app,
        "POST",
        &format!("/api/v1/teams/{}/join", team_uuid),
        Some(&access_cookie(&bob_access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_member_cannot_file_join_request() {
    let t = spawn_app().await;
    let (_, leader_access, _) = register_and_login(&t.app, "lead@example.com", PASSWORD).await;

    let team_uuid = create_team(&t, &leader_access, "rustaceans").await;

    let response = request(
        &t.app,
        "POST",
        &format!("/api/v1/teams/{}/join", team_uuid),
        Some(&access_cookie(&leader_access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_non_leader_cannot_resolve_requests() {
    let t = spawn_app().await;
    let (_, leader_access, _) = register_and_login(&t.app, "lead@example.com", PASSWORD).await;
    let (_, bob_access, _) = register_and_login(&t.app, "bob@example.com", PASSWORD).await;
    let (_, carol_access, _) = register_and_login(&t.app, "carol@example.com", PASSWORD).await;

    let team_uuid = create_team(&t, &leader_access, "rustaceans").await;
    let request_id = request_join(&t, &bob_access, &team_uuid).await;

    let response = request(
        &t.app,
        "POST",
        &format!("/api/v1/teams/{}/requests/{}/approve", team_uuid, request_id),
        Some(&access_cookie(&carol_access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_leader_manages_members_directly() {
    let t = spawn_app().await;
    let (_, leader_access, _) = register_and_login(&t.app, "lead@example.com", PASSWORD).await;
    let (bob_uuid, _, _) = register_and_login(&t.app, "bob@example.com", PASSWORD).await;

    let team_uuid = create_team(&t, &leader_access, "rustaceans").await;

    let response = request(
        &t.app,
        "POST",
        &format!("/api/v1/teams/{}/members/{}", team_uuid, bob_uuid),
        Some(&access_cookie(&leader_access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["added"], true);

    let response = request(
        &t.app,
        "DELETE",
        &format!("/api/v1/teams/{}/members/{}", team_uuid, bob_uuid),
        Some(&access_cookie(&leader_access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["removed"], true);
}

#[tokio::test]
async fn test_member_can_leave_but_not_remove_others() {
    let t = spawn_app().await;
    let (_, leader_access, _) = register_and_login(&t.app, "lead@example.com", PASSWORD).await;
    let (bob_uuid, bob_access, _) = register_and_login(&t.app, "bob@example.com", PASSWORD).await;
    let (carol_uuid, _, _) = register_and_login(&t.app, "carol@example.com", PASSWORD).await;

    let team_uuid = create_team(&t, &leader_access, "rustaceans").await;

    for member in [&bob_uuid, &carol_uuid] {
        request(
            &t.app,
            "POST",
            &format!("/api/v1/teams/{}/members/{}", team_uuid, member),
            Some(&access_cookie(&leader_access)),
            None,
        )
        .await;
    }

    // Bob cannot remove Carol
    let response = request(
        &t.app,
        "DELETE",
        &format!("/api/v1/teams/{}/members/{}", team_uuid, carol_uuid),
        Some(&access_cookie(&bob_access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Bob can leave
    let response = request(
        &t.app,
        "DELETE",
        &format!("/api/v1/teams/{}/members/{}", team_uuid, bob_uuid),
        Some(&access_cookie(&bob_access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_delete_team_leader_only() {
    let t = spawn_app().await;
    let (_, leader_access, _) = register_and_login(&t.app, "lead@example.com", PASSWORD).await;
    let (_, bob_access, _) = register_and_login(&t.app, "bob@example.com", PASSWORD).await;

    let team_uuid = create_team(&t, &leader_access, "rustaceans").await;

    let response = request(
        &t.app,
        "DELETE",
        &format!("/api/v1/teams/{}", team_uuid),
        Some(&access_cookie(&bob_access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = request(
        &t.app,
        "DELETE",
        &format!("/api/v1/teams/{}", team_uuid),
        Some(&access_cookie(&leader_access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = request(
        &t.app,
        "GET",
        &format!("/api/v1/teams/{}", team_uuid),
        Some(&access_cookie(&leader_access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_can_delete_any_team() {
    let t = spawn_app().await;
    let (_, leader_access, _) = register_and_login(&t.app, "lead@example.com", PASSWORD).await;
    let (_, admin_access) = create_admin(&t, "admin@example.com").await;

    let team_uuid = create_team(&t, &leader_access, "rustaceans").await;

    let response = request(
        &t.app,
        "DELETE",
        &format!("/api/v1/teams/{}", team_uuid),
        Some(&access_cookie(&admin_access)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
