use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct TeamStore {
    pool: SqlitePool,
}

/// A self-organized group with leader-gated membership.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(skip)]
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: i64,
    uuid: String,
    name: String,
    description: Option<String>,
    created_at: String,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

/// Per-team membership role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Member,
    Leader,
}

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Member => "member",
            TeamRole::Leader => "leader",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "leader" => TeamRole::Leader,
            _ => TeamRole::Member,
        }
    }
}

/// A team member with their public identifiers and team role.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub uuid: String,
    pub username: String,
    pub email: String,
    pub role: TeamRole,
}

#[derive(sqlx::FromRow)]
struct TeamMemberRow {
    uuid: String,
    username: String,
    email: String,
    member_role: String,
}

impl From<TeamMemberRow> for TeamMember {
    fn from(row: TeamMemberRow) -> Self {
        Self {
            uuid: row.uuid,
            username: row.username,
            email: row.email,
            role: TeamRole::from_str(&row.member_role),
        }
    }
}

/// Lifecycle of a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl JoinRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinRequestStatus::Pending => "PENDING",
            JoinRequestStatus::Approved => "APPROVED",
            JoinRequestStatus::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "APPROVED" => JoinRequestStatus::Approved,
            "REJECTED" => JoinRequestStatus::Rejected,
            _ => JoinRequestStatus::Pending,
        }
    }
}

/// A join request as listed to team leaders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub id: i64,
    pub user_uuid: String,
    pub username: String,
    pub status: JoinRequestStatus,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct JoinRequestRow {
    id: i64,
    user_uuid: String,
    username: String,
    status: String,
    created_at: String,
}

impl From<JoinRequestRow> for JoinRequest {
    fn from(row: JoinRequestRow) -> Self {
        Self {
            id: row.id,
            user_uuid: row.user_uuid,
            username: row.username,
            status: JoinRequestStatus::from_str(&row.status),
            created_at: row.created_at,
        }
    }
}

/// Internal join-request record used when resolving a request.
#[derive(Debug, Clone)]
pub struct JoinRequestRecord {
    pub id: i64,
    pub team_id: i64,
    pub user_id: i64,
    pub status: JoinRequestStatus,
}

impl TeamStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Check whether a team name is taken.
    pub async fn name_exists(&self, name: &str) -> Result<bool, sqlx::Error> {
        let count: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM teams WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    /// Create a team with its creator as the first leader, in one transaction.
    pub async fn create(
        &self,
        uuid: &str,
        name: &str,
        description: Option<&str>,
        creator_id: i64,
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("INSERT INTO teams (uuid, name, description, created_by) VALUES (?, ?, ?, ?)")
                .bind(uuid)
                .bind(name)
                .bind(description)
                .bind(creator_id)
                .execute(&mut *tx)
                .await?;
        let team_id = result.last_insert_rowid();

        sqlx::query(
            "INSERT INTO team_members (team_id, user_id, member_role) VALUES (?, ?, 'leader')",
        )
        .bind(team_id)
        .bind(creator_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(team_id)
    }

    /// Get a team by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Team>, sqlx::Error> {
        let row: Option<TeamRow> = sqlx::query_as(
            "SELECT id, uuid, name, description, created_at FROM teams WHERE uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Team::from))
    }

    /// List all teams, newest first.
    pub async fn list(&self) -> Result<Vec<Team>, sqlx::Error> {
        let rows: Vec<TeamRow> = sqlx::query_as(
            "SELECT id, uuid, name, description, created_at FROM teams ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Team::from).collect())
    }

    /// Delete a team, its memberships, and its join requests.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Add a member. Returns false if they already belong to the team.
    pub async fn add_member(
        &self,
        team_id: i64,
        user_id: i64,
        role: TeamRole,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO team_members (team_id, user_id, member_role) VALUES (?, ?, ?)",
        )
        .bind(team_id)
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a member.
    pub async fn remove_member(&self, team_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM team_members WHERE team_id = ? AND user_id = ?")
            .bind(team_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Get a user's role within a team, if they are a member.
    pub async fn member_role(
        &self,
        team_id: i64,
        user_id: i64,
    ) -> Result<Option<TeamRole>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT member_role FROM team_members WHERE team_id = ? AND user_id = ?",
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(role,)| TeamRole::from_str(&role)))
    }

    /// List team members, leaders first.
    pub async fn list_members(&self, team_id: i64) -> Result<Vec<TeamMember>, sqlx::Error> {
        let rows: Vec<TeamMemberRow> = sqlx::query_as(
            "SELECT u.uuid, u.username, u.email, tm.member_role \
             FROM users u JOIN team_members tm ON tm.user_id = u.id \
             WHERE tm.team_id = ? ORDER BY tm.member_role DESC, u.username",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TeamMember::from).collect())
    }

    /// Check whether a user already has a pending request for a team.
    pub async fn has_pending_request(
        &self,
        team_id: i64,
        user_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let count: (i32,) = sqlx::query_as(
            "SELECT COUNT(*) FROM team_join_requests \
             WHERE team_id = ? AND user_id = ? AND status = 'PENDING'",
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0 > 0)
    }

    /// File a join request. Returns the request ID.
    pub async fn create_join_request(
        &self,
        team_id: i64,
        user_id: i64,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO team_join_requests (team_id, user_id) VALUES (?, ?)")
                .bind(team_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a join request by ID for resolution.
    pub async fn get_join_request(
        &self,
        id: i64,
    ) -> Result<Option<JoinRequestRecord>, sqlx::Error> {
        let row: Option<(i64, i64, i64, String)> = sqlx::query_as(
            "SELECT id, team_id, user_id, status FROM team_join_requests WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, team_id, user_id, status)| JoinRequestRecord {
            id,
            team_id,
            user_id,
            status: JoinRequestStatus::from_str(&status),
        }))
    }

    /// Resolve a join request. Only pending requests transition, so two
    /// leaders cannot both resolve the same one.
    pub async fn resolve_join_request(
        &self,
        id: i64,
        status: JoinRequestStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE team_join_requests SET status = ? WHERE id = ? AND status = 'PENDING'",
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List a team's join requests, newest first.
    pub async fn list_join_requests(&self, team_id: i64) -> Result<Vec<JoinRequest>, sqlx::Error> {
        let rows: Vec<JoinRequestRow> = sqlx::query_as(
            "SELECT r.id, u.uuid AS user_uuid, u.username, r.status, r.created_at \
             FROM team_join_requests r JOIN users u ON u.id = r.user_id \
             WHERE r.team_id = ? ORDER BY r.created_at DESC",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(JoinRequest::from).collect())
    }
}
