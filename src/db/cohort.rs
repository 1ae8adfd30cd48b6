use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

use super::user::{IDENTITY_COLUMNS_PREFIXED, Identity, IdentityRow};

#[derive(Clone)]
pub struct CohortStore {
    pool: SqlitePool,
}

/// A program intake grouping identities.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cohort {
    #[serde(skip)]
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct CohortRow {
    id: i64,
    uuid: String,
    name: String,
    description: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    active: i32,
    created_at: String,
}

impl From<CohortRow> for Cohort {
    fn from(row: CohortRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            name: row.name,
            description: row.description,
            start_date: row.start_date,
            end_date: row.end_date,
            is_active: row.active != 0,
            created_at: row.created_at,
        }
    }
}

/// Writable cohort fields, shared by create and update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortData {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

const COHORT_COLUMNS: &str =
    "id, uuid, name, description, start_date, end_date, active, created_at";

impl CohortStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Check whether a cohort name is taken.
    pub async fn name_exists(&self, name: &str) -> Result<bool, sqlx::Error> {
        let count: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM cohorts WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    /// Create a cohort. Returns the cohort ID.
    pub async fn create(&self, uuid: &str, data: &CohortData) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO cohorts (uuid, name, description, start_date, end_date, active) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.start_date)
        .bind(&data.end_date)
        .bind(data.is_active.unwrap_or(true) as i32)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a cohort by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Cohort>, sqlx::Error> {
        let row: Option<CohortRow> =
            sqlx::query_as(&format!("SELECT {} FROM cohorts WHERE uuid = ?", COHORT_COLUMNS))
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Cohort::from))
    }

    /// List all cohorts, newest first.
    pub async fn list(&self) -> Result<Vec<Cohort>, sqlx::Error> {
        let rows: Vec<CohortRow> = sqlx::query_as(&format!(
            "SELECT {} FROM cohorts ORDER BY created_at DESC",
            COHORT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Cohort::from).collect())
    }

    /// Replace a cohort's writable fields. Returns false if it does not exist.
    pub async fn update(&self, id: i64, data: &CohortData) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE cohorts SET name = ?, description = ?, start_date = ?, end_date = ?, \
             active = ? WHERE id = ?",
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.start_date)
        .bind(&data.end_date)
        .bind(data.is_active.unwrap_or(true) as i32)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a cohort and its memberships.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cohorts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Add a user to a cohort. Returns false if they were already a member.
    pub async fn add_member(&self, cohort_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO cohort_members (cohort_id, user_id) VALUES (?, ?)",
        )
        .bind(cohort_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a user from a cohort.
    pub async fn remove_member(&self, cohort_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cohort_members WHERE cohort_id = ? AND user_id = ?")
            .bind(cohort_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List cohort members as identity projections.
    pub async fn list_members(&self, cohort_id: i64) -> Result<Vec<Identity>, sqlx::Error> {
        let rows: Vec<IdentityRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users u JOIN cohort_members cm ON cm.user_id = u.id \
             WHERE cm.cohort_id = ? ORDER BY u.username",
            IDENTITY_COLUMNS_PREFIXED
        ))
        .bind(cohort_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Identity::from).collect())
    }
}
