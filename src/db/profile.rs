use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct ProfileStore {
    pool: SqlitePool,
}

/// Availability status for team matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Busy,
    Maybe,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Busy => "busy",
            Availability::Maybe => "maybe",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "busy" => Availability::Busy,
            "maybe" => Availability::Maybe,
            _ => Availability::Available,
        }
    }
}

impl Default for Availability {
    fn default() -> Self {
        Availability::Available
    }
}

/// A member profile joined with its owner's public identifiers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub user_uuid: String,
    pub username: String,
    pub full_name: Option<String>,
    pub display_name: Option<String>,
    pub pronouns: Option<String>,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub preferred_roles: Vec<String>,
    pub preferred_team_size: i64,
    pub willing_to_lead: bool,
    pub availability: Availability,
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: i64,
    user_id: i64,
    user_uuid: String,
    username: String,
    full_name: Option<String>,
    display_name: Option<String>,
    pronouns: Option<String>,
    title: Option<String>,
    bio: Option<String>,
    skills: String,
    preferred_roles: String,
    preferred_team_size: i64,
    willing_to_lead: i32,
    availability: String,
    avatar_url: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            user_uuid: row.user_uuid,
            username: row.username,
            full_name: row.full_name,
            display_name: row.display_name,
            pronouns: row.pronouns,
            title: row.title,
            bio: row.bio,
            skills: serde_json::from_str(&row.skills).unwrap_or_default(),
            preferred_roles: serde_json::from_str(&row.preferred_roles).unwrap_or_default(),
            preferred_team_size: row.preferred_team_size,
            willing_to_lead: row.willing_to_lead != 0,
            availability: Availability::from_str(&row.availability),
            avatar_url: row.avatar_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Writable profile fields, shared by create and update.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileData {
    pub full_name: Option<String>,
    pub display_name: Option<String>,
    pub pronouns: Option<String>,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub preferred_roles: Vec<String>,
    pub preferred_team_size: Option<i64>,
    pub willing_to_lead: Option<bool>,
    pub availability: Option<Availability>,
    pub avatar_url: Option<String>,
}

const PROFILE_COLUMNS: &str = "p.id, p.user_id, u.uuid AS user_uuid, u.username, p.full_name, \
     p.display_name, p.pronouns, p.title, p.bio, p.skills, p.preferred_roles, \
     p.preferred_team_size, p.willing_to_lead, p.availability, p.avatar_url, p.created_at, \
     p.updated_at";

impl ProfileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a profile for a user. Fails on the unique user constraint if
    /// one already exists.
    pub async fn create(&self, user_id: i64, data: &ProfileData) -> Result<i64, sqlx::Error> {
        let skills = serde_json::to_string(&data.skills).unwrap_or_else(|_| "[]".to_string());
        let roles =
            serde_json::to_string(&data.preferred_roles).unwrap_or_else(|_| "[]".to_string());

        let result = sqlx::query(
            "INSERT INTO profiles (user_id, full_name, display_name, pronouns, title, bio, \
             skills, preferred_roles, preferred_team_size, willing_to_lead, availability, \
             avatar_url) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&data.full_name)
        .bind(&data.display_name)
        .bind(&data.pronouns)
        .bind(&data.title)
        .bind(&data.bio)
        .bind(&skills)
        .bind(&roles)
        .bind(data.preferred_team_size.unwrap_or(4))
        .bind(data.willing_to_lead.unwrap_or(false) as i32)
        .bind(data.availability.unwrap_or_default().as_str())
        .bind(&data.avatar_url)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a profile by its owner's user ID.
    pub async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Profile>, sqlx::Error> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM profiles p JOIN users u ON u.id = p.user_id WHERE p.user_id = ?",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Profile::from))
    }

    /// Get a profile by its owner's public UUID.
    pub async fn get_by_user_uuid(&self, uuid: &str) -> Result<Option<Profile>, sqlx::Error> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM profiles p JOIN users u ON u.id = p.user_id WHERE u.uuid = ?",
            PROFILE_COLUMNS
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Profile::from))
    }

    /// List all profiles, newest first.
    pub async fn list(&self) -> Result<Vec<Profile>, sqlx::Error> {
        let rows: Vec<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM profiles p JOIN users u ON u.id = p.user_id \
             ORDER BY p.created_at DESC",
            PROFILE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Profile::from).collect())
    }

    /// Replace a profile's writable fields. Returns false if no profile
    /// exists for the user.
    pub async fn update(&self, user_id: i64, data: &ProfileData) -> Result<bool, sqlx::Error> {
        let skills = serde_json::to_string(&data.skills).unwrap_or_else(|_| "[]".to_string());
        let roles =
            serde_json::to_string(&data.preferred_roles).unwrap_or_else(|_| "[]".to_string());

        let result = sqlx::query(
            "UPDATE profiles SET full_name = ?, display_name = ?, pronouns = ?, title = ?, \
             bio = ?, skills = ?, preferred_roles = ?, preferred_team_size = ?, \
             willing_to_lead = ?, availability = ?, avatar_url = ?, \
             updated_at = datetime('now') WHERE user_id = ?",
        )
        .bind(&data.full_name)
        .bind(&data.display_name)
        .bind(&data.pronouns)
        .bind(&data.title)
        .bind(&data.bio)
        .bind(&skills)
        .bind(&roles)
        .bind(data.preferred_team_size.unwrap_or(4))
        .bind(data.willing_to_lead.unwrap_or(false) as i32)
        .bind(data.availability.unwrap_or_default().as_str())
        .bind(&data.avatar_url)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user's profile.
    pub async fn delete(&self, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
