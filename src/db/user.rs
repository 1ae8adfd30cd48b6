use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "USER",
            UserRole::Admin => "ADMIN",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "ADMIN" => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

/// How the account was created. Only password-based identities may log in
/// with credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginType {
    EmailPassword,
    Google,
    Github,
}

impl LoginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginType::EmailPassword => "EMAIL_PASSWORD",
            LoginType::Google => "GOOGLE",
            LoginType::Github => "GITHUB",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "GOOGLE" => LoginType::Google,
            "GITHUB" => LoginType::Github,
            _ => LoginType::EmailPassword,
        }
    }
}

/// Full identity row, including credential material. Internal only; request
/// handlers respond with [`Identity`] instead.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: UserRole,
    pub login_type: LoginType,
    pub is_email_verified: bool,
    pub verification_token: Option<String>,
    pub verification_expiry: Option<i64>,
    pub reset_token: Option<String>,
    pub reset_expiry: Option<i64>,
    pub refresh_token: Option<String>,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    uuid: String,
    email: String,
    username: String,
    password_hash: String,
    role: String,
    login_type: String,
    email_verified: i32,
    verification_token: Option<String>,
    verification_expiry: Option<i64>,
    reset_token: Option<String>,
    reset_expiry: Option<i64>,
    refresh_token: Option<String>,
    created_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            email: row.email,
            username: row.username,
            password_hash: row.password_hash,
            role: UserRole::from_str(&row.role),
            login_type: LoginType::from_str(&row.login_type),
            is_email_verified: row.email_verified != 0,
            verification_token: row.verification_token,
            verification_expiry: row.verification_expiry,
            reset_token: row.reset_token,
            reset_expiry: row.reset_expiry,
            refresh_token: row.refresh_token,
            created_at: row.created_at,
        }
    }
}

/// Identity projection safe to hand to request handlers and responses.
/// Excludes the password digest, token hashes, and the refresh token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(skip)]
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub username: String,
    pub role: UserRole,
    pub login_type: LoginType,
    pub is_email_verified: bool,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
pub(crate) struct IdentityRow {
    id: i64,
    uuid: String,
    email: String,
    username: String,
    role: String,
    login_type: String,
    email_verified: i32,
    created_at: String,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            email: row.email,
            username: row.username,
            role: UserRole::from_str(&row.role),
            login_type: LoginType::from_str(&row.login_type),
            is_email_verified: row.email_verified != 0,
            created_at: row.created_at,
        }
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            uuid: user.uuid.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role,
            login_type: user.login_type,
            is_email_verified: user.is_email_verified,
            created_at: user.created_at.clone(),
        }
    }
}

/// Fields for a new password-based identity. The verification token hash and
/// expiry are written in the same insert as the identity itself.
pub struct NewUser<'a> {
    pub uuid: &'a str,
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub verification_token: &'a str,
    pub verification_expiry: i64,
}

const USER_COLUMNS: &str = "id, uuid, email, username, password_hash, role, login_type, \
     email_verified, verification_token, verification_expiry, reset_token, reset_expiry, \
     refresh_token, created_at";

const IDENTITY_COLUMNS: &str =
    "id, uuid, email, username, role, login_type, email_verified, created_at";

/// Identity projection columns qualified with the `u` alias, for joins from
/// membership tables.
pub(crate) const IDENTITY_COLUMNS_PREFIXED: &str = "u.id, u.uuid, u.email, u.username, u.role, \
     u.login_type, u.email_verified, u.created_at";

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new password-based identity. Returns the user ID.
    pub async fn create(&self, user: &NewUser<'_>) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (uuid, email, username, password_hash, verification_token, verification_expiry) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.uuid)
        .bind(user.email)
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.verification_token)
        .bind(user.verification_expiry)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Create an admin identity, already verified. Returns the user ID.
    pub async fn create_admin(
        &self,
        uuid: &str,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (uuid, email, username, password_hash, role, email_verified) \
             VALUES (?, ?, ?, ?, 'ADMIN', 1)",
        )
        .bind(uuid)
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get the full row by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Get the full row by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE uuid = ?", USER_COLUMNS))
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Get the full row by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Load the identity projection by UUID (no credential material).
    pub async fn identity_by_uuid(&self, uuid: &str) -> Result<Option<Identity>, sqlx::Error> {
        let row: Option<IdentityRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE uuid = ?",
            IDENTITY_COLUMNS
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Identity::from))
    }

    /// Load the identity projection by ID.
    pub async fn identity_by_id(&self, id: i64) -> Result<Option<Identity>, sqlx::Error> {
        let row: Option<IdentityRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?", IDENTITY_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Identity::from))
    }

    /// Overwrite the persisted refresh token; `None` clears it (logout).
    pub async fn set_refresh_token(
        &self,
        id: i64,
        token: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ?")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Atomically rotate the refresh token: the update only applies while the
    /// stored value still equals `current`, so concurrent rotations cannot
    /// both win. Returns false when the compare-and-swap loses.
    pub async fn rotate_refresh_token(
        &self,
        id: i64,
        current: &str,
        next: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ? AND refresh_token = ?")
                .bind(next)
                .bind(id)
                .bind(current)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find an identity holding an unexpired verification token hash.
    pub async fn find_by_verification_token(
        &self,
        hashed: &str,
        now: i64,
    ) -> Result<Option<Identity>, sqlx::Error> {
        let row: Option<IdentityRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE verification_token = ? AND verification_expiry > ?",
            IDENTITY_COLUMNS
        ))
        .bind(hashed)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Identity::from))
    }

    /// Consume the verification token and mark the email verified.
    pub async fn mark_email_verified(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET email_verified = 1, verification_token = NULL, \
             verification_expiry = NULL WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store a fresh password-reset token hash, replacing any previous one.
    pub async fn set_reset_token(
        &self,
        id: i64,
        hashed: &str,
        expires_at: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET reset_token = ?, reset_expiry = ? WHERE id = ?")
            .bind(hashed)
            .bind(expires_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Find an identity holding an unexpired reset token hash.
    pub async fn find_by_reset_token(
        &self,
        hashed: &str,
        now: i64,
    ) -> Result<Option<Identity>, sqlx::Error> {
        let row: Option<IdentityRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE reset_token = ? AND reset_expiry > ?",
            IDENTITY_COLUMNS
        ))
        .bind(hashed)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Identity::from))
    }

    /// Consume the reset token and store the new password digest.
    pub async fn reset_password(
        &self,
        id: i64,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, reset_token = NULL, reset_expiry = NULL \
             WHERE id = ?",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store a new password digest (authenticated password change).
    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Sweep expired verification and reset token hashes. Keeps the
    /// at-most-one-unexpired-token invariant tidy without touching live ones.
    pub async fn clear_expired_temp_tokens(&self, now: i64) -> Result<u64, sqlx::Error> {
        let verification = sqlx::query(
            "UPDATE users SET verification_token = NULL, verification_expiry = NULL \
             WHERE verification_token IS NOT NULL AND verification_expiry <= ?",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        let reset = sqlx::query(
            "UPDATE users SET reset_token = NULL, reset_expiry = NULL \
             WHERE reset_token IS NOT NULL AND reset_expiry <= ?",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(verification.rows_affected() + reset.rows_affected())
    }
}
