mod cohort;
mod profile;
mod team;
mod user;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use cohort::{Cohort, CohortData, CohortStore};
pub use profile::{Availability, Profile, ProfileData, ProfileStore};
pub use team::{
    JoinRequest, JoinRequestRecord, JoinRequestStatus, Team, TeamMember, TeamRole, TeamStore,
};
pub use user::{Identity, LoginType, NewUser, User, UserRole, UserStore};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                // Identities. Verification/reset tokens are stored as hashes
                // with Unix-second expiries; refresh_token holds the single
                // active refresh token, overwritten on each rotation.
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    email TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    username TEXT NOT NULL,
                    password_hash TEXT NOT NULL,
                    role TEXT NOT NULL DEFAULT 'USER',
                    login_type TEXT NOT NULL DEFAULT 'EMAIL_PASSWORD',
                    email_verified INTEGER NOT NULL DEFAULT 0,
                    verification_token TEXT,
                    verification_expiry INTEGER,
                    reset_token TEXT,
                    reset_expiry INTEGER,
                    refresh_token TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_users_uuid ON users(uuid)",
                "CREATE INDEX idx_users_email ON users(email)",
                "CREATE INDEX idx_users_verification_token ON users(verification_token)",
                "CREATE INDEX idx_users_reset_token ON users(reset_token)",
                // Member profiles, one per identity
                "CREATE TABLE profiles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER UNIQUE NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    full_name TEXT,
                    display_name TEXT,
                    pronouns TEXT,
                    title TEXT,
                    bio TEXT,
                    skills TEXT NOT NULL DEFAULT '[]',
                    preferred_roles TEXT NOT NULL DEFAULT '[]',
                    preferred_team_size INTEGER NOT NULL DEFAULT 4,
                    willing_to_lead INTEGER NOT NULL DEFAULT 0,
                    availability TEXT NOT NULL DEFAULT 'available',
                    avatar_url TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                // Cohorts and membership
                "CREATE TABLE cohorts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    name TEXT UNIQUE NOT NULL,
                    description TEXT,
                    start_date TEXT,
                    end_date TEXT,
                    active INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE TABLE cohort_members (
                    cohort_id INTEGER NOT NULL REFERENCES cohorts(id) ON DELETE CASCADE,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    PRIMARY KEY (cohort_id, user_id)
                )",
                // Teams, membership roles, and join requests
                "CREATE TABLE teams (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    name TEXT UNIQUE NOT NULL,
                    description TEXT,
                    created_by INTEGER NOT NULL REFERENCES users(id),
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE TABLE team_members (
                    team_id INTEGER NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    member_role TEXT NOT NULL DEFAULT 'member',
                    PRIMARY KEY (team_id, user_id)
                )",
                "CREATE TABLE team_join_requests (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    team_id INTEGER NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    status TEXT NOT NULL DEFAULT 'PENDING',
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_join_requests_team ON team_join_requests(team_id)",
            ],
        )
        .await
    }

    /// Get the user store.
    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    /// Get the profile store.
    pub fn profiles(&self) -> ProfileStore {
        ProfileStore::new(self.pool.clone())
    }

    /// Get the cohort store.
    pub fn cohorts(&self) -> CohortStore {
        CohortStore::new(self.pool.clone())
    }

    /// Get the team store.
    pub fn teams(&self) -> TeamStore {
        TeamStore::new(self.pool.clone())
    }

    /// Get the underlying connection pool (for tests that need raw SQL access).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool. Called after the listener has stopped accepting.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
