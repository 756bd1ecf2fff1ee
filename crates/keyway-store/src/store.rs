use std::path::Path;

use async_trait::async_trait;
use keyway_auth::{NewUser, UserRecord, UserRole, UserStatus, UserStore};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::{Error, Result};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

const USER_COLUMNS: &str = "id, github_id, username, display_name, email, status, role";

/// Thin repository over SQLite for user accounts.
///
/// Thread-safe via internal `Mutex<Connection>`.
pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    /// Open (or create) the database at `path` and run pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;

        let mut store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        info!(path = %path.display(), "Opened user database");
        Ok(store)
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&mut self) -> Result<()> {
        let report = embedded::migrations::runner()
            .run(self.conn.get_mut())
            .map_err(|e| Error::Migration(e.to_string()))?;
        for migration in report.applied_migrations() {
            debug!(migration = %migration, "Applied user store migration");
        }
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    // ── Users ───────────────────────────────────────────────────────

    pub fn find_by_github_id(&self, github_id: &str) -> Result<Option<UserRecord>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE github_id = ?1"),
                params![github_id],
                RawUser::from_row,
            )
            .optional()?;
        row.map(RawUser::into_record).transpose()
    }

    pub fn get(&self, id: i64) -> Result<Option<UserRecord>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                RawUser::from_row,
            )
            .optional()?;
        row.map(RawUser::into_record).transpose()
    }

    /// Insert an enabled, common-role user.
    pub fn create(&self, user: &NewUser) -> Result<UserRecord> {
        let status = UserStatus::Enabled;
        let role = UserRole::Common;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (github_id, username, display_name, email, status, role)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.github_id,
                user.username,
                user.display_name,
                user.email,
                status.code(),
                role.code()
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(user_id = id, github_id = %user.github_id, "Created user");

        Ok(UserRecord {
            id,
            github_id: user.github_id.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            status,
            role,
        })
    }

    /// Change a user's status. Returns `false` if the user does not exist.
    pub fn set_status(&self, id: i64, status: UserStatus) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE users SET status = ?1 WHERE id = ?2",
            params![status.code(), id],
        )?;
        Ok(changed > 0)
    }

    /// Change a user's role. Returns `false` if the user does not exist.
    pub fn set_role(&self, id: i64, role: UserRole) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE users SET role = ?1 WHERE id = ?2",
            params![role.code(), id],
        )?;
        Ok(changed > 0)
    }

    /// Delete a user row. Returns `false` if the user does not exist.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_by_github_id(
        &self,
        github_id: &str,
    ) -> std::result::Result<Option<UserRecord>, keyway_auth::StoreError> {
        Ok(SqliteUserStore::find_by_github_id(self, github_id)?)
    }

    async fn create(
        &self,
        user: NewUser,
    ) -> std::result::Result<UserRecord, keyway_auth::StoreError> {
        Ok(SqliteUserStore::create(self, &user)?)
    }

    async fn get(
        &self,
        id: i64,
    ) -> std::result::Result<Option<UserRecord>, keyway_auth::StoreError> {
        Ok(SqliteUserStore::get(self, id)?)
    }
}

/// Row as stored, before status and role codes are checked.
struct RawUser {
    id: i64,
    github_id: String,
    username: String,
    display_name: String,
    email: Option<String>,
    status: i64,
    role: i64,
}

impl RawUser {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            github_id: row.get(1)?,
            username: row.get(2)?,
            display_name: row.get(3)?,
            email: row.get(4)?,
            status: row.get(5)?,
            role: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<UserRecord> {
        let status = UserStatus::from_code(self.status).ok_or(Error::Corrupt {
            id: self.id,
            field: "status",
            code: self.status,
        })?;
        let role = UserRole::from_code(self.role).ok_or(Error::Corrupt {
            id: self.id,
            field: "role",
            code: self.role,
        })?;
        Ok(UserRecord {
            id: self.id,
            github_id: self.github_id,
            username: self.username,
            display_name: self.display_name,
            email: self.email,
            status,
            role,
        })
    }
}
