//! User records and the user-store collaborator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Enabled,
    Disabled,
    Deleted,
}

impl UserStatus {
    /// Numeric code used in storage.
    pub fn code(self) -> i64 {
        match self {
            UserStatus::Enabled => 1,
            UserStatus::Disabled => 2,
            UserStatus::Deleted => 3,
        }
    }

    /// Parse a storage code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(UserStatus::Enabled),
            2 => Some(UserStatus::Disabled),
            3 => Some(UserStatus::Deleted),
            _ => None,
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Guest,
    Common,
    Admin,
    Root,
}

impl UserRole {
    /// Numeric code used in storage.
    pub fn code(self) -> i64 {
        match self {
            UserRole::Guest => 0,
            UserRole::Common => 1,
            UserRole::Admin => 10,
            UserRole::Root => 100,
        }
    }

    /// Parse a storage code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(UserRole::Guest),
            1 => Some(UserRole::Common),
            10 => Some(UserRole::Admin),
            100 => Some(UserRole::Root),
            _ => None,
        }
    }
}

/// A local user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub github_id: String,
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub status: UserStatus,
    pub role: UserRole,
}

impl UserRecord {
    /// Whether the account may receive tokens.
    pub fn is_enabled(&self) -> bool {
        self.status == UserStatus::Enabled
    }
}

/// Fields for a user created on first sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub github_id: String,
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
}

/// User store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique field (username, GitHub id) is already taken.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend failure.
    #[error("Storage error: {0}")]
    Backend(String),
}

/// User-store collaborator.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find the user linked to a GitHub login.
    async fn find_by_github_id(&self, github_id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Create an enabled, common-role user.
    async fn create(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    /// Load a user by id.
    async fn get(&self, id: i64) -> Result<Option<UserRecord>, StoreError>;
}

// ============================================================================
// MemoryUserStore
// ============================================================================

/// In-process user store.
#[derive(Debug)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<i64, UserRecord>>,
    next_id: AtomicI64,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Insert a fully-formed record, replacing any record with the same id.
    pub async fn insert(&self, record: UserRecord) {
        self.next_id.fetch_max(record.id + 1, Ordering::SeqCst);
        self.users.write().await.insert(record.id, record);
    }

    /// Change a user's status. Returns false if the user does not exist.
    pub async fn set_status(&self, id: i64, status: UserStatus) -> bool {
        match self.users.write().await.get_mut(&id) {
            Some(user) => {
                user.status = status;
                true
            }
            None => false,
        }
    }

    /// Remove a user.
    pub async fn remove(&self, id: i64) -> Option<UserRecord> {
        self.users.write().await.remove(&id)
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_github_id(&self, github_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.github_id == github_id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!(
                "username '{}' already exists",
                user.username
            )));
        }
        if users.values().any(|u| u.github_id == user.github_id) {
            return Err(StoreError::Conflict(format!(
                "GitHub account '{}' already linked",
                user.github_id
            )));
        }

        let record = UserRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            github_id: user.github_id,
            username: user.username,
            display_name: user.display_name,
            email: user.email,
            status: UserStatus::Enabled,
            role: UserRole::Common,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: i64) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}
