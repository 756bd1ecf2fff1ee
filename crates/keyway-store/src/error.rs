#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Unknown {field} code {code} for user {id}")]
    Corrupt {
        id: i64,
        field: &'static str,
        code: i64,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for keyway_auth::StoreError {
    fn from(err: Error) -> Self {
        match err {
            Error::Database(rusqlite::Error::SqliteFailure(e, msg))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                keyway_auth::StoreError::Conflict(
                    msg.unwrap_or_else(|| "unique constraint".to_string()),
                )
            }
            other => keyway_auth::StoreError::Backend(other.to_string()),
        }
    }
}
