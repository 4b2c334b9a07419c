#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid {field} value: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("corrupt row in {table}.{column}: {detail}")]
    CorruptRow {
        table: &'static str,
        column: &'static str,
        detail: String,
    },

    #[error("IO error: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(err, msg)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(msg.unwrap_or_else(|| err.to_string()))
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_violation_maps_to_conflict() {
        let ffi = rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT);
        let err: StoreError =
            rusqlite::Error::SqliteFailure(ffi, Some("UNIQUE constraint failed".into())).into();
        assert!(matches!(err, StoreError::Conflict(_)), "got: {err:?}");
    }

    #[test]
    fn other_sqlite_errors_map_to_database() {
        let err: StoreError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, StoreError::Database(_)));
    }
}
