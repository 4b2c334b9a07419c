use chrono::{DateTime, NaiveDate, Utc};

use crate::error::StoreError;

/// Get a required column value from a row, returning CorruptRow on failure.
pub fn get<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

/// Get an optional column value.
pub fn get_opt<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<Option<T>, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

/// Parse a string into an enum, returning CorruptRow on failure.
pub fn parse_enum<T: std::str::FromStr>(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    raw.parse().map_err(|_| StoreError::CorruptRow {
        table,
        column,
        detail: format!("unknown variant: {raw}"),
    })
}

/// Parse an RFC 3339 timestamp column.
pub fn parse_datetime(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow {
            table,
            column,
            detail: format!("invalid timestamp: {e}"),
        })
}

/// Parse an ISO 8601 date column (no time component).
pub fn parse_date(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<NaiveDate, StoreError> {
    raw.parse().map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: format!("invalid date: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use callsense_core::SessionStatus;

    #[test]
    fn parse_enum_success() {
        let status: SessionStatus = parse_enum("completed", "call_sessions", "status").unwrap();
        assert_eq!(status, SessionStatus::Completed);
    }

    #[test]
    fn parse_enum_failure() {
        let result: Result<SessionStatus, _> = parse_enum("INVALID", "call_sessions", "status");
        assert!(matches!(
            result,
            Err(StoreError::CorruptRow {
                table: "call_sessions",
                column: "status",
                ..
            })
        ));
    }

    #[test]
    fn parse_datetime_roundtrip() {
        let parsed = parse_datetime("2026-03-14T09:30:00+00:00", "call_sessions", "started_at")
            .unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-03-14T09:30:00+00:00");
    }

    #[test]
    fn parse_datetime_failure() {
        let result = parse_datetime("last tuesday", "call_sessions", "started_at");
        assert!(matches!(result, Err(StoreError::CorruptRow { .. })));
    }

    #[test]
    fn parse_date_roundtrip() {
        let parsed = parse_date("2026-04-01", "call_sessions", "follow_up_date").unwrap();
        assert_eq!(parsed.to_string(), "2026-04-01");
    }
}
