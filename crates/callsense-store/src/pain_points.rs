use chrono::Utc;
use tracing::instrument;

use callsense_core::ids::{PainPointId, SessionId};
use callsense_core::CallPainPoint;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const MAX_SEVERITY: u8 = 10;

/// A pain point to append. Severity is optional; scoring treats unset as 0.
#[derive(Clone, Debug)]
pub struct NewPainPoint {
    pub pain_text: String,
    pub severity: Option<u8>,
}

/// Append-only pain-point log. No edit or delete; duplicates are allowed.
pub struct PainPointRepo {
    db: Database,
}

impl PainPointRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, new), fields(session_id = %session_id))]
    pub fn add(
        &self,
        session_id: &SessionId,
        new: &NewPainPoint,
    ) -> Result<CallPainPoint, StoreError> {
        if let Some(severity) = new.severity {
            if severity > MAX_SEVERITY {
                return Err(StoreError::InvalidValue {
                    field: "severity",
                    value: severity.to_string(),
                });
            }
        }

        let id = PainPointId::new();
        let now = Utc::now();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO call_pain_points (id, session_id, pain_text, severity, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    id.as_str(),
                    session_id.as_str(),
                    new.pain_text,
                    new.severity.map(|s| s as i64),
                    now.to_rfc3339(),
                ],
            )?;

            Ok(CallPainPoint {
                id: id.clone(),
                session_id: session_id.clone(),
                pain_text: new.pain_text.clone(),
                severity: new.severity,
                created_at: now,
            })
        })
    }

    /// All pain points for a session, oldest first.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn list(&self, session_id: &SessionId) -> Result<Vec<CallPainPoint>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, pain_text, severity, created_at
                 FROM call_pain_points WHERE session_id = ?1 ORDER BY created_at ASC, id ASC",
            )?;
            let mut rows = stmt.query([session_id.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_pain_point(row)?);
            }
            Ok(results)
        })
    }
}

fn row_to_pain_point(row: &rusqlite::Row<'_>) -> Result<CallPainPoint, StoreError> {
    const T: &str = "call_pain_points";
    let created_raw: String = row_helpers::get(row, 4, T, "created_at")?;

    Ok(CallPainPoint {
        id: PainPointId::from_raw(row_helpers::get::<String>(row, 0, T, "id")?),
        session_id: SessionId::from_raw(row_helpers::get::<String>(row, 1, T, "session_id")?),
        pain_text: row_helpers::get(row, 2, T, "pain_text")?,
        severity: row_helpers::get_opt::<i64>(row, 3, T, "severity")?.map(|v| v as u8),
        created_at: row_helpers::parse_datetime(&created_raw, T, "created_at")?,
    })
}
