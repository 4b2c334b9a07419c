use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use callsense_core::ids::{ObjectionId, SessionId};
use callsense_core::{CallObjection, SignalCatalog, SignalKind};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const OBJECTION_COLUMNS: &str = "id, session_id, objection_type, addressed, created_at";

/// Objection rows: at most one per `(session_id, objection_type)`, enforced
/// by a UNIQUE constraint. Toggle semantics live in the engine; this repo
/// only creates and flips rows.
pub struct ObjectionRepo {
    db: Database,
    catalog: Arc<SignalCatalog>,
}

impl ObjectionRepo {
    pub fn new(db: Database, catalog: Arc<SignalCatalog>) -> Self {
        Self { db, catalog }
    }

    /// Record a newly raised objection, initially unaddressed.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn add(
        &self,
        session_id: &SessionId,
        objection_type: &str,
    ) -> Result<CallObjection, StoreError> {
        if !self.catalog.contains(SignalKind::ObjectionType, objection_type) {
            return Err(StoreError::InvalidValue {
                field: "objection_type",
                value: objection_type.to_string(),
            });
        }

        let id = ObjectionId::new();
        let now = Utc::now();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO call_objections (id, session_id, objection_type, addressed, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                rusqlite::params![
                    id.as_str(),
                    session_id.as_str(),
                    objection_type,
                    now.to_rfc3339(),
                ],
            )?;

            Ok(CallObjection {
                id: id.clone(),
                session_id: session_id.clone(),
                objection_type: objection_type.to_string(),
                addressed: false,
                created_at: now,
            })
        })
    }

    /// Flip the addressed flag on an existing objection.
    #[instrument(skip(self), fields(session_id = %session_id, objection_id = %id))]
    pub fn set_addressed(
        &self,
        session_id: &SessionId,
        id: &ObjectionId,
        addressed: bool,
    ) -> Result<CallObjection, StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE call_objections SET addressed = ?1 WHERE id = ?2 AND session_id = ?3",
                rusqlite::params![addressed, id.as_str(), session_id.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("objection {id}")));
            }

            let mut stmt = conn.prepare(&format!(
                "SELECT {OBJECTION_COLUMNS} FROM call_objections WHERE id = ?1"
            ))?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_objection(row),
                None => Err(StoreError::NotFound(format!("objection {id}"))),
            }
        })
    }

    /// All objections for a session, in the order they were raised.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn list(&self, session_id: &SessionId) -> Result<Vec<CallObjection>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {OBJECTION_COLUMNS} FROM call_objections
                 WHERE session_id = ?1 ORDER BY created_at ASC, id ASC"
            ))?;
            let mut rows = stmt.query([session_id.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_objection(row)?);
            }
            Ok(results)
        })
    }

    /// Look up the one row for `(session, type)`, if it exists.
    pub fn find_by_type(
        &self,
        session_id: &SessionId,
        objection_type: &str,
    ) -> Result<Option<CallObjection>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {OBJECTION_COLUMNS} FROM call_objections
                 WHERE session_id = ?1 AND objection_type = ?2"
            ))?;
            let mut rows = stmt.query(rusqlite::params![session_id.as_str(), objection_type])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_objection(row)?)),
                None => Ok(None),
            }
        })
    }
}

fn row_to_objection(row: &rusqlite::Row<'_>) -> Result<CallObjection, StoreError> {
    const T: &str = "call_objections";
    let created_raw: String = row_helpers::get(row, 4, T, "created_at")?;

    Ok(CallObjection {
        id: ObjectionId::from_raw(row_helpers::get::<String>(row, 0, T, "id")?),
        session_id: SessionId::from_raw(row_helpers::get::<String>(row, 1, T, "session_id")?),
        objection_type: row_helpers::get(row, 2, T, "objection_type")?,
        addressed: row_helpers::get(row, 3, T, "addressed")?,
        created_at: row_helpers::parse_datetime(&created_raw, T, "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::businesses::{BusinessRepo, NewBusiness};
    use crate::sessions::{NewSession, SessionRepo};
    use chrono::TimeZone;

    fn setup() -> (SessionId, ObjectionRepo) {
        let db = Database::in_memory().unwrap();
        let catalog = Arc::new(SignalCatalog::default());
        let businesses = BusinessRepo::new(db.clone(), catalog.clone());
        let business = businesses
            .create(&NewBusiness {
                name: "Harbor Light Dental".into(),
                phone: None,
                business_type: None,
            })
            .unwrap();
        let sessions = SessionRepo::new(db.clone(), catalog.clone());
        let session = sessions
            .create(&NewSession {
                business_id: business.id,
                business_name: "Harbor Light Dental".into(),
                contact_name: "Sam".into(),
                contact_role: None,
                phone: None,
                business_type: None,
                started_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
            })
            .unwrap();
        (session.id, ObjectionRepo::new(db, catalog))
    }

    #[test]
    fn add_starts_unaddressed() {
        let (session_id, repo) = setup();
        let objection = repo.add(&session_id, "price").unwrap();
        assert!(objection.id.as_str().starts_with("obj_"));
        assert!(!objection.addressed);
    }

    #[test]
    fn duplicate_type_conflicts() {
        let (session_id, repo) = setup();
        repo.add(&session_id, "price").unwrap();
        let result = repo.add(&session_id, "price");
        assert!(matches!(result, Err(StoreError::Conflict(_))), "got: {result:?}");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let (session_id, repo) = setup();
        let result = repo.add(&session_id, "weather");
        assert!(matches!(
            result,
            Err(StoreError::InvalidValue {
                field: "objection_type",
                ..
            })
        ));
    }

    #[test]
    fn set_addressed_flips_flag() {
        let (session_id, repo) = setup();
        let objection = repo.add(&session_id, "timing").unwrap();

        let updated = repo.set_addressed(&session_id, &objection.id, true).unwrap();
        assert!(updated.addressed);

        let reverted = repo.set_addressed(&session_id, &objection.id, false).unwrap();
        assert!(!reverted.addressed);
    }

    #[test]
    fn set_addressed_unknown_id_fails() {
        let (session_id, repo) = setup();
        let result = repo.set_addressed(&session_id, &ObjectionId::from_raw("obj_missing"), true);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn list_and_find_by_type() {
        let (session_id, repo) = setup();
        repo.add(&session_id, "price").unwrap();
        repo.add(&session_id, "trust").unwrap();

        let all = repo.list(&session_id).unwrap();
        assert_eq!(all.len(), 2);

        let found = repo.find_by_type(&session_id, "trust").unwrap().unwrap();
        assert_eq!(found.objection_type, "trust");
        assert!(repo.find_by_type(&session_id, "timing").unwrap().is_none());
    }
}
