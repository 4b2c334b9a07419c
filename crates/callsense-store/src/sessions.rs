use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::instrument;

use callsense_core::ids::{BusinessId, SessionId};
use callsense_core::{CallSession, SessionStatus, SignalCatalog, SignalKind};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// Fields required to open a call session. Everything else starts unset.
#[derive(Clone, Debug)]
pub struct NewSession {
    pub business_id: BusinessId,
    pub business_name: String,
    pub contact_name: String,
    pub contact_role: Option<String>,
    pub phone: Option<String>,
    pub business_type: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Partial update: `None` leaves a field untouched. Last write wins.
#[derive(Clone, Debug, Default)]
pub struct UpdateSession {
    pub status: Option<SessionStatus>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub deal_score: Option<u8>,
    pub disposition: Option<String>,
    pub buyer_type: Option<String>,
    pub urgency: Option<String>,
    pub authority: Option<String>,
    pub budget: Option<String>,
    pub needs_demo: Option<bool>,
    pub needs_proposal: Option<bool>,
    pub needs_case_study: Option<bool>,
    pub needs_trial: Option<bool>,
    pub next_action: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

const SESSION_COLUMNS: &str = "id, business_id, business_name, contact_name, contact_role, \
     phone, business_type, status, started_at, ended_at, duration_minutes, buyer_type, \
     urgency, authority, budget, deal_score, disposition, needs_demo, needs_proposal, \
     needs_case_study, needs_trial, next_action, follow_up_date, notes";

pub struct SessionRepo {
    db: Database,
    catalog: Arc<SignalCatalog>,
}

impl SessionRepo {
    pub fn new(db: Database, catalog: Arc<SignalCatalog>) -> Self {
        Self { db, catalog }
    }

    /// Open a new in-progress session.
    ///
    /// The partial unique index on `(business_id) WHERE status = 'in_progress'`
    /// is the authoritative guard against two live calls for one business;
    /// a violation surfaces as `Conflict` regardless of what the caller
    /// checked beforehand.
    #[instrument(skip(self, new), fields(business_id = %new.business_id))]
    pub fn create(&self, new: &NewSession) -> Result<CallSession, StoreError> {
        let id = SessionId::new();
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO call_sessions (id, business_id, business_name, contact_name, \
                 contact_role, phone, business_type, status, started_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'in_progress', ?8, ?9)",
                rusqlite::params![
                    id.as_str(),
                    new.business_id.as_str(),
                    new.business_name,
                    new.contact_name,
                    new.contact_role,
                    new.phone,
                    new.business_type,
                    new.started_at.to_rfc3339(),
                    now,
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    StoreError::Conflict(format!(
                        "business {} already has a call in progress",
                        new.business_id
                    ))
                }
                rusqlite::Error::SqliteFailure(err, _)
                    if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
                {
                    StoreError::NotFound(format!("business {}", new.business_id))
                }
                other => other.into(),
            })?;

            Ok(CallSession {
                id: id.clone(),
                business_id: new.business_id.clone(),
                business_name: new.business_name.clone(),
                contact_name: new.contact_name.clone(),
                contact_role: new.contact_role.clone(),
                phone: new.phone.clone(),
                business_type: new.business_type.clone(),
                status: SessionStatus::InProgress,
                started_at: new.started_at,
                ended_at: None,
                duration_minutes: None,
                buyer_type: None,
                urgency: None,
                authority: None,
                budget: None,
                deal_score: None,
                disposition: None,
                needs_demo: false,
                needs_proposal: false,
                needs_case_study: false,
                needs_trial: false,
                next_action: None,
                follow_up_date: None,
                notes: None,
            })
        })
    }

    /// Get a session by ID.
    #[instrument(skip(self), fields(session_id = %id))]
    pub fn get(&self, id: &SessionId) -> Result<CallSession, StoreError> {
        self.db.with_conn(|conn| get_in(conn, id))
    }

    /// List all sessions for a business, most recent first.
    #[instrument(skip(self), fields(business_id = %business_id))]
    pub fn list(&self, business_id: &BusinessId) -> Result<Vec<CallSession>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM call_sessions
                 WHERE business_id = ?1 ORDER BY started_at DESC, id DESC"
            ))?;
            let mut rows = stmt.query([business_id.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_session(row)?);
            }
            Ok(results)
        })
    }

    /// Find the in-progress session for a business, if any.
    #[instrument(skip(self), fields(business_id = %business_id))]
    pub fn find_active(&self, business_id: &BusinessId) -> Result<Option<CallSession>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM call_sessions
                 WHERE business_id = ?1 AND status = 'in_progress'"
            ))?;
            let mut rows = stmt.query([business_id.as_str()])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_session(row)?)),
                None => Ok(None),
            }
        })
    }

    /// Apply a partial update and return the resulting row.
    ///
    /// Enum-valued fields are validated against the injected catalog here,
    /// at the store boundary; callers do not re-validate.
    #[instrument(skip(self, update), fields(session_id = %id))]
    pub fn update(&self, id: &SessionId, update: &UpdateSession) -> Result<CallSession, StoreError> {
        self.validate(update)?;

        self.db.with_conn(|conn| {
            let mut sets: Vec<String> = Vec::new();
            let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(status) = &update.status {
                sets.push(format!("status = ?{}", params.len() + 1));
                params.push(Box::new(status.to_string()));
            }
            if let Some(ended_at) = &update.ended_at {
                sets.push(format!("ended_at = ?{}", params.len() + 1));
                params.push(Box::new(ended_at.to_rfc3339()));
            }
            if let Some(minutes) = update.duration_minutes {
                sets.push(format!("duration_minutes = ?{}", params.len() + 1));
                params.push(Box::new(minutes as i64));
            }
            if let Some(score) = update.deal_score {
                sets.push(format!("deal_score = ?{}", params.len() + 1));
                params.push(Box::new(score as i64));
            }
            if let Some(disposition) = &update.disposition {
                sets.push(format!("disposition = ?{}", params.len() + 1));
                params.push(Box::new(disposition.clone()));
            }
            if let Some(buyer_type) = &update.buyer_type {
                sets.push(format!("buyer_type = ?{}", params.len() + 1));
                params.push(Box::new(buyer_type.clone()));
            }
            if let Some(urgency) = &update.urgency {
                sets.push(format!("urgency = ?{}", params.len() + 1));
                params.push(Box::new(urgency.clone()));
            }
            if let Some(authority) = &update.authority {
                sets.push(format!("authority = ?{}", params.len() + 1));
                params.push(Box::new(authority.clone()));
            }
            if let Some(budget) = &update.budget {
                sets.push(format!("budget = ?{}", params.len() + 1));
                params.push(Box::new(budget.clone()));
            }
            if let Some(v) = update.needs_demo {
                sets.push(format!("needs_demo = ?{}", params.len() + 1));
                params.push(Box::new(v));
            }
            if let Some(v) = update.needs_proposal {
                sets.push(format!("needs_proposal = ?{}", params.len() + 1));
                params.push(Box::new(v));
            }
            if let Some(v) = update.needs_case_study {
                sets.push(format!("needs_case_study = ?{}", params.len() + 1));
                params.push(Box::new(v));
            }
            if let Some(v) = update.needs_trial {
                sets.push(format!("needs_trial = ?{}", params.len() + 1));
                params.push(Box::new(v));
            }
            if let Some(next_action) = &update.next_action {
                sets.push(format!("next_action = ?{}", params.len() + 1));
                params.push(Box::new(next_action.clone()));
            }
            if let Some(date) = &update.follow_up_date {
                sets.push(format!("follow_up_date = ?{}", params.len() + 1));
                params.push(Box::new(date.to_string()));
            }
            if let Some(notes) = &update.notes {
                sets.push(format!("notes = ?{}", params.len() + 1));
                params.push(Box::new(notes.clone()));
            }

            sets.push(format!("updated_at = ?{}", params.len() + 1));
            params.push(Box::new(Utc::now().to_rfc3339()));

            let sql = format!(
                "UPDATE call_sessions SET {} WHERE id = ?{}",
                sets.join(", "),
                params.len() + 1
            );
            params.push(Box::new(id.as_str().to_string()));

            let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                params.iter().map(|p| p.as_ref()).collect();
            let changed = conn.execute(&sql, param_refs.as_slice())?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("call session {id}")));
            }

            get_in(conn, id)
        })
    }

    fn validate(&self, update: &UpdateSession) -> Result<(), StoreError> {
        let checks: [(SignalKind, &'static str, &Option<String>); 5] = [
            (SignalKind::BuyerType, "buyer_type", &update.buyer_type),
            (SignalKind::Urgency, "urgency", &update.urgency),
            (SignalKind::Authority, "authority", &update.authority),
            (SignalKind::Budget, "budget", &update.budget),
            (SignalKind::Disposition, "disposition", &update.disposition),
        ];
        for (kind, field, value) in checks {
            if let Some(v) = value {
                if !self.catalog.contains(kind, v) {
                    return Err(StoreError::InvalidValue {
                        field,
                        value: v.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn get_in(conn: &rusqlite::Connection, id: &SessionId) -> Result<CallSession, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM call_sessions WHERE id = ?1"
    ))?;
    let mut rows = stmt.query([id.as_str()])?;
    match rows.next()? {
        Some(row) => row_to_session(row),
        None => Err(StoreError::NotFound(format!("call session {id}"))),
    }
}

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<CallSession, StoreError> {
    const T: &str = "call_sessions";

    let status_raw: String = row_helpers::get(row, 7, T, "status")?;
    let started_raw: String = row_helpers::get(row, 8, T, "started_at")?;
    let ended_raw: Option<String> = row_helpers::get_opt(row, 9, T, "ended_at")?;
    let follow_up_raw: Option<String> = row_helpers::get_opt(row, 22, T, "follow_up_date")?;

    Ok(CallSession {
        id: SessionId::from_raw(row_helpers::get::<String>(row, 0, T, "id")?),
        business_id: BusinessId::from_raw(row_helpers::get::<String>(row, 1, T, "business_id")?),
        business_name: row_helpers::get(row, 2, T, "business_name")?,
        contact_name: row_helpers::get(row, 3, T, "contact_name")?,
        contact_role: row_helpers::get_opt(row, 4, T, "contact_role")?,
        phone: row_helpers::get_opt(row, 5, T, "phone")?,
        business_type: row_helpers::get_opt(row, 6, T, "business_type")?,
        status: row_helpers::parse_enum(&status_raw, T, "status")?,
        started_at: row_helpers::parse_datetime(&started_raw, T, "started_at")?,
        ended_at: ended_raw
            .map(|raw| row_helpers::parse_datetime(&raw, T, "ended_at"))
            .transpose()?,
        duration_minutes: row_helpers::get_opt::<i64>(row, 10, T, "duration_minutes")?
            .map(|v| v as u32),
        buyer_type: row_helpers::get_opt(row, 11, T, "buyer_type")?,
        urgency: row_helpers::get_opt(row, 12, T, "urgency")?,
        authority: row_helpers::get_opt(row, 13, T, "authority")?,
        budget: row_helpers::get_opt(row, 14, T, "budget")?,
        deal_score: row_helpers::get_opt::<i64>(row, 15, T, "deal_score")?.map(|v| v as u8),
        disposition: row_helpers::get_opt(row, 16, T, "disposition")?,
        needs_demo: row_helpers::get(row, 17, T, "needs_demo")?,
        needs_proposal: row_helpers::get(row, 18, T, "needs_proposal")?,
        needs_case_study: row_helpers::get(row, 19, T, "needs_case_study")?,
        needs_trial: row_helpers::get(row, 20, T, "needs_trial")?,
        next_action: row_helpers::get_opt(row, 21, T, "next_action")?,
        follow_up_date: follow_up_raw
            .map(|raw| row_helpers::parse_date(&raw, T, "follow_up_date"))
            .transpose()?,
        notes: row_helpers::get_opt(row, 23, T, "notes")?,
    })
}
