use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::instrument;

use callsense_core::ids::BusinessId;
use callsense_core::{SignalCatalog, SignalKind};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// The slice of the business record this engine reconciles into.
#[derive(Clone, Debug)]
pub struct Business {
    pub id: BusinessId,
    pub name: String,
    pub phone: Option<String>,
    pub business_type: Option<String>,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub follow_up_date: Option<NaiveDate>,
    pub last_disposition: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewBusiness {
    pub name: String,
    pub phone: Option<String>,
    pub business_type: Option<String>,
}

/// What a finished call writes back onto the business.
#[derive(Clone, Debug)]
pub struct ContactOutcome {
    pub last_contacted_at: DateTime<Utc>,
    pub follow_up_date: Option<NaiveDate>,
    pub last_disposition: Option<String>,
}

/// One appended call summary. Append-only, so the full outreach history
/// stays reconstructable by joining rows in insertion order.
#[derive(Clone, Debug)]
pub struct OutreachNote {
    pub id: i64,
    pub business_id: BusinessId,
    pub note: String,
    pub deal_score: Option<u8>,
    pub created_at: DateTime<Utc>,
}

const BUSINESS_COLUMNS: &str =
    "id, name, phone, business_type, last_contacted_at, follow_up_date, last_disposition, created_at";

pub struct BusinessRepo {
    db: Database,
    catalog: Arc<SignalCatalog>,
}

impl BusinessRepo {
    pub fn new(db: Database, catalog: Arc<SignalCatalog>) -> Self {
        Self { db, catalog }
    }

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn create(&self, new: &NewBusiness) -> Result<Business, StoreError> {
        let id = BusinessId::new();
        let now = Utc::now();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO businesses (id, name, phone, business_type, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    id.as_str(),
                    new.name,
                    new.phone,
                    new.business_type,
                    now.to_rfc3339(),
                ],
            )?;

            Ok(Business {
                id: id.clone(),
                name: new.name.clone(),
                phone: new.phone.clone(),
                business_type: new.business_type.clone(),
                last_contacted_at: None,
                follow_up_date: None,
                last_disposition: None,
                created_at: now,
            })
        })
    }

    #[instrument(skip(self), fields(business_id = %id))]
    pub fn get(&self, id: &BusinessId) -> Result<Business, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BUSINESS_COLUMNS} FROM businesses WHERE id = ?1"
            ))?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_business(row),
                None => Err(StoreError::NotFound(format!("business {id}"))),
            }
        })
    }

    /// Stamp the outcome of a finished call onto the business record.
    /// `follow_up_date` and `last_disposition` are only overwritten when the
    /// call produced them.
    #[instrument(skip(self, outcome), fields(business_id = %id))]
    pub fn record_contact(
        &self,
        id: &BusinessId,
        outcome: &ContactOutcome,
    ) -> Result<(), StoreError> {
        if let Some(disposition) = &outcome.last_disposition {
            if !self.catalog.contains(SignalKind::Disposition, disposition) {
                return Err(StoreError::InvalidValue {
                    field: "last_disposition",
                    value: disposition.clone(),
                });
            }
        }

        self.db.with_conn(|conn| {
            let mut sets = vec!["last_contacted_at = ?1".to_string()];
            let mut params: Vec<Box<dyn rusqlite::types::ToSql>> =
                vec![Box::new(outcome.last_contacted_at.to_rfc3339())];

            if let Some(date) = &outcome.follow_up_date {
                sets.push(format!("follow_up_date = ?{}", params.len() + 1));
                params.push(Box::new(date.to_string()));
            }
            if let Some(disposition) = &outcome.last_disposition {
                sets.push(format!("last_disposition = ?{}", params.len() + 1));
                params.push(Box::new(disposition.clone()));
            }

            let sql = format!(
                "UPDATE businesses SET {} WHERE id = ?{}",
                sets.join(", "),
                params.len() + 1
            );
            params.push(Box::new(id.as_str().to_string()));

            let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                params.iter().map(|p| p.as_ref()).collect();
            let changed = conn.execute(&sql, param_refs.as_slice())?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("business {id}")));
            }
            Ok(())
        })
    }

    /// Append one rendered call summary to the business's outreach history.
    #[instrument(skip(self, note), fields(business_id = %id))]
    pub fn append_outreach_note(
        &self,
        id: &BusinessId,
        note: &str,
        deal_score: Option<u8>,
    ) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT INTO outreach_notes (business_id, note, deal_score, created_at)
                 SELECT ?1, ?2, ?3, ?4 WHERE EXISTS (SELECT 1 FROM businesses WHERE id = ?1)",
                rusqlite::params![
                    id.as_str(),
                    note,
                    deal_score.map(|s| s as i64),
                    Utc::now().to_rfc3339(),
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("business {id}")));
            }
            Ok(())
        })
    }

    /// Outreach history for a business, oldest first.
    #[instrument(skip(self), fields(business_id = %id))]
    pub fn list_outreach_notes(&self, id: &BusinessId) -> Result<Vec<OutreachNote>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, business_id, note, deal_score, created_at
                 FROM outreach_notes WHERE business_id = ?1 ORDER BY id ASC",
            )?;
            let mut rows = stmt.query([id.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_note(row)?);
            }
            Ok(results)
        })
    }
}

fn row_to_business(row: &rusqlite::Row<'_>) -> Result<Business, StoreError> {
    const T: &str = "businesses";

    let last_contacted_raw: Option<String> = row_helpers::get_opt(row, 4, T, "last_contacted_at")?;
    let follow_up_raw: Option<String> = row_helpers::get_opt(row, 5, T, "follow_up_date")?;
    let created_raw: String = row_helpers::get(row, 7, T, "created_at")?;

    Ok(Business {
        id: BusinessId::from_raw(row_helpers::get::<String>(row, 0, T, "id")?),
        name: row_helpers::get(row, 1, T, "name")?,
        phone: row_helpers::get_opt(row, 2, T, "phone")?,
        business_type: row_helpers::get_opt(row, 3, T, "business_type")?,
        last_contacted_at: last_contacted_raw
            .map(|raw| row_helpers::parse_datetime(&raw, T, "last_contacted_at"))
            .transpose()?,
        follow_up_date: follow_up_raw
            .map(|raw| row_helpers::parse_date(&raw, T, "follow_up_date"))
            .transpose()?,
        last_disposition: row_helpers::get_opt(row, 6, T, "last_disposition")?,
        created_at: row_helpers::parse_datetime(&created_raw, T, "created_at")?,
    })
}

fn row_to_note(row: &rusqlite::Row<'_>) -> Result<OutreachNote, StoreError> {
    const T: &str = "outreach_notes";
    let created_raw: String = row_helpers::get(row, 4, T, "created_at")?;

    Ok(OutreachNote {
        id: row_helpers::get(row, 0, T, "id")?,
        business_id: BusinessId::from_raw(row_helpers::get::<String>(row, 1, T, "business_id")?),
        note: row_helpers::get(row, 2, T, "note")?,
        deal_score: row_helpers::get_opt::<i64>(row, 3, T, "deal_score")?.map(|v| v as u8),
        created_at: row_helpers::parse_datetime(&created_raw, T, "created_at")?,
    })
}
