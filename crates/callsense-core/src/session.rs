use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{BusinessId, ObjectionId, PainPointId, SessionId};

/// Session status is a two-value enum on purpose: pausing a call is a local
/// timer flag, never a persisted state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

/// Who picked up the phone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub role: Option<String>,
}

/// The four boolean "needs" flags on a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChecklistItem {
    Demo,
    Proposal,
    CaseStudy,
    Trial,
}

impl std::fmt::Display for ChecklistItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Demo => write!(f, "demo"),
            Self::Proposal => write!(f, "proposal"),
            Self::CaseStudy => write!(f, "case_study"),
            Self::Trial => write!(f, "trial"),
        }
    }
}

impl std::str::FromStr for ChecklistItem {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "demo" => Ok(Self::Demo),
            "proposal" => Ok(Self::Proposal),
            "case_study" => Ok(Self::CaseStudy),
            "trial" => Ok(Self::Trial),
            other => Err(format!("unknown checklist item: {other}")),
        }
    }
}

/// One call attempt against a business.
///
/// Signal fields hold catalog values; `None` means the signal was never
/// captured. `deal_score` is undefined until first computed and is fixed by
/// `end`, together with `ended_at` and `duration_minutes`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallSession {
    pub id: SessionId,
    pub business_id: BusinessId,
    pub business_name: String,
    pub contact_name: String,
    pub contact_role: Option<String>,
    pub phone: Option<String>,
    pub business_type: Option<String>,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub buyer_type: Option<String>,
    pub urgency: Option<String>,
    pub authority: Option<String>,
    pub budget: Option<String>,
    pub deal_score: Option<u8>,
    pub disposition: Option<String>,
    pub needs_demo: bool,
    pub needs_proposal: bool,
    pub needs_case_study: bool,
    pub needs_trial: bool,
    pub next_action: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Prospect pushback tracked per session, at most one row per objection type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallObjection {
    pub id: ObjectionId,
    pub session_id: SessionId,
    pub objection_type: String,
    pub addressed: bool,
    pub created_at: DateTime<Utc>,
}

/// A problem the prospect voiced, append-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallPainPoint {
    pub id: PainPointId,
    pub session_id: SessionId,
    pub pain_text: String,
    pub severity: Option<u8>,
    pub created_at: DateTime<Utc>,
}
