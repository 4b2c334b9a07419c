//! Deal scoring: a pure re-derivation from captured signals.
//!
//! The score is recomputed from scratch on every call — never incrementally
//! accumulated — so repeated reads cannot drift from the underlying signals.

use crate::session::{CallObjection, CallPainPoint, CallSession};

const BASE_SCORE: i32 = 50;
const UNADDRESSED_OBJECTION_PENALTY: i32 = 5;

/// Derive the deal score for a session, clamped to [0, 100].
///
/// Unset signals and values outside the well-known set contribute zero, so a
/// grown catalog is score-neutral until weights are assigned here.
pub fn deal_score(
    session: &CallSession,
    objections: &[CallObjection],
    pain_points: &[CallPainPoint],
) -> u8 {
    let unaddressed = objections.iter().filter(|o| !o.addressed).count() as i32;

    let score = BASE_SCORE
        + urgency_term(session.urgency.as_deref())
        + authority_term(session.authority.as_deref())
        + budget_term(session.budget.as_deref())
        + pain_term(pain_points)
        - UNADDRESSED_OBJECTION_PENALTY * unaddressed;

    score.clamp(0, 100) as u8
}

fn urgency_term(urgency: Option<&str>) -> i32 {
    match urgency {
        Some("bleeding") => 25,
        Some("urgent") => 15,
        Some("planning") => 5,
        Some("browsing") => -10,
        _ => 0,
    }
}

fn authority_term(authority: Option<&str>) -> i32 {
    match authority {
        Some("sole") => 15,
        Some("influencer") => 5,
        Some("gatekeeper") => -10,
        _ => 0,
    }
}

fn budget_term(budget: Option<&str>) -> i32 {
    match budget {
        Some("flexible") => 15,
        Some("price_first") => -5,
        Some("constrained") => -10,
        _ => 0,
    }
}

/// Highest severity across all pain points drives the term; a pain point
/// without a severity counts as 0.
fn pain_term(pain_points: &[CallPainPoint]) -> i32 {
    let max_severity = pain_points
        .iter()
        .map(|p| p.severity.unwrap_or(0))
        .max()
        .unwrap_or(0);

    match max_severity {
        s if s >= 7 => 15,
        s if s >= 4 => 8,
        _ => 0,
    }
}
