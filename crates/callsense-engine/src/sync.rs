//! Post-call reconciliation into the parent business record.

use chrono::{DateTime, Utc};
use tracing::instrument;

use callsense_core::{CallObjection, CallPainPoint, CallSession, SignalCatalog, SignalKind};
use callsense_store::businesses::{BusinessRepo, ContactOutcome};
use callsense_store::StoreError;

/// Write a finished call back onto its business: stamp the contact, copy the
/// follow-up date and disposition when present, and append one rendered
/// summary note.
#[instrument(skip_all, fields(session_id = %session.id, business_id = %session.business_id))]
pub fn reconcile(
    businesses: &BusinessRepo,
    catalog: &SignalCatalog,
    now: DateTime<Utc>,
    session: &CallSession,
    objections: &[CallObjection],
    pain_points: &[CallPainPoint],
) -> Result<(), StoreError> {
    businesses.record_contact(
        &session.business_id,
        &ContactOutcome {
            last_contacted_at: now,
            follow_up_date: session.follow_up_date,
            last_disposition: session.disposition.clone(),
        },
    )?;

    let note = summary_line(catalog, session, objections, pain_points);
    businesses.append_outreach_note(&session.business_id, &note, session.deal_score)?;
    Ok(())
}

/// Render the one-line call summary, omitting any empty segment.
///
/// Segment order: call date, duration, buyer type, urgency, authority, pain
/// points, unaddressed objections, disposition, final score.
pub fn summary_line(
    catalog: &SignalCatalog,
    session: &CallSession,
    objections: &[CallObjection],
    pain_points: &[CallPainPoint],
) -> String {
    let mut parts = vec![format!("Call {}", session.started_at.format("%Y-%m-%d"))];

    if let Some(minutes) = session.duration_minutes {
        parts.push(format!("{minutes} min"));
    }
    if let Some(value) = &session.buyer_type {
        parts.push(format!(
            "Buyer: {}",
            catalog.label_or_value(SignalKind::BuyerType, value)
        ));
    }
    if let Some(value) = &session.urgency {
        parts.push(format!(
            "Urgency: {}",
            catalog.label_or_value(SignalKind::Urgency, value)
        ));
    }
    if let Some(value) = &session.authority {
        parts.push(format!(
            "Authority: {}",
            catalog.label_or_value(SignalKind::Authority, value)
        ));
    }

    let pains: Vec<&str> = pain_points.iter().map(|p| p.pain_text.as_str()).collect();
    if !pains.is_empty() {
        parts.push(format!("Pain: {}", pains.join(", ")));
    }

    let unaddressed: Vec<&str> = objections
        .iter()
        .filter(|o| !o.addressed)
        .map(|o| o.objection_type.as_str())
        .collect();
    if !unaddressed.is_empty() {
        parts.push(format!("Unresolved: {}", unaddressed.join(", ")));
    }

    if let Some(value) = &session.disposition {
        parts.push(format!(
            "Outcome: {}",
            catalog.label_or_value(SignalKind::Disposition, value)
        ));
    }
    if let Some(score) = session.deal_score {
        parts.push(format!("Score {score}/100"));
    }

    parts.join(" | ")
}
