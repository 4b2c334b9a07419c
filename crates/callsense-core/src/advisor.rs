//! Live coaching tips derived from captured signals.
//!
//! Pure and order-stable: signals are checked in a fixed sequence so the tip
//! list renders consistently between reads.

use crate::session::{CallObjection, CallSession};

/// Build the ordered tip list for the current session state.
///
/// Checks buyer type, then urgency, then authority, then budget, then
/// unaddressed objections. Returns an empty list when nothing matches.
pub fn coaching_tips(session: &CallSession, objections: &[CallObjection]) -> Vec<String> {
    let mut tips = Vec::new();

    match session.buyer_type.as_deref() {
        Some("analytical") => tips.push(
            "Analytical buyer: lead with data — cite concrete numbers and offer a detailed breakdown.".to_string(),
        ),
        Some("driver") => tips.push(
            "Driver: be direct and results-focused. Skip the small talk, get to the bottom line.".to_string(),
        ),
        Some("expressive") => tips.push(
            "Expressive buyer: keep the energy up and paint the big picture — tell a story, not a spreadsheet.".to_string(),
        ),
        Some("amiable") => tips.push(
            "Amiable buyer: slow down and build trust. Mention other local customers they might know.".to_string(),
        ),
        _ => {}
    }

    match session.urgency.as_deref() {
        Some("bleeding") => tips.push(
            "They are hurting right now — propose a concrete start date on this call.".to_string(),
        ),
        Some("browsing") => tips.push(
            "Low urgency: plant seeds and book a long-dated follow-up instead of pushing to close.".to_string(),
        ),
        _ => {}
    }

    match session.authority.as_deref() {
        Some("gatekeeper") => tips.push(
            "You are not talking to the decision-maker. Ask who else should be in the room.".to_string(),
        ),
        Some("influencer") => tips.push(
            "Equip them to sell internally: offer materials they can forward to the decision-maker.".to_string(),
        ),
        _ => {}
    }

    if session.budget.as_deref() == Some("constrained") {
        tips.push(
            "Budget is tight — anchor on the cost of inaction and offer the smallest viable package.".to_string(),
        );
    }

    let unaddressed: Vec<&str> = objections
        .iter()
        .filter(|o| !o.addressed)
        .map(|o| o.objection_type.as_str())
        .collect();
    if !unaddressed.is_empty() {
        tips.push(format!(
            "Unresolved objections to address: {}",
            unaddressed.join(", ")
        ));
    }

    tips
}
