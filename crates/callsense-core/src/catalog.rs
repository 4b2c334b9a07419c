use serde::{Deserialize, Serialize};

/// One selectable value in a signal catalog: the stored value plus the
/// label shown to the operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub value: String,
    pub label: String,
}

/// Which catalog a value belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalKind {
    BuyerType,
    Urgency,
    Authority,
    Budget,
    ObjectionType,
    Disposition,
}

/// The sets of valid enum values consumed by the engine.
///
/// Owned by the host application as configuration — serde-loadable so it can
/// ship its own catalog. `Default` carries the standard one. Scoring and the
/// advisor key off well-known values and treat anything else as zero-weight,
/// so extending a catalog never touches them; validity checking happens at
/// the store boundary only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignalCatalog {
    pub buyer_types: Vec<CatalogEntry>,
    pub urgencies: Vec<CatalogEntry>,
    pub authorities: Vec<CatalogEntry>,
    pub budgets: Vec<CatalogEntry>,
    pub objection_types: Vec<CatalogEntry>,
    pub dispositions: Vec<CatalogEntry>,
}

impl SignalCatalog {
    pub fn entries(&self, kind: SignalKind) -> &[CatalogEntry] {
        match kind {
            SignalKind::BuyerType => &self.buyer_types,
            SignalKind::Urgency => &self.urgencies,
            SignalKind::Authority => &self.authorities,
            SignalKind::Budget => &self.budgets,
            SignalKind::ObjectionType => &self.objection_types,
            SignalKind::Disposition => &self.dispositions,
        }
    }

    pub fn contains(&self, kind: SignalKind, value: &str) -> bool {
        self.entries(kind).iter().any(|e| e.value == value)
    }

    pub fn label(&self, kind: SignalKind, value: &str) -> Option<&str> {
        self.entries(kind)
            .iter()
            .find(|e| e.value == value)
            .map(|e| e.label.as_str())
    }

    /// Label for a value, falling back to the raw value when the catalog
    /// does not know it.
    pub fn label_or_value<'a>(&'a self, kind: SignalKind, value: &'a str) -> &'a str {
        self.label(kind, value).unwrap_or(value)
    }
}

fn entry(value: &str, label: &str) -> CatalogEntry {
    CatalogEntry {
        value: value.to_string(),
        label: label.to_string(),
    }
}

impl Default for SignalCatalog {
    fn default() -> Self {
        Self {
            buyer_types: vec![
                entry("analytical", "Analytical"),
                entry("driver", "Driver"),
                entry("expressive", "Expressive"),
                entry("amiable", "Amiable"),
            ],
            urgencies: vec![
                entry("bleeding", "Critical pain now"),
                entry("urgent", "Urgent (this quarter)"),
                entry("planning", "Planning ahead"),
                entry("browsing", "Just browsing"),
            ],
            authorities: vec![
                entry("sole", "Sole decision-maker"),
                entry("influencer", "Influencer"),
                entry("gatekeeper", "Gatekeeper"),
            ],
            budgets: vec![
                entry("flexible", "Budget flexible"),
                entry("price_first", "Price-first"),
                entry("constrained", "Budget constrained"),
            ],
            objection_types: vec![
                entry("price", "Too expensive"),
                entry("timing", "Bad timing"),
                entry("trust", "Trust / credibility"),
                entry("competitor", "Using a competitor"),
                entry("no_need", "No perceived need"),
                entry("think_about_it", "Wants to think it over"),
            ],
            dispositions: vec![
                entry("closed_won", "Closed Won"),
                entry("follow_up", "Follow-Up Scheduled"),
                entry("not_now", "Not Now"),
                entry("not_interested", "Not Interested"),
                entry("no_decision", "No Decision"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_knows_standard_values() {
        let catalog = SignalCatalog::default();
        assert!(catalog.contains(SignalKind::BuyerType, "analytical"));
        assert!(catalog.contains(SignalKind::Urgency, "bleeding"));
        assert!(catalog.contains(SignalKind::Authority, "gatekeeper"));
        assert!(catalog.contains(SignalKind::Budget, "price_first"));
        assert!(catalog.contains(SignalKind::ObjectionType, "price"));
        assert!(catalog.contains(SignalKind::Disposition, "closed_won"));
    }

    #[test]
    fn unknown_value_is_rejected() {
        let catalog = SignalCatalog::default();
        assert!(!catalog.contains(SignalKind::Urgency, "desperate"));
        assert!(catalog.label(SignalKind::Urgency, "desperate").is_none());
    }

    #[test]
    fn label_lookup() {
        let catalog = SignalCatalog::default();
        assert_eq!(
            catalog.label(SignalKind::Disposition, "closed_won"),
            Some("Closed Won")
        );
        assert_eq!(
            catalog.label_or_value(SignalKind::Disposition, "mystery"),
            "mystery"
        );
    }

    #[test]
    fn serde_roundtrip() {
        let catalog = SignalCatalog::default();
        let json = serde_json::to_string(&catalog).unwrap();
        let parsed: SignalCatalog = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.buyer_types, catalog.buyer_types);
        assert_eq!(parsed.dispositions, catalog.dispositions);
    }

    #[test]
    fn host_app_can_extend_a_catalog() {
        let mut catalog = SignalCatalog::default();
        catalog
            .objection_types
            .push(entry("compliance", "Compliance concerns"));
        assert!(catalog.contains(SignalKind::ObjectionType, "compliance"));
    }
}
