pub mod advisor;
pub mod catalog;
pub mod ids;
pub mod scoring;
pub mod session;

pub use catalog::{CatalogEntry, SignalCatalog, SignalKind};
pub use session::{CallObjection, CallPainPoint, CallSession, ChecklistItem, ContactInfo, SessionStatus};
