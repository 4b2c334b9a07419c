use callsense_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("business not found: {0}")]
    BusinessNotFound(String),

    #[error("business {0} already has a call in progress")]
    CallInProgress(String),

    #[error("no active call")]
    NoActiveCall,

    #[error("session {0} has not ended")]
    SessionNotEnded(String),
}
