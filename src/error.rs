use thiserror::Error;

#[derive(Error, Debug)]
pub enum PainelError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid decimal: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("Invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("Reference not found: {kind} {id}")]
    ReferenceNotFound { kind: String, id: String },

    #[error("Cycle detected at node {0}")]
    CycleDetected(String),

    #[error("Account type not computable yet: {account_type} (account {account_id})")]
    UnimplementedAccountType {
        account_id: String,
        account_type: String,
    },

    #[error("Amount out of range: {0}")]
    Overflow(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied to company {0}")]
    AccessDenied(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PainelError>;
