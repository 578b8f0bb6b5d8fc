use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Ledger not initialized — no genesis block yet")]
    EmptyChain,

    #[error("Ledger already initialized")]
    AlreadyInitialized,

    #[error("Ticket already issued: {0}")]
    DuplicateTicket(String),

    #[error("Corruption: {0}")]
    Corruption(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
