use thiserror::Error;

pub type SettlementResult<T> = Result<T, SettlementError>;

/// Failures surfaced by the record store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store transport error: {0}")]
    Transport(String),
    #[error("record store rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("failed to decode {table} row: {message}")]
    Decode { table: &'static str, message: String },
    #[error("{table} row {id} not found")]
    MissingRow { table: &'static str, id: String },
}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("investment would exceed pitch target amount")]
    LimitExceeded,
    #[error("no investment tier matches the given amount")]
    NoMatchingTier,
    #[error("investment already refunded")]
    AlreadyRefunded,
    #[error("profit already distributed")]
    AlreadyDistributed,
    #[error("no active investments for this pitch")]
    NoActiveInvestments,
    #[error("no valid shares to distribute")]
    NoValidShares,
    #[error("invalid request: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("settlement journal unavailable: {0}")]
    Journal(String),
}

impl SettlementError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
