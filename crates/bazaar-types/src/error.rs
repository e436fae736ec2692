use thiserror::Error;

/// Failures surfaced by the marketplace operations.
///
/// Everything except `Storage` is an expected outcome that the web layer turns
/// into a notice and a redirect.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("that username is already taken")]
    DuplicateUsername,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("please log in first")]
    NotAuthenticated,

    #[error("only the owner can change this product")]
    NotOwner,

    #[error("not found")]
    NotFound,

    #[error("this account has been made dormant after repeated reports")]
    AccountDormant,

    #[error("{0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type MarketResult<T> = Result<T, MarketError>;
