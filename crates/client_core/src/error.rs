use shared::error::CursorParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog fetch failed: {0:#}")]
    Fetch(anyhow::Error),
    #[error("invalid pagination cursor: {0}")]
    Cursor(#[from] CursorParseError),
    #[error("last loaded item has no lot key; cannot advance the cursor")]
    MissingLot,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("a login attempt is already in progress")]
    AttemptInFlight,
}
