use thiserror::Error;

use crate::models::SessionStatus;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid session state {current:?}, expected {expect:?}")]
    InvalidState {
        current: SessionStatus,
        expect: SessionStatus,
    },

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Failed to open store")]
    Connection(#[from] diesel::ConnectionError),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected store error")]
    Database(#[from] diesel::result::Error),
}
