use std::fmt;

use rostermerge_config::SessionError;

#[derive(Debug)]
pub enum ReconError {
    /// Session store read/write failure.
    Session(SessionError),
    /// Reconciliation requested with no complete merge pair.
    NoValidPairs,
    /// CSV serialization error for one category.
    Export { category: String, message: String },
    /// IO error (export directory, file create, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(e) => write!(f, "{e}"),
            Self::NoValidPairs => {
                write!(f, "no complete merge pair: select both a OneSite and an Apricot column")
            }
            Self::Export { category, message } => {
                write!(f, "export '{category}': {message}")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<SessionError> for ReconError {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}
