//! Errors raised while parsing, validating or persisting watch entries

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("missing '=' between sensor key and value")]
    MissingSeparator,

    #[error("empty sensor key")]
    EmptyKey,

    #[error("invalid sensor key {0:?}: must not contain '=' or control characters, or start with '#', ';' or '['")]
    InvalidKey(String),

    #[error("invalid value structure: expected 3 comma-separated fields, found {0}")]
    FieldCount(usize),

    #[error("invalid action code '{0}'")]
    InvalidAction(String),

    #[error("invalid condition code '{0}'")]
    InvalidCondition(String),

    #[error("invalid threshold '{0}'")]
    InvalidThreshold(String),

    #[error("invalid range {min}:{max}, min must be less than max")]
    InvalidRange { min: f64, max: f64 },

    #[error("failed to persist watch config to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
