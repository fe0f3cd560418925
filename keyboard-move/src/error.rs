//! Error types for parser attachment

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Parser module unavailable: {0}")]
    Unavailable(String),
}
