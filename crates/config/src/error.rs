//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("config file not found: {_0}")]
    FileNotFound(#[error(not(source))] String),
    /// The merged configuration could not be deserialized.
    #[display("could not read configuration")]
    Load,
    /// A value deserialized fine but makes no sense.
    #[display("invalid configuration value for `{_0}`")]
    Invalid(#[error(not(source))] &'static str),
    /// A configured stylesheet could not be loaded.
    #[display("could not load stylesheets")]
    Styles,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Invalid("server.port").to_string(), "invalid configuration value for `server.port`");
        assert_eq!(ErrorKind::FileNotFound("/x.toml".into()).to_string(), "config file not found: /x.toml");
        assert!(!ErrorKind::Load.is_retryable());
    }
}
