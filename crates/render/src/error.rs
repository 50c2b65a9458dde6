//! Render Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use crate::session::SessionState;
use derive_more::{Display, Error};
use std::time::Duration;

/// A render error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request carried no HTML (absent or empty). Nothing was launched.
    #[display("no HTML content provided")]
    MissingInput,
    #[display("chrome/chromium not detected on your system")]
    ChromeNotFound,
    /// The browser process could not be started or did not answer in time.
    #[display("browser failed to launch")]
    LaunchFailed,
    /// A step of the session did not finish before its deadline.
    #[display("timed out after {}s while {_0}", _1.as_secs())]
    Timeout(#[error(not(source))] SessionState, #[error(not(source))] Duration),
    /// Loading the document or printing it failed inside the browser.
    #[display("rendering failed while {_0}")]
    RenderFailed(#[error(not(source))] SessionState),
    /// Every conversion slot is taken; the request was turned away before launching anything.
    #[display("too many conversions in progress")]
    Busy,
    /// Asset was not loadable (either file or builtin).
    #[display("asset not found: {_0}")]
    AssetNotFound(#[error(not(source))] String),
    Io,
}

impl ErrorKind {
    /// Stable machine-readable identifier, used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingInput => "missing_input",
            Self::ChromeNotFound | Self::LaunchFailed => "launch_failure",
            Self::Timeout(SessionState::Launching, _) => "launch_failure",
            Self::Timeout(..) | Self::RenderFailed(_) => "render_failure",
            Self::Busy => "busy",
            Self::AssetNotFound(_) | Self::Io => "render_failure",
        }
    }

    /// Returns `true` if the caller provided bad input rather than the service failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingInput)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy | Self::Timeout(..) | Self::LaunchFailed)
    }
}
