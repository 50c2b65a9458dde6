use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};

/// Environment variable hosting platforms use to point at a bundled Chromium.
pub const CHROME_PATH_ENV: &str = "CHROME_PATH";

/// Locate a Chrome/Chromium executable.
///
/// Resolution order: an explicitly configured path, then [`CHROME_PATH_ENV`],
/// then well-known executable names on `PATH`.
pub(crate) fn discover(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        tracing::warn!(path = %path.display(), "Configured Chrome executable does not exist");
        exn::bail!(ErrorKind::ChromeNotFound);
    }
    if let Some(path) = std::env::var_os(CHROME_PATH_ENV).map(PathBuf::from).filter(|p| !p.as_os_str().is_empty()) {
        if path.is_file() {
            tracing::debug!(path = %path.display(), "Using Chrome executable from {CHROME_PATH_ENV}");
            return Ok(path);
        }
        tracing::info!(path = %path.display(), "{CHROME_PATH_ENV} does not point at a file; searching PATH");
    }
    // TODO: What are the executable names on Windows? macOS?
    let executables =
        ["chromium", "chromium-browser", "google-chrome", "google-chrome-stable", "chrome", "headless_shell"];
    for exe in executables {
        if let Ok(path) = which::which(exe) {
            tracing::debug!(path = %path.display(), "Discovered Chrome executable in PATH");
            return Ok(path);
        }
    }
    tracing::info!("Chrome executable not found in PATH");
    exn::bail!(ErrorKind::ChromeNotFound);
}
