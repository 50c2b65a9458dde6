//! Browser launch configuration.
//!
//! The argument set targets restricted hosts (containers, serverless
//! sandboxes): no setuid sandbox, no GPU, no `/dev/shm`, a single process,
//! and no background throttling that could stall rendering of a hidden tab.

use std::path::PathBuf;
use std::time::Duration;

/// Chromium flags applied to every launch unless overridden.
pub const DEFAULT_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
    "--single-process",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-features=TranslateUI",
    "--disable-ipc-flooding-protection",
    "--disable-extensions",
    "--disable-default-apps",
];

/// Fixed window size for the rendered page, in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}
impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1200, height: 800 }
    }
}

/// Everything needed to start a browser. Built once at startup and shared by
/// every conversion.
#[derive(Clone, Debug)]
pub struct LaunchConfig {
    /// Explicit executable. When `None` one is discovered at launch time.
    pub executable: Option<PathBuf>,
    pub args: Vec<String>,
    pub viewport: Option<Viewport>,
    pub timeout: Duration,
    /// How long a browser gets to exit before it is killed.
    pub close_timeout: Duration,
}
impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            executable: None,
            args: DEFAULT_ARGS.iter().map(|s| s.to_string()).collect(),
            viewport: Some(Viewport::default()),
            timeout: Duration::from_secs(20),
            close_timeout: Duration::from_secs(10),
        }
    }
}
impl LaunchConfig {
    pub fn with_executable(mut self, path: impl Into<Option<PathBuf>>) -> Self {
        self.executable = path.into();
        self
    }

    /// Replace the argument set entirely.
    pub fn with_args<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_viewport(mut self, viewport: impl Into<Option<Viewport>>) -> Self {
        self.viewport = viewport.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_sandbox_and_gpu() {
        let config = LaunchConfig::default();
        for flag in ["--no-sandbox", "--disable-gpu", "--disable-dev-shm-usage", "--single-process"] {
            assert!(config.args.iter().any(|a| a == flag), "missing {flag}");
        }
        assert_eq!(config.viewport, Some(Viewport { width: 1200, height: 800 }));
    }

    #[test]
    fn args_can_be_replaced() {
        let config = LaunchConfig::default().with_args(["--headless=new"]);
        assert_eq!(config.args, vec!["--headless=new".to_string()]);
    }
}
