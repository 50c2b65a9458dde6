mod chrome;
mod chromium;
pub mod error;
mod launch;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod options;
mod pdf;
mod render;
mod session;
mod style;

pub use crate::chrome::CHROME_PATH_ENV;
pub use crate::chromium::ChromiumLauncher;
pub use crate::launch::{DEFAULT_ARGS, LaunchConfig, Viewport};
pub use crate::options::{Margins, PaperSize, Readiness, RenderOptions};
pub use crate::pdf::Pdf;
pub use crate::session::{Launcher, Session, SessionState};
pub use crate::style::StyleConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// The HTML to PDF conversion pipeline.
///
/// Holds everything that is fixed for the lifetime of a deployment: how to
/// launch a browser, which stylesheets to inject, how to wait for and print
/// the page, and how many conversions may run at once. Nothing here is
/// mutated per request, so one `Renderer` is shared by every caller.
pub struct Renderer {
    launcher: Arc<dyn Launcher>,
    launch: LaunchConfig,
    styles: StyleConfig,
    options: RenderOptions,
    readiness: Readiness,
    page_timeout: Duration,
    render_timeout: Duration,
    slots: Option<Arc<Semaphore>>,
    max_concurrent: usize,
}
impl Renderer {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// A renderer backed by a real Chromium, with no concurrency cap.
    pub fn new(launch: LaunchConfig, styles: StyleConfig) -> Self {
        Self {
            launcher: Arc::new(ChromiumLauncher),
            launch,
            styles,
            options: RenderOptions::default(),
            readiness: Readiness::default(),
            page_timeout: Self::DEFAULT_TIMEOUT,
            render_timeout: Self::DEFAULT_TIMEOUT,
            slots: None,
            max_concurrent: 0,
        }
    }

    pub fn with_launcher(mut self, launcher: impl Launcher + 'static) -> Self {
        self.launcher = Arc::new(launcher);
        self
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    /// Deadline for loading the document and reaching readiness.
    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    /// Deadline for printing the loaded document.
    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    /// Cap simultaneous conversions. Requests beyond the cap are rejected
    /// immediately rather than queued. `0` removes the cap.
    pub fn with_max_concurrent(mut self, limit: usize) -> Self {
        self.max_concurrent = limit;
        self.slots = (limit > 0).then(|| Arc::new(Semaphore::new(limit)));
        self
    }

    /// The configured concurrency cap, `0` meaning unlimited.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Conversion slots currently free, `None` when uncapped.
    pub fn available_slots(&self) -> Option<usize> {
        self.slots.as_ref().map(|s| s.available_permits())
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }
}
