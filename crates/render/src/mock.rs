//! In-process browser double for testing.
//!
//! [`MockLauncher`] stands in for [`ChromiumLauncher`](crate::ChromiumLauncher)
//! so the conversion pipeline can be exercised without a browser. It counts
//! launches and closes, remembers the last document it was asked to load, and
//! can be told to fail at a particular stage.

use crate::error::{ErrorKind, Result};
use crate::launch::LaunchConfig;
use crate::options::{Readiness, RenderOptions};
use crate::session::{Launcher, Session, SessionState};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The stage at which a [`MockLauncher`] session misbehaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    /// The browser never starts.
    Launch,
    /// Starting the browser never finishes.
    HangLaunch,
    /// Loading the document errors.
    Load,
    /// Loading the document never finishes.
    Hang,
    /// Printing errors.
    Print,
    /// Printing never finishes.
    HangPrint,
    /// Printing returns bytes that are not a PDF.
    NotPdf,
    /// Everything works, but shutting the browser down errors.
    Close,
    /// Everything works, but shutting the browser down never finishes.
    HangClose,
}

#[derive(Default)]
struct Counters {
    launches: AtomicUsize,
    closes: AtomicUsize,
    last_html: Mutex<Option<String>>,
}

/// A [`Launcher`] that never starts a process.
///
/// Clones share their counters, so keep one clone in the test and hand the
/// other to the code under test.
///
/// # Examples
///
/// ```ignore
/// use pagepress_render::mock::{Failure, MockLauncher};
/// use pagepress_render::{Renderer, StyleConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let launcher = MockLauncher::new().failing(Failure::Print);
/// let renderer = Renderer::new(Default::default(), StyleConfig::new()).with_launcher(launcher.clone());
/// assert!(renderer.convert("<p>hello</p>").await.is_err());
/// assert_eq!(launcher.closes(), 1);
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockLauncher {
    counters: Arc<Counters>,
    failure: Option<Failure>,
    load_delay: Option<Duration>,
}
impl MockLauncher {
    /// What every successful mock conversion returns.
    pub const PDF: &'static [u8] =
        b"%PDF-1.7\n%mock\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Make every load take `delay` before succeeding.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    pub fn launches(&self) -> usize {
        self.counters.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    /// The document most recently handed to a session, after style injection.
    pub fn last_html(&self) -> Option<String> {
        self.counters.last_html.lock().ok().and_then(|html| html.clone())
    }
}

#[async_trait]
impl Launcher for MockLauncher {
    async fn launch(&self, _config: &LaunchConfig) -> Result<Box<dyn Session>> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(Failure::Launch) => exn::bail!(ErrorKind::LaunchFailed),
            Some(Failure::HangLaunch) => std::future::pending::<()>().await,
            _ => {},
        }
        Ok(Box::new(MockSession {
            counters: self.counters.clone(),
            failure: self.failure,
            load_delay: self.load_delay,
            loaded: false,
        }))
    }
}

struct MockSession {
    counters: Arc<Counters>,
    failure: Option<Failure>,
    load_delay: Option<Duration>,
    loaded: bool,
}

#[async_trait]
impl Session for MockSession {
    async fn load(&mut self, html: &str, _readiness: Readiness) -> Result<()> {
        if let Ok(mut last) = self.counters.last_html.lock() {
            *last = Some(html.to_string());
        }
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure {
            Some(Failure::Load) => exn::bail!(ErrorKind::RenderFailed(SessionState::ContentLoading)),
            Some(Failure::Hang) => std::future::pending::<Result<()>>().await,
            _ => {
                self.loaded = true;
                Ok(())
            },
        }
    }

    async fn print(&mut self, _options: &RenderOptions) -> Result<Vec<u8>> {
        match self.failure {
            _ if !self.loaded => exn::bail!(ErrorKind::RenderFailed(SessionState::Rendering)),
            Some(Failure::Print) => exn::bail!(ErrorKind::RenderFailed(SessionState::Rendering)),
            Some(Failure::HangPrint) => std::future::pending::<Result<Vec<u8>>>().await,
            Some(Failure::NotPdf) => Ok(b"<html>not a pdf</html>".to_vec()),
            _ => Ok(MockLauncher::PDF.to_vec()),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(Failure::Close) => exn::bail!(ErrorKind::Io),
            Some(Failure::HangClose) => std::future::pending::<Result<()>>().await,
            _ => Ok(()),
        }
    }
}
