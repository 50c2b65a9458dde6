use crate::error::{ErrorKind, Result};
use crate::session::{Lifecycle, Session, SessionGuard, SessionState};
use crate::{Pdf, Renderer};
use exn::ResultExt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::OwnedSemaphorePermit;
use tracing::instrument;

impl Renderer {
    /// Convert an HTML document (or fragment) into a PDF.
    ///
    /// Empty input is rejected before anything else happens. Otherwise a
    /// conversion slot is claimed, the configured stylesheets are injected, a
    /// fresh browser is launched and driven through load and print, and the
    /// browser is closed again regardless of how far it got.
    #[instrument(skip_all, fields(html_len = html.len()))]
    pub async fn convert(&self, html: &str) -> Result<Pdf> {
        if html.is_empty() {
            exn::bail!(ErrorKind::MissingInput);
        }
        let _permit = self.admit()?;
        let (document, placement) = self.styles.apply(html);
        tracing::debug!(?placement, styles = self.styles.len(), "Document prepared");

        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(SessionState::Launching);
        let session = step(&mut lifecycle, self.launch.timeout, self.launcher.launch(&self.launch)).await?;
        lifecycle.advance(SessionState::Ready);

        let mut guard = SessionGuard::new(session, self.launch.close_timeout);
        let outcome = self.drive(&mut lifecycle, guard.session(), &document).await;
        guard.close().await;
        lifecycle.advance(SessionState::Closed);

        match &outcome {
            Ok(pdf) => tracing::info!(bytes = pdf.len(), "PDF generated"),
            Err(e) => tracing::warn!(error = %**e, "PDF generation failed"),
        }
        outcome
    }

    async fn drive(&self, lifecycle: &mut Lifecycle, session: &mut dyn Session, html: &str) -> Result<Pdf> {
        lifecycle.advance(SessionState::ContentLoading);
        step(lifecycle, self.page_timeout, session.load(html, self.readiness)).await?;
        lifecycle.advance(SessionState::Rendering);
        let bytes = step(lifecycle, self.render_timeout, session.print(&self.options)).await?;
        let pdf = Pdf::from(bytes);
        if !pdf.has_magic() {
            lifecycle.fail();
            tracing::error!(bytes = pdf.len(), "Browser returned something that is not a PDF");
            exn::bail!(ErrorKind::RenderFailed(SessionState::Rendering));
        }
        Ok(pdf)
    }

    fn admit(&self) -> Result<Option<OwnedSemaphorePermit>> {
        let Some(slots) = &self.slots else {
            return Ok(None);
        };
        match slots.clone().try_acquire_owned() {
            Ok(permit) => Ok(Some(permit)),
            Err(e) => {
                tracing::warn!(limit = self.max_concurrent(), "Conversion rejected; all slots busy");
                Err(e).or_raise(|| ErrorKind::Busy)
            },
        }
    }
}

/// Run one lifecycle step under a deadline, marking the lifecycle failed if
/// the step errors or runs out of time.
async fn step<T>(lifecycle: &mut Lifecycle, limit: Duration, work: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, work).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            lifecycle.fail();
            Err(e)
        },
        Err(elapsed) => {
            let state = lifecycle.fail();
            Err(elapsed).or_raise(|| ErrorKind::Timeout(state, limit))
        },
    }
}
