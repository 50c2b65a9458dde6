//! Chrome DevTools Protocol implementation of [`Launcher`]/[`Session`].

use crate::chrome;
use crate::error::{ErrorKind, Result};
use crate::launch::{LaunchConfig, Viewport};
use crate::options::{Readiness, RenderOptions};
use crate::session::{Launcher, Session, SessionState};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use exn::ResultExt;
use futures::StreamExt;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::instrument;

/// Launches a fresh headless Chromium for every conversion.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChromiumLauncher;

#[async_trait]
impl Launcher for ChromiumLauncher {
    #[instrument(skip_all)]
    async fn launch(&self, config: &LaunchConfig) -> Result<Box<dyn Session>> {
        let executable = chrome::discover(config.executable.as_deref())?;
        // Each browser gets its own profile; concurrent launches sharing one
        // would fight over the profile lock.
        let profile = tempfile::Builder::new().prefix("pagepress-profile-").tempdir().or_raise(|| ErrorKind::Io)?;
        let browser_config = BrowserConfig::builder()
            .chrome_executable(&executable)
            .user_data_dir(profile.path())
            .launch_timeout(config.timeout)
            .args(config.args.iter().cloned())
            .build();
        let browser_config = match browser_config {
            Ok(c) => c,
            Err(reason) => {
                tracing::error!(%reason, "Invalid browser configuration");
                exn::bail!(ErrorKind::LaunchFailed);
            },
        };
        let (browser, mut handler) = Browser::launch(browser_config).await.or_raise(|| ErrorKind::LaunchFailed)?;
        // The CDP connection only makes progress while its handler is polled.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!(error = %e, "CDP handler reported an error");
                }
            }
        });
        tracing::debug!(executable = %executable.display(), args = config.args.len(), "Browser launched");
        Ok(Box::new(ChromiumSession {
            browser,
            handler,
            page: None,
            viewport: config.viewport,
            close_timeout: config.close_timeout,
            _profile: profile,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<Page>,
    viewport: Option<Viewport>,
    close_timeout: Duration,
    _profile: TempDir,
}
impl ChromiumSession {
    async fn shut_down(&mut self) -> Result<()> {
        if let Err(e) = self.browser.close().await {
            tracing::debug!(error = %e, "Graceful browser close failed; killing the process");
            self.kill().await;
        }
        let status = self.browser.wait().await.or_raise(|| ErrorKind::Io)?;
        tracing::trace!(?status, "Browser process exited");
        Ok(())
    }

    async fn kill(&mut self) {
        if let Some(Err(e)) = self.browser.kill().await {
            tracing::warn!(error = %e, "Failed to kill browser process");
        }
    }
}
impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl Session for ChromiumSession {
    async fn load(&mut self, html: &str, readiness: Readiness) -> Result<()> {
        let failed = || ErrorKind::RenderFailed(SessionState::ContentLoading);
        let page = self.browser.new_page("about:blank").await.or_raise(failed)?;
        if let Some(Viewport { width, height }) = self.viewport {
            let metrics = SetDeviceMetricsOverrideParams::new(i64::from(width), i64::from(height), 1.0, false);
            page.execute(metrics).await.or_raise(failed)?;
        }
        page.set_content(html).await.or_raise(failed)?;
        let mut wait = EvaluateParams::new(readiness.script());
        wait.await_promise = Some(true);
        wait.return_by_value = Some(true);
        page.evaluate_expression(wait).await.or_raise(failed)?;
        tracing::debug!(%readiness, "Page reached readiness");
        self.page = Some(page);
        Ok(())
    }

    async fn print(&mut self, options: &RenderOptions) -> Result<Vec<u8>> {
        let failed = || ErrorKind::RenderFailed(SessionState::Rendering);
        let Some(page) = self.page.as_ref() else {
            tracing::error!("Print requested before any content was loaded");
            exn::bail!(failed());
        };
        page.pdf(print_params(options)).await.or_raise(failed)
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        self.page = None;
        let limit = self.close_timeout;
        let outcome = tokio::time::timeout(limit, self.shut_down()).await;
        if outcome.is_err() {
            tracing::warn!(?limit, "Browser did not exit in time; killing the process");
            self.kill().await;
        }
        outcome.unwrap_or(Ok(()))
    }
}

fn print_params(options: &RenderOptions) -> PrintToPdfParams {
    let (paper_width, paper_height) = options.paper().inches();
    let [top, right, bottom, left] = options.margins().inches();
    PrintToPdfParams {
        print_background: Some(options.print_background()),
        paper_width: Some(paper_width),
        paper_height: Some(paper_height),
        margin_top: Some(top),
        margin_right: Some(right),
        margin_bottom: Some(bottom),
        margin_left: Some(left),
        scale: options.scale(),
        prefer_css_page_size: Some(false),
        display_header_footer: Some(false),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Margins;

    #[test]
    fn print_params_are_a4_with_background() {
        let params = print_params(&RenderOptions::new().with_scale(0.8));
        assert_eq!(params.print_background, Some(true));
        assert_eq!(params.scale, Some(0.8));
        assert!((params.paper_width.unwrap() - 210.0 / 25.4).abs() < 1e-9);
        assert!((params.paper_height.unwrap() - 297.0 / 25.4).abs() < 1e-9);
        assert_eq!(params.prefer_css_page_size, Some(false));
    }

    #[test]
    fn print_params_margins() {
        let params = print_params(&RenderOptions::new().with_margins(Margins::uniform(25.4)));
        assert_eq!(params.margin_top, Some(1.0));
        assert_eq!(params.margin_left, Some(1.0));
        assert_eq!(params.scale, None);
    }
}
