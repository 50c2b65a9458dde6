//! Browser session lifecycle.
//!
//! A conversion walks a browser through a fixed sequence of states:
//!
//! ```text
//! Uninitialized -> Launching -> Ready -> ContentLoading -> Rendering -> Closed
//!                      \           \            \              \
//!                       +-----------+------------+--------------+--> Failed -> Closed
//! ```
//!
//! The browser itself sits behind the [`Launcher`]/[`Session`] seam so the
//! state machine can be driven against a test double. Once a session exists it
//! is owned by a [`SessionGuard`], which closes it exactly once: explicitly via
//! [`SessionGuard::close`] on every normal exit, or from [`Drop`] if the
//! conversion future is abandoned half way through.

use crate::error::Result;
use crate::launch::LaunchConfig;
use crate::options::{Readiness, RenderOptions};
use async_trait::async_trait;
use derive_more::Display;
use std::time::Duration;

/// Where a conversion currently is in its life.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum SessionState {
    #[display("initializing")]
    Uninitialized,
    #[display("launching the browser")]
    Launching,
    #[display("opening a page")]
    Ready,
    #[display("loading content")]
    ContentLoading,
    #[display("rendering")]
    Rendering,
    #[display("closed")]
    Closed,
    #[display("failed")]
    Failed,
}
impl SessionState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Closed, _) => false,
            (Failed, Closed) => true,
            (Failed, _) => false,
            (_, Failed) => true,
            (Uninitialized, Launching) => true,
            (Launching, Ready) => true,
            (Ready, ContentLoading) => true,
            (ContentLoading, Rendering) => true,
            (Ready | ContentLoading | Rendering, Closed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Starts browser sessions. One call per conversion; sessions are never pooled.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, config: &LaunchConfig) -> Result<Box<dyn Session>>;
}

/// A single running browser with one page.
#[async_trait]
pub trait Session: Send {
    /// Replace the page's document with `html` and wait until `readiness` is satisfied.
    async fn load(&mut self, html: &str, readiness: Readiness) -> Result<()>;

    /// Print the loaded document.
    async fn print(&mut self, options: &RenderOptions) -> Result<Vec<u8>>;

    /// Terminate the browser process and release everything it holds.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Owns a launched [`Session`] and guarantees it is closed exactly once.
///
/// Closing is bounded by `close_timeout`; a session that does not finish in
/// time is dropped, which kills whatever process it still holds.
pub(crate) struct SessionGuard {
    session: Option<Box<dyn Session>>,
    close_timeout: Duration,
}
impl SessionGuard {
    pub(crate) fn new(session: Box<dyn Session>, close_timeout: Duration) -> Self {
        Self { session: Some(session), close_timeout }
    }

    pub(crate) fn session(&mut self) -> &mut dyn Session {
        // Only `close` and `drop` take the session, and both consume the guard.
        self.session.as_deref_mut().expect("session is present until the guard is consumed")
    }

    /// Close the browser. Failures are logged and swallowed: the conversion
    /// outcome has already been decided by the time we get here.
    pub(crate) async fn close(mut self) {
        if let Some(session) = self.session.take() {
            shut_down(session, self.close_timeout).await;
        }
    }
}

async fn shut_down(session: Box<dyn Session>, limit: Duration) {
    match tokio::time::timeout(limit, session.close()).await {
        Ok(Ok(())) => {},
        Ok(Err(e)) => tracing::warn!(error = ?e, "Failed to close browser session"),
        Err(_) => tracing::warn!(?limit, "Browser session did not close in time; abandoning it"),
    }
}
impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        tracing::debug!("Conversion abandoned mid-flight; scheduling browser shutdown");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(shut_down(session, self.close_timeout));
            },
            // Without a runtime there is nothing to drive the close; dropping
            // the session still kills the child process.
            Err(_) => drop(session),
        }
    }
}

/// Tracks and logs the state of one conversion.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: SessionState,
}
impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self { state: SessionState::Uninitialized }
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: SessionState) {
        debug_assert!(self.state.can_transition_to(next), "illegal transition {:?} -> {:?}", self.state, next);
        tracing::trace!(from = ?self.state, to = ?next, "Session state transition");
        self.state = next;
    }

    /// Move to [`SessionState::Failed`], returning the state the failure happened in.
    pub(crate) fn fail(&mut self) -> SessionState {
        let failed_in = self.state;
        self.advance(SessionState::Failed);
        failed_in
    }
}

#[cfg(test)]
mod tests {
    use super::SessionState::*;
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Uninitialized, Launching)]
    #[case(Launching, Ready)]
    #[case(Ready, ContentLoading)]
    #[case(ContentLoading, Rendering)]
    #[case(Rendering, Closed)]
    #[case(Launching, Failed)]
    #[case(ContentLoading, Failed)]
    #[case(Rendering, Failed)]
    #[case(Failed, Closed)]
    #[case(Ready, Closed)]
    fn legal_transitions(#[case] from: SessionState, #[case] to: SessionState) {
        assert!(from.can_transition_to(to));
    }

    #[rstest]
    #[case(Uninitialized, Rendering)]
    #[case(Launching, ContentLoading)]
    #[case(Rendering, ContentLoading)]
    #[case(Closed, Failed)]
    #[case(Closed, Launching)]
    #[case(Failed, Ready)]
    fn illegal_transitions(#[case] from: SessionState, #[case] to: SessionState) {
        assert!(!from.can_transition_to(to));
    }

    #[rstest]
    #[case(Launching, "launching the browser")]
    #[case(Ready, "opening a page")]
    #[case(ContentLoading, "loading content")]
    fn states_describe_the_pending_step(#[case] state: SessionState, #[case] label: &str) {
        assert_eq!(state.to_string(), label);
    }

    #[test]
    fn lifecycle_records_failure_origin() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(Launching);
        lifecycle.advance(Ready);
        lifecycle.advance(ContentLoading);
        assert_eq!(lifecycle.fail(), ContentLoading);
        assert_eq!(lifecycle.state(), Failed);
        lifecycle.advance(Closed);
        assert!(lifecycle.state().is_terminal());
    }
}
