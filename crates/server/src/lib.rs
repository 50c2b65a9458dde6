//! HTTP surface for the conversion pipeline.
//!
//! | Route                         | Method    | Auth |
//! |-------------------------------|-----------|------|
//! | `/`                           | `GET`     | no   |
//! | `/convert`                    | `POST`    | yes  |
//! | `/convert-html-to-pdf`        | `POST`    | yes  |
//! | `/test-auth`                  | `GET`     | yes  |
//!
//! Conversion routes answer `OPTIONS` with `200` and any other method with a
//! JSON `405`. Every response carries permissive CORS headers.

pub mod error;
mod auth;
mod handlers;
mod response;
mod state;

pub use crate::handlers::{CONVERT_PATHS, ConvertRequest};
pub use crate::response::PdfResponse;
pub use crate::state::AppState;

use crate::error::{ErrorKind, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use exn::ResultExt;
use pagepress_config::Config;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the application router around `state`.
pub fn router(state: AppState) -> Router {
    let auth = middleware::from_fn_with_state(state.clone(), auth::require_api_key);
    let convert = post(handlers::convert)
        .layer(auth.clone())
        .options(handlers::preflight)
        .fallback(handlers::method_not_allowed);

    let mut router = Router::new().route("/", get(handlers::health));
    for path in CONVERT_PATHS {
        router = router.route(path, convert.clone());
    }
    router
        .route("/test-auth", get(handlers::test_auth).layer(auth))
        .layer(DefaultBodyLimit::max(state.body_limit()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until interrupted.
///
/// In-flight conversions are allowed to finish, so every browser they started
/// is closed before this returns.
#[tracing::instrument(skip_all)]
pub async fn serve(config: &Config) -> Result<()> {
    let renderer = config.render.renderer().or_raise(|| ErrorKind::Setup)?;
    let state = AppState::new(renderer, config);
    let address = config.server.address();
    let listener = TcpListener::bind(address).await.or_raise(|| ErrorKind::Bind(address))?;
    tracing::info!(
        %address,
        environment = %config.environment,
        auth = state.api_key().is_some(),
        max_concurrent = state.renderer().max_concurrent(),
        "Listening"
    );
    if state.api_key().is_none() {
        tracing::warn!("No API key configured; conversion endpoints are open");
    }
    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await.or_raise(|| ErrorKind::Serve)?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(err) => {
                tracing::error!(error = %err, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown requested; waiting for in-flight conversions");
}
