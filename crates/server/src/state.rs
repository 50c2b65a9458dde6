use pagepress_config::{Config, Environment};
use pagepress_render::Renderer;
use std::sync::Arc;

/// Everything a request handler needs, shared across connections.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    renderer: Renderer,
    api_key: Option<String>,
    environment: Environment,
    filename: String,
    body_limit: usize,
}

impl AppState {
    pub fn new(renderer: Renderer, config: &Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                renderer,
                api_key: config.auth.api_key.clone(),
                environment: config.environment,
                filename: config.server.filename.clone(),
                body_limit: config.server.body_limit,
            }),
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.inner.renderer
    }

    /// The key clients must present, if authentication is enabled.
    pub fn api_key(&self) -> Option<&str> {
        self.inner.api_key.as_deref()
    }

    pub fn environment(&self) -> Environment {
        self.inner.environment
    }

    /// Download name without the `.pdf` extension.
    pub fn filename(&self) -> &str {
        &self.inner.filename
    }

    pub fn body_limit(&self) -> usize {
        self.inner.body_limit
    }
}
