//! Layered configuration for pagepress.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A TOML file: the path given on the command line, otherwise
//!    `config.toml` in the platform config directory (if it exists).
//! 3. `PAGEPRESS_*` environment variables, `__` separating nested keys
//!    (`PAGEPRESS_SERVER__PORT=8080`, `PAGEPRESS_RENDER__READINESS=network-idle`).
//! 4. The bare `PORT`, `API_KEY` and `NODE_ENV` variables that hosting
//!    platforms set.
//!
//! Everything is resolved once at startup. Nothing downstream reads the
//! environment afterwards.

pub mod error;

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use pagepress_render::{
    DEFAULT_ARGS, LaunchConfig, Margins, Readiness, RenderOptions, Renderer, StyleConfig, Viewport,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for namespaced environment variables.
pub const ENV_PREFIX: &str = "PAGEPRESS_";

/// Whether internal error detail may be shown to clients.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[serde(alias = "dev")]
    #[display("development")]
    Development,
    /// Anything that isn't explicitly development is treated as production.
    #[default]
    #[serde(alias = "prod", other)]
    #[display("production")]
    Production,
}
impl Environment {
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub render: RenderConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Download name suggested to clients, without the `.pdf` extension.
    pub filename: String,
    /// Largest accepted request body, in bytes.
    pub body_limit: usize,
}
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            filename: "document".to_string(),
            body_limit: 10 * 1024 * 1024,
        }
    }
}
impl ServerConfig {
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Shared-secret protection for the conversion endpoints. Disabled when no key is set.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(deserialize_with = "lenient_string")]
    pub api_key: Option<String>,
}
impl Debug for AuthConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AuthConfig").field("api_key", &self.api_key.as_ref().map(|_| "<redacted>")).finish()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Chrome/Chromium executable. Discovered when unset.
    pub chrome_path: Option<PathBuf>,
    /// Replaces the default launch flags entirely.
    pub args: Vec<String>,
    /// Appended to `args`.
    pub extra_args: Vec<String>,
    pub viewport: Option<Viewport>,
    pub readiness: Readiness,
    pub page_timeout_secs: u64,
    pub render_timeout_secs: u64,
    pub launch_timeout_secs: u64,
    /// Grace period for a browser to exit before it is killed.
    pub close_timeout_secs: u64,
    pub margins: Margins,
    pub scale: Option<f64>,
    /// Inject the builtin colour emoji font fallback.
    pub emoji_fonts: bool,
    /// Extra stylesheets injected after the builtin ones, in order.
    pub stylesheets: Vec<PathBuf>,
    /// Inline CSS injected last.
    pub inline_css: Option<String>,
    /// Simultaneous conversions; `0` for no limit.
    pub max_concurrent: usize,
}
impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            args: DEFAULT_ARGS.iter().map(|s| s.to_string()).collect(),
            extra_args: Vec::new(),
            viewport: Some(Viewport::default()),
            readiness: Readiness::default(),
            page_timeout_secs: 30,
            render_timeout_secs: 30,
            launch_timeout_secs: 20,
            close_timeout_secs: 10,
            margins: Margins::default(),
            scale: None,
            emoji_fonts: true,
            stylesheets: Vec::new(),
            inline_css: None,
            max_concurrent: 4,
        }
    }
}
impl RenderConfig {
    pub fn launch_config(&self) -> LaunchConfig {
        LaunchConfig::default()
            .with_executable(self.chrome_path.clone())
            .with_args(self.args.iter().chain(&self.extra_args).cloned())
            .with_viewport(self.viewport)
            .with_timeout(Duration::from_secs(self.launch_timeout_secs))
            .with_close_timeout(Duration::from_secs(self.close_timeout_secs))
    }

    pub fn options(&self) -> RenderOptions {
        RenderOptions::new().with_margins(self.margins).with_scale(self.scale)
    }

    /// Load every configured stylesheet. Files are read now, not per request.
    pub fn styles(&self) -> Result<StyleConfig> {
        let mut styles = StyleConfig::new();
        if self.emoji_fonts {
            styles = styles.with_emoji_fonts().or_raise(|| ErrorKind::Styles)?;
        }
        for path in &self.stylesheets {
            styles = styles.with_file(path).or_raise(|| ErrorKind::Styles)?;
        }
        if let Some(css) = &self.inline_css {
            styles = styles.with_content(css.clone());
        }
        Ok(styles)
    }

    /// Build the conversion pipeline this configuration describes.
    pub fn renderer(&self) -> Result<Renderer> {
        Ok(Renderer::new(self.launch_config(), self.styles()?)
            .with_options(self.options())
            .with_readiness(self.readiness)
            .with_page_timeout(Duration::from_secs(self.page_timeout_secs))
            .with_render_timeout(Duration::from_secs(self.render_timeout_secs))
            .with_max_concurrent(self.max_concurrent))
    }
}

impl Config {
    /// `config.toml` in the platform configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "pagepress").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// The provider stack, before extraction. Exposed for tests and tooling.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__")).merge(
            Env::raw().only(&["PORT", "NODE_ENV"]).map(|key| {
                if key.as_str().eq_ignore_ascii_case("port") { "server.port".into() } else { "environment".into() }
            }),
        );
        // Read verbatim: an all-digit key must not turn into a number.
        if let Some(key) = std::env::var("API_KEY").ok().filter(|k| !k.is_empty()) {
            figment = figment.merge(Serialized::default("auth.api_key", key));
        }
        figment
    }

    /// Load and validate configuration. An explicit `path` must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path
            && !path.is_file()
        {
            exn::bail!(ErrorKind::FileNotFound(path.display().to_string()));
        }
        let config: Config = Self::figment(path).extract().or_raise(|| ErrorKind::Load)?;
        let config = config.validate()?;
        tracing::debug!(
            environment = %config.environment,
            address = %config.server.address(),
            auth = config.auth.api_key.is_some(),
            readiness = %config.render.readiness,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn validate(mut self) -> Result<Self> {
        if self.server.port == 0 {
            exn::bail!(ErrorKind::Invalid("server.port"));
        }
        if self.server.body_limit == 0 {
            exn::bail!(ErrorKind::Invalid("server.body_limit"));
        }
        let render = &self.render;
        let timeouts = [
            render.page_timeout_secs,
            render.render_timeout_secs,
            render.launch_timeout_secs,
            render.close_timeout_secs,
        ];
        if timeouts.contains(&0) {
            exn::bail!(ErrorKind::Invalid("render.*_timeout_secs"));
        }
        if render.scale.is_some_and(|s| !RenderOptions::SCALE_RANGE.contains(&s)) {
            exn::bail!(ErrorKind::Invalid("render.scale"));
        }
        let margins = [render.margins.top, render.margins.right, render.margins.bottom, render.margins.left];
        if margins.iter().any(|m| !m.is_finite() || *m < 0.0) {
            exn::bail!(ErrorKind::Invalid("render.margins"));
        }
        let filename = rslug::slugify!(self.server.filename.trim_end_matches(".pdf"));
        self.server.filename = if filename.is_empty() { ServerConfig::default().filename } else { filename };
        if self.auth.api_key.as_deref().is_some_and(str::is_empty) {
            self.auth.api_key = None;
        }
        Ok(self)
    }
}

/// Accept scalars of any type as a string; environment values that look
/// numeric are parsed as numbers before they reach us.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        String(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Bool(bool),
    }
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::String(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn load_in(jail: &Jail, file: Option<&str>) -> Result<Config> {
        match file {
            Some(name) => Config::load(Some(&jail.directory().join(name))),
            // Point at a file that doesn't exist so the user's real config is never read.
            None => Config::figment(Some(&jail.directory().join("absent.toml")))
                .extract::<Config>()
                .or_raise(|| ErrorKind::Load)
                .and_then(Config::validate),
        }
    }

    #[test]
    fn defaults() {
        Jail::expect_with(|jail| {
            let config = load_in(jail, None).unwrap();
            assert_eq!(config.environment, Environment::Production);
            assert_eq!(config.server.port, 3000);
            assert_eq!(config.server.filename, "document");
            assert!(config.auth.api_key.is_none());
            assert_eq!(config.render.readiness, Readiness::FontsReady);
            assert_eq!(config.render.page_timeout_secs, 30);
            assert_eq!(config.render.max_concurrent, 4);
            assert!(config.render.emoji_fonts);
            assert_eq!(config.render.margins, Margins::default());
            Ok(())
        });
    }

    #[test]
    fn file_then_env_precedence() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "pagepress.toml",
                r#"
                environment = "development"

                [server]
                port = 4000
                filename = "Feedback Rapport.pdf"

                [render]
                readiness = "network-idle"
                scale = 0.8
                max_concurrent = 0

                [render.margins]
                top = 20.0
                "#,
            )?;
            jail.set_env("PAGEPRESS_RENDER__PAGE_TIMEOUT_SECS", "15");
            jail.set_env("PORT", "9000");
            let config = load_in(jail, Some("pagepress.toml")).unwrap();
            assert_eq!(config.environment, Environment::Development);
            assert_eq!(config.server.port, 9000);
            assert_eq!(config.server.filename, "feedback-rapport");
            assert_eq!(config.render.readiness, Readiness::NetworkIdle);
            assert_eq!(config.render.scale, Some(0.8));
            assert_eq!(config.render.max_concurrent, 0);
            assert_eq!(config.render.page_timeout_secs, 15);
            assert_eq!(config.render.margins.top, 20.0);
            assert_eq!(config.render.margins.left, 10.0);
            Ok(())
        });
    }

    #[rstest]
    #[case("development", Environment::Development)]
    #[case("dev", Environment::Development)]
    #[case("production", Environment::Production)]
    #[case("test", Environment::Production)]
    fn node_env(#[case] value: &str, #[case] expected: Environment) {
        Jail::expect_with(|jail| {
            jail.set_env("NODE_ENV", value);
            assert_eq!(load_in(jail, None).unwrap().environment, expected);
            Ok(())
        });
    }

    #[rstest]
    #[case("API_KEY", "s3cret", "s3cret")]
    #[case("API_KEY", "0123", "0123")]
    #[case("PAGEPRESS_AUTH__API_KEY", "abc", "abc")]
    #[case("PAGEPRESS_AUTH__API_KEY", "12345", "12345")]
    fn api_key_from_env(#[case] var: &str, #[case] value: &str, #[case] expected: &str) {
        Jail::expect_with(|jail| {
            jail.set_env(var, value);
            assert_eq!(load_in(jail, None).unwrap().auth.api_key.as_deref(), Some(expected));
            Ok(())
        });
    }

    #[test]
    fn api_key_is_redacted() {
        let auth = AuthConfig { api_key: Some("hunter2".into()) };
        assert!(!format!("{auth:?}").contains("hunter2"));
    }

    #[rstest]
    #[case("PAGEPRESS_SERVER__PORT", "0", "server.port")]
    #[case("PAGEPRESS_RENDER__SCALE", "3.5", "render.scale")]
    #[case("PAGEPRESS_RENDER__PAGE_TIMEOUT_SECS", "0", "render.*_timeout_secs")]
    #[case("PAGEPRESS_RENDER__CLOSE_TIMEOUT_SECS", "0", "render.*_timeout_secs")]
    fn rejects_invalid(#[case] var: &str, #[case] value: &str, #[case] field: &'static str) {
        Jail::expect_with(|jail| {
            jail.set_env(var, value);
            let err = load_in(jail, None).unwrap_err();
            assert_eq!(*err, ErrorKind::Invalid(field));
            Ok(())
        });
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::FileNotFound(_)));
    }

    #[test]
    fn render_config_builds_pipeline() {
        let mut render = RenderConfig { scale: Some(0.8), extra_args: vec!["--lang=nl".into()], ..Default::default() };
        render.max_concurrent = 2;
        let launch = render.launch_config();
        assert_eq!(launch.args.last().map(String::as_str), Some("--lang=nl"));
        assert_eq!(launch.args.len(), DEFAULT_ARGS.len() + 1);
        assert_eq!(launch.timeout, Duration::from_secs(20));
        assert_eq!(launch.close_timeout, Duration::from_secs(10));
        assert_eq!(render.options().scale(), Some(0.8));
        assert_eq!(render.styles().unwrap().len(), 1);
        let renderer = render.renderer().unwrap();
        assert_eq!(renderer.max_concurrent(), 2);
        assert_eq!(renderer.available_slots(), Some(2));
    }

    #[test]
    fn missing_stylesheet_fails_fast() {
        let render = RenderConfig { stylesheets: vec!["/no/such.css".into()], ..Default::default() };
        let err = render.styles().err().unwrap();
        assert_eq!(*err, ErrorKind::Styles);
    }
}
