//! Stylesheets injected into every converted document.
//!
//! The emoji font fallback ships inside the binary; deployments can add their
//! own CSS from files or inline strings. Everything is loaded up front, and
//! each conversion only splices the prepared `<style>` blocks into its HTML.

mod assets;
mod inject;

pub(crate) use self::inject::Placement;
use crate::error::{ErrorKind, Result};
use crate::style::assets::Builtins;
use exn::ResultExt;
use std::borrow::Cow;
use std::path::Path;

/// Stylesheets in injection order.
///
/// Injected CSS lands before anything the document declares itself, so a
/// document can always override it.
///
/// ```no_run
/// # fn main() -> pagepress_render::error::Result<()> {
/// let styles = pagepress_render::StyleConfig::new()
///     .with_emoji_fonts()?
///     .with_file("/etc/pagepress/print.css")?
///     .with_content("body { font-size: 11pt; }");
/// assert_eq!(styles.len(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct StyleConfig {
    origins: Vec<String>,
    // Rendered once as styles are added; every conversion injects the same markup.
    markup: String,
}
impl StyleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stylesheets compiled into the binary.
    pub fn list_builtins() -> Vec<Cow<'static, str>> {
        Builtins::names()
    }

    /// Add a stylesheet compiled into the binary, such as `emoji.css`.
    pub fn with_builtin(self, name: impl AsRef<str>) -> Result<Self> {
        let (origin, css) = Builtins::stylesheet(name.as_ref())?;
        Ok(self.push(origin, css))
    }

    /// Adds the colour emoji font fallback.
    pub fn with_emoji_fonts(self) -> Result<Self> {
        self.with_builtin(Builtins::emoji())
    }

    /// Add a stylesheet from disk. The file is read now, not per conversion.
    pub fn with_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            exn::bail!(ErrorKind::AssetNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path).or_raise(|| ErrorKind::Io)?;
        Ok(self.push(path.display().to_string(), content))
    }

    pub fn with_content(self, content: impl Into<String>) -> Self {
        self.push("inline".to_string(), content.into())
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    /// Where each stylesheet came from, in application order.
    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.origins.iter().map(String::as_str)
    }

    /// The `<style>` blocks that get injected, one per stylesheet.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Inject every stylesheet into `html`.
    pub(crate) fn apply<'a>(&self, html: &'a str) -> (Cow<'a, str>, Placement) {
        inject::augment(html, &self.markup)
    }

    fn push(mut self, origin: String, content: String) -> Self {
        self.markup.push_str("<style>");
        self.markup.push_str(&content);
        self.markup.push_str("</style>\n");
        self.origins.push(origin);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_leaves_html_alone() {
        let styles = StyleConfig::new();
        let (html, placement) = styles.apply("<p>hi</p>");
        assert_eq!(html, "<p>hi</p>");
        assert_eq!(placement, Placement::Untouched);
    }

    #[test]
    fn styles_are_applied_in_order() {
        let styles = StyleConfig::new().with_content("a{}").with_content("b{}");
        assert_eq!(styles.markup(), "<style>a{}</style>\n<style>b{}</style>\n");
        let (html, _) = styles.apply("<head></head>");
        assert_eq!(html, "<head><style>a{}</style>\n<style>b{}</style>\n</head>");
    }

    #[test]
    fn emoji_builtin() {
        let styles = StyleConfig::new().with_emoji_fonts().unwrap();
        assert_eq!(styles.len(), 1);
        assert_eq!(styles.origins().collect::<Vec<_>>(), vec!["builtin:emoji.css"]);
        assert!(styles.markup().starts_with("<style>"));
        assert!(styles.markup().contains("Pagepress Emoji"));
    }

    #[test]
    fn unknown_builtin() {
        let err = StyleConfig::new().with_builtin("nope.css").err().unwrap();
        assert!(matches!(&*err, ErrorKind::AssetNotFound(name) if name == "builtin:nope.css"));
    }

    #[test]
    fn file_is_read_eagerly() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "body {{ color: red; }}").unwrap();
        let styles = StyleConfig::new().with_file(file.path()).unwrap();
        drop(file);
        assert!(styles.markup().contains("color: red"));
    }

    #[test]
    fn missing_file() {
        let err = StyleConfig::new().with_file("/no/such/file.css").err().unwrap();
        assert!(matches!(&*err, ErrorKind::AssetNotFound(_)));
    }
}
