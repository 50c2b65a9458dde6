//! Stylesheets compiled into the binary from `assets/styles/`.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use rust_embed::Embed;
use std::borrow::Cow;

#[derive(Embed)]
#[folder = "../../assets/styles/"]
pub struct Builtins;
impl Builtins {
    /// The colour emoji font fallback.
    pub const fn emoji() -> &'static str {
        "emoji.css"
    }

    /// A builtin stylesheet as text, with the origin label it is recorded under.
    pub fn stylesheet(name: &str) -> Result<(String, String)> {
        let name = name.trim().trim_start_matches("builtin:");
        let origin = format!("builtin:{name}");
        let file = Self::get(name).ok_or_raise(|| ErrorKind::AssetNotFound(origin.clone()))?;
        let css = String::from_utf8(file.data.into_owned()).or_raise(|| ErrorKind::AssetNotFound(origin.clone()))?;
        Ok((origin, css))
    }

    pub fn names() -> Vec<Cow<'static, str>> {
        Self::iter().filter(|name| name.ends_with(".css")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn emoji_stylesheet_declares_colour_fonts() {
        let (origin, css) = Builtins::stylesheet(Builtins::emoji()).unwrap();
        assert_eq!(origin, "builtin:emoji.css");
        assert!(css.contains("@font-face"));
        assert!(css.contains("Noto Color Emoji"));
        assert!(Builtins::names().iter().any(|name| name == Builtins::emoji()));
    }

    #[rstest]
    #[case("builtin:emoji.css")]
    #[case(" emoji.css ")]
    fn accepts_prefixed_and_padded_names(#[case] name: &str) {
        assert_eq!(Builtins::stylesheet(name).unwrap().0, "builtin:emoji.css");
    }

    #[test]
    fn missing_builtin_is_named() {
        let err = Builtins::stylesheet("builtin:nope.css").unwrap_err();
        assert_eq!(*err, ErrorKind::AssetNotFound("builtin:nope.css".to_string()));
    }
}
