//! Stylesheet injection into raw HTML.
//!
//! Plain substring search, no parsing: the first opening `<head>` tag gets the
//! stylesheets directly after it; failing that a `<head>` is synthesised after
//! the first opening `<html>` tag; failing that the input is treated as a
//! fragment and wrapped in a minimal document. Tag names are matched ASCII
//! case-insensitively and may carry attributes. A tag that appears inside a
//! comment, attribute value or script block will be matched all the same.

use std::borrow::Cow;

/// Where the styles ended up. Reported in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Placement {
    AfterHead,
    SynthesizedHead,
    Wrapped,
    Untouched,
}

pub(crate) fn augment<'a>(html: &'a str, styles: &str) -> (Cow<'a, str>, Placement) {
    if styles.is_empty() {
        return (Cow::Borrowed(html), Placement::Untouched);
    }
    if let Some(pos) = find_open_tag(html, "head") {
        let mut out = String::with_capacity(html.len() + styles.len());
        out.push_str(&html[..pos]);
        out.push_str(styles);
        out.push_str(&html[pos..]);
        return (Cow::Owned(out), Placement::AfterHead);
    }
    if let Some(pos) = find_open_tag(html, "html") {
        let mut out = String::with_capacity(html.len() + styles.len() + 13);
        out.push_str(&html[..pos]);
        out.push_str("<head>");
        out.push_str(styles);
        out.push_str("</head>");
        out.push_str(&html[pos..]);
        return (Cow::Owned(out), Placement::SynthesizedHead);
    }
    let wrapped = format!("<!DOCTYPE html><html><head>{styles}</head><body>{html}</body></html>");
    (Cow::Owned(wrapped), Placement::Wrapped)
}

/// Byte offset just past the `>` of the first opening `<name ...>` tag.
fn find_open_tag(html: &str, name: &str) -> Option<usize> {
    let bytes = html.as_bytes();
    let needle = format!("<{name}");
    let needle = needle.as_bytes();
    let mut from = 0;
    while let Some(offset) = bytes[from..].windows(needle.len()).position(|w| w.eq_ignore_ascii_case(needle)) {
        let after = from + offset + needle.len();
        match bytes.get(after) {
            Some(b'>') => return Some(after + 1),
            Some(b) if b.is_ascii_whitespace() || *b == b'/' => {
                return bytes[after..].iter().position(|&b| b == b'>').map(|p| after + p + 1);
            },
            // `<header>`, `<htmlfoo>`, or the input ended mid-tag.
            _ => from = after,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const CSS: &str = "<style>x</style>";

    #[test]
    fn inserts_directly_after_head() {
        let html = "<!DOCTYPE html><html><head><title>T</title></head><body>Hi</body></html>";
        let (out, placement) = augment(html, CSS);
        assert_eq!(placement, Placement::AfterHead);
        assert_eq!(out, "<!DOCTYPE html><html><head><style>x</style><title>T</title></head><body>Hi</body></html>");
        assert_eq!(out.matches(CSS).count(), 1);
    }

    #[rstest]
    #[case("<HEAD>", "<HEAD><style>x</style>")]
    #[case("<head lang=\"en\">", "<head lang=\"en\"><style>x</style>")]
    #[case("<head\n>", "<head\n><style>x</style>")]
    #[case("<header>a</header><head>", "<header>a</header><head><style>x</style>")]
    fn head_variants(#[case] html: &str, #[case] expected: &str) {
        let (out, placement) = augment(html, CSS);
        assert_eq!(placement, Placement::AfterHead);
        assert_eq!(out, expected);
    }

    #[test]
    fn only_first_head_is_used() {
        let (out, _) = augment("<head></head><head></head>", CSS);
        assert_eq!(out, "<head><style>x</style></head><head></head>");
    }

    #[test]
    fn synthesizes_head_after_html() {
        let html = "<html><body><h1>Hi</h1></body></html>";
        let (out, placement) = augment(html, CSS);
        assert_eq!(placement, Placement::SynthesizedHead);
        assert_eq!(out, "<html><head><style>x</style></head><body><h1>Hi</h1></body></html>");
        assert_eq!(out.matches("<head>").count(), 1);
    }

    #[test]
    fn synthesizes_head_after_html_with_attributes() {
        let (out, placement) = augment("<!doctype html><HTML lang=\"nl\"><body>x</body></HTML>", CSS);
        assert_eq!(placement, Placement::SynthesizedHead);
        assert_eq!(out, "<!doctype html><HTML lang=\"nl\"><head><style>x</style></head><body>x</body></HTML>");
    }

    #[rstest]
    #[case("<h1>Hi 👋</h1>")]
    #[case("plain text")]
    #[case("<header>not a head</header>")]
    #[case("<htmlish>")]
    fn wraps_fragments(#[case] fragment: &str) {
        let (out, placement) = augment(fragment, CSS);
        assert_eq!(placement, Placement::Wrapped);
        assert!(out.starts_with("<!DOCTYPE html><html><head><style>x</style></head><body>"));
        assert!(out.ends_with("</body></html>"));
        let body = out.split("<body>").nth(1).unwrap().strip_suffix("</body></html>").unwrap();
        assert_eq!(body, fragment);
    }

    #[test]
    fn unterminated_tag_is_not_a_match() {
        let (_, placement) = augment("<head lang=", CSS);
        assert_eq!(placement, Placement::Wrapped);
    }

    #[test]
    fn no_styles_no_change() {
        let (out, placement) = augment("<p>x</p>", "");
        assert!(matches!(out, Cow::Borrowed("<p>x</p>")));
        assert_eq!(placement, Placement::Untouched);
    }

    #[test]
    fn tag_in_comment_still_matches() {
        // Known limitation of substring matching.
        let (out, _) = augment("<!-- <head> --><html><head></head></html>", CSS);
        assert!(out.starts_with("<!-- <head><style>x</style> -->"));
    }
}
