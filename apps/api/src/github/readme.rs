//! Preview-image extraction from README text.
//!
//! Pure scanning, no network: the first absolute HTTP(S) image reference
//! wins, whether it appears as a Markdown image or an HTML `<img>` tag. On a
//! positional tie the Markdown form is preferred.

use std::sync::OnceLock;

use regex::Regex;

static MARKDOWN_IMAGE: OnceLock<Regex> = OnceLock::new();
static HTML_IMAGE: OnceLock<Regex> = OnceLock::new();

fn markdown_image() -> &'static Regex {
    MARKDOWN_IMAGE.get_or_init(|| {
        Regex::new(r#"!\[[^\]]*\]\(\s*(https?://[^)\s]+)"#).expect("valid markdown image pattern")
    })
}

fn html_image() -> &'static Regex {
    HTML_IMAGE.get_or_init(|| {
        Regex::new(r#"<img[^>]*\bsrc\s*=\s*["'](https?://[^"']+)["']"#)
            .expect("valid html image pattern")
    })
}

/// Scans `text` for the first absolute image URL.
///
/// Relative paths are ignored on purpose — the feed cannot resolve them
/// without knowing the repository's raw-content root.
pub fn extract_preview_image(text: &str) -> Option<String> {
    let markdown = first_url(markdown_image(), text);
    let html = first_url(html_image(), text);

    match (markdown, html) {
        (Some((md_pos, md_url)), Some((html_pos, _))) if md_pos <= html_pos => Some(md_url),
        (_, Some((_, html_url))) => Some(html_url),
        (Some((_, md_url)), None) => Some(md_url),
        (None, None) => None,
    }
}

fn first_url(pattern: &Regex, text: &str) -> Option<(usize, String)> {
    let captures = pattern.captures(text)?;
    let whole = captures.get(0)?;
    let url = captures.get(1)?;
    Some((whole.start(), url.as_str().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_markdown_image() {
        let text = "# Title\n\n![screenshot](https://example.com/shot.png)\n";
        assert_eq!(
            extract_preview_image(text).as_deref(),
            Some("https://example.com/shot.png")
        );
    }

    #[test]
    fn test_extracts_html_image() {
        let text = r#"<p align="center"><img width="600" src="https://example.com/logo.svg"></p>"#;
        assert_eq!(
            extract_preview_image(text).as_deref(),
            Some("https://example.com/logo.svg")
        );
    }

    #[test]
    fn test_first_by_position_wins() {
        let text = concat!(
            r#"<img src="https://example.com/first.png">"#,
            "\n\n![later](https://example.com/second.png)",
        );
        assert_eq!(
            extract_preview_image(text).as_deref(),
            Some("https://example.com/first.png")
        );
    }

    #[test]
    fn test_markdown_preferred_when_earlier_or_equal() {
        let text = concat!(
            "![badge](https://example.com/badge.svg)",
            r#"<img src="https://example.com/tag.png">"#,
        );
        assert_eq!(
            extract_preview_image(text).as_deref(),
            Some("https://example.com/badge.svg")
        );
    }

    #[test]
    fn test_relative_urls_are_skipped() {
        let text = "![local](./docs/shot.png)\n<img src='assets/logo.png'>";
        assert_eq!(extract_preview_image(text), None);
    }

    #[test]
    fn test_skips_relative_markdown_but_takes_absolute_html() {
        let text = "![local](./docs/shot.png)\n<img src=\"https://example.com/real.png\">";
        assert_eq!(
            extract_preview_image(text).as_deref(),
            Some("https://example.com/real.png")
        );
    }

    #[test]
    fn test_no_images_yields_none() {
        assert_eq!(extract_preview_image("plain text, no images here"), None);
        assert_eq!(extract_preview_image(""), None);
    }

    #[test]
    fn test_single_quoted_html_src() {
        let text = "<img alt='x' src='https://example.com/sq.png'/>";
        assert_eq!(
            extract_preview_image(text).as_deref(),
            Some("https://example.com/sq.png")
        );
    }
}
