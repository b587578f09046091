//! Page metadata extraction.
//!
//! Parses upstream HTML with `scraper` and pulls the three pieces of text a
//! preview card shows. Nothing here escapes or sanitizes text: the upstream is
//! a single first-party site. If that trust boundary ever changes, escape the
//! fields before they reach the template.

use crate::{Error, PageMetadata, Result};
use scraper::{Html, Selector};

const TITLE_SELECTOR: &str = "title";
const SUPER_TITLE_SELECTOR: &str = "#header > div > p:first-of-type";
const DESCRIPTION_SELECTOR: &str = r#"meta[property="og:description"]"#;

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Other(format!("Invalid selector {:?}: {:?}", css, e)))
}

/// Remove a trailing ` - <site>` or ` – <site>` from a page title.
pub fn strip_site_suffix<'a>(title: &'a str, site_name: &str) -> &'a str {
    for dash in ['-', '\u{2013}'] {
        let suffix = format!(" {} {}", dash, site_name);
        if let Some(stripped) = title.strip_suffix(suffix.as_str()) {
            return stripped;
        }
    }
    title
}

/// Extract [`PageMetadata`] from an HTML document.
///
/// The site suffix is removed from the first `<title>`, then surrounding
/// whitespace is trimmed. Fails with [`Error::NoTitle`] when there is no
/// `<title>` or nothing is left, so a whitespace-only title is an error too.
pub fn extract_metadata(html: &str, site_name: &str) -> Result<PageMetadata> {
    let document = Html::parse_document(html);

    let raw_title = document
        .select(&selector(TITLE_SELECTOR)?)
        .next()
        .map(|n| n.text().collect::<String>())
        .unwrap_or_default();
    let title = strip_site_suffix(raw_title.trim_end(), site_name).trim().to_string();
    if title.is_empty() {
        return Err(Error::NoTitle);
    }

    let super_title = document
        .select(&selector(SUPER_TITLE_SELECTOR)?)
        .next()
        .map(|n| n.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty());

    let description = document
        .select(&selector(DESCRIPTION_SELECTOR)?)
        .next()
        .and_then(|n| n.value().attr("content"))
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty());

    Ok(PageMetadata {
        title,
        super_title,
        description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "Tailwind CSS";

    #[test]
    fn strips_hyphen_and_en_dash_suffixes() {
        assert_eq!(strip_site_suffix("Installation - Tailwind CSS", SITE), "Installation");
        assert_eq!(strip_site_suffix("Installation \u{2013} Tailwind CSS", SITE), "Installation");
        assert_eq!(strip_site_suffix("Tailwind CSS", SITE), "Tailwind CSS");
        // only the trailing occurrence goes
        assert_eq!(
            strip_site_suffix("Tailwind CSS - Tailwind CSS - Tailwind CSS", SITE),
            "Tailwind CSS - Tailwind CSS"
        );
    }

    #[test]
    fn extracts_all_fields() {
        let html = r#"<!DOCTYPE html>
<html>
<head>
  <title>Padding - Tailwind CSS</title>
  <meta property="og:description" content="Utilities for controlling an element's padding.">
</head>
<body>
  <header id="header">
    <div>
      <p>Spacing</p>
      <p>Not this one</p>
    </div>
    <h1>Padding</h1>
  </header>
</body>
</html>"#;
        let meta = extract_metadata(html, SITE).unwrap();
        assert_eq!(meta.title, "Padding");
        assert_eq!(meta.super_title.as_deref(), Some("Spacing"));
        assert_eq!(
            meta.description.as_deref(),
            Some("Utilities for controlling an element's padding.")
        );
    }

    #[test]
    fn optional_fields_are_none_when_absent() {
        let html = "<html><head><title>Installation \u{2013} Tailwind CSS</title></head><body></body></html>";
        let meta = extract_metadata(html, SITE).unwrap();
        assert_eq!(meta.title, "Installation");
        assert_eq!(meta.super_title, None);
        assert_eq!(meta.description, None);
    }

    #[test]
    fn empty_description_is_omitted() {
        let html = r#"<html><head><title>A</title><meta property="og:description" content=""></head></html>"#;
        let meta = extract_metadata(html, SITE).unwrap();
        assert_eq!(meta.description, None);
    }

    #[test]
    fn missing_title_is_an_error() {
        let html = "<html><head></head><body><h1>Hello</h1></body></html>";
        assert!(matches!(extract_metadata(html, SITE), Err(Error::NoTitle)));
    }

    #[test]
    fn whitespace_only_title_is_an_error() {
        let html = "<html><head><title> \n\t </title></head></html>";
        assert!(matches!(extract_metadata(html, SITE), Err(Error::NoTitle)));
    }

    #[test]
    fn title_that_is_only_the_suffix_is_an_error() {
        let html = "<html><head><title> - Tailwind CSS</title></head></html>";
        assert!(matches!(extract_metadata(html, SITE), Err(Error::NoTitle)));
    }

    #[test]
    fn super_title_must_be_inside_header() {
        let html = r#"<html><head><title>Flex</title></head>
<body><div><div><p>Outside</p></div></div></body></html>"#;
        let meta = extract_metadata(html, SITE).unwrap();
        assert_eq!(meta.super_title, None);
    }
}
