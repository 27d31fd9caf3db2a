//! HTML content extractor
//!
//! Scraper-based implementation of the [`ContentExtractor`] capability.
//!
//! # Link Extraction Rules
//!
//! **Include:**
//! - `<a href="...">` tags anywhere in the document
//!
//! **Exclude:**
//! - `<a href="..." download>`
//! - `javascript:`, `mailto:`, `tel:` links
//! - Data URIs
//! - Fragment-only links (same-page anchors)
//! - Anything that does not resolve to an HTTP(S) URL

use crate::extract::{
    ContentExtractor, ExtractError, ExtractedContent, ExtractedLink, PageMetadata,
};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Best-effort extractor over parsed HTML
///
/// Parsing never fails: the underlying parser error-corrects malformed
/// markup the way a browser does, so `extract` always returns content.
#[derive(Debug, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ContentExtractor for HtmlExtractor {
    fn extract(&self, html: &str, base_url: &Url) -> Result<ExtractedContent, ExtractError> {
        let document = Html::parse_document(html);

        Ok(ExtractedContent {
            title: extract_title(&document),
            main_text: extract_main_text(&document),
            markdown: render_markdown(&document),
            metadata: extract_metadata(&document, base_url),
            links: extract_links(&document, base_url),
        })
    }
}

/// Extracts the page title from the `<title>` tag
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts the page's main text, whitespace-normalized
///
/// Prefers `<main>` or `<article>` when present, falling back to the whole
/// `<body>`. Script, style, and template subtrees are never included.
fn extract_main_text(document: &Html) -> String {
    let root = ["main", "article", "body"]
        .iter()
        .filter_map(|tag| Selector::parse(tag).ok())
        .find_map(|sel| document.select(&sel).next());

    let mut raw = String::new();
    if let Some(element) = root {
        collect_text(element, &mut raw);
    }

    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            if is_invisible(el.value().name()) {
                continue;
            }
            collect_text(el, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        }
    }
}

fn is_invisible(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "noscript" | "template" | "svg")
}

/// Renders a markdown rendition of the page body
///
/// Covers the structural subset that matters for reading a crawled page
/// back: headings, paragraphs, lists, links, emphasis, code, and block
/// quotes. Everything else passes through as its text content.
fn render_markdown(document: &Html) -> String {
    let body = Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next());

    let mut out = String::new();
    if let Some(element) = body {
        render_blocks(element, &mut out);
    }

    // Collapse the blank-line runs left behind by nested blocks.
    let mut compact = String::with_capacity(out.len());
    let mut blank_run = 0usize;
    for line in out.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        compact.push_str(line.trim_end());
        compact.push('\n');
    }
    compact.trim().to_string()
}

fn render_blocks(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            let name = el.value().name();
            if is_invisible(name) {
                continue;
            }
            match name {
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    let level = name[1..].parse::<usize>().unwrap_or(1);
                    let text = inline_to_string(el);
                    if !text.is_empty() {
                        out.push('\n');
                        out.push_str(&"#".repeat(level));
                        out.push(' ');
                        out.push_str(&text);
                        out.push_str("\n\n");
                    }
                }
                "p" => {
                    let text = inline_to_string(el);
                    if !text.is_empty() {
                        out.push_str(&text);
                        out.push_str("\n\n");
                    }
                }
                "li" => {
                    let text = inline_to_string(el);
                    if !text.is_empty() {
                        out.push_str("- ");
                        out.push_str(&text);
                        out.push('\n');
                    }
                }
                "blockquote" => {
                    let text = inline_to_string(el);
                    if !text.is_empty() {
                        out.push_str("> ");
                        out.push_str(&text);
                        out.push_str("\n\n");
                    }
                }
                "pre" => {
                    let text = el.text().collect::<String>();
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        out.push_str("```\n");
                        out.push_str(trimmed);
                        out.push_str("\n```\n\n");
                    }
                }
                "ul" | "ol" => {
                    render_blocks(el, out);
                    out.push('\n');
                }
                "br" => out.push('\n'),
                _ => render_blocks(el, out),
            }
        } else if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push_str(trimmed);
                out.push('\n');
            }
        }
    }
}

fn render_inline(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            let name = el.value().name();
            if is_invisible(name) {
                continue;
            }
            match name {
                "a" => {
                    let text = el.text().collect::<String>();
                    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                    match el.value().attr("href") {
                        Some(href) if !text.is_empty() => {
                            out.push_str(&format!("[{}]({})", text, href));
                        }
                        _ => out.push_str(&text),
                    }
                    out.push(' ');
                }
                "strong" | "b" => {
                    let text = inline_to_string(el);
                    if !text.is_empty() {
                        out.push_str(&format!("**{}** ", text));
                    }
                }
                "em" | "i" => {
                    let text = inline_to_string(el);
                    if !text.is_empty() {
                        out.push_str(&format!("*{}* ", text));
                    }
                }
                "code" => {
                    let text = el.text().collect::<String>();
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        out.push_str(&format!("`{}` ", trimmed));
                    }
                }
                "br" => out.push(' '),
                _ => render_inline(el, out),
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

fn inline_to_string(element: ElementRef) -> String {
    let mut buf = String::new();
    render_inline(element, &mut buf);
    buf.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts head metadata: description, language, canonical URL, and Open
/// Graph properties
fn extract_metadata(document: &Html, base_url: &Url) -> PageMetadata {
    let mut metadata = PageMetadata::default();

    if let Ok(sel) = Selector::parse("html") {
        metadata.language = document
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr("lang"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
    }

    if let Ok(sel) = Selector::parse(r#"meta[name="description"]"#) {
        metadata.description = document
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
    }

    if let Ok(sel) = Selector::parse(r#"link[rel="canonical"]"#) {
        metadata.canonical_url = document
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr("href"))
            .and_then(|href| base_url.join(href).ok())
            .map(|u| u.to_string());
    }

    if let Ok(sel) = Selector::parse(r#"meta[property^="og:"]"#) {
        for element in document.select(&sel) {
            let property = element.value().attr("property").unwrap_or("");
            if let (Some(key), Some(content)) =
                (property.strip_prefix("og:"), element.value().attr("content"))
            {
                if !key.is_empty() && !content.is_empty() {
                    metadata
                        .open_graph
                        .insert(key.to_string(), content.to_string());
                }
            }
        }
    }

    metadata
}

/// Extracts all valid links from the document
fn extract_links(document: &Html, base_url: &Url) -> Vec<ExtractedLink> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    let text = element.text().collect::<String>();
                    links.push(ExtractedLink {
                        href: absolute_url,
                        text: text.split_whitespace().collect::<Vec<_>>().join(" "),
                    });
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs or non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
