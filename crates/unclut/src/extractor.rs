//! Unsubscribe link extraction from message headers and bodies.

use crate::gmail_client::{BodyPart, MailMessage};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

static HEADER_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([^>]*)>").unwrap());

static HREF_PATTERN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)unsubscribe|email_preferences|preferences|optout|opt-out|manage_preferences|emailpreferences|email-preferences|email_optout|email-optout",
    )
    .unwrap()
});

static MAILTO_UNSUB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)mailto:.*unsubscribe").unwrap());

static TEXT_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)https?://[^\s"]+unsubscribe[^\s">]*"#).unwrap());

pub fn is_http_link(link: &str) -> bool {
    link.starts_with("http://") || link.starts_with("https://")
}

pub fn is_mailto_link(link: &str) -> bool {
    link.starts_with("mailto:")
}

/// All unsubscribe links in a message, first occurrence first.
///
/// A `List-Unsubscribe` header with usable entries wins; the body is only
/// scanned when the header yields nothing.
pub fn extract_unsubscribe_links(message: &MailMessage) -> Vec<String> {
    let mut links = Vec::new();

    if let Some(header) = message.header("List-Unsubscribe") {
        links = links_from_header(header);
        if !links.is_empty() {
            tracing::debug!("Found {} unsubscribe links in headers", links.len());
        }
    }

    if links.is_empty() {
        collect_from_part(&message.payload, &mut links);
    }

    dedupe(links)
}

fn links_from_header(value: &str) -> Vec<String> {
    HEADER_ENTRY_RE
        .captures_iter(value)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|link| is_http_link(link) || is_mailto_link(link))
        .collect()
}

fn collect_from_part(part: &BodyPart, links: &mut Vec<String>) {
    if let Some(text) = part.text.as_deref().filter(|t| !t.is_empty()) {
        let mime_type = part.mime_type.to_lowercase();
        if mime_type.contains("html") {
            let found = links_from_html(text);
            tracing::debug!("Found {} unsubscribe links in HTML body", found.len());
            links.extend(found);
        } else if mime_type.contains("text") {
            let found = links_from_text(text);
            tracing::debug!("Found {} unsubscribe links in plain text", found.len());
            links.extend(found);
        }
    }

    for child in &part.parts {
        collect_from_part(child, links);
    }
}

/// Anchor hrefs that look like unsubscribe or preference links
pub fn links_from_html(html: &str) -> Vec<String> {
    let cleaned = html.replace("=\r\n", "").replace("=\n", "");
    let document = Html::parse_document(&cleaned);

    let mut links = Vec::new();
    if let Ok(sel) = Selector::parse("a[href]") {
        for anchor in document.select(&sel) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if HREF_PATTERN_RE.is_match(href) || MAILTO_UNSUB_RE.is_match(href) {
                links.push(href.trim().to_string());
            }
        }
    }
    links
}

pub fn links_from_text(text: &str) -> Vec<String> {
    TEXT_LINK_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn dedupe(links: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty() && seen.insert(link.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_with(headers: &[(&str, &str)], payload: BodyPart) -> MailMessage {
        MailMessage {
            id: "m1".to_string(),
            snippet: String::new(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            payload,
        }
    }

    #[test]
    fn test_header_links_skip_body() {
        let message = message_with(
            &[(
                "List-Unsubscribe",
                "<mailto:leave@shop.com?subject=unsubscribe>, <https://shop.com/u/123>, <ftp://nope>",
            )],
            BodyPart::text(
                "text/html",
                r#"<a href="https://shop.com/preferences">prefs</a>"#,
            ),
        );

        assert_eq!(
            extract_unsubscribe_links(&message),
            vec![
                "mailto:leave@shop.com?subject=unsubscribe",
                "https://shop.com/u/123"
            ]
        );
    }

    #[test]
    fn test_unusable_header_falls_back_to_body() {
        let message = message_with(
            &[("List-Unsubscribe", "<ftp://old.example.com/leave>")],
            BodyPart::text(
                "text/plain",
                "Stop these: https://news.example.com/unsubscribe?id=9 thanks",
            ),
        );

        assert_eq!(
            extract_unsubscribe_links(&message),
            vec!["https://news.example.com/unsubscribe?id=9"]
        );
    }

    #[test]
    fn test_html_anchor_patterns() {
        let html = r#"
            <p><a href="https://shop.com/products">Shop</a></p>
            <p><a href="https://shop.com/Email-Preferences?u=1">Manage</a></p>
            <p><a href=" https://shop.com/optout ">Opt out</a></p>
            <p><a href="mailto:list@shop.com?body=unsubscribe">Mail us</a></p>
            <p><a href="mailto:support@shop.com">Support</a></p>
        "#;

        assert_eq!(
            links_from_html(html),
            vec![
                "https://shop.com/Email-Preferences?u=1",
                "https://shop.com/optout",
                "mailto:list@shop.com?body=unsubscribe",
            ]
        );
    }

    #[test]
    fn test_quoted_printable_soft_breaks_removed() {
        let html = "<a href=\"https://shop.com/unsub=\r\nscribe?id=4\">leave</a>";
        assert_eq!(links_from_html(html), vec!["https://shop.com/unsubscribe?id=4"]);
    }

    #[test]
    fn test_nested_parts_and_dedupe() {
        let payload = BodyPart::multipart(
            "multipart/mixed",
            vec![
                BodyPart::multipart(
                    "multipart/alternative",
                    vec![
                        BodyPart::text("text/plain", "Leave: https://a.com/unsubscribe/1"),
                        BodyPart::text(
                            "text/html",
                            r#"<a href="https://a.com/unsubscribe/1">x</a><a href="https://a.com/opt-out">y</a>"#,
                        ),
                    ],
                ),
                BodyPart::text("image/png", "https://a.com/unsubscribe/ignored"),
            ],
        );
        let message = message_with(&[], payload);

        assert_eq!(
            extract_unsubscribe_links(&message),
            vec!["https://a.com/unsubscribe/1", "https://a.com/opt-out"]
        );
    }

    #[test]
    fn test_single_part_message() {
        let message = message_with(
            &[],
            BodyPart::text("TEXT/HTML", r#"<a href="https://x.io/unsubscribe">u</a>"#),
        );
        assert_eq!(
            extract_unsubscribe_links(&message),
            vec!["https://x.io/unsubscribe"]
        );
    }

    #[test]
    fn test_no_links() {
        let message = message_with(&[], BodyPart::text("text/plain", "Nothing to see"));
        assert!(extract_unsubscribe_links(&message).is_empty());
    }

    #[test]
    fn test_link_kind_helpers() {
        assert!(is_http_link("https://a.com"));
        assert!(is_http_link("http://a.com"));
        assert!(!is_http_link("mailto:a@b.com"));
        assert!(is_mailto_link("mailto:a@b.com"));
    }
}
