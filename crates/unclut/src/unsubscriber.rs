//! HTTP unsubscribe engine: follows links, detects confirmation pages and
//! submits unsubscribe forms.

use crate::error::UnsubscribeError;
use crate::extractor::is_http_link;
use regex::Regex;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use shared_types::{SenderUnsubscribeResult, UnsubscribeAttempt, UnsubscribeStatus};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

static NEGATIVE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\balready\s+(?:un)?subscribed\b",
        r"\b(?:please\s+)?confirm\s+your\s+unsubscription\b",
        r"\bverify\s+unsubscription\b",
        r"\bclick\s+to\s+confirm\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static POSITIVE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(?:you\s+have\s+been|successfully|success!?)\s+unsubscribed\b",
        r"\bunsubscrib(?:ed|tion)\s+(?:was\s+)?successful(?:ly)?\b",
        r"\b(?:preferences|subscription)\s+updated\b",
        r"\byou\s+are\s+now\s+unsubscribed\b",
        r"\bunsubscribe\s+confirmed\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const CONFIRMATION_SELECTOR: &str = ".confirmation, .success, .alert-success, .status-msg, \
     #unsubscribe-confirmation, [class*=\"success\"], [class*=\"confirm\"]";

const FORM_TERMS: [&str; 3] = ["unsub", "optout", "preferences"];

/// Whether a landing page reads as a completed unsubscribe
pub fn is_unsubscribe_confirmed(html: &str) -> bool {
    if html.is_empty() {
        return false;
    }

    let content = html.to_lowercase();

    if NEGATIVE_PATTERNS.iter().any(|re| re.is_match(&content)) {
        return false;
    }
    if POSITIVE_PATTERNS.iter().any(|re| re.is_match(&content)) {
        return true;
    }

    let document = Html::parse_document(&content);
    if let Ok(sel) = Selector::parse(CONFIRMATION_SELECTOR) {
        return document.select(&sel).any(|element| {
            let text = element.text().collect::<String>();
            ["unsub", "success", "confirm"]
                .iter()
                .any(|keyword| text.contains(keyword))
        });
    }

    false
}

/// An unsubscribe form lifted out of a page, ready to send
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FormSubmission {
    pub url: Url,
    pub post: bool,
    pub fields: Vec<(String, String)>,
}

/// Find forms on `html` that look like unsubscribe forms
pub(crate) fn find_unsubscribe_forms(html: &str, base_url: &Url) -> Vec<FormSubmission> {
    let document = Html::parse_document(html);
    let (Ok(form_sel), Ok(control_sel)) = (Selector::parse("form"), Selector::parse("input, button"))
    else {
        return Vec::new();
    };

    let mut forms = Vec::new();
    for form in document.select(&form_sel) {
        let action = form.value().attr("action").unwrap_or_default();
        let markup = form.html().to_lowercase();
        let action_lower = action.to_lowercase();
        if !FORM_TERMS
            .iter()
            .any(|term| action_lower.contains(term) || markup.contains(term))
        {
            continue;
        }

        let mut fields: Vec<(String, String)> = Vec::new();
        for control in form.select(&control_sel) {
            let attrs = control.value();
            if attrs.attr("type") == Some("submit") && fields.is_empty() {
                continue;
            }
            let Some(name) = attrs.attr("name") else {
                continue;
            };
            let value = attrs.attr("value").unwrap_or_default().to_string();
            match fields.iter_mut().find(|(key, _)| key == name) {
                Some(existing) => existing.1 = value,
                None => fields.push((name.to_string(), value)),
            }
        }

        if !fields
            .iter()
            .any(|(key, _)| key.to_lowercase().contains("confirm"))
        {
            for (key, value) in [
                ("unsub_confirm", "1"),
                ("confirm", "1"),
                ("submit", "Unsubscribe"),
            ] {
                match fields.iter_mut().find(|(k, _)| k == key) {
                    Some(existing) => existing.1 = value.to_string(),
                    None => fields.push((key.to_string(), value.to_string())),
                }
            }
        }

        let url = match base_url.join(action) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping form with unusable action '{}': {}", action, e);
                continue;
            }
        };
        let post = form
            .value()
            .attr("method")
            .is_some_and(|m| m.eq_ignore_ascii_case("post"));

        forms.push(FormSubmission { url, post, fields });
    }

    forms
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers
}

/// SendGrid tracking links need the POST flow in `sendgrid_unsubscribe`
pub(crate) fn is_sendgrid_host(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|host| host.contains("sendgrid.net") || host.contains("sendgrid.com"))
}

fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Per-sender results of a batch, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct UnsubscribeReport {
    pub results: Vec<SenderUnsubscribeResult>,
}

impl UnsubscribeReport {
    pub fn get(&self, sender: &str) -> Option<&SenderUnsubscribeResult> {
        self.results.iter().find(|r| r.sender == sender)
    }

    fn entry(&mut self, sender: &str, dry_run: bool) -> &mut SenderUnsubscribeResult {
        let index = match self.results.iter().position(|r| r.sender == sender) {
            Some(index) => index,
            None => {
                self.results
                    .push(SenderUnsubscribeResult::pending(sender, dry_run));
                self.results.len() - 1
            }
        };
        &mut self.results[index]
    }

    pub fn processed(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == UnsubscribeStatus::Success)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_failure()).count()
    }
}

pub struct Unsubscriber {
    client: Client,
}

impl Unsubscriber {
    pub fn new(timeout: Duration) -> Result<Self, UnsubscribeError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Try one unsubscribe link. Returns whether it worked and a message
    /// describing what happened.
    pub async fn unsubscribe_from_link(&self, link: &str) -> (bool, String) {
        if !is_http_link(link) {
            return (false, format!("Invalid URL: {}", link));
        }
        let url = match Url::parse(link) {
            Ok(url) => url,
            Err(_) => return (false, format!("Invalid URL: {}", link)),
        };

        if is_sendgrid_host(&url) {
            return self.sendgrid_unsubscribe(&url).await;
        }

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return (false, format!("Request error: {}", e)),
        };

        let final_url = response.url().clone();
        let redirect_info = if final_url != url {
            format!(" (redirected from {})", link)
        } else {
            String::new()
        };

        let status = response.status();
        if status != StatusCode::OK {
            return (
                false,
                format!(
                    "Request failed with status code: {}{}",
                    status.as_u16(),
                    redirect_info
                ),
            );
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return (false, format!("Request error: {}", e)),
        };

        if is_unsubscribe_confirmed(&body) {
            return (true, format!("Successfully unsubscribed{}", redirect_info));
        }

        if self.submit_unsubscribe_form(&body, &final_url).await {
            return (true, format!("Form submitted successfully{}", redirect_info));
        }

        (
            false,
            format!(
                "Unsubscription confirmation not detected{}\nYou may need to unsubscribe manually: {}",
                redirect_info, final_url
            ),
        )
    }

    /// SendGrid pages need the query parameters POSTed back with a confirm flag
    pub(crate) async fn sendgrid_unsubscribe(&self, url: &Url) -> (bool, String) {
        let mut fields: Vec<(String, String)> = Vec::new();
        for (key, value) in url.query_pairs() {
            if !fields.iter().any(|(k, _)| *k == key) {
                fields.push((key.into_owned(), value.into_owned()));
            }
        }
        for (key, value) in [("unsub_confirm", "1"), ("submit", "Unsubscribe")] {
            fields.retain(|(k, _)| k != key);
            fields.push((key.to_string(), value.to_string()));
        }

        let mut target = url.clone();
        target.set_query(None);
        target.set_fragment(None);

        let result = self
            .client
            .post(target)
            .header(header::ORIGIN, origin_of(url))
            .header(header::REFERER, url.as_str())
            .form(&fields)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => return (false, format!("Error processing SendGrid unsubscribe: {}", e)),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return (
                false,
                format!("SendGrid unsubscribe failed with status {}", status.as_u16()),
            );
        }

        let body = match response.text().await {
            Ok(body) => body.to_lowercase(),
            Err(e) => return (false, format!("Error processing SendGrid unsubscribe: {}", e)),
        };

        if ["unsubscribed", "success", "thank you"]
            .iter()
            .any(|term| body.contains(term))
        {
            (true, "Successfully unsubscribed from SendGrid".to_string())
        } else {
            (false, "SendGrid unsubscription response not confirmed".to_string())
        }
    }

    /// Submit the first unsubscribe form on the page that the server accepts
    async fn submit_unsubscribe_form(&self, html: &str, page_url: &Url) -> bool {
        let forms = find_unsubscribe_forms(html, page_url);

        for form in forms {
            let request = if form.post {
                self.client
                    .post(form.url.clone())
                    .header(header::ORIGIN, origin_of(page_url))
                    .header(header::REFERER, page_url.as_str())
                    .form(&form.fields)
            } else {
                self.client.get(form.url.clone()).query(&form.fields)
            };

            match request.send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    tracing::debug!("Submitted unsubscribe form to {}", form.url);
                    return true;
                }
                Ok(response) => {
                    tracing::debug!(
                        "Form at {} answered with status {}",
                        form.url,
                        response.status()
                    );
                }
                Err(e) => {
                    tracing::error!("Error submitting unsubscribe form: {}", e);
                    return false;
                }
            }
        }

        false
    }

    /// Work through `(link, sender)` pairs, updating one result per sender.
    pub async fn process_unsubscribe_links(
        &self,
        links: &[String],
        senders: &[String],
        dry_run: bool,
    ) -> Result<UnsubscribeReport, UnsubscribeError> {
        if links.len() != senders.len() {
            let err = UnsubscribeError::LengthMismatch {
                links: links.len(),
                senders: senders.len(),
            };
            tracing::error!("{}", err);
            return Err(err);
        }

        let mut report = UnsubscribeReport::default();

        for (link, sender) in links.iter().zip(senders) {
            let link = link.trim();
            let result = report.entry(sender, dry_run);

            if link.is_empty() {
                result.status = UnsubscribeStatus::Skipped;
                result.message = format!("No unsubscribe link found for {}", sender);
                continue;
            }

            if dry_run {
                result.status = UnsubscribeStatus::DryRun;
                result.message = format!(
                    "Would attempt to unsubscribe from {} using {}",
                    sender, link
                );
                result.attempts = vec![UnsubscribeAttempt {
                    link: link.to_string(),
                    status: UnsubscribeStatus::DryRun,
                    message: "Dry run - no action taken".to_string(),
                }];
                result.dry_run = true;
                tracing::info!("[DRY RUN] {}", result.message);
                continue;
            }

            tracing::info!("Attempting to unsubscribe from {} using {}", sender, link);
            let (success, message) = self.unsubscribe_from_link(link).await;

            let result = report.entry(sender, dry_run);
            result.attempts.push(UnsubscribeAttempt {
                link: link.to_string(),
                status: if success {
                    UnsubscribeStatus::Success
                } else {
                    UnsubscribeStatus::Failed
                },
                message: message.clone(),
            });

            if success {
                result.status = UnsubscribeStatus::Success;
                result.message = format!("Successfully unsubscribed from {}", sender);
                result.success = true;
                tracing::info!("Successfully unsubscribed from {}", sender);
            } else {
                result.status = UnsubscribeStatus::PartialFailure;
                result.message = format!("Failed to unsubscribe from {}: {}", sender, message);
                tracing::warn!("Failed to unsubscribe from {}: {}", sender, message);
            }
        }

        tracing::info!(
            "Unsubscribe summary: {} processed, {} successful, {} failed{}",
            report.processed(),
            report.succeeded(),
            report.failed(),
            if dry_run { " (dry run)" } else { "" }
        );
        for result in &report.results {
            tracing::debug!(
                "{}: {} - {}",
                result.sender,
                result.status.as_str(),
                result.message
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header as header_is, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn unsubscriber() -> Unsubscriber {
        Unsubscriber::new(Duration::from_secs(5)).unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_confirmation_patterns() {
        assert!(is_unsubscribe_confirmed("<h1>You have been unsubscribed</h1>"));
        assert!(is_unsubscribe_confirmed("Unsubscribed successfully."));
        assert!(is_unsubscribe_confirmed("<p>Your preferences updated</p>"));
        assert!(is_unsubscribe_confirmed("SUCCESS! Unsubscribed"));
        assert!(!is_unsubscribe_confirmed(""));
        assert!(!is_unsubscribe_confirmed("<p>Welcome to our store</p>"));
    }

    #[test]
    fn test_negative_patterns_win() {
        assert!(!is_unsubscribe_confirmed(
            "You have been unsubscribed. Please confirm your unsubscription below."
        ));
        assert!(!is_unsubscribe_confirmed("You are already unsubscribed"));
        assert!(!is_unsubscribe_confirmed("<button>Click to confirm</button>"));
    }

    #[test]
    fn test_confirmation_elements() {
        assert!(is_unsubscribe_confirmed(
            r#"<div class="alert-success">Done, you will not hear from us.</div><p>Confirmed</p><div class="success">Request success</div>"#
        ));
        assert!(is_unsubscribe_confirmed(
            r#"<div id="unsubscribe-confirmation">Unsub complete</div>"#
        ));
        assert!(!is_unsubscribe_confirmed(
            r#"<div class="success-banner">Welcome back</div>"#
        ));
    }

    #[test]
    fn test_find_forms() {
        let base = Url::parse("https://mail.shop.com/landing/page").unwrap();
        let html = r#"
            <form action="/search"><input name="q" value=""></form>
            <form action="/unsubscribe/do" method="POST">
                <input type="submit" name="go" value="Go">
                <input type="hidden" name="token" value="abc">
                <input type="hidden" name="token" value="def">
                <button type="submit" name="action" value="leave">Leave</button>
            </form>
        "#;

        let forms = find_unsubscribe_forms(html, &base);
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].url.as_str(), "https://mail.shop.com/unsubscribe/do");
        assert!(forms[0].post);
        assert_eq!(
            forms[0].fields,
            vec![
                ("token".to_string(), "def".to_string()),
                ("action".to_string(), "leave".to_string()),
                ("unsub_confirm".to_string(), "1".to_string()),
                ("confirm".to_string(), "1".to_string()),
                ("submit".to_string(), "Unsubscribe".to_string()),
            ]
        );
    }

    #[test]
    fn test_form_with_confirm_field_kept_as_is() {
        let base = Url::parse("https://shop.com/p").unwrap();
        let html = r#"<form action="https://other.com/optout"><input name="Confirm_Leave" value="yes"></form>"#;

        let forms = find_unsubscribe_forms(html, &base);
        assert_eq!(forms.len(), 1);
        assert!(!forms[0].post);
        assert_eq!(forms[0].url.as_str(), "https://other.com/optout");
        assert_eq!(
            forms[0].fields,
            vec![("Confirm_Leave".to_string(), "yes".to_string())]
        );
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let (ok, message) = unsubscriber()
            .unsubscribe_from_link("mailto:leave@shop.com")
            .await;
        assert!(!ok);
        assert_eq!(message, "Invalid URL: mailto:leave@shop.com");
    }

    #[tokio::test]
    async fn test_confirmed_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/unsubscribe"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<h1>You have been unsubscribed</h1>"),
            )
            .mount(&server)
            .await;

        let link = format!("{}/unsubscribe", server.uri());
        let (ok, message) = unsubscriber().unsubscribe_from_link(&link).await;
        assert!(ok);
        assert_eq!(message, "Successfully unsubscribed");
    }

    #[tokio::test]
    async fn test_redirect_is_noted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/done", server.uri()).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/done"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Unsubscribe confirmed"))
            .mount(&server)
            .await;

        let link = format!("{}/old", server.uri());
        let (ok, message) = unsubscriber().unsubscribe_from_link(&link).await;
        assert!(ok);
        assert_eq!(
            message,
            format!("Successfully unsubscribed (redirected from {})", link)
        );
    }

    #[tokio::test]
    async fn test_form_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/landing"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<form action="/unsub" method="post"><input name="id" value="42"></form>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/unsub"))
            .and(body_string_contains("id=42"))
            .and(body_string_contains("unsub_confirm=1"))
            .and(header_is("referer", format!("{}/landing", server.uri()).as_str()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let link = format!("{}/landing", server.uri());
        let (ok, message) = unsubscriber().unsubscribe_from_link(&link).await;
        assert!(ok);
        assert_eq!(message, "Form submitted successfully");
    }

    #[tokio::test]
    async fn test_get_form_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/landing"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<form action="/optout"><input name="uid" value="42"><button type="submit">Go</button></form>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/optout"))
            .and(query_param("uid", "42"))
            .and(query_param("unsub_confirm", "1"))
            .and(query_param("submit", "Unsubscribe"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let link = format!("{}/landing", server.uri());
        let (ok, message) = unsubscriber().unsubscribe_from_link(&link).await;
        assert!(ok);
        assert_eq!(message, "Form submitted successfully");
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let (ok, message) = unsubscriber()
            .unsubscribe_from_link("http://127.0.0.1:1/unsubscribe")
            .await;
        assert!(!ok);
        assert!(message.starts_with("Request error: "), "{message}");
    }

    #[test]
    fn test_sendgrid_hosts() {
        let tracked = Url::parse("https://u123.ct.sendgrid.net/wf/unsubscribe?upn=abc").unwrap();
        assert!(is_sendgrid_host(&tracked));
        let branded = Url::parse("https://links.sendgrid.com/asm/unsubscribe").unwrap();
        assert!(is_sendgrid_host(&branded));

        let other = Url::parse("https://shop.com/unsubscribe?via=sendgrid.net").unwrap();
        assert!(!is_sendgrid_host(&other));
    }

    #[tokio::test]
    async fn test_unconfirmed_page_asks_for_manual_step() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/landing"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>Hello there</p>"))
            .mount(&server)
            .await;

        let link = format!("{}/landing", server.uri());
        let (ok, message) = unsubscriber().unsubscribe_from_link(&link).await;
        assert!(!ok);
        assert_eq!(
            message,
            format!(
                "Unsubscription confirmation not detected\nYou may need to unsubscribe manually: {}",
                link
            )
        );
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let link = format!("{}/gone", server.uri());
        let (ok, message) = unsubscriber().unsubscribe_from_link(&link).await;
        assert!(!ok);
        assert_eq!(message, "Request failed with status code: 404");
    }

    #[tokio::test]
    async fn test_sendgrid_post() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wf/unsubscribe"))
            .and(body_string_contains("upn=abc"))
            .and(body_string_contains("submit=Unsubscribe"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Thank you!"))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/wf/unsubscribe?upn=abc&upn=zzz", server.uri())).unwrap();
        let (ok, message) = unsubscriber().sendgrid_unsubscribe(&url).await;
        assert!(ok);
        assert_eq!(message, "Successfully unsubscribed from SendGrid");
    }

    #[tokio::test]
    async fn test_process_length_mismatch() {
        let err = unsubscriber()
            .process_unsubscribe_links(&strings(&["https://a.com/u"]), &strings(&[]), false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UnsubscribeError::LengthMismatch {
                links: 1,
                senders: 0
            }
        ));
    }

    #[tokio::test]
    async fn test_process_dry_run_and_skipped() {
        let report = unsubscriber()
            .process_unsubscribe_links(
                &strings(&["https://a.com/unsubscribe", "  "]),
                &strings(&["a@a.com", "b@b.com"]),
                true,
            )
            .await
            .unwrap();

        let a = report.get("a@a.com").unwrap();
        assert_eq!(a.status, UnsubscribeStatus::DryRun);
        assert_eq!(
            a.message,
            "Would attempt to unsubscribe from a@a.com using https://a.com/unsubscribe"
        );
        assert_eq!(a.attempts.len(), 1);
        assert!(!a.success);

        let b = report.get("b@b.com").unwrap();
        assert_eq!(b.status, UnsubscribeStatus::Skipped);
        assert_eq!(report.processed(), 2);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn test_process_success_and_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .and(query_param("u", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("You are now unsubscribed"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let report = unsubscriber()
            .process_unsubscribe_links(
                &[
                    format!("{}/ok?u=1", server.uri()),
                    format!("{}/broken", server.uri()),
                ],
                &strings(&["good@shop.com", "bad@shop.com"]),
                false,
            )
            .await
            .unwrap();

        let good = report.get("good@shop.com").unwrap();
        assert_eq!(good.status, UnsubscribeStatus::Success);
        assert!(good.success);
        assert_eq!(good.attempts[0].status, UnsubscribeStatus::Success);

        let bad = report.get("bad@shop.com").unwrap();
        assert_eq!(bad.status, UnsubscribeStatus::PartialFailure);
        assert!(!bad.success);
        assert_eq!(bad.attempts[0].status, UnsubscribeStatus::Failed);
        assert_eq!(
            bad.message,
            "Failed to unsubscribe from bad@shop.com: Request failed with status code: 500"
        );

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
    }
}
