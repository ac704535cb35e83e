//! Finds promotional senders worth cleaning up.

use crate::gmail_client::{Mailbox, MessageFormat};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime};
use futures::stream::{self, StreamExt};
use shared_types::PromoSender;
use std::collections::HashSet;

/// Promotional mail older than two weeks, excluding the other inbox tabs
pub const PROMOTIONS_QUERY: &str =
    "category:promotions older_than:14d -category:updates -category:social -category:forums";

const PAGE_SIZE: u32 = 100;
/// Metadata requests in flight at once
const METADATA_CONCURRENCY: usize = 8;

/// Collect the first message from up to `max_senders` distinct senders,
/// looking at no more than `max_emails_to_scan` messages.
pub async fn fetch_promotional_senders(
    mailbox: &dyn Mailbox,
    max_senders: u32,
    max_emails_to_scan: u32,
) -> Result<Vec<PromoSender>> {
    let mut senders = Vec::new();
    let mut seen = HashSet::new();
    let mut scanned: u32 = 0;
    let mut page_token: Option<String> = None;

    if max_senders == 0 {
        return Ok(senders);
    }

    while scanned < max_emails_to_scan {
        let page_size = PAGE_SIZE.min(max_emails_to_scan - scanned);
        let page = match mailbox
            .list_message_ids(PROMOTIONS_QUERY, page_size, page_token.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) if scanned == 0 => {
                return Err(e).context("Failed to list promotional messages")
            }
            Err(e) => {
                tracing::warn!(
                    "Stopping scan after {} messages, listing failed: {:#}",
                    scanned,
                    e
                );
                break;
            }
        };

        if page.ids.is_empty() {
            break;
        }

        let budget = (max_emails_to_scan - scanned) as usize;
        let mut fetches = stream::iter(page.ids.into_iter().take(budget))
            .map(|id| async move {
                let result = mailbox.get_message(&id, MessageFormat::Metadata).await;
                (id, result)
            })
            .buffered(METADATA_CONCURRENCY);

        while let Some((id, result)) = fetches.next().await {
            scanned += 1;

            let message = match result {
                Ok(message) => message,
                Err(e) => {
                    tracing::error!("Error processing message {}: {:#}", id, e);
                    continue;
                }
            };

            let from = message.header("From").unwrap_or_default();
            let (sender_email, sender_name) = parse_from_header(from);
            if sender_email.is_empty() || !seen.insert(sender_email.clone()) {
                continue;
            }

            senders.push(PromoSender {
                message_id: message.id.clone(),
                sender_display: sender_name.unwrap_or_else(|| sender_email.clone()),
                sender_email,
                subject: message
                    .header("Subject")
                    .unwrap_or("(No Subject)")
                    .to_string(),
                date: message.header("Date").map(str::to_string),
            });

            if senders.len() >= max_senders as usize {
                tracing::debug!("Reached sender limit after {} messages", scanned);
                return Ok(senders);
            }
        }

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    tracing::info!(
        "Found {} promotional senders in {} messages",
        senders.len(),
        scanned
    );
    Ok(senders)
}

/// Parse a "From" header like "John Doe <john@example.com>" into (address, name)
pub fn parse_from_header(from: &str) -> (String, Option<String>) {
    let from = from.trim();

    if let Some(bracket_start) = from.rfind('<') {
        if let Some(bracket_end) = from.rfind('>').filter(|end| *end > bracket_start) {
            let address = from[bracket_start + 1..bracket_end].trim().to_string();
            let name = from[..bracket_start].trim().trim_matches('"').trim();
            let name = (!name.is_empty()).then(|| name.to_string());
            return (address, name);
        }
    }

    (from.to_string(), None)
}

/// Render a `Date` header as `YYYY-MM-DD HH:MM`, or its first 16 characters
/// when it cannot be parsed.
pub fn format_preview_date(raw: &str) -> String {
    let without_comment = raw.split('(').next().unwrap_or(raw).trim();

    if let Ok(parsed) = DateTime::parse_from_rfc2822(without_comment) {
        return parsed.format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(without_comment, "%a, %d %b %Y %H:%M:%S") {
        return parsed.format("%Y-%m-%d %H:%M").to_string();
    }

    raw.chars().take(16).collect()
}
