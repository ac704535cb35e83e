//! Unsubscribe / delete / both, run over the selected senders.

use crate::cleaner::{self, DEFAULT_MAX_MESSAGES};
use crate::extractor::{extract_unsubscribe_links, is_http_link, is_mailto_link};
use crate::gmail_client::{Mailbox, MessageFormat};
use crate::unsubscriber::Unsubscriber;
use anyhow::{Context, Result};
use shared_types::{ActionPreference, DeleteReport, SenderUnsubscribeResult, UnsubscribeStatus};

/// How many recent messages to look at when hunting for links
const LINK_SEARCH_LIMIT: u32 = 5;

/// Unsubscribe links from the newest promotional message of `sender`
pub async fn find_unsubscribe_links(mailbox: &dyn Mailbox, sender: &str) -> Result<Vec<String>> {
    let query = format!("from:{} category:promotions", sender);
    let page = mailbox
        .list_message_ids(&query, LINK_SEARCH_LIMIT, None)
        .await
        .with_context(|| format!("Failed to search messages from {}", sender))?;

    let Some(newest) = page.ids.first() else {
        return Ok(Vec::new());
    };

    let message = mailbox.get_message(newest, MessageFormat::Full).await?;
    Ok(extract_unsubscribe_links(&message))
}

/// Run the unsubscribe engine for one sender over already-extracted links
pub async fn unsubscribe_with_links(
    unsubscriber: &Unsubscriber,
    sender: &str,
    links: &[String],
    dry_run: bool,
) -> SenderUnsubscribeResult {
    let mailto: Vec<&String> = links.iter().filter(|l| is_mailto_link(l)).collect();
    let Some(http) = links.iter().find(|l| is_http_link(l)) else {
        let message = match mailto.first() {
            Some(address) => format!("Only a mailto link was found, unsubscribe manually: {}", address),
            None => format!("No unsubscribe link found for {}", sender),
        };
        return SenderUnsubscribeResult::skipped(sender, message, dry_run);
    };

    for address in &mailto {
        tracing::info!("Manual unsubscribe available for {}: {}", sender, address);
    }

    let report = unsubscriber
        .process_unsubscribe_links(&[http.clone()], &[sender.to_string()], dry_run)
        .await;

    match report {
        Ok(report) => report
            .results
            .into_iter()
            .next()
            .unwrap_or_else(|| SenderUnsubscribeResult::pending(sender, dry_run)),
        Err(e) => SenderUnsubscribeResult {
            status: UnsubscribeStatus::Error,
            message: format!("Error unsubscribing from {}: {}", sender, e),
            ..SenderUnsubscribeResult::pending(sender, dry_run)
        },
    }
}

/// Find links for `sender` and try them
pub async fn unsubscribe_sender(
    mailbox: &dyn Mailbox,
    unsubscriber: &Unsubscriber,
    sender: &str,
    dry_run: bool,
) -> Result<SenderUnsubscribeResult> {
    let links = find_unsubscribe_links(mailbox, sender).await?;
    Ok(unsubscribe_with_links(unsubscriber, sender, &links, dry_run).await)
}

/// What happened to one selected sender
#[derive(Debug, Clone, Default)]
pub struct SenderOutcome {
    pub sender: String,
    pub unsubscribe: Option<SenderUnsubscribeResult>,
    pub delete: Option<DeleteReport>,
    /// Sub-actions that failed outright, as user-facing status lines
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ActionSummary {
    pub outcomes: Vec<SenderOutcome>,
    pub unsubscribed: usize,
    pub deleted: usize,
}

impl ActionSummary {
    fn push(&mut self, outcome: SenderOutcome) {
        if outcome
            .unsubscribe
            .as_ref()
            .is_some_and(|r| r.status == UnsubscribeStatus::Success)
        {
            self.unsubscribed += 1;
        }
        if let Some(report) = outcome.delete.as_ref().filter(|r| !r.dry_run) {
            self.deleted += report.deleted_count;
        }
        self.outcomes.push(outcome);
    }
}

/// Apply `action` to every sender in order
pub async fn run_action(
    action: ActionPreference,
    mailbox: &dyn Mailbox,
    unsubscriber: &Unsubscriber,
    senders: &[String],
    dry_run: bool,
) -> ActionSummary {
    let mut summary = ActionSummary::default();

    for sender in senders {
        let outcome = match action {
            ActionPreference::Unsubscribe => {
                unsubscribe_only(mailbox, unsubscriber, sender, dry_run).await
            }
            ActionPreference::Delete => SenderOutcome {
                sender: sender.clone(),
                delete: Some(
                    cleaner::delete_emails_from_sender(
                        mailbox,
                        sender,
                        DEFAULT_MAX_MESSAGES,
                        dry_run,
                    )
                    .await,
                ),
                ..Default::default()
            },
            ActionPreference::Both => {
                unsubscribe_and_delete(mailbox, unsubscriber, sender, dry_run).await
            }
        };
        summary.push(outcome);
    }

    summary
}

async fn unsubscribe_only(
    mailbox: &dyn Mailbox,
    unsubscriber: &Unsubscriber,
    sender: &str,
    dry_run: bool,
) -> SenderOutcome {
    let mut outcome = SenderOutcome {
        sender: sender.to_string(),
        ..Default::default()
    };

    match unsubscribe_sender(mailbox, unsubscriber, sender, dry_run).await {
        Ok(result) => outcome.unsubscribe = Some(result),
        Err(e) => {
            tracing::error!("Unsubscribe failed for {}: {:#}", sender, e);
            outcome.errors.push(format!("Failed to unsubscribe from {}", sender));
        }
    }

    outcome
}

/// Both sub-actions for one sender. Links are read before anything is
/// deleted, then the unsubscribe and the deletion run concurrently.
async fn unsubscribe_and_delete(
    mailbox: &dyn Mailbox,
    unsubscriber: &Unsubscriber,
    sender: &str,
    dry_run: bool,
) -> SenderOutcome {
    let mut outcome = SenderOutcome {
        sender: sender.to_string(),
        ..Default::default()
    };

    let links = match find_unsubscribe_links(mailbox, sender).await {
        Ok(links) => Some(links),
        Err(e) => {
            tracing::error!("Unsubscribe failed for {}: {:#}", sender, e);
            outcome.errors.push(format!("Failed to unsubscribe from {}", sender));
            None
        }
    };

    let unsubscribe = async {
        match &links {
            Some(links) => Some(unsubscribe_with_links(unsubscriber, sender, links, dry_run).await),
            None => None,
        }
    };
    let delete =
        cleaner::delete_emails_from_sender(mailbox, sender, DEFAULT_MAX_MESSAGES, dry_run);

    let (unsubscribe, delete) = tokio::join!(unsubscribe, delete);

    if !delete.success {
        tracing::error!("Delete failed for {}: {}", sender, delete.errors.join("; "));
        outcome.errors.push(format!("Failed to delete emails from {}", sender));
    }

    outcome.unsubscribe = unsubscribe;
    outcome.delete = Some(delete);
    outcome
}
