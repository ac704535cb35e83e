//! Sender-wide deletion.

use crate::gmail_client::Mailbox;
use shared_types::DeleteReport;

/// Gmail caps a list page at 500 ids
const LIST_PAGE_LIMIT: usize = 500;
/// Gmail caps batchDelete at 1000 ids
pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_MAX_MESSAGES: usize = 10_000;

/// Ids of every message from `sender`, up to `max_results`.
///
/// Listing errors are logged and yield an empty list.
pub async fn message_ids_for_sender(
    mailbox: &dyn Mailbox,
    sender: &str,
    max_results: usize,
) -> Vec<String> {
    let query = format!("from:{}", sender);
    let mut ids: Vec<String> = Vec::new();
    let mut page_token: Option<String> = None;

    while ids.len() < max_results {
        let page_size = (max_results - ids.len()).min(LIST_PAGE_LIMIT) as u32;
        let page = match mailbox
            .list_message_ids(&query, page_size, page_token.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("Error fetching message IDs for {}: {:#}", sender, e);
                return Vec::new();
            }
        };

        if page.ids.is_empty() {
            break;
        }
        ids.extend(page.ids);

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    ids.truncate(max_results);
    ids
}

/// Delete `ids` in chunks of `batch_size`. A failed chunk is recorded and
/// the remaining chunks still run.
pub async fn delete_messages_batch(
    mailbox: &dyn Mailbox,
    ids: &[String],
    batch_size: usize,
) -> (usize, Vec<String>) {
    let mut deleted = 0;
    let mut errors = Vec::new();

    for (index, chunk) in ids.chunks(batch_size.max(1)).enumerate() {
        match mailbox.batch_delete(chunk).await {
            Ok(()) => {
                deleted += chunk.len();
                tracing::info!("Deleted {} messages (total: {})", chunk.len(), deleted);
            }
            Err(e) => {
                let message = format!("Error deleting batch {}: {:#}", index + 1, e);
                tracing::error!("{}", message);
                errors.push(message);
            }
        }
    }

    (deleted, errors)
}

pub async fn delete_emails_from_sender(
    mailbox: &dyn Mailbox,
    sender: &str,
    max_messages: usize,
    dry_run: bool,
) -> DeleteReport {
    let ids = message_ids_for_sender(mailbox, sender, max_messages).await;
    let total = ids.len();

    if dry_run {
        return DeleteReport {
            sender: sender.to_string(),
            success: true,
            deleted_count: total,
            errors: Vec::new(),
            message: format!("Would delete {} messages from {} (dry run)", total, sender),
            dry_run: true,
        };
    }

    if ids.is_empty() {
        return DeleteReport {
            sender: sender.to_string(),
            success: true,
            deleted_count: 0,
            errors: Vec::new(),
            message: format!("No messages found from {}", sender),
            dry_run: false,
        };
    }

    let (deleted_count, errors) = delete_messages_batch(mailbox, &ids, DEFAULT_BATCH_SIZE).await;

    DeleteReport {
        sender: sender.to_string(),
        success: errors.is_empty(),
        deleted_count,
        errors,
        message: format!("Deleted {} messages from {}", deleted_count, sender),
        dry_run: false,
    }
}
