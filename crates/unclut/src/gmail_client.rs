//! Gmail API access behind the `Mailbox` trait.

use anyhow::{Context, Result};
use async_trait::async_trait;
use google_gmail1::api::{BatchDeleteMessagesRequest, Message, MessagePart};
use google_gmail1::hyper_rustls::HttpsConnector;
use google_gmail1::Gmail;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    /// Headers only (From, Subject, Date)
    Metadata,
    /// Headers plus decoded body parts
    Full,
}

impl MessageFormat {
    pub fn as_str(&self) -> &str {
        match self {
            MessageFormat::Metadata => "metadata",
            MessageFormat::Full => "full",
        }
    }
}

/// One page of message ids from a list query
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub ids: Vec<String>,
    pub next_page_token: Option<String>,
}

/// A MIME part with its body already decoded to text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyPart {
    pub mime_type: String,
    pub text: Option<String>,
    pub parts: Vec<BodyPart>,
}

impl BodyPart {
    pub fn text(mime_type: &str, text: &str) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            text: Some(text.to_string()),
            parts: Vec::new(),
        }
    }

    pub fn multipart(mime_type: &str, parts: Vec<BodyPart>) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            text: None,
            parts,
        }
    }
}

/// A message as the rest of the tool sees it
#[derive(Debug, Clone, Default)]
pub struct MailMessage {
    pub id: String,
    pub snippet: String,
    /// Headers in message order
    pub headers: Vec<(String, String)>,
    pub payload: BodyPart,
}

impl MailMessage {
    /// Case-insensitive header lookup; the first occurrence wins
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// The mailbox operations the tool needs
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Email address of the authenticated user
    async fn profile_email(&self) -> Result<String>;

    async fn list_message_ids(
        &self,
        query: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<MessagePage>;

    async fn get_message(&self, id: &str, format: MessageFormat) -> Result<MailMessage>;

    /// Permanently delete the given messages in one request
    async fn batch_delete(&self, ids: &[String]) -> Result<()>;
}

/// Client for interacting with Gmail API
pub struct GmailClient {
    hub: Gmail<HttpsConnector<HttpConnector>>,
    user_id: String,
}

impl GmailClient {
    /// Build a client from the stored refresh token in the environment
    pub async fn from_env(user_id: &str) -> Result<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID")
            .context("GOOGLE_CLIENT_ID environment variable must be set")?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET")
            .context("GOOGLE_CLIENT_SECRET environment variable must be set")?;
        let refresh_token = std::env::var("GOOGLE_REFRESH_TOKEN")
            .context("GOOGLE_REFRESH_TOKEN environment variable must be set")?;

        // Use the yup_oauth2 re-exported by google_gmail1 to avoid version mismatch
        let secret = google_gmail1::yup_oauth2::authorized_user::AuthorizedUserSecret {
            client_id,
            client_secret,
            refresh_token,
            key_type: "authorized_user".to_string(),
        };

        let auth = google_gmail1::yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
            .build()
            .await
            .context("Failed to build authenticator from refresh token")?;

        let connector = google_gmail1::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);
        let hub = Gmail::new(client, auth);

        Ok(Self {
            hub,
            user_id: user_id.to_string(),
        })
    }

    fn parse_message(message: Message) -> MailMessage {
        let id = message.id.unwrap_or_default();
        let snippet = message.snippet.unwrap_or_default();

        let (headers, payload) = match message.payload {
            Some(payload) => {
                let headers = payload
                    .headers
                    .clone()
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|h| Some((h.name?, h.value.unwrap_or_default())))
                    .collect();
                (headers, Self::convert_part(&payload))
            }
            None => (Vec::new(), BodyPart::default()),
        };

        MailMessage {
            id,
            snippet,
            headers,
            payload,
        }
    }

    fn convert_part(part: &MessagePart) -> BodyPart {
        let text = part
            .body
            .as_ref()
            .and_then(|body| body.data.as_ref())
            .filter(|data| !data.is_empty())
            .map(|data| String::from_utf8_lossy(data).into_owned());

        let parts = part
            .parts
            .as_ref()
            .map(|parts| parts.iter().map(Self::convert_part).collect())
            .unwrap_or_default();

        BodyPart {
            mime_type: part.mime_type.clone().unwrap_or_default(),
            text,
            parts,
        }
    }
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn profile_email(&self) -> Result<String> {
        let (_, profile) = self
            .hub
            .users()
            .get_profile(&self.user_id)
            .doit()
            .await
            .context("Failed to get profile")?;

        profile
            .email_address
            .context("No email address in profile")
    }

    async fn list_message_ids(
        &self,
        query: &str,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<MessagePage> {
        let mut call = self
            .hub
            .users()
            .messages_list(&self.user_id)
            .q(query)
            .max_results(max_results);
        if let Some(token) = page_token {
            call = call.page_token(token);
        }

        let (_, response) = call.doit().await.context("Failed to list messages")?;

        let ids = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.id)
            .collect();

        Ok(MessagePage {
            ids,
            next_page_token: response.next_page_token,
        })
    }

    async fn get_message(&self, id: &str, format: MessageFormat) -> Result<MailMessage> {
        let mut call = self
            .hub
            .users()
            .messages_get(&self.user_id, id)
            .format(format.as_str());
        if format == MessageFormat::Metadata {
            call = call
                .add_metadata_headers("From")
                .add_metadata_headers("Subject")
                .add_metadata_headers("Date");
        }

        let (_, message) = call
            .doit()
            .await
            .with_context(|| format!("Failed to get message {}", id))?;

        Ok(Self::parse_message(message))
    }

    async fn batch_delete(&self, ids: &[String]) -> Result<()> {
        let request = BatchDeleteMessagesRequest {
            ids: Some(ids.to_vec()),
        };

        self.hub
            .users()
            .messages_batch_delete(request, &self.user_id)
            .doit()
            .await
            .context("Failed to batch delete messages")?;

        tracing::debug!("Batch deleted {} messages", ids.len());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory mailbox for tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeMailbox {
        pub email: String,
        /// Messages in newest-first order
        pub messages: Vec<MailMessage>,
        /// Query string to matching message ids
        pub queries: HashMap<String, Vec<String>>,
        pub fail_ids: Vec<String>,
        /// Queries whose listing fails
        pub fail_queries: Vec<String>,
        pub fail_delete: bool,
        pub deleted: Mutex<Vec<Vec<String>>>,
        pub list_calls: Mutex<Vec<(String, u32, Option<String>)>>,
    }

    impl FakeMailbox {
        pub fn new(email: &str) -> Self {
            Self {
                email: email.to_string(),
                ..Default::default()
            }
        }

        pub fn with_message(mut self, message: MailMessage) -> Self {
            self.messages.push(message);
            self
        }

        pub fn with_query(mut self, query: &str, ids: &[&str]) -> Self {
            self.queries.insert(
                query.to_string(),
                ids.iter().map(|s| s.to_string()).collect(),
            );
            self
        }

        pub fn deleted_ids(&self) -> Vec<String> {
            self.deleted.lock().unwrap().concat()
        }
    }

    pub fn message(id: &str, from: &str, subject: &str) -> MailMessage {
        MailMessage {
            id: id.to_string(),
            snippet: String::new(),
            headers: vec![
                ("From".to_string(), from.to_string()),
                ("Subject".to_string(), subject.to_string()),
                (
                    "Date".to_string(),
                    "Mon, 14 Oct 2024 09:30:00 +0000".to_string(),
                ),
            ],
            payload: BodyPart::default(),
        }
    }

    #[async_trait]
    impl Mailbox for FakeMailbox {
        async fn profile_email(&self) -> Result<String> {
            Ok(self.email.clone())
        }

        async fn list_message_ids(
            &self,
            query: &str,
            max_results: u32,
            page_token: Option<&str>,
        ) -> Result<MessagePage> {
            self.list_calls.lock().unwrap().push((
                query.to_string(),
                max_results,
                page_token.map(str::to_string),
            ));

            if self.fail_queries.iter().any(|q| q == query) {
                anyhow::bail!("search backend unavailable");
            }

            let all = self.queries.get(query).cloned().unwrap_or_default();
            let start: usize = page_token.map(|t| t.parse::<usize>()).transpose()?.unwrap_or(0);
            let end = (start + max_results as usize).min(all.len());
            let ids = all.get(start..end).map(<[String]>::to_vec).unwrap_or_default();
            let next_page_token = (end < all.len()).then(|| end.to_string());

            Ok(MessagePage {
                ids,
                next_page_token,
            })
        }

        async fn get_message(&self, id: &str, _format: MessageFormat) -> Result<MailMessage> {
            if self.fail_ids.iter().any(|f| f == id) {
                anyhow::bail!("message {} unavailable", id);
            }
            self.messages
                .iter()
                .find(|m| m.id == id)
                .cloned()
                .with_context(|| format!("no message {}", id))
        }

        async fn batch_delete(&self, ids: &[String]) -> Result<()> {
            if self.fail_delete {
                anyhow::bail!("quota exceeded");
            }
            self.deleted.lock().unwrap().push(ids.to_vec());
            Ok(())
        }
    }
}
