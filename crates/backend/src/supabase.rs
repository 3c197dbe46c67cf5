//! Supabase REST backend implementation
//!
//! Talks PostgREST: equality/null filters as query parameters, `order` and
//! `limit` for ranges, `Prefer: return=representation` on writes and
//! `Prefer: count=exact` for counts. Message rows are flat
//! (`attachment_url` / `attachment_name` / `attachment_type` columns) and
//! are mapped to the domain's nested attachment value here.
//!
//! Realtime runs over a websocket transport this client does not carry;
//! [`ChatBackend::subscribe_messages`] reports that as a subscription
//! error so callers can degrade instead of crashing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use sidechat_domain::{Attachment, AttachmentKind, Conversation, Membership, Message, Participant};

use crate::{BackendConfig, BackendError, ChatBackend, MessageSubscription};

/// Flat message row as stored remotely
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: Uuid,
    content: Option<String>,
    attachment_url: Option<String>,
    attachment_name: Option<String>,
    attachment_type: Option<AttachmentKind>,
    created_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        let attachment = match (row.attachment_url, row.attachment_type) {
            (Some(url), Some(kind)) => Some(Attachment {
                url,
                name: row.attachment_name.unwrap_or_default(),
                kind,
            }),
            _ => None,
        };
        Message {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            content: row.content,
            attachment,
            created_at: row.created_at,
            read_at: row.read_at,
            deleted_at: row.deleted_at,
        }
    }
}

impl From<&Message> for MessageRow {
    fn from(message: &Message) -> Self {
        MessageRow {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            content: message.content.clone(),
            attachment_url: message.attachment.as_ref().map(|a| a.url.clone()),
            attachment_name: message.attachment.as_ref().map(|a| a.name.clone()),
            attachment_type: message.attachment.as_ref().map(|a| a.kind),
            created_at: message.created_at,
            read_at: message.read_at,
            deleted_at: message.deleted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConversationRow {
    id: Uuid,
    last_message_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Conversation {
            id: row.id,
            last_message_id: row.last_message_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MembershipRow {
    conversation_id: Uuid,
    user_id: Uuid,
}

impl From<MembershipRow> for Membership {
    fn from(row: MembershipRow) -> Self {
        Membership {
            conversation_id: row.conversation_id,
            user_id: row.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileRow {
    id: Uuid,
    username: String,
    avatar_url: Option<String>,
}

impl From<ProfileRow> for Participant {
    fn from(row: ProfileRow) -> Self {
        Participant {
            id: row.id,
            username: row.username,
            avatar_url: row.avatar_url,
        }
    }
}

/// Supabase REST backend
pub struct SupabaseBackend {
    http: reqwest::Client,
    rest_url: String,
    anon_key: String,
}

impl SupabaseBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let url = config.supabase_url.as_deref().ok_or_else(|| {
            BackendError::Configuration("SUPABASE_URL is required".to_string())
        })?;
        let anon_key = config.supabase_anon_key.clone().ok_or_else(|| {
            BackendError::Configuration("SUPABASE_ANON_KEY is required".to_string())
        })?;

        Ok(Self {
            http: reqwest::Client::new(),
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            anon_key,
        })
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn parse_rows<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Vec<T>, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Response(format!("{}: {}", status, body)));
        }
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| BackendError::Response(e.to_string()))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, BackendError> {
        let response = self
            .authed(self.http.get(self.endpoint(table)).query(query))
            .send()
            .await?;
        Self::parse_rows(response).await
    }

    async fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<R, BackendError> {
        let response = self
            .authed(self.http.post(self.endpoint(table)))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        let mut rows: Vec<R> = Self::parse_rows(response).await?;
        if rows.is_empty() {
            return Err(BackendError::Response(format!(
                "insert into {} returned no rows",
                table
            )));
        }
        Ok(rows.remove(0))
    }

    async fn patch<R: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        body: serde_json::Value,
    ) -> Result<Vec<R>, BackendError> {
        let response = self
            .authed(self.http.patch(self.endpoint(table)).query(query))
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;
        Self::parse_rows(response).await
    }

    async fn count(&self, table: &str, query: &[(&str, String)]) -> Result<u64, BackendError> {
        let response = self
            .authed(self.http.head(self.endpoint(table)).query(query))
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Response(status.to_string()));
        }
        let content_range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                BackendError::Response("count response missing content-range".to_string())
            })?;
        parse_content_range(content_range).ok_or_else(|| {
            BackendError::Response(format!("unparseable content-range: {}", content_range))
        })
    }
}

/// Extract the total from a `content-range` value like `0-24/3573` or `*/0`
fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.parse().ok()
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl ChatBackend for SupabaseBackend {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Participant>, BackendError> {
        let rows: Vec<ProfileRow> = self
            .select("profiles", &[("id", eq(id)), ("limit", "1".to_string())])
            .await?;
        Ok(rows.into_iter().next().map(Participant::from))
    }

    async fn insert_conversation(&self) -> Result<Conversation, BackendError> {
        let conv = Conversation::new();
        let row = ConversationRow {
            id: conv.id,
            last_message_id: None,
            created_at: conv.created_at,
        };
        let created: ConversationRow = self.insert("conversations", &row).await?;
        Ok(created.into())
    }

    async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>, BackendError> {
        let rows: Vec<ConversationRow> = self
            .select(
                "conversations",
                &[("id", eq(id)), ("limit", "1".to_string())],
            )
            .await?;
        Ok(rows.into_iter().next().map(Conversation::from))
    }

    async fn set_last_message(
        &self,
        conversation_id: Uuid,
        message_id: Option<Uuid>,
    ) -> Result<(), BackendError> {
        let patched: Vec<ConversationRow> = self
            .patch(
                "conversations",
                &[("id", eq(conversation_id))],
                json!({ "last_message_id": message_id }),
            )
            .await?;
        if patched.is_empty() {
            return Err(BackendError::Response(format!(
                "conversation {} does not exist",
                conversation_id
            )));
        }
        Ok(())
    }

    async fn insert_membership(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Membership, BackendError> {
        let row = MembershipRow {
            conversation_id,
            user_id,
        };
        let created: MembershipRow = self.insert("conversation_members", &row).await?;
        Ok(created.into())
    }

    async fn memberships_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Membership>, BackendError> {
        let rows: Vec<MembershipRow> = self
            .select("conversation_members", &[("user_id", eq(user_id))])
            .await?;
        Ok(rows.into_iter().map(Membership::from).collect())
    }

    async fn memberships_for_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Membership>, BackendError> {
        let rows: Vec<MembershipRow> = self
            .select(
                "conversation_members",
                &[("conversation_id", eq(conversation_id))],
            )
            .await?;
        Ok(rows.into_iter().map(Membership::from).collect())
    }

    async fn insert_message(&self, message: &Message) -> Result<Message, BackendError> {
        let created: MessageRow = self.insert("messages", &MessageRow::from(message)).await?;
        Ok(created.into())
    }

    async fn find_message(&self, id: Uuid) -> Result<Option<Message>, BackendError> {
        let rows: Vec<MessageRow> = self
            .select("messages", &[("id", eq(id)), ("limit", "1".to_string())])
            .await?;
        Ok(rows.into_iter().next().map(Message::from))
    }

    async fn surviving_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, BackendError> {
        let rows: Vec<MessageRow> = self
            .select(
                "messages",
                &[
                    ("conversation_id", eq(conversation_id)),
                    ("deleted_at", "is.null".to_string()),
                    ("order", "created_at.asc,id.asc".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn latest_surviving_message(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<Message>, BackendError> {
        let rows: Vec<MessageRow> = self
            .select(
                "messages",
                &[
                    ("conversation_id", eq(conversation_id)),
                    ("deleted_at", "is.null".to_string()),
                    ("order", "created_at.desc,id.desc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(Message::from))
    }

    async fn unread_count(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> Result<u64, BackendError> {
        self.count(
            "messages",
            &[
                ("conversation_id", eq(conversation_id)),
                ("sender_id", format!("neq.{}", reader_id)),
                ("read_at", "is.null".to_string()),
                ("deleted_at", "is.null".to_string()),
            ],
        )
        .await
    }

    async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<u64, BackendError> {
        let patched: Vec<MessageRow> = self
            .patch(
                "messages",
                &[
                    ("conversation_id", eq(conversation_id)),
                    ("sender_id", format!("neq.{}", reader_id)),
                    ("read_at", "is.null".to_string()),
                    ("deleted_at", "is.null".to_string()),
                ],
                json!({ "read_at": read_at }),
            )
            .await?;
        Ok(patched.len() as u64)
    }

    async fn soft_delete_message(
        &self,
        message_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> Result<Option<Message>, BackendError> {
        let patched: Vec<MessageRow> = self
            .patch(
                "messages",
                &[
                    ("id", eq(message_id)),
                    ("deleted_at", "is.null".to_string()),
                ],
                json!({ "deleted_at": deleted_at }),
            )
            .await?;
        Ok(patched.into_iter().next().map(Message::from))
    }

    async fn subscribe_messages(
        &self,
        _conversation_id: Option<Uuid>,
    ) -> Result<MessageSubscription, BackendError> {
        Err(BackendError::Subscription(
            "realtime events are not available over the REST transport".to_string(),
        ))
    }
}
