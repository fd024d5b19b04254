use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::{Member, Message};

/// Keeps an explicit JSON `null` distinguishable from an absent key:
/// absent stays `None`, `null` becomes `Some(Value::Null)`.
fn present<'de, D>(de: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(de).map(Some)
}

// -- Auth --

/// Body of `POST /auth/register` and `POST /auth/login`.
///
/// Fields stay as raw JSON values so the handlers can report
/// missing / null / non-string input with their own messages.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default, deserialize_with = "present")]
    pub username: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub password: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberResponse {
    pub id: i64,
    pub username: String,
}

impl From<&Member> for MemberResponse {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id,
            username: member.username.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: MemberResponse,
}

// -- Messages --

#[derive(Debug, Default, Deserialize)]
pub struct CreateMessageRequest {
    #[serde(default, deserialize_with = "present")]
    pub text: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: i64,
    pub author: MemberResponse,
    /// Flattened author name, read directly by the web client.
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            author: MemberResponse::from(&message.author),
            username: message.author.username,
            text: message.text,
            created_at: message.created_at,
        }
    }
}

// -- Misc --

#[derive(Debug, Serialize, Deserialize)]
pub struct HelloResponse {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
