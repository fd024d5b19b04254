use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;

use murmur_db::{Database, format_timestamp};
use murmur_types::api::{CreateMessageRequest, MessageResponse};
use murmur_types::models::{Member, Message};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::validation::{JsonBody, TextField};

/// Every message, oldest first, with its author. No pagination.
pub fn list_all(db: &Database) -> anyhow::Result<Vec<Message>> {
    db.get_messages()?
        .into_iter()
        .map(|row| row.into_message())
        .collect()
}

/// Validates and stores a message from `author`.
pub fn create(db: &Database, author: &Member, text: &str) -> Result<Message, ApiError> {
    let text = TextField::MESSAGE.clean(Some(text.into()))?;
    let created_at = format_timestamp(&Utc::now());
    let row = db.insert_message(author.id, &text, &created_at)?;
    Ok(row.into_message()?)
}

/// Authorization model: any authenticated member reads every message.
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(_member): Extension<Member>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = blocking(move || Ok(list_all(&state.db)?)).await?;

    let body: Vec<MessageResponse> = messages.into_iter().map(MessageResponse::from).collect();
    Ok(Json(body))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(member): Extension<Member>,
    JsonBody(req): JsonBody<CreateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = TextField::MESSAGE.clean(req.text)?;

    let message = blocking(move || create(&state.db, &member, &text)).await?;

    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}
