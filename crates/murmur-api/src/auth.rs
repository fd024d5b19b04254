use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use murmur_db::Database;
use murmur_types::api::{AuthResponse, CredentialsRequest, MemberResponse};
use murmur_types::models::Member;

use crate::credentials;
use crate::error::{ApiError, blocking};
use crate::tokens;
use crate::validation::{JsonBody, TextField};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}

/// POST /auth/register — creates a member and returns a fresh token.
///
/// The username is fully checked, taken names included, before the password
/// is looked at, so a taken name is the error reported.
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = TextField::USERNAME.clean(req.username)?;
    let raw_password = req.password;

    let (member, token) = blocking(move || {
        credentials::ensure_username_available(&state.db, &username)?;
        let password = TextField::PASSWORD.clean(raw_password)?;
        credentials::register_with_token(&state.db, &username, &password)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token: token.key,
            user: MemberResponse::from(&member),
        }),
    ))
}

/// POST /auth/login — every successful call mints a new token.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = TextField::USERNAME.clean(req.username)?;
    let password = TextField::PASSWORD.clean(req.password)?;

    let (member, token) = blocking(move || {
        let member = credentials::verify(&state.db, &username, &password)?;
        let token = tokens::issue(&state.db, &member)?;
        Ok((member, token))
    })
    .await?;

    info!("Member {} logged in", member.id);

    Ok(Json(AuthResponse {
        token: token.key,
        user: MemberResponse::from(&member),
    }))
}

/// GET /auth/me
pub async fn me(Extension(member): Extension<Member>) -> Json<MemberResponse> {
    Json(MemberResponse::from(&member))
}
