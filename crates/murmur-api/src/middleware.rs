use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use murmur_db::Database;
use murmur_types::models::Member;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::tokens;

/// Pulls the token out of an `Authorization` value.
///
/// `"<scheme> <token>"` yields the part after the first space, whatever the
/// scheme is; a value without a space is taken as the bare token.
pub fn token_from_header(header: &str) -> Option<&str> {
    if header.is_empty() {
        return None;
    }
    match header.split(' ').nth(1) {
        Some(token) => Some(token),
        None => Some(header),
    }
}

/// Maps an `Authorization` header to its member. Every failure, including a
/// store error, is reported as `None`.
pub fn resolve_token(db: &Database, header: Option<&str>) -> Option<Member> {
    let key = token_from_header(header?)?;
    match tokens::resolve(db, key) {
        Ok(member) => member,
        Err(e) => {
            warn!("Token lookup failed: {:#}", e);
            None
        }
    }
}

/// Rejects the request with 401 unless it carries a valid token, otherwise
/// makes the caller's [`Member`] available as an extension.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let member = blocking(move || Ok(resolve_token(&state.db, auth_header.as_deref()))).await;

    match member {
        Ok(Some(member)) => {
            req.extensions_mut().insert(member);
            next.run(req).await
        }
        Ok(None) => ApiError::Unauthenticated.into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials;

    #[test]
    fn header_forms() {
        assert_eq!(token_from_header("Token abc"), Some("abc"));
        assert_eq!(token_from_header("Bearer abc"), Some("abc"));
        assert_eq!(token_from_header("abc"), Some("abc"));
        assert_eq!(token_from_header("Token abc extra"), Some("abc"));
        assert_eq!(token_from_header("Token "), Some(""));
        assert_eq!(token_from_header(""), None);
    }

    #[test]
    fn resolves_with_or_without_scheme() {
        let db = Database::open_in_memory().unwrap();
        let alice = credentials::register(&db, "alice", "secret123").unwrap();
        let token = tokens::issue(&db, &alice).unwrap();

        let bare = resolve_token(&db, Some(&token.key));
        let prefixed = resolve_token(&db, Some(&format!("Token {}", token.key)));
        let other_scheme = resolve_token(&db, Some(&format!("Bearer {}", token.key)));

        assert_eq!(bare.as_ref(), Some(&alice));
        assert_eq!(prefixed.as_ref(), Some(&alice));
        assert_eq!(other_scheme.as_ref(), Some(&alice));
    }

    #[test]
    fn absent_or_bogus_is_none() {
        let db = Database::open_in_memory().unwrap();

        assert!(resolve_token(&db, None).is_none());
        assert!(resolve_token(&db, Some("")).is_none());
        assert!(resolve_token(&db, Some("Token ")).is_none());
        assert!(resolve_token(&db, Some("Token nope")).is_none());
    }
}
