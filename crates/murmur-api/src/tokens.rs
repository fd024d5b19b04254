use chrono::Utc;
use tracing::warn;

use murmur_db::{Database, format_timestamp};
use murmur_types::models::{Member, Token};

use crate::error::ApiError;

/// 20 random bytes, hex-encoded to 40 characters.
const KEY_BYTES: usize = 20;

/// Fresh keys tried before a collision is reported.
const ISSUE_ATTEMPTS: usize = 3;

pub fn generate_key() -> String {
    let bytes: [u8; KEY_BYTES] = rand::random();
    hex::encode(bytes)
}

/// Mints and stores a new token for `member`. Existing tokens stay valid.
pub fn issue(db: &Database, member: &Member) -> Result<Token, ApiError> {
    with_fresh_key(generate_key, |key| {
        let created_at = format_timestamp(&Utc::now());
        let row = db
            .insert_token(key, member.id, &created_at)
            .map_err(ApiError::from_store)?;
        Ok(row.into_token()?)
    })
}

/// Runs `op` with keys drawn from `next_key`, drawing again whenever `op`
/// reports [`ApiError::TokenCollision`], up to `ISSUE_ATTEMPTS` times.
pub(crate) fn with_fresh_key<T>(
    mut next_key: impl FnMut() -> String,
    mut op: impl FnMut(&str) -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    for attempt in 1..=ISSUE_ATTEMPTS {
        match op(&next_key()) {
            Err(ApiError::TokenCollision) => {
                warn!("Token key collision (attempt {})", attempt);
            }
            other => return other,
        }
    }
    Err(ApiError::TokenCollision)
}

/// Member owning the token with exactly this key, if any.
pub fn resolve(db: &Database, key: &str) -> anyhow::Result<Option<Member>> {
    db.get_member_by_token(key)?
        .map(|row| row.to_member())
        .transpose()
}
