use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Utc;
use tracing::{info, warn};

use murmur_db::{Database, format_timestamp};
use murmur_types::models::{Member, Token};

use crate::error::ApiError;
use crate::tokens;

/// Fails with `DuplicateUsername` if the name is already registered.
///
/// Only an early answer: two concurrent registrations can both pass it, and
/// the UNIQUE constraint on `members.username` decides which one wins.
pub fn ensure_username_available(db: &Database, username: &str) -> Result<(), ApiError> {
    if db.get_member_by_username(username)?.is_some() {
        return Err(ApiError::DuplicateUsername);
    }
    Ok(())
}

/// Creates a member with an Argon2id-hashed password.
pub fn register(db: &Database, username: &str, password: &str) -> Result<Member, ApiError> {
    ensure_username_available(db, username)?;
    insert_member(db, username, password)
}

fn insert_member(db: &Database, username: &str, password: &str) -> Result<Member, ApiError> {
    let password_hash = hash_password(password)?;
    let created_at = format_timestamp(&Utc::now());

    let row = db
        .create_member(username, &password_hash, &created_at)
        .map_err(ApiError::from_store)?;

    info!("Registered member {} ({})", row.username, row.id);
    Ok(row.to_member()?)
}

/// Creates a member together with their first token, atomically: on any
/// failure neither row exists. Does not run the early username check.
pub fn register_with_token(db: &Database, username: &str, password: &str) -> Result<(Member, Token), ApiError> {
    let password_hash = hash_password(password)?;
    store_with_token(db, username, &password_hash, tokens::generate_key)
}

fn store_with_token(
    db: &Database,
    username: &str,
    password_hash: &str,
    next_key: impl FnMut() -> String,
) -> Result<(Member, Token), ApiError> {
    let (member, token) = tokens::with_fresh_key(next_key, |key| {
        let created_at = format_timestamp(&Utc::now());
        db.create_member_with_token(username, password_hash, key, &created_at)
            .map_err(ApiError::from_store)
    })?;

    info!("Registered member {} ({})", member.username, member.id);
    Ok((member.to_member()?, token.into_token()?))
}

/// Checks a username/password pair. Unknown usernames and wrong passwords
/// fail the same way.
pub fn verify(db: &Database, username: &str, password: &str) -> Result<Member, ApiError> {
    let Some(row) = db.get_member_by_username(username)? else {
        warn!("Login failed: unknown username");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(password, &row.password)? {
        warn!("Login failed for member {}", row.id);
        return Err(ApiError::InvalidCredentials);
    }

    Ok(row.to_member()?)
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("stored password hash is corrupt: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    const TS: &str = "2026-01-01T00:00:00.000000Z";

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn register_then_verify_returns_same_member() {
        let db = db();
        let registered = register(&db, "alice", "secret123").unwrap();
        let verified = verify(&db, "alice", "secret123").unwrap();

        assert_eq!(registered, verified);
        assert_eq!(verified.username, "alice");
    }

    #[test]
    fn password_is_stored_hashed() {
        let db = db();
        register(&db, "alice", "secret123").unwrap();

        let row = db.get_member_by_username("alice").unwrap().unwrap();
        assert_ne!(row.password, "secret123");
        assert!(row.password.starts_with("$argon2id$"));
    }

    #[test]
    fn duplicate_username_rejected_once() {
        let db = db();
        register(&db, "alice", "secret123").unwrap();

        let err = register(&db, "alice", "other-pass").unwrap_err();
        assert!(matches!(err, ApiError::DuplicateUsername));

        // the original password still works, so the first row is untouched
        assert!(verify(&db, "alice", "secret123").is_ok());
    }

    #[test]
    fn constraint_wins_when_precheck_is_passed() {
        let db = db();
        ensure_username_available(&db, "alice").unwrap();

        // another registration lands between the check and the insert
        db.create_member("alice", "x", TS).unwrap();

        let err = insert_member(&db, "alice", "secret123").unwrap_err();
        assert!(matches!(err, ApiError::DuplicateUsername));
    }

    #[test]
    fn register_with_token_stores_both() {
        let db = db();
        let (member, token) = register_with_token(&db, "alice", "secret123").unwrap();

        assert_eq!(token.member_id, member.id);
        assert_eq!(tokens::resolve(&db, &token.key).unwrap(), Some(member.clone()));
        assert_eq!(verify(&db, "alice", "secret123").unwrap(), member);
    }

    #[test]
    fn register_with_token_maps_taken_name() {
        let db = db();
        db.create_member("alice", "x", TS).unwrap();

        let err = register_with_token(&db, "alice", "secret123").unwrap_err();
        assert!(matches!(err, ApiError::DuplicateUsername));
    }

    #[test]
    fn exhausted_token_keys_leave_no_member() {
        let db = db();
        let bob = db.create_member("bob", "x", TS).unwrap();
        db.insert_token("taken", bob.id, TS).unwrap();

        let hash = hash_password("secret123").unwrap();
        let err = store_with_token(&db, "alice", &hash, || "taken".to_string()).unwrap_err();

        assert!(matches!(err, ApiError::TokenCollision));
        assert!(db.get_member_by_username("alice").unwrap().is_none());

        // a later attempt with a free key can still claim the name
        let (member, token) = store_with_token(&db, "alice", &hash, || "free".to_string()).unwrap();
        assert_eq!(member.username, "alice");
        assert_eq!(token.key, "free");
    }

    #[test]
    fn concurrent_registrations_of_one_name() {
        let db = Arc::new(db());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    let password = format!("password-{}", i);
                    match ensure_username_available(&db, "alice") {
                        Ok(()) => register_with_token(&db, "alice", &password),
                        Err(e) => Err(e),
                    }
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let dup = results
            .iter()
            .filter(|r| matches!(r, Err(ApiError::DuplicateUsername)))
            .count();

        assert_eq!(ok, 1);
        assert_eq!(dup, 7);

        let (winner, token) = results.into_iter().find_map(Result::ok).unwrap();
        let row = db.get_member_by_username("alice").unwrap().unwrap();
        assert_eq!(row.id, winner.id);
        assert_eq!(tokens::resolve(&db, &token.key).unwrap(), Some(winner));
    }

    #[test]
    fn wrong_password_and_unknown_user_fail_identically() {
        let db = db();
        register(&db, "alice", "secret123").unwrap();

        let wrong_pw = verify(&db, "alice", "nope").unwrap_err();
        let unknown = verify(&db, "mallory", "secret123").unwrap_err();

        assert!(matches!(wrong_pw, ApiError::InvalidCredentials));
        assert!(matches!(unknown, ApiError::InvalidCredentials));
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
    }

    #[test]
    fn corrupt_hash_is_internal() {
        let db = db();
        db.create_member("alice", "not-a-phc-string", TS).unwrap();

        let err = verify(&db, "alice", "whatever").unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
