use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered member. Carries identity only; the password hash never
/// leaves the db layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Bearer credential minted on register/login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub key: String,
    pub member_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub author: Member,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
