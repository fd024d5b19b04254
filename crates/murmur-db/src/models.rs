//! Database row types — these map directly to SQLite rows.
//! Distinct from murmur-types models to keep the DB layer independent.
use anyhow::Result;
use murmur_types::models::{Member, Message, Token};

use crate::parse_timestamp;

#[derive(Debug)]
pub struct MemberRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

impl MemberRow {
    pub fn to_member(&self) -> Result<Member> {
        Ok(Member {
            id: self.id,
            username: self.username.clone(),
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[derive(Debug)]
pub struct TokenRow {
    pub key: String,
    pub member_id: i64,
    pub created_at: String,
}

impl TokenRow {
    pub fn into_token(self) -> Result<Token> {
        Ok(Token {
            created_at: parse_timestamp(&self.created_at)?,
            key: self.key,
            member_id: self.member_id,
        })
    }
}

/// A message joined with its author.
#[derive(Debug)]
pub struct MessageRow {
    pub id: i64,
    pub member_id: i64,
    pub author_username: String,
    pub author_created_at: String,
    pub text: String,
    pub created_at: String,
}

impl MessageRow {
    pub fn into_message(self) -> Result<Message> {
        Ok(Message {
            id: self.id,
            author: Member {
                id: self.member_id,
                username: self.author_username,
                created_at: parse_timestamp(&self.author_created_at)?,
            },
            created_at: parse_timestamp(&self.created_at)?,
            text: self.text,
        })
    }
}
