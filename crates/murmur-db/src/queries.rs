use crate::models::{MemberRow, MessageRow, TokenRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, Row};

impl Database {
    // -- Members --

    /// Insert a member. Fails with a UNIQUE violation on `members.username`
    /// (see [`crate::unique_violation`]) when the username is taken.
    pub fn create_member(&self, username: &str, password_hash: &str, created_at: &str) -> Result<MemberRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO members (username, password, created_at) VALUES (?1, ?2, ?3)",
                (username, password_hash, created_at),
            )?;
            Ok(MemberRow {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                password: password_hash.to_string(),
                created_at: created_at.to_string(),
            })
        })
    }

    pub fn get_member_by_username(&self, username: &str) -> Result<Option<MemberRow>> {
        self.with_conn(|conn| query_member_by_username(conn, username))
    }

    /// Inserts a member and their first token in one transaction; if either
    /// insert fails nothing is stored.
    pub fn create_member_with_token(
        &self,
        username: &str,
        password_hash: &str,
        key: &str,
        created_at: &str,
    ) -> Result<(MemberRow, TokenRow)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO members (username, password, created_at) VALUES (?1, ?2, ?3)",
                (username, password_hash, created_at),
            )?;
            let member_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO tokens (key, member_id, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, member_id, created_at],
            )?;
            tx.commit()?;

            Ok((
                MemberRow {
                    id: member_id,
                    username: username.to_string(),
                    password: password_hash.to_string(),
                    created_at: created_at.to_string(),
                },
                TokenRow {
                    key: key.to_string(),
                    member_id,
                    created_at: created_at.to_string(),
                },
            ))
        })
    }

    /// Removes a member together with their tokens and messages.
    /// Returns false if no such member existed.
    pub fn delete_member(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM members WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    // -- Tokens --

    pub fn insert_token(&self, key: &str, member_id: i64, created_at: &str) -> Result<TokenRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tokens (key, member_id, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, member_id, created_at],
            )?;
            Ok(TokenRow {
                key: key.to_string(),
                member_id,
                created_at: created_at.to_string(),
            })
        })
    }

    /// Owner of the token with exactly this key.
    pub fn get_member_by_token(&self, key: &str) -> Result<Option<MemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.username, m.password, m.created_at
                 FROM tokens t
                 JOIN members m ON t.member_id = m.id
                 WHERE t.key = ?1",
            )?;
            let row = stmt.query_row([key], member_from_row).optional()?;
            Ok(row)
        })
    }

    #[cfg(test)]
    pub fn count_tokens_for_member(&self, member_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM tokens WHERE member_id = ?1",
                [member_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, member_id: i64, text: &str, created_at: &str) -> Result<MessageRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (member_id, text, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![member_id, text, created_at],
            )?;
            let id = conn.last_insert_rowid();

            let mut stmt = conn.prepare(&format!("{} WHERE msg.id = ?1", MESSAGE_SELECT))?;
            let row = stmt.query_row([id], message_from_row)?;
            Ok(row)
        })
    }

    /// Every message, oldest first.
    pub fn get_messages(&self) -> Result<Vec<MessageRow>> {
        self.with_conn(query_messages)
    }

    #[cfg(test)]
    pub fn count_messages_for_member(&self, member_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE member_id = ?1",
                [member_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

// JOIN members to fetch the author in a single query (eliminates N+1)
const MESSAGE_SELECT: &str = "SELECT msg.id, msg.member_id, m.username, m.created_at, msg.text, msg.created_at
     FROM messages msg
     JOIN members m ON msg.member_id = m.id";

fn query_member_by_username(conn: &Connection, username: &str) -> Result<Option<MemberRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, created_at FROM members WHERE username = ?1")?;

    let row = stmt.query_row([username], member_from_row).optional()?;
    Ok(row)
}

fn query_messages(conn: &Connection) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY msg.created_at ASC, msg.id ASC",
        MESSAGE_SELECT
    ))?;

    let rows = stmt
        .query_map([], message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<MemberRow> {
    Ok(MemberRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        member_id: row.get(1)?,
        author_username: row.get(2)?,
        author_created_at: row.get(3)?,
        text: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
