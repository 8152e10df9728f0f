use hex::ToHex;
use rusqlite::{Connection, OptionalExtension};
use sha2::Digest;
use uuid::Uuid;

/// A logged-in browser session. Only the hash of the bearer token is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token_hash: String,
    pub user_id: i64,
    pub sesskey: String,
}

pub fn token_hash(token: &str) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().encode_hex::<String>()
}

/// Returns the bearer token together with the stored session.
pub fn open_session(conn: &Connection, user_id: i64) -> anyhow::Result<(String, Session)> {
    let token = Uuid::new_v4().simple().to_string();
    let sesskey: String = Uuid::new_v4().simple().to_string().chars().take(10).collect();
    let session = Session {
        token_hash: token_hash(&token),
        user_id,
        sesskey,
    };
    conn.execute(
        "INSERT INTO sessions(token_hash, user_id, sesskey, created_at) VALUES(?, ?, ?, ?)",
        (
            &session.token_hash,
            session.user_id,
            &session.sesskey,
            chrono::Utc::now().to_rfc3339(),
        ),
    )?;
    Ok((token, session))
}

pub fn resolve_session(conn: &Connection, token: &str) -> anyhow::Result<Option<Session>> {
    let hash = token_hash(token);
    let row = conn
        .query_row(
            "SELECT token_hash, user_id, sesskey FROM sessions WHERE token_hash = ?",
            [&hash],
            |r| {
                Ok(Session {
                    token_hash: r.get(0)?,
                    user_id: r.get(1)?,
                    sesskey: r.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Returns false when the token did not name an open session.
pub fn close_session(conn: &Connection, token: &str) -> anyhow::Result<bool> {
    let hash = token_hash(token);
    conn.execute(
        "DELETE FROM session_active_groups WHERE token_hash = ?",
        [&hash],
    )?;
    let n = conn.execute("DELETE FROM sessions WHERE token_hash = ?", [&hash])?;
    Ok(n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn open_resolve_close() {
        let conn = db::open_in_memory().expect("db");
        conn.execute(
            "INSERT INTO users(id, username, firstname, lastname) VALUES(7, 'u7', 'U', 'Seven')",
            [],
        )
        .expect("user");

        let (token, session) = open_session(&conn, 7).expect("open");
        assert_eq!(session.sesskey.len(), 10);
        assert_ne!(session.token_hash, token);
        assert_eq!(session.token_hash.len(), 64);

        let resolved = resolve_session(&conn, &token).expect("resolve");
        assert_eq!(resolved, Some(session));
        assert!(resolve_session(&conn, "nope").expect("resolve").is_none());

        assert!(close_session(&conn, &token).expect("close"));
        assert!(!close_session(&conn, &token).expect("close twice"));
        assert!(resolve_session(&conn, &token).expect("resolve").is_none());
    }
}
