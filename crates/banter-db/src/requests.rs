use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

use crate::conversations::insert_direct_conversation;
use crate::models::{RequestRow, UserRow};
use crate::{Database, now_ms};

impl Database {
    pub fn get_request(&self, id: &str) -> Result<Option<RequestRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, from_user_id, to_user_id, status, created_at
                     FROM message_requests WHERE id = ?1",
                    [id],
                    map_request_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// The request for an ordered (from, to) pair, whatever its status.
    pub fn get_request_by_pair(&self, from_user_id: &str, to_user_id: &str) -> Result<Option<RequestRow>> {
        self.with_conn(|conn| query_request_by_pair(conn, from_user_id, to_user_id))
    }

    /// First-contact handshake. At most one request per ordered pair:
    /// re-sending returns the existing id whatever its status — declined
    /// included, there is no re-request path. Returns None when the
    /// reverse-direction request is already accepted (the pair is
    /// connected; no duplicate channel). Otherwise inserts a fresh
    /// pending request.
    pub fn send_request(&self, from_user_id: &str, to_user_id: &str) -> Result<Option<String>> {
        let now = now_ms();
        self.with_conn(|conn| {
            if let Some(existing) = query_request_by_pair(conn, from_user_id, to_user_id)? {
                return Ok(Some(existing.id));
            }

            if let Some(reverse) = query_request_by_pair(conn, to_user_id, from_user_id)? {
                if reverse.status == "accepted" {
                    return Ok(None);
                }
            }

            let id = uuid::Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO message_requests (id, from_user_id, to_user_id, status, created_at)
                 VALUES (?1, ?2, ?3, 'pending', ?4)",
                params![id, from_user_id, to_user_id, now],
            )?;
            Ok(Some(id))
        })
    }

    /// Accept a request: flip the status and create the direct conversation
    /// plus both memberships in one transaction. The accepting recipient
    /// gets a now-watermark, the original sender a zero one.
    pub fn accept_request(&self, request_id: &str, recipient_id: &str, sender_id: &str) -> Result<String> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "UPDATE message_requests SET status = 'accepted' WHERE id = ?1",
                [request_id],
            )?;
            let conversation_id = insert_direct_conversation(&tx, recipient_id, sender_id, now)?;

            tx.commit()?;
            Ok(conversation_id)
        })
    }

    pub fn decline_request(&self, request_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE message_requests SET status = 'declined' WHERE id = ?1",
                [request_id],
            )?;
            Ok(())
        })
    }

    /// Pending requests addressed to a user, with the sender's profile.
    pub fn pending_incoming(&self, to_user_id: &str) -> Result<Vec<(RequestRow, UserRow)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.from_user_id, r.to_user_id, r.status, r.created_at,
                        u.id, u.external_id, u.name, u.email, u.avatar_url, u.is_online, u.last_seen, u.created_at
                 FROM message_requests r
                 JOIN users u ON u.id = r.from_user_id
                 WHERE r.to_user_id = ?1 AND r.status = 'pending'
                 ORDER BY r.created_at DESC",
            )?;
            let rows = stmt
                .query_map([to_user_id], |row| {
                    let request = map_request_row(row)?;
                    let user = UserRow {
                        id: row.get(5)?,
                        external_id: row.get(6)?,
                        name: row.get(7)?,
                        email: row.get(8)?,
                        avatar_url: row.get(9)?,
                        is_online: row.get(10)?,
                        last_seen: row.get(11)?,
                        created_at: row.get(12)?,
                    };
                    Ok((request, user))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn pending_count(&self, to_user_id: &str) -> Result<u32> {
        self.with_conn(|conn| {
            let count: u32 = conn.query_row(
                "SELECT COUNT(*) FROM message_requests WHERE to_user_id = ?1 AND status = 'pending'",
                [to_user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

fn query_request_by_pair(
    conn: &Connection,
    from_user_id: &str,
    to_user_id: &str,
) -> Result<Option<RequestRow>> {
    let row = conn
        .query_row(
            "SELECT id, from_user_id, to_user_id, status, created_at
             FROM message_requests WHERE from_user_id = ?1 AND to_user_id = ?2",
            params![from_user_id, to_user_id],
            map_request_row,
        )
        .optional()?;
    Ok(row)
}

fn map_request_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RequestRow> {
    Ok(RequestRow {
        id: row.get(0)?,
        from_user_id: row.get(1)?,
        to_user_id: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
    })
}
