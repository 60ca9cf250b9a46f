use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use banter_types::models::{LinkPreview, MessageType};

use crate::models::{MessageRow, MessageWithSenderRow};
use crate::{DELETED_PLACEHOLDER, Database, now_ms};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, content, type, deleted, \
     image_file_id, reply_to_message_id, preview_url, preview_title, preview_description, \
     preview_image, preview_site_name, created_at";

impl Database {
    /// Append a text message. One transaction: insert, advance the
    /// conversation's last-message pointer, and bump the sender's own
    /// read watermark so their own send never counts as unread.
    pub fn insert_message(
        &self,
        id: &str,
        conversation_id: &str,
        sender_id: &str,
        content: &str,
        image_file_id: Option<&str>,
        reply_to_message_id: Option<&str>,
    ) -> Result<i64> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, content, type, deleted,
                                       image_file_id, reply_to_message_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8)",
                params![
                    id,
                    conversation_id,
                    sender_id,
                    content,
                    MessageType::Text.as_str(),
                    image_file_id,
                    reply_to_message_id,
                    now
                ],
            )?;
            tx.execute(
                "UPDATE conversations SET last_message_id = ?1 WHERE id = ?2",
                params![id, conversation_id],
            )?;
            tx.execute(
                "UPDATE conversation_members SET last_read_time = ?1
                 WHERE conversation_id = ?2 AND user_id = ?3",
                params![now, conversation_id, sender_id],
            )?;

            tx.commit()?;
            Ok(now)
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS);
            let row = conn.query_row(&sql, [id], map_message_row).optional()?;
            Ok(row)
        })
    }

    /// Resolve a replied-to message together with its sender's display name.
    /// Returns None for a dangling reference; the reply preview just
    /// disappears in that case.
    pub fn get_message_with_sender(&self, id: &str) -> Result<Option<MessageWithSenderRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT m.{}, u.name, u.avatar_url
                 FROM messages m
                 LEFT JOIN users u ON u.id = m.sender_id
                 WHERE m.id = ?1",
                MESSAGE_COLUMNS.replace(", ", ", m.")
            );
            let row = conn
                .query_row(&sql, [id], map_message_with_sender_row)
                .optional()?;
            Ok(row)
        })
    }

    /// Newest-first page of messages with sender display data joined in.
    /// `before` is the (created_at, id) of the previous page's oldest row;
    /// the compound cursor keeps messages sharing a millisecond from being
    /// skipped across a page boundary.
    pub fn list_messages(
        &self,
        conversation_id: &str,
        limit: u32,
        before: Option<(i64, &str)>,
    ) -> Result<Vec<MessageWithSenderRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT m.{}, u.name, u.avatar_url
                 FROM messages m
                 LEFT JOIN users u ON u.id = m.sender_id
                 WHERE m.conversation_id = ?1
                   AND (m.created_at < ?2 OR (m.created_at = ?2 AND m.id < ?3))
                 ORDER BY m.created_at DESC, m.id DESC
                 LIMIT ?4",
                MESSAGE_COLUMNS.replace(", ", ", m.")
            );
            let (cursor_ts, cursor_id) = match before {
                Some((ts, id)) => (ts, id),
                None => (i64::MAX, ""),
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![conversation_id, cursor_ts, cursor_id, limit],
                    map_message_with_sender_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Soft-delete: the row survives (still listed, flagged deleted) but the
    /// content is overwritten and all reactions on the message are removed.
    pub fn soft_delete_message(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE messages SET deleted = 1, content = ?1 WHERE id = ?2",
                params![DELETED_PLACEHOLDER, id],
            )?;
            tx.execute("DELETE FROM reactions WHERE message_id = ?1", [id])?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Attach a fetched link preview, unless the message was deleted (or
    /// removed entirely) in the meantime. Returns whether a row was patched.
    pub fn patch_link_preview(&self, id: &str, preview: &LinkPreview) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages
                 SET preview_url = ?1, preview_title = ?2, preview_description = ?3,
                     preview_image = ?4, preview_site_name = ?5
                 WHERE id = ?6 AND deleted = 0",
                params![
                    preview.url,
                    preview.title,
                    preview.description,
                    preview.image,
                    preview.site_name,
                    id
                ],
            )?;
            Ok(changed > 0)
        })
    }
}

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        content: row.get(3)?,
        message_type: row.get(4)?,
        deleted: row.get(5)?,
        image_file_id: row.get(6)?,
        reply_to_message_id: row.get(7)?,
        preview_url: row.get(8)?,
        preview_title: row.get(9)?,
        preview_description: row.get(10)?,
        preview_image: row.get(11)?,
        preview_site_name: row.get(12)?,
        created_at: row.get(13)?,
    })
}

fn map_message_with_sender_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageWithSenderRow> {
    Ok(MessageWithSenderRow {
        message: map_message_row(row)?,
        sender_name: row
            .get::<_, Option<String>>(14)?
            .unwrap_or_else(|| "Unknown User".to_string()),
        sender_avatar: row.get::<_, Option<String>>(15)?.unwrap_or_default(),
    })
}
