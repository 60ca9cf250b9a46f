use anyhow::{Result, anyhow};
use rand::Rng;
use rand::distr::Alphanumeric;
use rusqlite::{Connection, OptionalExtension, params};

use banter_types::models::MemberRole;

use crate::models::{ConversationRow, MembershipRow, UserRow};
use crate::users::{map_user_row, query_user_by_id};
use crate::{Database, now_ms};

/// What happened when a member left a group.
#[derive(Debug, Clone, Copy)]
pub struct LeaveOutcome {
    /// True when the leaver was the last member and the conversation (plus
    /// its messages and reactions) was removed.
    pub conversation_deleted: bool,
}

impl Database {
    // -- Direct conversations --

    /// Find an existing direct conversation shared by both users.
    pub fn find_direct_conversation(&self, user_a: &str, user_b: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let id = conn
                .query_row(
                    "SELECT c.id
                     FROM conversations c
                     JOIN conversation_members ma ON ma.conversation_id = c.id AND ma.user_id = ?1
                     JOIN conversation_members mb ON mb.conversation_id = c.id AND mb.user_id = ?2
                     WHERE c.is_group = 0",
                    params![user_a, user_b],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(id)
        })
    }

    /// Create a direct conversation between two users. The initiator's
    /// watermark starts at now; the recipient's at 0, so it shows unread.
    pub fn create_direct_conversation(&self, initiator: &str, recipient: &str) -> Result<String> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let id = insert_direct_conversation(&tx, initiator, recipient, now)?;
            tx.commit()?;
            Ok(id)
        })
    }

    // -- Groups --

    /// Create a group: creator joins as admin with a now-watermark, everyone
    /// else as member with a zero-watermark. Emits the creation system
    /// message in the same transaction.
    pub fn create_group(
        &self,
        name: &str,
        image_url: Option<&str>,
        creator_id: &str,
        member_ids: &[String],
    ) -> Result<String> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let creator = query_user_by_id(&tx, creator_id)?
                .ok_or_else(|| anyhow!("Creator not found: {}", creator_id))?;

            let id = uuid::Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO conversations (id, is_group, name, image_url, creator_id, created_at)
                 VALUES (?1, 1, ?2, ?3, ?4, ?5)",
                params![id, name, image_url, creator_id, now],
            )?;

            insert_membership(&tx, &id, creator_id, now, Some(MemberRole::Admin.as_str()))?;
            for member in member_ids {
                if member == creator_id {
                    continue;
                }
                insert_membership(&tx, &id, member, 0, Some(MemberRole::Member.as_str()))?;
            }

            insert_system_message(&tx, &id, creator_id, &format!("{} created the group", creator.name), now)?;

            tx.commit()?;
            Ok(id)
        })
    }

    pub fn get_conversation(&self, id: &str) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| query_conversation(conn, id))
    }

    /// Patch group name and/or image. A rename emits a system message in the
    /// same transaction; an image change does not.
    pub fn update_group(
        &self,
        conversation_id: &str,
        name: Option<&str>,
        image_url: Option<&str>,
        actor_id: &str,
    ) -> Result<()> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if let Some(name) = name {
                tx.execute(
                    "UPDATE conversations SET name = ?1 WHERE id = ?2",
                    params![name, conversation_id],
                )?;
            }
            if let Some(image_url) = image_url {
                tx.execute(
                    "UPDATE conversations SET image_url = ?1 WHERE id = ?2",
                    params![image_url, conversation_id],
                )?;
            }

            if let Some(name) = name {
                let actor = query_user_by_id(&tx, actor_id)?
                    .ok_or_else(|| anyhow!("Actor not found: {}", actor_id))?;
                insert_system_message(
                    &tx,
                    conversation_id,
                    actor_id,
                    &format!("{} renamed the group to \"{}\"", actor.name, name),
                    now,
                )?;
            }

            tx.commit()?;
            Ok(())
        })
    }

    /// Add a user to a group. Returns false (and changes nothing) when the
    /// target is already a member.
    pub fn add_member(&self, conversation_id: &str, target_id: &str, actor_id: &str) -> Result<bool> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if query_membership(&tx, conversation_id, target_id)?.is_some() {
                return Ok(false);
            }

            insert_membership(&tx, conversation_id, target_id, 0, Some(MemberRole::Member.as_str()))?;

            let actor = query_user_by_id(&tx, actor_id)?
                .ok_or_else(|| anyhow!("Actor not found: {}", actor_id))?;
            let target_name = query_user_by_id(&tx, target_id)?
                .map(|u| u.name)
                .unwrap_or_else(|| "Someone".to_string());
            insert_system_message(
                &tx,
                conversation_id,
                actor_id,
                &format!("{} was added by {}", target_name, actor.name),
                now,
            )?;

            tx.commit()?;
            Ok(true)
        })
    }

    /// Leave a group. The "left" system message is written before the
    /// membership row is removed, so the last member is still attributable.
    /// An emptied group is deleted along with its messages and reactions.
    pub fn leave_group(&self, conversation_id: &str, user_id: &str) -> Result<LeaveOutcome> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let user = query_user_by_id(&tx, user_id)?
                .ok_or_else(|| anyhow!("User not found: {}", user_id))?;

            insert_system_message(
                &tx,
                conversation_id,
                user_id,
                &format!("{} left the group", user.name),
                now,
            )?;

            tx.execute(
                "DELETE FROM conversation_members WHERE conversation_id = ?1 AND user_id = ?2",
                params![conversation_id, user_id],
            )?;

            let remaining: i64 = tx.query_row(
                "SELECT COUNT(*) FROM conversation_members WHERE conversation_id = ?1",
                [conversation_id],
                |row| row.get(0),
            )?;

            let deleted = remaining == 0;
            if deleted {
                delete_conversation_cascade(&tx, conversation_id)?;
            }

            tx.commit()?;
            Ok(LeaveOutcome {
                conversation_deleted: deleted,
            })
        })
    }

    // -- Invite codes --

    /// Return the group's invite code, generating one on first call.
    pub fn generate_invite_code(&self, conversation_id: &str) -> Result<String> {
        self.with_conn(|conn| {
            let existing: Option<String> = conn.query_row(
                "SELECT invite_code FROM conversations WHERE id = ?1",
                [conversation_id],
                |row| row.get(0),
            )?;
            if let Some(code) = existing {
                return Ok(code);
            }

            let code = new_invite_code();
            conn.execute(
                "UPDATE conversations SET invite_code = ?1 WHERE id = ?2",
                params![code, conversation_id],
            )?;
            Ok(code)
        })
    }

    /// Invite codes are stored uppercase; lookup normalizes the input.
    pub fn find_by_invite_code(&self, code: &str) -> Result<Option<ConversationRow>> {
        let normalized = code.trim().to_uppercase();
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, is_group, name, image_url, invite_code, creator_id, last_message_id, created_at
                     FROM conversations WHERE invite_code = ?1",
                    [normalized],
                    map_conversation_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Join via invite: fresh membership with a now-watermark plus the join
    /// system message. Caller must have checked the user is not a member.
    pub fn join_group(&self, conversation_id: &str, user_id: &str) -> Result<()> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            insert_membership(&tx, conversation_id, user_id, now, Some(MemberRole::Member.as_str()))?;

            let user = query_user_by_id(&tx, user_id)?
                .ok_or_else(|| anyhow!("User not found: {}", user_id))?;
            insert_system_message(
                &tx,
                conversation_id,
                user_id,
                &format!("{} joined via invite link", user.name),
                now,
            )?;

            tx.commit()?;
            Ok(())
        })
    }

    // -- Memberships and read state --

    pub fn get_membership(&self, conversation_id: &str, user_id: &str) -> Result<Option<MembershipRow>> {
        self.with_conn(|conn| query_membership(conn, conversation_id, user_id))
    }

    pub fn is_member(&self, conversation_id: &str, user_id: &str) -> Result<bool> {
        Ok(self.get_membership(conversation_id, user_id)?.is_some())
    }

    pub fn memberships_for_user(&self, user_id: &str) -> Result<Vec<MembershipRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, user_id, last_read_time, role
                 FROM conversation_members WHERE user_id = ?1",
            )?;
            let rows = stmt
                .query_map([user_id], map_membership_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// All members of a conversation except the given user, with profiles.
    pub fn other_member_users(&self, conversation_id: &str, exclude_user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.external_id, u.name, u.email, u.avatar_url, u.is_online, u.last_seen, u.created_at
                 FROM conversation_members m
                 JOIN users u ON u.id = m.user_id
                 WHERE m.conversation_id = ?1 AND m.user_id != ?2",
            )?;
            let rows = stmt
                .query_map(params![conversation_id, exclude_user_id], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Full member list with roles, for group details.
    pub fn group_members(&self, conversation_id: &str) -> Result<Vec<(UserRow, Option<String>)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.external_id, u.name, u.email, u.avatar_url, u.is_online, u.last_seen, u.created_at, m.role
                 FROM conversation_members m
                 JOIN users u ON u.id = m.user_id
                 WHERE m.conversation_id = ?1",
            )?;
            let rows = stmt
                .query_map([conversation_id], |row| {
                    Ok((map_user_row(row)?, row.get::<_, Option<String>>(8)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Unread = non-deleted text messages by someone else, newer than the
    /// member's watermark. System messages are deliberately excluded.
    pub fn unread_count(&self, conversation_id: &str, user_id: &str, last_read_time: i64) -> Result<u32> {
        self.with_conn(|conn| {
            let count: u32 = conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE conversation_id = ?1
                   AND created_at > ?2
                   AND deleted = 0
                   AND type = 'text'
                   AND sender_id != ?3",
                params![conversation_id, last_read_time, user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn mark_as_read(&self, conversation_id: &str, user_id: &str) -> Result<()> {
        let now = now_ms();
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE conversation_members SET last_read_time = ?1
                 WHERE conversation_id = ?2 AND user_id = ?3",
                params![now, conversation_id, user_id],
            )?;
            Ok(())
        })
    }

    /// Other members' watermarks, for read receipts.
    pub fn read_status(&self, conversation_id: &str, exclude_user_id: &str) -> Result<Vec<(String, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, last_read_time FROM conversation_members
                 WHERE conversation_id = ?1 AND user_id != ?2",
            )?;
            let rows = stmt
                .query_map(params![conversation_id, exclude_user_id], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn new_invite_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect()
}

pub(crate) fn insert_direct_conversation(
    conn: &Connection,
    initiator: &str,
    recipient: &str,
    now: i64,
) -> Result<String> {
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO conversations (id, is_group, created_at) VALUES (?1, 0, ?2)",
        params![id, now],
    )?;
    insert_membership(conn, &id, initiator, now, None)?;
    insert_membership(conn, &id, recipient, 0, None)?;
    Ok(id)
}

pub(crate) fn insert_membership(
    conn: &Connection,
    conversation_id: &str,
    user_id: &str,
    last_read_time: i64,
    role: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO conversation_members (id, conversation_id, user_id, last_read_time, role)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![uuid::Uuid::new_v4().to_string(), conversation_id, user_id, last_read_time, role],
    )?;
    Ok(())
}

/// Insert a system message and advance the conversation's last-message
/// pointer. Used for every membership-changing action.
pub(crate) fn insert_system_message(
    conn: &Connection,
    conversation_id: &str,
    sender_id: &str,
    content: &str,
    now: i64,
) -> Result<String> {
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO messages (id, conversation_id, sender_id, content, type, deleted, created_at)
         VALUES (?1, ?2, ?3, ?4, 'system', 0, ?5)",
        params![id, conversation_id, sender_id, content, now],
    )?;
    conn.execute(
        "UPDATE conversations SET last_message_id = ?1 WHERE id = ?2",
        params![id, conversation_id],
    )?;
    Ok(id)
}

/// Uniform cascade for removing a conversation: reactions on its messages,
/// the messages, any leftover memberships, presence scoping, then the
/// conversation row itself.
fn delete_conversation_cascade(conn: &Connection, conversation_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM reactions WHERE message_id IN
            (SELECT id FROM messages WHERE conversation_id = ?1)",
        [conversation_id],
    )?;
    conn.execute("DELETE FROM messages WHERE conversation_id = ?1", [conversation_id])?;
    conn.execute(
        "DELETE FROM conversation_members WHERE conversation_id = ?1",
        [conversation_id],
    )?;
    conn.execute(
        "UPDATE presence SET conversation_id = NULL WHERE conversation_id = ?1",
        [conversation_id],
    )?;
    conn.execute("DELETE FROM conversations WHERE id = ?1", [conversation_id])?;
    Ok(())
}

pub(crate) fn query_conversation(conn: &Connection, id: &str) -> Result<Option<ConversationRow>> {
    let row = conn
        .query_row(
            "SELECT id, is_group, name, image_url, invite_code, creator_id, last_message_id, created_at
             FROM conversations WHERE id = ?1",
            [id],
            map_conversation_row,
        )
        .optional()?;
    Ok(row)
}

pub(crate) fn query_membership(
    conn: &Connection,
    conversation_id: &str,
    user_id: &str,
) -> Result<Option<MembershipRow>> {
    let row = conn
        .query_row(
            "SELECT id, conversation_id, user_id, last_read_time, role
             FROM conversation_members WHERE conversation_id = ?1 AND user_id = ?2",
            params![conversation_id, user_id],
            map_membership_row,
        )
        .optional()?;
    Ok(row)
}

fn map_conversation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        is_group: row.get(1)?,
        name: row.get(2)?,
        image_url: row.get(3)?,
        invite_code: row.get(4)?,
        creator_id: row.get(5)?,
        last_message_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_membership_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MembershipRow> {
    Ok(MembershipRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        user_id: row.get(2)?,
        last_read_time: row.get(3)?,
        role: row.get(4)?,
    })
}
