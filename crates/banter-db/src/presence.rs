use anyhow::Result;
use rusqlite::params;

use crate::models::{PresenceRow, UserRow};
use crate::{Database, PRESENCE_STALE_MS, now_ms};

impl Database {
    /// One presence row per user. The optional conversation id says where
    /// the user is currently typing, if anywhere. Also refreshes the durable
    /// online flag on the user record.
    pub fn upsert_presence(
        &self,
        user_id: &str,
        is_online: bool,
        is_typing: bool,
        conversation_id: Option<&str>,
    ) -> Result<()> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "UPDATE users SET is_online = ?1, last_seen = ?2 WHERE id = ?3",
                params![is_online, now, user_id],
            )?;
            tx.execute(
                "INSERT INTO presence (id, user_id, is_typing, conversation_id, last_active)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET
                     is_typing = excluded.is_typing,
                     conversation_id = excluded.conversation_id,
                     last_active = excluded.last_active",
                params![uuid::Uuid::new_v4().to_string(), user_id, is_typing, conversation_id, now],
            )?;

            tx.commit()?;
            Ok(())
        })
    }

    /// Other members' presence in a conversation, filtered to entries fresh
    /// within PRESENCE_STALE_MS. Staleness is enforced here at read time;
    /// stale rows linger harmlessly until overwritten.
    pub fn presence_for_conversation(
        &self,
        conversation_id: &str,
        exclude_user_id: &str,
    ) -> Result<Vec<(PresenceRow, UserRow)>> {
        let cutoff = now_ms() - PRESENCE_STALE_MS;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.user_id, p.is_typing, p.conversation_id, p.last_active,
                        u.id, u.external_id, u.name, u.email, u.avatar_url, u.is_online, u.last_seen, u.created_at
                 FROM presence p
                 JOIN users u ON u.id = p.user_id
                 WHERE p.conversation_id = ?1 AND p.user_id != ?2 AND p.last_active > ?3",
            )?;
            let rows = stmt
                .query_map(params![conversation_id, exclude_user_id, cutoff], |row| {
                    let presence = PresenceRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        is_typing: row.get(2)?,
                        conversation_id: row.get(3)?,
                        last_active: row.get(4)?,
                    };
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
                    Ok((presence, user))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
