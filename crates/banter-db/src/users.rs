use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

use crate::models::UserRow;
use crate::{Database, now_ms};

impl Database {
    /// Upsert a user by their external identity. First login creates the
    /// record (online); later logins refresh name/avatar/online/last_seen.
    /// Returns the internal user id.
    pub fn upsert_user(
        &self,
        external_id: &str,
        name: &str,
        email: &str,
        avatar_url: &str,
    ) -> Result<String> {
        let now = now_ms();
        self.with_conn(|conn| {
            if let Some(existing) = query_user_by_external_id(conn, external_id)? {
                conn.execute(
                    "UPDATE users SET name = ?1, avatar_url = ?2, is_online = 1, last_seen = ?3
                     WHERE id = ?4",
                    params![name, avatar_url, now, existing.id],
                )?;
                return Ok(existing.id);
            }

            let id = uuid::Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO users (id, external_id, name, email, avatar_url, is_online, last_seen, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)",
                params![id, external_id, name, email, avatar_url, now],
            )?;
            Ok(id)
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_external_id(&self, external_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_external_id(conn, external_id))
    }

    /// Best-effort offline marking. Unknown external id is a no-op.
    pub fn set_offline_by_external_id(&self, external_id: &str) -> Result<()> {
        let now = now_ms();
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET is_online = 0, last_seen = ?1 WHERE external_id = ?2",
                params![now, external_id],
            )?;
            Ok(())
        })
    }

    pub fn set_user_online(&self, user_id: &str, is_online: bool, last_seen: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET is_online = ?1, last_seen = ?2 WHERE id = ?3",
                params![is_online, last_seen, user_id],
            )?;
            Ok(())
        })
    }

    pub fn update_user_name(&self, user_id: &str, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET name = ?1 WHERE id = ?2",
                params![name, user_id],
            )?;
            Ok(())
        })
    }

    /// Case-insensitive substring search on display name, excluding the
    /// caller. An empty term returns all other users; `%` and `_` in the
    /// term match literally. No pagination — fine for small user bases.
    pub fn search_users(&self, exclude_user_id: &str, term: &str) -> Result<Vec<UserRow>> {
        let escaped = term
            .trim()
            .to_lowercase()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{}%", escaped);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, external_id, name, email, avatar_url, is_online, last_seen, created_at
                 FROM users
                 WHERE id != ?1 AND LOWER(name) LIKE ?2 ESCAPE '\\'
                 ORDER BY name",
            )?;
            let rows = stmt
                .query_map(params![exclude_user_id, pattern], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

pub(crate) fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        external_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        avatar_url: row.get(4)?,
        is_online: row.get(5)?,
        last_seen: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, external_id, name, email, avatar_url, is_online, last_seen, created_at
         FROM users WHERE {} = ?1",
        column
    );
    let row = conn.query_row(&sql, [value], map_user_row).optional()?;
    Ok(row)
}

pub(crate) fn query_user_by_external_id(
    conn: &Connection,
    external_id: &str,
) -> Result<Option<UserRow>> {
    query_user(conn, "external_id", external_id)
}

pub(crate) fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    query_user(conn, "id", id)
}
