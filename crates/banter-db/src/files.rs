use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use crate::models::FileRow;
use crate::{Database, now_ms};

impl Database {
    pub fn insert_file(&self, id: &str, owner_id: &str, size: i64) -> Result<()> {
        let now = now_ms();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO files (id, owner_id, size, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id, owner_id, size, now],
            )?;
            Ok(())
        })
    }

    pub fn get_file(&self, id: &str) -> Result<Option<FileRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, owner_id, size, created_at FROM files WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(FileRow {
                            id: row.get(0)?,
                            owner_id: row.get(1)?,
                            size: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }
}
