use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id           TEXT PRIMARY KEY,
            external_id  TEXT NOT NULL UNIQUE,
            name         TEXT NOT NULL,
            email        TEXT NOT NULL,
            avatar_url   TEXT NOT NULL,
            is_online    INTEGER NOT NULL DEFAULT 0,
            last_seen    INTEGER NOT NULL DEFAULT 0,
            created_at   INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS conversations (
            id               TEXT PRIMARY KEY,
            is_group         INTEGER NOT NULL,
            name             TEXT,
            image_url        TEXT,
            invite_code      TEXT UNIQUE,
            creator_id       TEXT REFERENCES users(id),
            last_message_id  TEXT,
            created_at       INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS conversation_members (
            id               TEXT PRIMARY KEY,
            conversation_id  TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            user_id          TEXT NOT NULL REFERENCES users(id),
            last_read_time   INTEGER NOT NULL DEFAULT 0,
            role             TEXT,
            UNIQUE(conversation_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_members_user
            ON conversation_members(user_id);
        CREATE INDEX IF NOT EXISTS idx_members_conversation
            ON conversation_members(conversation_id);

        CREATE TABLE IF NOT EXISTS messages (
            id                   TEXT PRIMARY KEY,
            conversation_id      TEXT NOT NULL REFERENCES conversations(id),
            sender_id            TEXT NOT NULL REFERENCES users(id),
            content              TEXT NOT NULL,
            type                 TEXT NOT NULL CHECK (type IN ('text', 'system')),
            deleted              INTEGER NOT NULL DEFAULT 0,
            image_file_id        TEXT,
            reply_to_message_id  TEXT,
            preview_url          TEXT,
            preview_title        TEXT,
            preview_description  TEXT,
            preview_image        TEXT,
            preview_site_name    TEXT,
            created_at           INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, created_at);

        CREATE TABLE IF NOT EXISTS reactions (
            id          TEXT PRIMARY KEY,
            message_id  TEXT NOT NULL REFERENCES messages(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            emoji       TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            UNIQUE(message_id, user_id, emoji)
        );

        CREATE INDEX IF NOT EXISTS idx_reactions_message
            ON reactions(message_id);

        CREATE TABLE IF NOT EXISTS presence (
            id               TEXT PRIMARY KEY,
            user_id          TEXT NOT NULL UNIQUE REFERENCES users(id),
            is_typing        INTEGER NOT NULL DEFAULT 0,
            conversation_id  TEXT,
            last_active      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_presence_conversation
            ON presence(conversation_id);

        CREATE TABLE IF NOT EXISTS message_requests (
            id            TEXT PRIMARY KEY,
            from_user_id  TEXT NOT NULL REFERENCES users(id),
            to_user_id    TEXT NOT NULL REFERENCES users(id),
            status        TEXT NOT NULL CHECK (status IN ('pending', 'accepted', 'declined')),
            created_at    INTEGER NOT NULL,
            UNIQUE(from_user_id, to_user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_requests_to
            ON message_requests(to_user_id);

        CREATE TABLE IF NOT EXISTS files (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT NOT NULL REFERENCES users(id),
            size        INTEGER NOT NULL,
            created_at  INTEGER NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
