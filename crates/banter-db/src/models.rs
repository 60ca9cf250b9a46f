//! Database row types — these map directly to SQLite rows.
//! Distinct from the banter-types API models to keep the DB layer
//! independent of serialization concerns.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub external_id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub is_online: bool,
    pub last_seen: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct ConversationRow {
    pub id: String,
    pub is_group: bool,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub invite_code: Option<String>,
    pub creator_id: Option<String>,
    pub last_message_id: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct MembershipRow {
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub last_read_time: i64,
    pub role: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub message_type: String,
    pub deleted: bool,
    pub image_file_id: Option<String>,
    pub reply_to_message_id: Option<String>,
    pub preview_url: Option<String>,
    pub preview_title: Option<String>,
    pub preview_description: Option<String>,
    pub preview_image: Option<String>,
    pub preview_site_name: Option<String>,
    pub created_at: i64,
}

/// Message joined with its sender's display fields (single-query, no N+1).
#[derive(Debug, Clone)]
pub struct MessageWithSenderRow {
    pub message: MessageRow,
    pub sender_name: String,
    pub sender_avatar: String,
}

#[derive(Debug, Clone)]
pub struct ReactionRow {
    pub id: String,
    pub message_id: String,
    pub user_id: String,
    pub user_name: String,
    pub emoji: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct PresenceRow {
    pub id: String,
    pub user_id: String,
    pub is_typing: bool,
    pub conversation_id: Option<String>,
    pub last_active: i64,
}

#[derive(Debug, Clone)]
pub struct RequestRow {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct FileRow {
    pub id: String,
    pub owner_id: String,
    pub size: i64,
    pub created_at: i64,
}
