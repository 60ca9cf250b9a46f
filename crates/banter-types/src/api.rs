use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{LinkPreview, MemberRole, MessageType, RequestStatus};

// -- JWT Claims --

/// Claims minted by the external identity provider. `sub` is the opaque
/// external subject id; it is the only identity the server trusts. Canonical
/// definition lives here in banter-types so the API middleware and the server
/// binary share one type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncUserRequest {
    pub name: String,
    pub email: String,
    pub avatar_url: String,
}

#[derive(Debug, Serialize)]
pub struct SyncUserResponse {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OfflineRequest {
    pub external_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub is_online: bool,
    pub last_seen: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: String,
}

// -- Conversations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDirectRequest {
    pub other_user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ConversationIdResponse {
    pub conversation_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
    pub member_ids: Vec<Uuid>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct InviteCodeResponse {
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinByCodeRequest {
    pub code: String,
}

/// Compact view of a conversation's most recent message, for list previews.
#[derive(Debug, Clone, Serialize)]
pub struct LastMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub deleted: bool,
    pub has_image: bool,
    pub created_at: i64,
}

#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub is_group: bool,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub created_at: i64,
    pub other_users: Vec<UserSummary>,
    pub last_message: Option<LastMessage>,
    pub unread_count: u32,
}

#[derive(Debug, Serialize)]
pub struct GroupMember {
    #[serde(flatten)]
    pub user: UserSummary,
    pub role: MemberRole,
    pub is_me: bool,
}

#[derive(Debug, Serialize)]
pub struct GroupDetails {
    pub id: Uuid,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub invite_code: Option<String>,
    pub creator_id: Option<Uuid>,
    pub created_at: i64,
    pub members: Vec<GroupMember>,
    pub is_admin: bool,
}

/// Map of other members' user id -> last-read watermark (Unix ms).
pub type ReadStatus = HashMap<Uuid, i64>;

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
    pub image_file_id: Option<Uuid>,
    pub reply_to_message_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub message_id: Uuid,
}

/// What a reply renders of the message it points at. Survives deletion of
/// the original (content becomes the deletion placeholder) but not removal
/// of the row itself, in which case the whole preview is absent.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyPreview {
    pub sender_name: String,
    pub content: String,
    pub had_image: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_avatar: String,
    pub is_me: bool,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub deleted: bool,
    pub image_file_id: Option<Uuid>,
    pub reply_to: Option<ReplyPreview>,
    pub link_preview: Option<LinkPreview>,
    pub created_at: i64,
}

#[derive(Debug, Serialize)]
pub struct MessagePage {
    pub messages: Vec<MessageResponse>,
    /// `created_at` of the oldest message in this page; pass back as
    /// `before` to fetch the next (older) page. None means terminal.
    pub next_cursor: Option<i64>,
    /// Id of that same oldest message; pass back as `before_id` so
    /// same-millisecond neighbors are not skipped at the boundary.
    pub next_cursor_id: Option<Uuid>,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleReactionRequest {
    pub emoji: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReactionInfo {
    pub user_id: Uuid,
    pub user_name: String,
    pub emoji: String,
}

pub type ReactionsByMessage = HashMap<Uuid, Vec<ReactionInfo>>;

// -- Presence --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePresenceRequest {
    pub is_online: bool,
    pub is_typing: bool,
    pub conversation_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct PresenceEntry {
    pub user: UserSummary,
    pub is_typing: bool,
    pub conversation_id: Option<Uuid>,
    pub last_active: i64,
}

// -- Message requests --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequestBody {
    pub to_user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequestResponse {
    /// None means the two users are already connected.
    pub request_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDirection {
    Sent,
    Received,
}

#[derive(Debug, Serialize)]
pub struct RequestStatusResponse {
    pub direction: RequestDirection,
    pub status: RequestStatus,
    pub request_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PendingRequest {
    pub id: Uuid,
    pub sender: UserSummary,
    pub created_at: i64,
}

// -- Files --

#[derive(Debug, Serialize)]
pub struct UploadTarget {
    pub file_id: Uuid,
    pub upload_url: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_id: Uuid,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct FileUrlResponse {
    pub url: Option<String>,
}
