use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use banter_types::api::{
    Claims, MessagePage, MessageResponse, ReplyPreview, SendMessageRequest, SendMessageResponse,
};
use banter_types::models::{LinkPreview, MessageType};

use crate::auth::{AppState, current_user, maybe_current_user};
use crate::blocking;
use crate::error::ApiError;
use crate::preview;
use crate::users::parse_id;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination: the `created_at` of the oldest message from
    /// the previous page, to fetch older ones.
    pub before: Option<i64>,
    /// Tiebreak half of the cursor, the oldest message's id. Without it
    /// `before` falls back to a strict timestamp comparison.
    pub before_id: Option<Uuid>,
}

fn default_limit() -> u32 {
    50
}

/// POST /conversations/{id}/messages — append a message. Membership is
/// checked before anything is written. If the content carries a URL and no
/// image is attached, link-preview enrichment is scheduled as a detached
/// task; its failure can never affect delivery.
pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() && req.image_file_id.is_none() {
        return Err(ApiError::Validation(
            "message needs text content or an image".into(),
        ));
    }

    let me = current_user(&state, &claims).await?;
    let cid = conversation_id.to_string();
    let message_id = Uuid::new_v4();

    let db = state.clone();
    let mid = message_id.to_string();
    let content = req.content.clone();
    let image_file_id = req.image_file_id.map(|id| id.to_string());
    let reply_to = req.reply_to_message_id.map(|id| id.to_string());
    let has_image = image_file_id.is_some();

    let is_member = blocking(move || {
        if !db.db.is_member(&cid, &me.id)? {
            return Ok(false);
        }
        db.db.insert_message(
            &mid,
            &cid,
            &me.id,
            &content,
            image_file_id.as_deref(),
            reply_to.as_deref(),
        )?;
        Ok(true)
    })
    .await?;

    if !is_member {
        return Err(ApiError::Forbidden("not a member of this conversation"));
    }

    if !has_image {
        if let Some(url) = preview::first_url(&req.content) {
            preview::spawn_enrichment(state.clone(), message_id.to_string(), url.to_string());
        }
    }

    Ok((StatusCode::CREATED, Json(SendMessageResponse { message_id })))
}

/// GET /conversations/{id}/messages — newest-first page, enriched with
/// sender display data and reply previews. Non-members (and unresolved
/// callers) get an empty terminal page rather than an error.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let empty = MessagePage {
        messages: vec![],
        next_cursor: None,
        next_cursor_id: None,
    };
    let Some(me) = maybe_current_user(&state, &claims).await? else {
        return Ok(Json(empty));
    };

    let cid = conversation_id.to_string();
    let limit = query.limit.clamp(1, 100);
    let before = query
        .before
        .map(|ts| (ts, query.before_id.map(|id| id.to_string()).unwrap_or_default()));

    let db = state.clone();
    let my_id = me.id.clone();
    let rows = blocking(move || {
        if !db.db.is_member(&cid, &my_id)? {
            return Ok(None);
        }

        let rows = db
            .db
            .list_messages(&cid, limit, before.as_ref().map(|(ts, id)| (*ts, id.as_str())))?;

        // Resolve reply previews; a dangling reference just yields no preview.
        let mut enriched = Vec::with_capacity(rows.len());
        for row in rows {
            let reply = match &row.message.reply_to_message_id {
                Some(id) => db.db.get_message_with_sender(id)?,
                None => None,
            };
            enriched.push((row, reply));
        }
        Ok(Some(enriched))
    })
    .await?;

    let Some(rows) = rows else {
        return Ok(Json(empty));
    };

    let (next_cursor, next_cursor_id) = if rows.len() as u32 == limit {
        match rows.last() {
            Some((row, _)) => (
                Some(row.message.created_at),
                Some(parse_id(&row.message.id, "message")),
            ),
            None => (None, None),
        }
    } else {
        (None, None)
    };

    let messages = rows
        .into_iter()
        .map(|(row, reply)| {
            let msg = row.message;
            MessageResponse {
                id: parse_id(&msg.id, "message"),
                conversation_id: parse_id(&msg.conversation_id, "conversation"),
                sender_id: parse_id(&msg.sender_id, "user"),
                sender_name: row.sender_name,
                sender_avatar: row.sender_avatar,
                is_me: msg.sender_id == me.id,
                content: msg.content,
                message_type: MessageType::parse(&msg.message_type).unwrap_or(MessageType::Text),
                deleted: msg.deleted,
                image_file_id: msg.image_file_id.as_deref().map(|id| parse_id(id, "file")),
                reply_to: reply.map(|r| ReplyPreview {
                    sender_name: r.sender_name,
                    content: r.message.content,
                    had_image: r.message.image_file_id.is_some(),
                }),
                link_preview: msg.preview_url.map(|url| LinkPreview {
                    url,
                    title: msg.preview_title,
                    description: msg.preview_description,
                    image: msg.preview_image,
                    site_name: msg.preview_site_name,
                }),
                created_at: msg.created_at,
            }
        })
        .collect();

    Ok(Json(MessagePage {
        messages,
        next_cursor,
        next_cursor_id,
    }))
}

/// DELETE /messages/{id} — sender-only soft delete. The row survives,
/// flagged deleted with its content replaced by a fixed placeholder, and
/// every reaction on it is removed.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = current_user(&state, &claims).await?;
    let mid = message_id.to_string();

    let db = state.clone();
    let outcome = blocking(move || {
        let Some(message) = db.db.get_message(&mid)? else {
            return Ok(DeleteOutcome::NotFound);
        };
        if message.sender_id != me.id {
            return Ok(DeleteOutcome::NotOwner);
        }
        db.db.soft_delete_message(&mid)?;
        Ok(DeleteOutcome::Deleted)
    })
    .await?;

    match outcome {
        DeleteOutcome::Deleted => Ok(StatusCode::NO_CONTENT),
        DeleteOutcome::NotFound => Err(ApiError::NotFound("message not found")),
        DeleteOutcome::NotOwner => Err(ApiError::Forbidden("only the sender can delete a message")),
    }
}

enum DeleteOutcome {
    Deleted,
    NotFound,
    NotOwner,
}
