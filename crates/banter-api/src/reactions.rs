use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use banter_types::api::{Claims, ReactionInfo, ReactionsByMessage, ToggleReactionRequest};

use crate::auth::{AppState, current_user, maybe_current_user};
use crate::blocking;
use crate::error::ApiError;
use crate::users::parse_id;

/// POST /messages/{id}/reactions — idempotent flip of the exact
/// (message, user, emoji) triple: on if absent, off if present. Not a
/// counter; toggling twice lands back where it started.
pub async fn toggle_reaction(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ToggleReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.emoji.trim().is_empty() {
        return Err(ApiError::Validation("emoji must not be empty".into()));
    }

    let me = current_user(&state, &claims).await?;
    let mid = message_id.to_string();

    let db = state.clone();
    let outcome = blocking(move || {
        let Some(message) = db.db.get_message(&mid)? else {
            return Ok(ToggleOutcome::Gone);
        };
        if message.deleted {
            return Ok(ToggleOutcome::Gone);
        }
        if !db.db.is_member(&message.conversation_id, &me.id)? {
            return Ok(ToggleOutcome::NotMember);
        }
        let added = db.db.toggle_reaction(&mid, &me.id, &req.emoji)?;
        Ok(ToggleOutcome::Toggled(added))
    })
    .await?;

    match outcome {
        ToggleOutcome::Toggled(added) => Ok(Json(serde_json::json!({ "added": added }))),
        ToggleOutcome::Gone => Err(ApiError::NotFound("message not found or deleted")),
        ToggleOutcome::NotMember => Err(ApiError::Forbidden("not a member of this conversation")),
    }
}

enum ToggleOutcome {
    Toggled(bool),
    Gone,
    NotMember,
}

#[derive(Debug, Deserialize)]
pub struct ReactionsQuery {
    /// Comma-separated message ids.
    #[serde(default)]
    pub message_ids: String,
}

/// GET /reactions?message_ids=a,b,c — batch read grouped by message id.
/// Unresolved callers get an empty mapping.
pub async fn get_reactions(
    State(state): State<AppState>,
    Query(query): Query<ReactionsQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if maybe_current_user(&state, &claims).await?.is_none() {
        return Ok(Json(ReactionsByMessage::new()));
    }

    let ids: Vec<String> = query
        .message_ids
        .split(',')
        .filter_map(|s| s.trim().parse::<Uuid>().ok())
        .map(|id| id.to_string())
        .collect();

    let db = state.clone();
    let rows = blocking(move || db.db.reactions_for_messages(&ids)).await?;

    let mut grouped: ReactionsByMessage = HashMap::new();
    for row in rows {
        grouped
            .entry(parse_id(&row.message_id, "message"))
            .or_default()
            .push(ReactionInfo {
                user_id: parse_id(&row.user_id, "user"),
                user_name: row.user_name,
                emoji: row.emoji,
            });
    }

    Ok(Json(grouped))
}
