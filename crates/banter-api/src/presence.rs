use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use banter_types::api::{Claims, PresenceEntry, UpdatePresenceRequest};

use crate::auth::{AppState, maybe_current_user};
use crate::blocking;
use crate::error::ApiError;
use crate::users::{parse_id, user_summary};

/// POST /presence — caller-driven heartbeat. One presence row per user; the
/// optional conversation id marks where they are typing. Best-effort: an
/// unresolved caller is a silent no-op, matching the offline path.
pub async fn update_presence(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdatePresenceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(me) = maybe_current_user(&state, &claims).await? else {
        return Ok(StatusCode::NO_CONTENT);
    };

    let db = state.clone();
    let conversation_id = req.conversation_id.map(|id| id.to_string());
    blocking(move || {
        db.db
            .upsert_presence(&me.id, req.is_online, req.is_typing, conversation_id.as_deref())
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /conversations/{id}/presence — other members' presence in this
/// conversation. Entries older than the staleness window never appear;
/// there is no server-side sweep, staleness is purely a read-time filter.
pub async fn get_presence(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(me) = maybe_current_user(&state, &claims).await? else {
        return Ok(Json(Vec::<PresenceEntry>::new()));
    };
    let cid = conversation_id.to_string();

    let db = state.clone();
    let rows = blocking(move || db.db.presence_for_conversation(&cid, &me.id)).await?;

    let body: Vec<PresenceEntry> = rows
        .into_iter()
        .map(|(presence, user)| PresenceEntry {
            user: user_summary(&user),
            is_typing: presence.is_typing,
            conversation_id: presence
                .conversation_id
                .as_deref()
                .map(|id| parse_id(id, "conversation")),
            last_active: presence.last_active,
        })
        .collect();

    Ok(Json(body))
}
