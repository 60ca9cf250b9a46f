use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use banter_db::models::UserRow;
use banter_types::api::{Claims, UpdateProfileRequest, UserSummary};

use crate::auth::{AppState, current_user, maybe_current_user};
use crate::blocking;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,
}

/// GET /users?search=term — case-insensitive name search excluding the
/// caller; an empty term lists everyone else. Unresolved callers get an
/// empty list, not an error.
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(me) = maybe_current_user(&state, &claims).await? else {
        return Ok(Json(Vec::<UserSummary>::new()));
    };

    let db = state.clone();
    let rows = blocking(move || db.db.search_users(&me.id, &query.search)).await?;

    Ok(Json(rows.iter().map(user_summary).collect::<Vec<_>>()))
}

/// GET /users/me
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = maybe_current_user(&state, &claims).await?;
    Ok(Json(me.as_ref().map(user_summary)))
}

/// PATCH /users/me — update the display name.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }

    let me = current_user(&state, &claims).await?;

    let db = state.clone();
    blocking(move || db.db.update_user_name(&me.id, &name)).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DB row to API summary. Stored ids are uuids we minted ourselves, so a
/// parse failure means a corrupt row; surface it in logs and degrade.
pub(crate) fn user_summary(row: &UserRow) -> UserSummary {
    UserSummary {
        id: parse_id(&row.id, "user"),
        name: row.name.clone(),
        email: row.email.clone(),
        avatar_url: row.avatar_url.clone(),
        is_online: row.is_online,
        last_seen: row.last_seen,
    }
}

pub(crate) fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", what, raw, e);
        Uuid::default()
    })
}
