use std::path::PathBuf;
use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use banter_db::Database;
use banter_db::models::UserRow;
use banter_types::api::{Claims, OfflineRequest, SyncUserRequest, SyncUserResponse};

use crate::blocking;
use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    /// Shared client for link-preview fetches; carries the fetch timeout.
    pub http: reqwest::Client,
}

/// Resolve the token subject to a user record. A valid token without a
/// synced user record still counts as unauthenticated for mutations.
pub(crate) async fn current_user(state: &AppState, claims: &Claims) -> Result<UserRow, ApiError> {
    maybe_current_user(state, claims)
        .await?
        .ok_or(ApiError::Unauthenticated)
}

/// Same resolution, but for read paths that degrade to empty results.
pub(crate) async fn maybe_current_user(
    state: &AppState,
    claims: &Claims,
) -> Result<Option<UserRow>, ApiError> {
    let db = state.clone();
    let external_id = claims.sub.clone();
    blocking(move || db.db.get_user_by_external_id(&external_id)).await
}

/// POST /auth/sync — upsert the caller's profile on login. First login
/// creates the record online; later logins refresh name/avatar/last_seen.
/// A missing auth context never gets this far: the middleware rejects it
/// with 401 before the handler runs.
pub async fn sync_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SyncUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }

    let db = state.clone();
    let external_id = claims.sub.clone();
    let user_id = blocking(move || {
        db.db
            .upsert_user(&external_id, req.name.trim(), &req.email, &req.avatar_url)
    })
    .await?;

    let user_id: Uuid = user_id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id: {}", e)))?;

    Ok(Json(SyncUserResponse { user_id }))
}

#[cfg(test)]
pub(crate) fn test_state(jwt_secret: &str) -> AppState {
    Arc::new(AppStateInner {
        db: Database::open_in_memory().expect("in-memory db"),
        jwt_secret: jwt_secret.to_string(),
        upload_dir: std::env::temp_dir().join("banter-test-uploads"),
        http: reqwest::Client::new(),
    })
}

/// POST /auth/offline — best-effort, fired on tab close. Public route, no
/// token required (the closing tab may no longer have one). Unknown ids
/// are a no-op; this never fails the caller.
pub async fn set_offline(
    State(state): State<AppState>,
    Json(req): Json<OfflineRequest>,
) -> impl IntoResponse {
    let db = state.clone();
    let result =
        tokio::task::spawn_blocking(move || db.db.set_offline_by_external_id(&req.external_id))
            .await;

    if let Ok(Err(e)) = result {
        tracing::debug!("offline marking failed: {}", e);
    }

    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_for(sub: &str) -> Claims {
        Claims {
            sub: sub.into(),
            exp: 4_102_444_800,
        }
    }

    #[tokio::test]
    async fn unsynced_subject_is_an_explicit_error_on_write_paths() {
        let state = test_state("test-secret");

        let err = current_user(&state, &claims_for("ext-ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[tokio::test]
    async fn unsynced_subject_degrades_to_none_on_read_paths() {
        let state = test_state("test-secret");

        let resolved = maybe_current_user(&state, &claims_for("ext-ghost"))
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn synced_subject_resolves_to_their_record() {
        let state = test_state("test-secret");
        state
            .db
            .upsert_user("ext-alice", "Alice", "alice@example.com", "")
            .unwrap();

        let me = current_user(&state, &claims_for("ext-alice")).await.unwrap();
        assert_eq!(me.name, "Alice");
    }
}
