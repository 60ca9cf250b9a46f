use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use banter_types::api::{
    Claims, ConversationIdResponse, PendingRequest, RequestDirection, RequestStatusResponse,
    SendMessageRequestBody, SendMessageRequestResponse,
};
use banter_types::models::RequestStatus;

use crate::auth::{AppState, current_user, maybe_current_user};
use crate::blocking;
use crate::error::ApiError;
use crate::users::{parse_id, user_summary};

/// POST /requests — first-contact handshake. At most one request per
/// ordered pair: re-sending returns the existing id whatever its status,
/// including declined (there is no re-request path). If the reverse
/// request is already accepted the pair is connected and this returns null.
pub async fn send_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let me = current_user(&state, &claims).await?;
    let to_id = req.to_user_id.to_string();

    if me.id == to_id {
        return Err(ApiError::Validation("cannot send a request to yourself".into()));
    }

    let db = state.clone();
    let outcome = blocking(move || {
        if db.db.get_user(&to_id)?.is_none() {
            return Ok(SendOutcome::NoRecipient);
        }
        Ok(SendOutcome::Request(db.db.send_request(&me.id, &to_id)?))
    })
    .await?;

    match outcome {
        SendOutcome::Request(request_id) => Ok(Json(SendMessageRequestResponse {
            request_id: request_id.map(|id| parse_id(&id, "request")),
        })),
        SendOutcome::NoRecipient => Err(ApiError::NotFound("user not found")),
    }
}

enum SendOutcome {
    /// Some = the (existing or fresh) request id; None = already connected.
    Request(Option<String>),
    NoRecipient,
}

/// POST /requests/{id}/accept — recipient-only. Flips the status and
/// creates the direct conversation plus both memberships in one
/// transaction; the accepting recipient starts read, the sender unread.
pub async fn accept_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = current_user(&state, &claims).await?;
    let rid = request_id.to_string();

    let db = state.clone();
    let outcome = blocking(move || {
        let Some(request) = db.db.get_request(&rid)? else {
            return Ok(ActOutcome::NotFound);
        };
        if request.to_user_id != me.id {
            return Ok(ActOutcome::NotRecipient);
        }
        if request.status != RequestStatus::Pending.as_str() {
            return Ok(ActOutcome::NotPending);
        }
        let conversation_id = db.db.accept_request(&rid, &me.id, &request.from_user_id)?;
        Ok(ActOutcome::Done(conversation_id))
    })
    .await?;

    match outcome {
        ActOutcome::Done(conversation_id) => Ok(Json(ConversationIdResponse {
            conversation_id: parse_id(&conversation_id, "conversation"),
        })),
        ActOutcome::NotFound => Err(ApiError::NotFound("request not found")),
        ActOutcome::NotRecipient => Err(ApiError::Forbidden("request is not addressed to you")),
        ActOutcome::NotPending => Err(ApiError::Validation("request is not pending".into())),
    }
}

/// POST /requests/{id}/decline — recipient-only; terminal, no side effects.
pub async fn decline_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = current_user(&state, &claims).await?;
    let rid = request_id.to_string();

    let db = state.clone();
    let outcome = blocking(move || {
        let Some(request) = db.db.get_request(&rid)? else {
            return Ok(ActOutcome::NotFound);
        };
        if request.to_user_id != me.id {
            return Ok(ActOutcome::NotRecipient);
        }
        if request.status != RequestStatus::Pending.as_str() {
            return Ok(ActOutcome::NotPending);
        }
        db.db.decline_request(&rid)?;
        Ok(ActOutcome::Done(String::new()))
    })
    .await?;

    match outcome {
        ActOutcome::Done(_) => Ok(StatusCode::NO_CONTENT),
        ActOutcome::NotFound => Err(ApiError::NotFound("request not found")),
        ActOutcome::NotRecipient => Err(ApiError::Forbidden("request is not addressed to you")),
        ActOutcome::NotPending => Err(ApiError::Validation("request is not pending".into())),
    }
}

enum ActOutcome {
    Done(String),
    NotFound,
    NotRecipient,
    NotPending,
}

/// GET /requests/status/{other_user_id} — direction and status of the
/// request between the caller and one other user, or null when none
/// exists. Drives the Request / Pending / Connected affordance.
pub async fn get_request_status(
    State(state): State<AppState>,
    Path(other_user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(me) = maybe_current_user(&state, &claims).await? else {
        return Ok(Json(None::<RequestStatusResponse>));
    };
    let other_id = other_user_id.to_string();

    let db = state.clone();
    let found = blocking(move || {
        if let Some(sent) = db.db.get_request_by_pair(&me.id, &other_id)? {
            return Ok(Some((RequestDirection::Sent, sent)));
        }
        if let Some(received) = db.db.get_request_by_pair(&other_id, &me.id)? {
            return Ok(Some((RequestDirection::Received, received)));
        }
        Ok(None)
    })
    .await?;

    let body = found.map(|(direction, row)| RequestStatusResponse {
        direction,
        status: RequestStatus::parse(&row.status).unwrap_or(RequestStatus::Pending),
        request_id: parse_id(&row.id, "request"),
    });

    Ok(Json(body))
}

/// GET /requests/pending — incoming pending requests with sender profiles.
pub async fn get_pending_incoming(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(me) = maybe_current_user(&state, &claims).await? else {
        return Ok(Json(Vec::<PendingRequest>::new()));
    };

    let db = state.clone();
    let rows = blocking(move || db.db.pending_incoming(&me.id)).await?;

    let body: Vec<PendingRequest> = rows
        .into_iter()
        .map(|(request, sender)| PendingRequest {
            id: parse_id(&request.id, "request"),
            sender: user_summary(&sender),
            created_at: request.created_at,
        })
        .collect();

    Ok(Json(body))
}

/// GET /requests/pending/count
pub async fn get_pending_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(me) = maybe_current_user(&state, &claims).await? else {
        return Ok(Json(serde_json::json!({ "count": 0 })));
    };

    let db = state.clone();
    let count = blocking(move || db.db.pending_count(&me.id)).await?;

    Ok(Json(serde_json::json!({ "count": count })))
}
