use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use banter_db::models::MessageRow;
use banter_types::api::{
    AddMemberRequest, Claims, ConversationIdResponse, ConversationSummary, CreateDirectRequest,
    CreateGroupRequest, GroupDetails, GroupMember, InviteCodeResponse, JoinByCodeRequest,
    LastMessage, ReadStatus, UpdateGroupRequest,
};
use banter_types::models::{MemberRole, MessageType};

use crate::auth::{AppState, current_user, maybe_current_user};
use crate::blocking;
use crate::error::ApiError;
use crate::users::{parse_id, user_summary};

/// POST /conversations/direct — idempotent: an existing direct conversation
/// between the two users is returned instead of creating a duplicate.
pub async fn create_or_get_direct(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateDirectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let me = current_user(&state, &claims).await?;
    let other_id = req.other_user_id.to_string();

    let db = state.clone();
    let conversation_id = blocking(move || {
        if db.db.get_user(&other_id)?.is_none() {
            return Ok(None);
        }
        if let Some(existing) = db.db.find_direct_conversation(&me.id, &other_id)? {
            return Ok(Some(existing));
        }
        db.db.create_direct_conversation(&me.id, &other_id).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("user not found"))?;

    Ok(Json(ConversationIdResponse {
        conversation_id: parse_id(&conversation_id, "conversation"),
    }))
}

/// POST /conversations/group
pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("group name must not be empty".into()));
    }

    let me = current_user(&state, &claims).await?;
    let member_ids: Vec<String> = req.member_ids.iter().map(|id| id.to_string()).collect();
    let image_url = req.image_url.clone();

    let db = state.clone();
    let conversation_id = blocking(move || {
        for id in &member_ids {
            if db.db.get_user(id)?.is_none() {
                return Ok(None);
            }
        }
        db.db
            .create_group(&name, image_url.as_deref(), &me.id, &member_ids)
            .map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("member not found"))?;

    Ok((
        StatusCode::CREATED,
        Json(ConversationIdResponse {
            conversation_id: parse_id(&conversation_id, "conversation"),
        }),
    ))
}

/// PATCH /conversations/{id} — group rename and/or image change. Renaming
/// emits a system message; the image change is silent.
pub async fn update_group(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("group name must not be empty".into()));
        }
    }

    let me = current_user(&state, &claims).await?;
    let cid = conversation_id.to_string();

    let db = state.clone();
    let name = req.name.map(|n| n.trim().to_string());
    let image_url = req.image_url;
    require_group_membership(&state, &cid, &me.id).await?;
    blocking(move || {
        db.db
            .update_group(&cid, name.as_deref(), image_url.as_deref(), &me.id)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /conversations/{id}/members — no-op when the target is already in.
pub async fn add_member(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let me = current_user(&state, &claims).await?;
    let cid = conversation_id.to_string();
    let target_id = req.user_id.to_string();

    require_group_membership(&state, &cid, &me.id).await?;

    let db = state.clone();
    let target_found = blocking(move || {
        if db.db.get_user(&target_id)?.is_none() {
            return Ok(false);
        }
        db.db.add_member(&cid, &target_id, &me.id)?;
        Ok(true)
    })
    .await?;

    if !target_found {
        return Err(ApiError::NotFound("user not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /conversations/{id}/leave — the "left" system message is written
/// before the membership goes away, so even the last member out is still
/// attributable. An emptied group is removed entirely.
pub async fn leave_group(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = current_user(&state, &claims).await?;
    let cid = conversation_id.to_string();

    require_group_membership(&state, &cid, &me.id).await?;

    let db = state.clone();
    blocking(move || db.db.leave_group(&cid, &me.id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /conversations/{id}/invite-code — idempotent; an existing code is
/// reused rather than rotated.
pub async fn generate_invite_code(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = current_user(&state, &claims).await?;
    let cid = conversation_id.to_string();

    require_group_membership(&state, &cid, &me.id).await?;

    let db = state.clone();
    let code = blocking(move || db.db.generate_invite_code(&cid)).await?;

    Ok(Json(InviteCodeResponse { code }))
}

/// POST /conversations/join — join a group by invite code. Joining twice is
/// a no-op that returns the same conversation id.
pub async fn join_by_invite_code(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<JoinByCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.code.trim().is_empty() {
        return Err(ApiError::Validation("invite code must not be empty".into()));
    }

    let me = current_user(&state, &claims).await?;

    let db = state.clone();
    let code = req.code.clone();
    let conversation_id = blocking(move || {
        let Some(conv) = db.db.find_by_invite_code(&code)? else {
            return Ok(None);
        };
        if !db.db.is_member(&conv.id, &me.id)? {
            db.db.join_group(&conv.id, &me.id)?;
        }
        Ok(Some(conv.id))
    })
    .await?
    .ok_or_else(|| ApiError::Validation("invalid invite code".into()))?;

    Ok(Json(ConversationIdResponse {
        conversation_id: parse_id(&conversation_id, "conversation"),
    }))
}

/// GET /conversations — every conversation the caller belongs to, enriched
/// with the other members' profiles, the last message, and the unread count.
/// Sorted by most recent activity.
pub async fn get_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(me) = maybe_current_user(&state, &claims).await? else {
        return Ok(Json(Vec::<ConversationSummary>::new()));
    };

    let db = state.clone();
    let mut summaries = blocking(move || {
        let memberships = db.db.memberships_for_user(&me.id)?;
        let mut out = Vec::with_capacity(memberships.len());

        for membership in memberships {
            let Some(conv) = db.db.get_conversation(&membership.conversation_id)? else {
                continue;
            };

            let others = db.db.other_member_users(&conv.id, &me.id)?;

            let last_message = match &conv.last_message_id {
                Some(id) => db.db.get_message(id)?,
                None => None,
            };

            let unread = db
                .db
                .unread_count(&conv.id, &me.id, membership.last_read_time)?;

            out.push((conv, others, last_message, unread));
        }
        Ok(out)
    })
    .await?;

    // Most recent activity first; empty conversations fall back to their
    // creation time.
    summaries.sort_by_key(|(conv, _, last, _)| {
        std::cmp::Reverse(last.as_ref().map(|m| m.created_at).unwrap_or(conv.created_at))
    });

    let body: Vec<ConversationSummary> = summaries
        .into_iter()
        .map(|(conv, others, last, unread)| ConversationSummary {
            id: parse_id(&conv.id, "conversation"),
            is_group: conv.is_group,
            name: conv.name,
            image_url: conv.image_url,
            created_at: conv.created_at,
            other_users: others.iter().map(user_summary).collect(),
            last_message: last.as_ref().map(last_message_view),
            unread_count: unread,
        })
        .collect();

    Ok(Json(body))
}

/// GET /conversations/{id} — group details with the full member list.
/// Null-degrades for non-groups and non-members.
pub async fn get_group_details(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(me) = maybe_current_user(&state, &claims).await? else {
        return Ok(Json(None::<GroupDetails>));
    };
    let cid = conversation_id.to_string();

    let db = state.clone();
    let my_id = me.id.clone();
    let details = blocking(move || {
        let Some(conv) = db.db.get_conversation(&cid)? else {
            return Ok(None);
        };
        if !conv.is_group || !db.db.is_member(&cid, &my_id)? {
            return Ok(None);
        }
        let members = db.db.group_members(&cid)?;
        Ok(Some((conv, members)))
    })
    .await?;

    let body = details.map(|(conv, members)| GroupDetails {
        id: parse_id(&conv.id, "conversation"),
        name: conv.name,
        image_url: conv.image_url,
        invite_code: conv.invite_code,
        creator_id: conv.creator_id.as_deref().map(|id| parse_id(id, "user")),
        created_at: conv.created_at,
        is_admin: conv.creator_id.as_deref() == Some(me.id.as_str()),
        members: members
            .into_iter()
            .map(|(user, role)| GroupMember {
                is_me: user.id == me.id,
                role: role
                    .as_deref()
                    .and_then(MemberRole::parse)
                    .unwrap_or(MemberRole::Member),
                user: user_summary(&user),
            })
            .collect(),
    });

    Ok(Json(body))
}

/// POST /conversations/{id}/read — move the caller's watermark to now.
pub async fn mark_as_read(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(me) = maybe_current_user(&state, &claims).await? else {
        return Ok(StatusCode::NO_CONTENT);
    };
    let cid = conversation_id.to_string();

    let db = state.clone();
    blocking(move || db.db.mark_as_read(&cid, &me.id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /conversations/{id}/read-status — other members' watermarks, for
/// read receipts. Empty for non-members.
pub async fn read_status(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(me) = maybe_current_user(&state, &claims).await? else {
        return Ok(Json(ReadStatus::new()));
    };
    let cid = conversation_id.to_string();

    let db = state.clone();
    let entries = blocking(move || {
        if !db.db.is_member(&cid, &me.id)? {
            return Ok(vec![]);
        }
        db.db.read_status(&cid, &me.id)
    })
    .await?;

    let body: ReadStatus = entries
        .into_iter()
        .map(|(user_id, watermark)| (parse_id(&user_id, "user"), watermark))
        .collect::<HashMap<_, _>>();

    Ok(Json(body))
}

pub(crate) fn last_message_view(msg: &MessageRow) -> LastMessage {
    LastMessage {
        id: parse_id(&msg.id, "message"),
        sender_id: parse_id(&msg.sender_id, "user"),
        content: msg.content.clone(),
        message_type: MessageType::parse(&msg.message_type).unwrap_or(MessageType::Text),
        deleted: msg.deleted,
        has_image: msg.image_file_id.is_some(),
        created_at: msg.created_at,
    }
}

/// Shared guard: the conversation must exist, be a group, and include the
/// caller. Runs before any mutation so authorization failures leave no
/// partial state.
async fn require_group_membership(
    state: &AppState,
    conversation_id: &str,
    user_id: &str,
) -> Result<(), ApiError> {
    let db = state.clone();
    let cid = conversation_id.to_string();
    let uid = user_id.to_string();
    let check = blocking(move || {
        let Some(conv) = db.db.get_conversation(&cid)? else {
            return Ok(MembershipCheck::Missing);
        };
        if !conv.is_group {
            return Ok(MembershipCheck::NotAGroup);
        }
        if !db.db.is_member(&cid, &uid)? {
            return Ok(MembershipCheck::NotAMember);
        }
        Ok(MembershipCheck::Ok)
    })
    .await?;

    match check {
        MembershipCheck::Ok => Ok(()),
        MembershipCheck::Missing => Err(ApiError::NotFound("conversation not found")),
        MembershipCheck::NotAGroup => Err(ApiError::Validation("not a group conversation".into())),
        MembershipCheck::NotAMember => Err(ApiError::Forbidden("not a member of this conversation")),
    }
}

enum MembershipCheck {
    Ok,
    Missing,
    NotAGroup,
    NotAMember,
}
