use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    Conversation, ConversationParticipant, ConversationType, EncryptionKeyDto, MemberRole,
};
use crate::realtime::RealtimeEvent;
use crate::services::KeyValidation;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateConversationRequest {
    pub creator_id: Uuid,
    pub kind: ConversationType,
    pub name: Option<String>,
    pub participant_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
pub struct CallerQuery {
    pub user_id: Uuid,
}

pub async fn create_conversation(
    State(state): State<AppState>,
    Json(body): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<Conversation>), AppError> {
    let conversation = state
        .conversations
        .create_conversation(body.creator_id, body.kind, body.name, body.participant_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<CallerQuery>,
) -> Result<Json<Vec<Conversation>>, AppError> {
    Ok(Json(state.conversations.list_conversations(query.user_id).await?))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CallerQuery>,
) -> Result<Json<Conversation>, AppError> {
    Ok(Json(
        state.conversations.get_conversation(query.user_id, id).await?,
    ))
}

pub async fn get_participants(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CallerQuery>,
) -> Result<Json<Vec<ConversationParticipant>>, AppError> {
    Ok(Json(
        state.conversations.participants(query.user_id, id).await?,
    ))
}

#[derive(Deserialize)]
pub struct UpdateConversationRequest {
    pub caller_id: Uuid,
    pub name: Option<String>,
}

pub async fn update_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateConversationRequest>,
) -> Result<Json<Conversation>, AppError> {
    Ok(Json(
        state
            .conversations
            .update_conversation(body.caller_id, id, body.name)
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct AddParticipantRequest {
    pub caller_id: Uuid,
    pub user_id: Uuid,
}

pub async fn add_participant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AddParticipantRequest>,
) -> Result<StatusCode, AppError> {
    state
        .conversations
        .add_participant(body.caller_id, id, body.user_id)
        .await?;
    Ok(StatusCode::CREATED)
}

#[derive(Deserialize)]
pub struct CallerIdQuery {
    pub caller_id: Uuid,
}

pub async fn remove_participant(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<CallerIdQuery>,
) -> Result<StatusCode, AppError> {
    state
        .conversations
        .remove_participant(query.caller_id, id, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ChangeRoleRequest {
    pub caller_id: Uuid,
    pub role: MemberRole,
}

pub async fn change_participant_role(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<ChangeRoleRequest>,
) -> Result<StatusCode, AppError> {
    state
        .conversations
        .change_role(body.caller_id, id, user_id, body.role)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct CallerBody {
    pub caller_id: Uuid,
}

pub async fn archive_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CallerBody>,
) -> Result<Json<Conversation>, AppError> {
    Ok(Json(state.conversations.archive(body.caller_id, id).await?))
}

pub async fn unarchive_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CallerBody>,
) -> Result<Json<Conversation>, AppError> {
    Ok(Json(state.conversations.unarchive(body.caller_id, id).await?))
}

#[derive(Deserialize)]
pub struct PreferencesRequest {
    pub caller_id: Uuid,
    pub pinned: Option<bool>,
    pub muted: Option<bool>,
}

pub async fn update_preferences(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<PreferencesRequest>,
) -> Result<Json<Conversation>, AppError> {
    let mut conversation = state
        .conversations
        .get_conversation(body.caller_id, id)
        .await?;
    if let Some(pinned) = body.pinned {
        conversation = state
            .conversations
            .set_pinned(body.caller_id, id, pinned)
            .await?;
    }
    if let Some(muted) = body.muted {
        conversation = state
            .conversations
            .set_muted(body.caller_id, id, muted)
            .await?;
    }
    Ok(Json(conversation))
}

#[derive(Deserialize)]
pub struct TypingRequest {
    pub user_id: Uuid,
    pub typing: bool,
}

pub async fn typing_indicator(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TypingRequest>,
) -> Result<StatusCode, AppError> {
    state.conversations.get_conversation(body.user_id, id).await?;
    let event = if body.typing {
        RealtimeEvent::TypingStarted {
            conversation_id: id,
            user_id: body.user_id,
        }
    } else {
        RealtimeEvent::TypingStopped {
            conversation_id: id,
            user_id: body.user_id,
        }
    };
    state.hub.publish(event).await;
    Ok(StatusCode::ACCEPTED)
}

pub async fn list_conversation_keys(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CallerQuery>,
) -> Result<Json<Vec<EncryptionKeyDto>>, AppError> {
    state.conversations.get_conversation(query.user_id, id).await?;
    Ok(Json(state.vault.list_keys(id).await?))
}

pub async fn rotate_conversation_keys(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CallerBody>,
) -> Result<Json<EncryptionKeyDto>, AppError> {
    state.conversations.get_conversation(body.caller_id, id).await?;
    let key = state.vault.rotate_keys(id, body.caller_id).await?;
    state
        .hub
        .publish(RealtimeEvent::KeysRotated {
            conversation_id: id,
            key_id: key.id,
            fingerprint: key.fingerprint.clone(),
        })
        .await;
    Ok(Json(key))
}

pub async fn validate_key(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<KeyValidation>, AppError> {
    Ok(Json(state.vault.validate_key(id).await?))
}

#[derive(Deserialize)]
pub struct RevokeKeyRequest {
    pub caller_id: Uuid,
    pub reason: Option<String>,
}

pub async fn revoke_key(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RevokeKeyRequest>,
) -> Result<Json<EncryptionKeyDto>, AppError> {
    Ok(Json(
        state.vault.revoke_key(id, body.caller_id, body.reason).await?,
    ))
}
