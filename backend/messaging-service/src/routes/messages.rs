use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{MessageAttachment, MessageDto, MessageType};
use crate::services::SendMessageRequest;
use crate::state::AppState;

use super::conversations::{CallerIdQuery, CallerQuery};

#[derive(Deserialize)]
pub struct SendMessageBody {
    pub sender_id: Uuid,
    pub conversation_id: Uuid,
    #[serde(default = "default_kind")]
    pub kind: MessageType,
    pub content: String,
    pub reply_to_message_id: Option<Uuid>,
    #[serde(default)]
    pub attachments: Vec<MessageAttachment>,
}

fn default_kind() -> MessageType {
    MessageType::Text
}

pub async fn send_message(
    State(state): State<AppState>,
    Json(body): Json<SendMessageBody>,
) -> Result<(StatusCode, Json<MessageDto>), AppError> {
    let message = state
        .messages
        .send_message(
            body.sender_id,
            SendMessageRequest {
                conversation_id: body.conversation_id,
                kind: body.kind,
                content: body.content,
                reply_to_message_id: body.reply_to_message_id,
                attachments: body.attachments,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CallerQuery>,
) -> Result<Json<MessageDto>, AppError> {
    Ok(Json(state.messages.get_message(query.user_id, id).await?))
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub user_id: Uuid,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    50
}

pub async fn get_conversation_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<MessageDto>>, AppError> {
    Ok(Json(
        state
            .messages
            .get_conversation_messages(query.user_id, id, query.page, query.page_size)
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct EditMessageBody {
    pub caller_id: Uuid,
    pub content: String,
}

pub async fn edit_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<EditMessageBody>,
) -> Result<Json<MessageDto>, AppError> {
    Ok(Json(
        state
            .messages
            .edit_message(body.caller_id, id, body.content)
            .await?,
    ))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CallerIdQuery>,
) -> Result<StatusCode, AppError> {
    state.messages.delete_message(query.caller_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct MarkAsReadBody {
    pub user_id: Uuid,
    pub device_info: Option<String>,
}

pub async fn mark_as_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<MarkAsReadBody>,
) -> Result<StatusCode, AppError> {
    state
        .messages
        .mark_as_read(body.user_id, id, body.device_info)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_unread_count(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CallerQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let unread = state.messages.unread_count(query.user_id, id).await?;
    Ok(Json(json!({ "conversation_id": id, "unread_count": unread })))
}
