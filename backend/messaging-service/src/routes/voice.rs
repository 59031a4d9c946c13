use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{VoiceMessage, VoiceTranscription};
use crate::state::AppState;

use super::conversations::CallerQuery;

#[derive(Deserialize)]
pub struct StartRecordingBody {
    pub sender_id: Uuid,
    pub conversation_id: Uuid,
}

pub async fn start_recording(
    State(state): State<AppState>,
    Json(body): Json<StartRecordingBody>,
) -> Result<(StatusCode, Json<VoiceMessage>), AppError> {
    let voice = state
        .voice
        .start_recording(body.sender_id, body.conversation_id)
        .await?;
    Ok((StatusCode::CREATED, Json(voice)))
}

#[derive(Deserialize)]
pub struct CompleteRecordingBody {
    pub sender_id: Uuid,
    pub duration_ms: i64,
    pub audio_ref: String,
}

pub async fn complete_recording(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CompleteRecordingBody>,
) -> Result<Json<VoiceMessage>, AppError> {
    Ok(Json(
        state
            .voice
            .complete_recording(body.sender_id, id, body.duration_ms, body.audio_ref)
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct CancelRecordingBody {
    pub sender_id: Uuid,
}

pub async fn cancel_recording(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CancelRecordingBody>,
) -> Result<Json<VoiceMessage>, AppError> {
    Ok(Json(state.voice.cancel_recording(body.sender_id, id).await?))
}

pub async fn get_voice_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CallerQuery>,
) -> Result<Json<VoiceMessage>, AppError> {
    Ok(Json(state.voice.get_voice_message(query.user_id, id).await?))
}

#[derive(Deserialize)]
pub struct PlaybackBody {
    pub caller_id: Uuid,
}

pub async fn record_playback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<PlaybackBody>,
) -> Result<Json<VoiceMessage>, AppError> {
    Ok(Json(state.voice.record_playback(body.caller_id, id).await?))
}

#[derive(Deserialize)]
pub struct TranscriptionBody {
    pub caller_id: Uuid,
}

pub async fn request_transcription(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TranscriptionBody>,
) -> Result<(StatusCode, Json<VoiceTranscription>), AppError> {
    let transcription = state
        .voice
        .request_transcription(body.caller_id, id)
        .await?;
    Ok((StatusCode::CREATED, Json(transcription)))
}

pub async fn get_transcriptions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CallerQuery>,
) -> Result<Json<Vec<VoiceTranscription>>, AppError> {
    Ok(Json(state.voice.transcriptions(query.user_id, id).await?))
}
