use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod conversations;
pub mod messages;
pub mod security;
pub mod voice;

use conversations::{
    add_participant, archive_conversation, change_participant_role, create_conversation,
    get_conversation, get_participants, list_conversation_keys, list_conversations,
    remove_participant, revoke_key, rotate_conversation_keys, typing_indicator,
    unarchive_conversation, update_conversation, update_preferences, validate_key,
};
use messages::{
    delete_message, edit_message, get_conversation_messages, get_message, get_unread_count,
    mark_as_read, send_message,
};
use security::{
    cancel_self_destruct, configure_security, configure_self_destruct, destroy_message,
    get_access_logs, get_incident, get_security, get_self_destruct, report_incident,
    resolve_incident, user_security_analysis, view_message,
};
use voice::{
    cancel_recording, complete_recording, get_transcriptions, get_voice_message,
    record_playback, request_transcription, start_recording,
};

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "messaging-service" }))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/conversations", post(create_conversation).get(list_conversations))
        .route(
            "/conversations/:id",
            get(get_conversation).put(update_conversation),
        )
        .route(
            "/conversations/:id/participants",
            get(get_participants).post(add_participant),
        )
        .route(
            "/conversations/:id/participants/:user_id",
            delete(remove_participant),
        )
        .route(
            "/conversations/:id/participants/:user_id/role",
            put(change_participant_role),
        )
        .route("/conversations/:id/archive", post(archive_conversation))
        .route("/conversations/:id/unarchive", post(unarchive_conversation))
        .route("/conversations/:id/preferences", put(update_preferences))
        .route("/conversations/:id/typing", post(typing_indicator))
        .route("/conversations/:id/keys", get(list_conversation_keys))
        .route("/conversations/:id/keys/rotate", post(rotate_conversation_keys))
        .route("/conversations/:id/messages", get(get_conversation_messages))
        .route("/conversations/:id/unread-count", get(get_unread_count))
        .route("/keys/:id/validate", get(validate_key))
        .route("/keys/:id/revoke", post(revoke_key))
        .route("/messages", post(send_message))
        .route(
            "/messages/:id",
            get(get_message).put(edit_message).delete(delete_message),
        )
        .route("/messages/:id/read", post(mark_as_read))
        .route(
            "/messages/:id/security",
            get(get_security).put(configure_security),
        )
        .route("/messages/:id/view", post(view_message))
        .route("/messages/:id/access-logs", get(get_access_logs))
        .route(
            "/messages/:id/self-destruct",
            get(get_self_destruct)
                .post(configure_self_destruct)
                .delete(cancel_self_destruct),
        )
        .route("/messages/:id/destroy", post(destroy_message))
        .route("/incidents", post(report_incident))
        .route("/incidents/:id", get(get_incident))
        .route("/incidents/:id/resolve", post(resolve_incident))
        .route("/users/:id/security-analysis", get(user_security_analysis))
        .route("/voice", post(start_recording))
        .route("/voice/:id", get(get_voice_message))
        .route("/voice/:id/complete", post(complete_recording))
        .route("/voice/:id/cancel", post(cancel_recording))
        .route("/voice/:id/played", post(record_playback))
        .route(
            "/voice/:id/transcriptions",
            get(get_transcriptions).post(request_transcription),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
