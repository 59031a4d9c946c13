use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    AccessType, ClientInfo, DestructMode, IncidentSeverity, IncidentType, MessageAccessLog,
    MessageSecurity, SecurityIncident, SecurityLevel, SelfDestructPolicy, UserSecurityAnalysis,
};
use crate::services::access_control::SecurityRequest;
use crate::services::self_destruct::DestructRequest;
use crate::state::AppState;

use super::conversations::CallerIdQuery;

#[derive(Deserialize)]
pub struct ConfigureSecurityBody {
    pub caller_id: Uuid,
    pub security_level: SecurityLevel,
    #[serde(default)]
    pub requires_authentication: bool,
    #[serde(default)]
    pub block_screenshots: bool,
    #[serde(default)]
    pub allowed_countries: Vec<String>,
    #[serde(default)]
    pub denied_ips: Vec<String>,
    pub access_expires_at: Option<DateTime<Utc>>,
}

pub async fn configure_security(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ConfigureSecurityBody>,
) -> Result<Json<MessageSecurity>, AppError> {
    Ok(Json(
        state
            .access
            .configure_security(
                body.caller_id,
                id,
                SecurityRequest {
                    security_level: body.security_level,
                    requires_authentication: body.requires_authentication,
                    block_screenshots: body.block_screenshots,
                    allowed_countries: body.allowed_countries,
                    denied_ips: body.denied_ips,
                    access_expires_at: body.access_expires_at,
                },
            )
            .await?,
    ))
}

pub async fn get_security(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageSecurity>, AppError> {
    Ok(Json(state.access.get_security(id).await?))
}

#[derive(Deserialize)]
pub struct ViewMessageBody {
    pub user_id: Uuid,
    #[serde(default)]
    pub access_type: Option<AccessType>,
    pub view_duration_ms: Option<i64>,
    #[serde(default)]
    pub client: ClientInfo,
}

#[derive(Serialize)]
pub struct ViewMessageResponse {
    pub granted: bool,
    pub risk_score: u8,
    pub requires_verification: bool,
    pub denial_reason: Option<String>,
    pub view_count: Option<u32>,
    pub triggered_destruction: bool,
}

/// Access validation and view counting in one step. A denied decision comes
/// back as a 200 with `granted: false` so callers can render the reason.
pub async fn view_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ViewMessageBody>,
) -> Result<Json<ViewMessageResponse>, AppError> {
    let access_type = body.access_type.unwrap_or(AccessType::View);
    let decision = state
        .access
        .validate_access(body.user_id, id, access_type, &body.client)
        .await?;
    if !decision.granted {
        return Ok(Json(ViewMessageResponse {
            granted: false,
            risk_score: decision.risk_score,
            requires_verification: decision.requires_verification,
            denial_reason: decision.denial_reason,
            view_count: None,
            triggered_destruction: false,
        }));
    }
    let outcome = state
        .destruct
        .record_view(body.user_id, id, body.view_duration_ms, Some(body.client))
        .await?;
    Ok(Json(ViewMessageResponse {
        granted: true,
        risk_score: decision.risk_score,
        requires_verification: false,
        denial_reason: None,
        view_count: outcome.map(|o| o.view_count),
        triggered_destruction: outcome.map(|o| o.destroyed_now).unwrap_or(false),
    }))
}

#[derive(Deserialize)]
pub struct AccessLogQuery {
    pub caller_id: Uuid,
    #[serde(default = "default_log_limit")]
    pub limit: usize,
}

fn default_log_limit() -> usize {
    100
}

pub async fn get_access_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AccessLogQuery>,
) -> Result<Json<Vec<MessageAccessLog>>, AppError> {
    Ok(Json(
        state
            .access
            .access_logs(query.caller_id, id, query.limit)
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct ConfigureDestructBody {
    pub caller_id: Uuid,
    pub mode: DestructMode,
    pub timer_seconds: Option<i64>,
    pub max_views: Option<u32>,
    #[serde(default)]
    pub notify_on_destruction: bool,
}

pub async fn configure_self_destruct(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ConfigureDestructBody>,
) -> Result<(StatusCode, Json<SelfDestructPolicy>), AppError> {
    let policy = state
        .destruct
        .configure(
            body.caller_id,
            id,
            DestructRequest {
                mode: body.mode,
                timer_seconds: body.timer_seconds,
                max_views: body.max_views,
                notify_on_destruction: body.notify_on_destruction,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(policy)))
}

pub async fn get_self_destruct(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SelfDestructPolicy>, AppError> {
    state
        .destruct
        .policy(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("self-destruct policy"))
}

pub async fn cancel_self_destruct(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CallerIdQuery>,
) -> Result<StatusCode, AppError> {
    if state.destruct.cancel(query.caller_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("self-destruct policy"))
    }
}

#[derive(Deserialize)]
pub struct DestroyBody {
    pub caller_id: Uuid,
    pub reason: Option<String>,
}

pub async fn destroy_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DestroyBody>,
) -> Result<StatusCode, AppError> {
    let reason = body.reason.as_deref().unwrap_or("destroyed by sender");
    state.destruct.trigger(body.caller_id, id, reason).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ReportIncidentBody {
    pub reporter_id: Uuid,
    pub incident_type: IncidentType,
    pub severity: IncidentSeverity,
    pub message_id: Option<Uuid>,
    pub description: String,
}

pub async fn report_incident(
    State(state): State<AppState>,
    Json(body): Json<ReportIncidentBody>,
) -> Result<(StatusCode, Json<SecurityIncident>), AppError> {
    let incident = state
        .access
        .report_incident(
            body.reporter_id,
            body.incident_type,
            body.severity,
            body.message_id,
            body.description,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(incident)))
}

pub async fn get_incident(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SecurityIncident>, AppError> {
    Ok(Json(state.access.get_incident(id).await?))
}

#[derive(Deserialize)]
pub struct ResolveIncidentBody {
    pub resolved_by: Uuid,
    pub summary: String,
}

pub async fn resolve_incident(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ResolveIncidentBody>,
) -> Result<Json<SecurityIncident>, AppError> {
    Ok(Json(
        state
            .access
            .resolve_incident(id, body.resolved_by, body.summary)
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct AnalysisQuery {
    #[serde(default = "default_window_secs")]
    pub window_secs: i64,
}

fn default_window_secs() -> i64 {
    86_400
}

pub async fn user_security_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<UserSecurityAnalysis>, AppError> {
    Ok(Json(
        state
            .access
            .analyze_user_security(id, query.window_secs)
            .await?,
    ))
}
