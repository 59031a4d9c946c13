use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Client fingerprint captured on every access attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_fingerprint: Option<String>,
    /// ISO country code resolved by the caller's edge, if any.
    pub location: Option<String>,
}

/// Per-message security configuration, 1:1 with a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSecurity {
    pub message_id: Uuid,
    pub security_level: SecurityLevel,
    pub requires_authentication: bool,
    pub block_screenshots: bool,
    /// Empty list means no geographic restriction.
    pub allowed_countries: Vec<String>,
    pub denied_ips: Vec<String>,
    pub access_expires_at: Option<DateTime<Utc>>,
    pub configured_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageSecurity {
    pub fn defaults(message_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            message_id,
            security_level: SecurityLevel::Low,
            requires_authentication: false,
            block_screenshots: false,
            allowed_countries: Vec::new(),
            denied_ips: Vec::new(),
            access_expires_at: None,
            configured_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    View,
    Download,
    Decrypt,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::View => "view",
            AccessType::Download => "download",
            AccessType::Decrypt => "decrypt",
        }
    }
}

/// Append-only audit row; written for every access attempt, granted or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageAccessLog {
    pub id: Uuid,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub access_type: AccessType,
    pub granted: bool,
    pub denial_reason: Option<String>,
    pub risk_score: u8,
    pub client: ClientInfo,
    pub accessed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    UnauthorizedAccess,
    SuspiciousActivity,
    DataBreach,
    PermissionChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    Investigating,
    Resolved,
}

/// Durable security event, independent of any message lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityIncident {
    pub id: Uuid,
    pub incident_type: IncidentType,
    pub severity: IncidentSeverity,
    pub user_id: Uuid,
    pub message_id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    pub description: String,
    pub status: IncidentStatus,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_summary: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl SecurityIncident {
    pub fn new(
        incident_type: IncidentType,
        severity: IncidentSeverity,
        user_id: Uuid,
        message_id: Option<Uuid>,
        description: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            incident_type,
            severity,
            user_id,
            message_id,
            conversation_id: None,
            description,
            status: IncidentStatus::Open,
            resolved_by: None,
            resolved_at: None,
            resolution_summary: None,
            occurred_at: Utc::now(),
        }
    }
}

/// Outcome of a single access validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDecision {
    pub granted: bool,
    pub risk_score: u8,
    pub requires_verification: bool,
    pub denial_reason: Option<String>,
}

impl AccessDecision {
    pub fn granted(risk_score: u8) -> Self {
        Self {
            granted: true,
            risk_score,
            requires_verification: false,
            denial_reason: None,
        }
    }

    pub fn denied(risk_score: u8, reason: impl Into<String>, requires_verification: bool) -> Self {
        Self {
            granted: false,
            risk_score,
            requires_verification,
            denial_reason: Some(reason.into()),
        }
    }
}

/// Read-only aggregation over a trailing window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSecurityAnalysis {
    pub user_id: Uuid,
    pub window_secs: i64,
    pub incident_count: u64,
    pub denied_access_count: u64,
    pub total_access_count: u64,
    pub risk_level: SecurityLevel,
    pub generated_at: DateTime<Utc>,
}
