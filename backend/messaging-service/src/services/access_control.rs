use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RiskConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    AccessDecision, AccessType, ClientInfo, IncidentSeverity, IncidentStatus, IncidentType,
    MessageAccessLog, MessageSecurity, SecurityIncident, SecurityLevel, UserSecurityAnalysis,
};
use crate::store::{AccessStats, ConversationStore, MessageStore, PolicyStore, SecurityStore};

/// Parameters for per-message security configuration.
#[derive(Debug, Clone)]
pub struct SecurityRequest {
    pub security_level: SecurityLevel,
    pub requires_authentication: bool,
    pub block_screenshots: bool,
    pub allowed_countries: Vec<String>,
    pub denied_ips: Vec<String>,
    pub access_expires_at: Option<chrono::DateTime<Utc>>,
}

/// Additive risk score over the client fingerprint and recent behavior,
/// clamped to 100.
pub fn calculate_access_risk_score(
    client: &ClientInfo,
    stats: &AccessStats,
    security: Option<&MessageSecurity>,
    cfg: &RiskConfig,
) -> u8 {
    let mut score: u32 = 0;

    if let Some(ip) = &client.ip_address {
        if cfg.flagged_ip_prefixes.iter().any(|p| ip.starts_with(p)) {
            score += cfg.anonymizer_weight as u32;
        }
    }
    if let Some(ua) = &client.user_agent {
        let ua = ua.to_ascii_lowercase();
        if cfg.automation_signatures.iter().any(|s| ua.contains(s)) {
            score += cfg.automation_weight as u32;
        }
    }
    if client.device_fingerprint.is_none() {
        score += cfg.missing_fingerprint_weight as u32;
    }
    if stats.total > cfg.velocity_threshold {
        score += cfg.velocity_weight as u32;
    }
    if let Some(security) = security {
        if !security.allowed_countries.is_empty() {
            let in_allowed = client
                .location
                .as_ref()
                .map(|c| security.allowed_countries.iter().any(|a| a == c))
                .unwrap_or(false);
            if !in_allowed {
                score += cfg.geo_mismatch_weight as u32;
            }
        }
    }

    score.min(100) as u8
}

/// Gatekeeper for message access. Every attempt, granted or denied, leaves
/// an audit row; high-risk denials open a security incident.
pub struct AccessController {
    security: Arc<dyn SecurityStore>,
    policies: Arc<dyn PolicyStore>,
    messages: Arc<dyn MessageStore>,
    conversations: Arc<dyn ConversationStore>,
    risk: RiskConfig,
}

impl AccessController {
    pub fn new(
        security: Arc<dyn SecurityStore>,
        policies: Arc<dyn PolicyStore>,
        messages: Arc<dyn MessageStore>,
        conversations: Arc<dyn ConversationStore>,
        risk: RiskConfig,
    ) -> Self {
        Self {
            security,
            policies,
            messages,
            conversations,
            risk,
        }
    }

    /// Only the sender may tighten or relax a message's security settings.
    pub async fn configure_security(
        &self,
        caller_id: Uuid,
        message_id: Uuid,
        request: SecurityRequest,
    ) -> AppResult<MessageSecurity> {
        let message = self
            .messages
            .get(message_id)
            .await?
            .ok_or(AppError::NotFound("message"))?;
        if message.sender_id != caller_id {
            return Err(AppError::Forbidden(
                "only the sender may configure message security".into(),
            ));
        }
        let mut security = self
            .security
            .get_security(message_id)
            .await?
            .unwrap_or_else(|| MessageSecurity::defaults(message_id));
        security.security_level = request.security_level;
        security.requires_authentication = request.requires_authentication;
        security.block_screenshots = request.block_screenshots;
        security.allowed_countries = request.allowed_countries;
        security.denied_ips = request.denied_ips;
        security.access_expires_at = request.access_expires_at;
        security.configured_by = Some(caller_id);
        security.updated_at = Utc::now();
        self.security.upsert_security(security.clone()).await?;
        Ok(security)
    }

    pub async fn get_security(&self, message_id: Uuid) -> AppResult<MessageSecurity> {
        Ok(self
            .security
            .get_security(message_id)
            .await?
            .unwrap_or_else(|| MessageSecurity::defaults(message_id)))
    }

    /// Layered validation. The checks run cheapest-first and the first
    /// failing layer decides; the risk score is computed regardless so every
    /// audit row carries one.
    pub async fn validate_access(
        &self,
        user_id: Uuid,
        message_id: Uuid,
        access_type: AccessType,
        client: &ClientInfo,
    ) -> AppResult<AccessDecision> {
        let message = self
            .messages
            .get(message_id)
            .await?
            .ok_or(AppError::NotFound("message"))?;

        let security = self.security.get_security(message_id).await?;
        let window = Duration::seconds(self.risk.velocity_window_secs);
        let stats = self
            .security
            .user_access_stats(user_id, Utc::now() - window)
            .await?;
        let risk_score = calculate_access_risk_score(client, &stats, security.as_ref(), &self.risk);

        let is_member = self
            .conversations
            .is_participant(message.conversation_id, user_id)
            .await?;
        let destroyed = self
            .policies
            .get(message_id)
            .await?
            .map(|p| p.is_destroyed || p.timer_elapsed(Utc::now()))
            .unwrap_or(false);

        let decision = if !is_member {
            AccessDecision::denied(risk_score, "not a conversation participant", false)
        } else if destroyed {
            AccessDecision::denied(risk_score, "message destroyed", false)
        } else if let Some(denial) = Self::security_denial(security.as_ref(), client, risk_score) {
            denial
        } else if risk_score > self.risk.high_risk_threshold {
            AccessDecision::denied(risk_score, "access risk score too high", true)
        } else {
            AccessDecision::granted(risk_score)
        };

        self.security
            .append_access_log(MessageAccessLog {
                id: Uuid::new_v4(),
                message_id,
                user_id,
                access_type,
                granted: decision.granted,
                denial_reason: decision.denial_reason.clone(),
                risk_score,
                client: client.clone(),
                accessed_at: Utc::now(),
            })
            .await?;

        if !decision.granted && risk_score >= self.risk.incident_threshold {
            let severity = if risk_score >= 90 {
                IncidentSeverity::Critical
            } else {
                IncidentSeverity::High
            };
            let mut incident = SecurityIncident::new(
                IncidentType::SuspiciousActivity,
                severity,
                user_id,
                Some(message_id),
                format!(
                    "{} access denied with risk score {}",
                    access_type.as_str(),
                    risk_score
                ),
            );
            incident.conversation_id = Some(message.conversation_id);
            warn!(%user_id, %message_id, risk_score, "high-risk access denied, incident opened");
            self.security.insert_incident(incident).await?;
        }

        Ok(decision)
    }

    fn security_denial(
        security: Option<&MessageSecurity>,
        client: &ClientInfo,
        risk_score: u8,
    ) -> Option<AccessDecision> {
        let security = security?;
        if let Some(expires_at) = security.access_expires_at {
            if Utc::now() > expires_at {
                return Some(AccessDecision::denied(
                    risk_score,
                    "access window expired",
                    false,
                ));
            }
        }
        if security.requires_authentication && client.device_fingerprint.is_none() {
            return Some(AccessDecision::denied(
                risk_score,
                "additional verification required",
                true,
            ));
        }
        if !security.allowed_countries.is_empty() {
            let in_allowed = client
                .location
                .as_ref()
                .map(|c| security.allowed_countries.iter().any(|a| a == c))
                .unwrap_or(false);
            if !in_allowed {
                return Some(AccessDecision::denied(
                    risk_score,
                    "geographic restriction",
                    false,
                ));
            }
        }
        if let Some(ip) = &client.ip_address {
            if security.denied_ips.iter().any(|d| ip.starts_with(d)) {
                return Some(AccessDecision::denied(risk_score, "ip address blocked", false));
            }
        }
        None
    }

    pub async fn access_logs(
        &self,
        caller_id: Uuid,
        message_id: Uuid,
        limit: usize,
    ) -> AppResult<Vec<MessageAccessLog>> {
        let message = self
            .messages
            .get(message_id)
            .await?
            .ok_or(AppError::NotFound("message"))?;
        if message.sender_id != caller_id {
            return Err(AppError::Forbidden(
                "only the sender may read the access log".into(),
            ));
        }
        self.security.access_logs(message_id, limit).await
    }

    pub async fn report_incident(
        &self,
        reporter_id: Uuid,
        incident_type: IncidentType,
        severity: IncidentSeverity,
        message_id: Option<Uuid>,
        description: String,
    ) -> AppResult<SecurityIncident> {
        let incident =
            SecurityIncident::new(incident_type, severity, reporter_id, message_id, description);
        info!(incident_id = %incident.id, "security incident reported");
        self.security.insert_incident(incident.clone()).await?;
        Ok(incident)
    }

    pub async fn get_incident(&self, id: Uuid) -> AppResult<SecurityIncident> {
        self.security
            .get_incident(id)
            .await?
            .ok_or(AppError::NotFound("security incident"))
    }

    /// Terminal transition; resolving twice conflicts.
    pub async fn resolve_incident(
        &self,
        id: Uuid,
        resolved_by: Uuid,
        summary: String,
    ) -> AppResult<SecurityIncident> {
        self.security
            .resolve_incident(id, resolved_by, summary, Utc::now())
            .await
    }

    /// Trailing-window aggregation over a user's accesses and incidents.
    pub async fn analyze_user_security(
        &self,
        user_id: Uuid,
        window_secs: i64,
    ) -> AppResult<UserSecurityAnalysis> {
        let since = Utc::now() - Duration::seconds(window_secs.max(1));
        let stats = self.security.user_access_stats(user_id, since).await?;
        let incidents = self.security.incidents_for_user(user_id, since).await?;
        let open_incidents = incidents
            .iter()
            .filter(|i| i.status != IncidentStatus::Resolved)
            .count() as u64;

        let risk_level = if open_incidents >= 3 || stats.denied >= 10 {
            SecurityLevel::Critical
        } else if open_incidents >= 1 || stats.denied >= 5 {
            SecurityLevel::High
        } else if stats.denied >= 1 {
            SecurityLevel::Medium
        } else {
            SecurityLevel::Low
        };

        Ok(UserSecurityAnalysis {
            user_id,
            window_secs,
            incident_count: incidents.len() as u64,
            denied_access_count: stats.denied,
            total_access_count: stats.total,
            risk_level,
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_client() -> ClientInfo {
        ClientInfo {
            ip_address: Some("93.184.216.34".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
            device_fingerprint: Some("fp-1".to_string()),
            location: Some("DE".to_string()),
        }
    }

    #[test]
    fn clean_client_scores_low() {
        let cfg = RiskConfig::default();
        let score =
            calculate_access_risk_score(&clean_client(), &AccessStats::default(), None, &cfg);
        assert_eq!(score, 0);
    }

    #[test]
    fn tor_exit_with_automation_crosses_threshold() {
        let cfg = RiskConfig::default();
        let client = ClientInfo {
            ip_address: Some("185.220.101.7".to_string()),
            user_agent: Some("curl/8.4.0".to_string()),
            device_fingerprint: Some("fp-1".to_string()),
            location: None,
        };
        let score = calculate_access_risk_score(&client, &AccessStats::default(), None, &cfg);
        assert!(score > cfg.high_risk_threshold);
    }

    #[test]
    fn score_is_clamped_to_100() {
        let cfg = RiskConfig::default();
        let client = ClientInfo {
            ip_address: Some("185.220.101.7".to_string()),
            user_agent: Some("python-requests/2.31".to_string()),
            device_fingerprint: None,
            location: None,
        };
        let stats = AccessStats {
            total: 1000,
            denied: 500,
        };
        let mut security = MessageSecurity::defaults(Uuid::new_v4());
        security.allowed_countries = vec!["US".to_string()];
        let score = calculate_access_risk_score(&client, &stats, Some(&security), &cfg);
        assert_eq!(score, 100);
    }

    #[test]
    fn velocity_adds_weight_only_above_threshold() {
        let cfg = RiskConfig::default();
        let at_threshold = AccessStats {
            total: cfg.velocity_threshold,
            denied: 0,
        };
        let above = AccessStats {
            total: cfg.velocity_threshold + 1,
            denied: 0,
        };
        let client = clean_client();
        assert_eq!(
            calculate_access_risk_score(&client, &at_threshold, None, &cfg),
            0
        );
        assert_eq!(
            calculate_access_risk_score(&client, &above, None, &cfg),
            cfg.velocity_weight
        );
    }
}
