use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use messaging_service::config::Config;
use messaging_service::error::AppError;
use messaging_service::models::{
    AccessType, ClientInfo, ConversationType, IncidentSeverity, IncidentType, MessageType,
    SecurityLevel,
};
use messaging_service::services::access_control::SecurityRequest;
use messaging_service::services::{NullNotifier, SendMessageRequest, UnconfiguredTranscriber};
use messaging_service::state::AppState;
use messaging_service::store::{MemoryStore, SecurityStore};

struct Fixture {
    state: AppState,
    store: MemoryStore,
    alice: Uuid,
    bob: Uuid,
    message_id: Uuid,
}

async fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let state = AppState::build(
        Config::test_defaults(),
        store.clone(),
        Arc::new(NullNotifier),
        Arc::new(UnconfiguredTranscriber),
    );
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let conversation = state
        .conversations
        .create_conversation(alice, ConversationType::Direct, None, vec![bob])
        .await
        .unwrap();
    let message = state
        .messages
        .send_message(
            alice,
            SendMessageRequest {
                conversation_id: conversation.id,
                kind: MessageType::Text,
                content: "classified".into(),
                reply_to_message_id: None,
                attachments: Vec::new(),
            },
        )
        .await
        .unwrap();
    Fixture {
        state,
        store,
        alice,
        bob,
        message_id: message.id,
    }
}

fn clean_client() -> ClientInfo {
    ClientInfo {
        ip_address: Some("93.184.216.34".to_string()),
        user_agent: Some("Mozilla/5.0 (iPhone)".to_string()),
        device_fingerprint: Some("fp-bob".to_string()),
        location: Some("DE".to_string()),
    }
}

fn tor_client() -> ClientInfo {
    ClientInfo {
        ip_address: Some("185.220.101.7".to_string()),
        user_agent: Some("curl/8.4.0".to_string()),
        device_fingerprint: Some("fp-x".to_string()),
        location: None,
    }
}

#[tokio::test]
async fn clean_access_is_granted_and_logged() {
    let f = fixture().await;
    let decision = f
        .state
        .access
        .validate_access(f.bob, f.message_id, AccessType::View, &clean_client())
        .await
        .unwrap();
    assert!(decision.granted);
    assert!(decision.risk_score <= 70);

    let logs = f
        .state
        .access
        .access_logs(f.alice, f.message_id, 10)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].granted);
}

#[tokio::test]
async fn anonymizer_plus_automation_is_denied_with_incident() {
    let f = fixture().await;
    let decision = f
        .state
        .access
        .validate_access(f.bob, f.message_id, AccessType::Decrypt, &tor_client())
        .await
        .unwrap();
    assert!(!decision.granted);
    assert!(decision.risk_score > 70);
    assert!(decision.requires_verification);

    let incidents = f
        .store
        .incidents_for_user(f.bob, Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].incident_type, IncidentType::SuspiciousActivity);
}

#[tokio::test]
async fn non_participants_are_denied() {
    let f = fixture().await;
    let decision = f
        .state
        .access
        .validate_access(Uuid::new_v4(), f.message_id, AccessType::View, &clean_client())
        .await
        .unwrap();
    assert!(!decision.granted);
    assert_eq!(
        decision.denial_reason.as_deref(),
        Some("not a conversation participant")
    );
}

#[tokio::test]
async fn geo_restriction_denies_outside_countries() {
    let f = fixture().await;
    f.state
        .access
        .configure_security(
            f.alice,
            f.message_id,
            SecurityRequest {
                security_level: SecurityLevel::High,
                requires_authentication: false,
                block_screenshots: true,
                allowed_countries: vec!["US".into()],
                denied_ips: Vec::new(),
                access_expires_at: None,
            },
        )
        .await
        .unwrap();

    let decision = f
        .state
        .access
        .validate_access(f.bob, f.message_id, AccessType::View, &clean_client())
        .await
        .unwrap();
    assert!(!decision.granted);
    assert_eq!(decision.denial_reason.as_deref(), Some("geographic restriction"));

    let mut us_client = clean_client();
    us_client.location = Some("US".into());
    let decision = f
        .state
        .access
        .validate_access(f.bob, f.message_id, AccessType::View, &us_client)
        .await
        .unwrap();
    assert!(decision.granted);
}

#[tokio::test]
async fn denied_ip_prefixes_block_access() {
    let f = fixture().await;
    f.state
        .access
        .configure_security(
            f.alice,
            f.message_id,
            SecurityRequest {
                security_level: SecurityLevel::Medium,
                requires_authentication: false,
                block_screenshots: false,
                allowed_countries: Vec::new(),
                denied_ips: vec!["93.184.".into()],
                access_expires_at: None,
            },
        )
        .await
        .unwrap();

    let decision = f
        .state
        .access
        .validate_access(f.bob, f.message_id, AccessType::View, &clean_client())
        .await
        .unwrap();
    assert!(!decision.granted);
    assert_eq!(decision.denial_reason.as_deref(), Some("ip address blocked"));
}

#[tokio::test]
async fn expired_access_window_denies() {
    let f = fixture().await;
    f.state
        .access
        .configure_security(
            f.alice,
            f.message_id,
            SecurityRequest {
                security_level: SecurityLevel::High,
                requires_authentication: false,
                block_screenshots: false,
                allowed_countries: Vec::new(),
                denied_ips: Vec::new(),
                access_expires_at: Some(Utc::now() - Duration::minutes(5)),
            },
        )
        .await
        .unwrap();

    let decision = f
        .state
        .access
        .validate_access(f.bob, f.message_id, AccessType::View, &clean_client())
        .await
        .unwrap();
    assert!(!decision.granted);
    assert_eq!(decision.denial_reason.as_deref(), Some("access window expired"));
}

#[tokio::test]
async fn authentication_requirement_asks_for_verification() {
    let f = fixture().await;
    f.state
        .access
        .configure_security(
            f.alice,
            f.message_id,
            SecurityRequest {
                security_level: SecurityLevel::Critical,
                requires_authentication: true,
                block_screenshots: true,
                allowed_countries: Vec::new(),
                denied_ips: Vec::new(),
                access_expires_at: None,
            },
        )
        .await
        .unwrap();

    let mut anonymous = clean_client();
    anonymous.device_fingerprint = None;
    let decision = f
        .state
        .access
        .validate_access(f.bob, f.message_id, AccessType::View, &anonymous)
        .await
        .unwrap();
    assert!(!decision.granted);
    assert!(decision.requires_verification);
}

#[tokio::test]
async fn only_the_sender_configures_security_or_reads_logs() {
    let f = fixture().await;
    let err = f
        .state
        .access
        .configure_security(
            f.bob,
            f.message_id,
            SecurityRequest {
                security_level: SecurityLevel::Low,
                requires_authentication: false,
                block_screenshots: false,
                allowed_countries: Vec::new(),
                denied_ips: Vec::new(),
                access_expires_at: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = f
        .state
        .access
        .access_logs(f.bob, f.message_id, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn incident_resolution_is_terminal() {
    let f = fixture().await;
    let incident = f
        .state
        .access
        .report_incident(
            f.alice,
            IncidentType::PermissionChange,
            IncidentSeverity::Medium,
            Some(f.message_id),
            "role escalation observed".into(),
        )
        .await
        .unwrap();

    let resolved = f
        .state
        .access
        .resolve_incident(incident.id, f.alice, "false alarm".into())
        .await
        .unwrap();
    assert_eq!(resolved.resolution_summary.as_deref(), Some("false alarm"));

    let err = f
        .state
        .access
        .resolve_incident(incident.id, f.alice, "again".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn user_analysis_escalates_with_denials() {
    let f = fixture().await;
    let analysis = f
        .state
        .access
        .analyze_user_security(f.bob, 3600)
        .await
        .unwrap();
    assert_eq!(analysis.risk_level, SecurityLevel::Low);

    // One risk-based denial opens an incident and raises the level.
    f.state
        .access
        .validate_access(f.bob, f.message_id, AccessType::View, &tor_client())
        .await
        .unwrap();
    let analysis = f
        .state
        .access
        .analyze_user_security(f.bob, 3600)
        .await
        .unwrap();
    assert_eq!(analysis.denied_access_count, 1);
    assert_eq!(analysis.risk_level, SecurityLevel::High);
}
