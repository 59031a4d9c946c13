use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Ios,
    Android,
    Web,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Web => "web",
        }
    }
}

/// Local quiet window during which pushes are suppressed. A window whose
/// start is after its end spans midnight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl QuietHours {
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            time >= self.start && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    pub notifications_enabled: bool,
    pub sound_enabled: bool,
    pub vibration_enabled: bool,
    pub quiet_hours: Option<QuietHours>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            sound_enabled: true,
            vibration_enabled: true,
            quiet_hours: None,
        }
    }
}

/// Registered push target. The token is the identity: re-registering an
/// existing token updates the row instead of duplicating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDevice {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub platform: Platform,
    pub device_name: Option<String>,
    pub settings: DeviceSettings,
    pub is_active: bool,
    pub registered_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl NotificationDevice {
    pub fn new(user_id: Uuid, token: String, platform: Platform, device_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token,
            platform,
            device_name,
            settings: DeviceSettings::default(),
            is_active: true,
            registered_at: now,
            last_seen_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent,
    Failed,
    /// Every eligible device was inside its quiet window.
    Suppressed,
    Read,
}

/// Durable record of one logical send, regardless of device count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushNotification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
    pub status: NotificationStatus,
    pub devices_attempted: u32,
    pub devices_delivered: u32,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendNotificationRequest {
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Deferred send; delivery happens only through the scheduler sweep, never
/// synchronously at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub id: Uuid,
    pub request: SendNotificationRequest,
    pub deliver_at: DateTime<Utc>,
    pub delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkFailure {
    pub user_id: Uuid,
    pub reason: String,
}

/// Outcome of a bulk send; one entry per failed recipient, the rest went out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkSendReport {
    pub requested: u32,
    pub sent: u32,
    pub failed: u32,
    pub failures: Vec<BulkFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_hours_within_same_day() {
        let window = QuietHours {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        };
        assert!(window.contains(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
        assert!(!window.contains(NaiveTime::from_hms_opt(18, 0, 0).unwrap()));
    }

    #[test]
    fn quiet_hours_spanning_midnight() {
        let window = QuietHours {
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
        };
        assert!(window.contains(NaiveTime::from_hms_opt(23, 30, 0).unwrap()));
        assert!(window.contains(NaiveTime::from_hms_opt(3, 0, 0).unwrap()));
        assert!(!window.contains(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
    }
}
