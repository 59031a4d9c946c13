use dotenvy::dotenv;
use std::env;

/// Risk-score weighting and thresholds for access control.
///
/// All weights are additive and the final score is clamped to 100. The exact
/// coefficients are tunable; only the qualitative policy (deny above
/// `high_risk_threshold`) is contractual.
#[derive(Debug, Clone)]
pub struct RiskConfig {
    /// Score above which access is denied and verification is required.
    pub high_risk_threshold: u8,
    /// Risk score at or above which a denied/suspicious access opens an incident.
    pub incident_threshold: u8,
    /// IP prefixes associated with anonymizing networks (Tor exits, open proxies).
    pub flagged_ip_prefixes: Vec<String>,
    /// User-agent substrings that indicate automation.
    pub automation_signatures: Vec<String>,
    pub anonymizer_weight: u8,
    pub automation_weight: u8,
    pub geo_mismatch_weight: u8,
    pub velocity_weight: u8,
    pub missing_fingerprint_weight: u8,
    /// Accesses within the velocity window above this count add `velocity_weight`.
    pub velocity_threshold: u64,
    pub velocity_window_secs: i64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high_risk_threshold: 70,
            incident_threshold: 70,
            flagged_ip_prefixes: vec![
                // Sample ranges of well-known Tor exit / anonymizer blocks.
                "185.220.".to_string(),
                "199.249.230.".to_string(),
                "204.85.191.".to_string(),
            ],
            automation_signatures: vec![
                "curl".to_string(),
                "wget".to_string(),
                "python-requests".to_string(),
                "bot".to_string(),
                "scanner".to_string(),
                "headless".to_string(),
            ],
            anonymizer_weight: 45,
            automation_weight: 30,
            geo_mismatch_weight: 30,
            velocity_weight: 15,
            missing_fingerprint_weight: 10,
            velocity_threshold: 20,
            velocity_window_secs: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Lifetime of a conversation key before it is considered Expired.
    pub key_ttl_days: i64,
    /// Reaper interval for timer-mode self-destruct sweeps.
    pub destruct_sweep_secs: u64,
    pub risk: RiskConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let key_ttl_days = env::var("KEY_TTL_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(90);
        let destruct_sweep_secs = env::var("DESTRUCT_SWEEP_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let mut risk = RiskConfig::default();
        if let Ok(v) = env::var("HIGH_RISK_THRESHOLD") {
            risk.high_risk_threshold = v
                .parse()
                .map_err(|_| crate::error::AppError::Config("invalid HIGH_RISK_THRESHOLD".into()))?;
        }
        if let Ok(v) = env::var("FLAGGED_IP_PREFIXES") {
            risk.flagged_ip_prefixes = Self::parse_list(&v);
        }

        Ok(Self {
            port,
            key_ttl_days,
            destruct_sweep_secs,
            risk,
        })
    }

    fn parse_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }

    pub fn test_defaults() -> Self {
        Self {
            port: 3000,
            key_ttl_days: 90,
            destruct_sweep_secs: 30,
            risk: RiskConfig::default(),
        }
    }
}
