use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Interval of the scheduled-notification sweep.
    pub scheduler_sweep_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3001);
        let scheduler_sweep_secs = env::var("SCHEDULER_SWEEP_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        Self {
            port,
            scheduler_sweep_secs,
        }
    }
}
