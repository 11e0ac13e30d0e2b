//! Engine configuration
//!
//! Defaults tuned for the canvassing dashboard, overridable through
//! environment variables.

use std::time::Duration;

/// Configuration for the guarantee engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the guarantee REST backend (default: `http://localhost:8000/api`)
    pub api_base_url: String,
    /// Timeout for remote calls (default: 10 seconds)
    pub request_timeout: Duration,
    /// How long the "saved" flash stays visible (default: 1500 ms)
    pub flash_duration: Duration,
    /// Page size for the same-department relationship list (default: 10)
    pub dept_page_size: u32,
    /// Page size for the same-team relationship list (default: 10)
    pub team_page_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            request_timeout: Duration::from_secs(10),
            flash_duration: Duration::from_millis(1500),
            dept_page_size: 10,
            team_page_size: 10,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GUARANTEE_API_URL") {
            if !val.is_empty() {
                config.api_base_url = val;
            }
        }

        if let Ok(val) = std::env::var("GUARANTEE_API_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.request_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(val) = std::env::var("GUARANTEE_FLASH_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.flash_duration = Duration::from_millis(ms);
            }
        }

        if let Ok(val) = std::env::var("GUARANTEE_DEPT_PAGE_SIZE") {
            if let Ok(n) = val.parse::<u32>() {
                config.dept_page_size = n.max(1);
            }
        }

        if let Ok(val) = std::env::var("GUARANTEE_TEAM_PAGE_SIZE") {
            if let Ok(n) = val.parse::<u32>() {
                config.team_page_size = n.max(1);
            }
        }

        config
    }
}
