use std::env;
use tracing::warn;

pub const DEFAULT_API_PORT: u16 = 3000;
pub const DEFAULT_DAILY_NORMAL_QUOTA: u32 = 10;
pub const DEFAULT_DAILY_LIMITED_QUOTA: u32 = 5;
/// IST, UTC+05:30.
pub const DEFAULT_CLINIC_UTC_OFFSET_MINUTES: i32 = 330;
pub const DEFAULT_DRAFT_IDLE_MINUTES: i64 = 120;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Origin of the clinic REST backend, e.g. `https://api.example-clinic.com`.
    pub clinic_api_url: String,
    pub api_port: u16,
    pub daily_normal_quota: u32,
    pub daily_limited_quota: u32,
    /// Offset used to turn backend timestamps into clinic calendar dates.
    pub clinic_utc_offset_minutes: i32,
    /// Drafts untouched for this long are dropped from the in-memory store.
    pub draft_idle_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            clinic_api_url: env::var("CLINIC_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("CLINIC_API_URL not set, using empty value");
                    String::new()
                }),
            api_port: parse_var("API_PORT", DEFAULT_API_PORT),
            daily_normal_quota: parse_var("DAILY_NORMAL_QUOTA", DEFAULT_DAILY_NORMAL_QUOTA),
            daily_limited_quota: parse_var("DAILY_LIMITED_QUOTA", DEFAULT_DAILY_LIMITED_QUOTA),
            clinic_utc_offset_minutes: parse_var("CLINIC_UTC_OFFSET_MINUTES", DEFAULT_CLINIC_UTC_OFFSET_MINUTES),
            draft_idle_minutes: parse_var("DRAFT_IDLE_MINUTES", DEFAULT_DRAFT_IDLE_MINUTES),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.clinic_api_url.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            clinic_api_url: String::new(),
            api_port: DEFAULT_API_PORT,
            daily_normal_quota: DEFAULT_DAILY_NORMAL_QUOTA,
            daily_limited_quota: DEFAULT_DAILY_LIMITED_QUOTA,
            clinic_utc_offset_minutes: DEFAULT_CLINIC_UTC_OFFSET_MINUTES,
            draft_idle_minutes: DEFAULT_DRAFT_IDLE_MINUTES,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", name, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", name, default);
            default
        }
    }
}
