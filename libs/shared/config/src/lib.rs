use std::env;
use std::str::FromStr;
use tracing::warn;

/// Seats offered per travel date when no specific vehicle is known yet.
pub const DEFAULT_TRANSPORT_CAPACITY: u32 = 15;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub default_transport_capacity: u32,
    pub reminder_poll_interval_secs: u64,
    pub reminder_lead_minutes: i64,
    pub share_base_url: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            default_transport_capacity: DEFAULT_TRANSPORT_CAPACITY,
            reminder_poll_interval_secs: 60,
            reminder_lead_minutes: 60,
            share_base_url: "https://wa.me/".to_string(),
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            default_transport_capacity: parse_or("DEFAULT_TRANSPORT_CAPACITY", defaults.default_transport_capacity),
            reminder_poll_interval_secs: parse_or("REMINDER_POLL_INTERVAL_SECS", defaults.reminder_poll_interval_secs),
            reminder_lead_minutes: parse_or("REMINDER_LEAD_MINUTES", defaults.reminder_lead_minutes),
            share_base_url: env::var("SHARE_BASE_URL").unwrap_or(defaults.share_base_url),
            port: parse_or("PORT", defaults.port),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
