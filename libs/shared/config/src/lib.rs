use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub api_port: u16,
    pub auto_generation_enabled: bool,
    pub auto_generation_interval_seconds: u64,
    pub generation_concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_role_key: String::new(),
            api_port: 3000,
            auto_generation_enabled: true,
            auto_generation_interval_seconds: 3600,
            generation_concurrency: 4,
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
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            api_port: parse_or("API_PORT", defaults.api_port),
            auto_generation_enabled: parse_or("AUTO_GENERATION_ENABLED", defaults.auto_generation_enabled),
            auto_generation_interval_seconds: parse_or(
                "AUTO_GENERATION_INTERVAL_SECONDS",
                defaults.auto_generation_interval_seconds,
            ),
            generation_concurrency: parse_or("GENERATION_CONCURRENCY", defaults.generation_concurrency),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_service_role_key.is_empty()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_not_configured() {
        let config = AppConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.auto_generation_interval_seconds, 3600);
        assert_eq!(config.generation_concurrency, 4);
    }

    #[test]
    fn test_configured_requires_service_key() {
        let mut config = AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "anon".to_string(),
            ..AppConfig::default()
        };
        assert!(!config.is_configured());

        config.supabase_service_role_key = "service".to_string();
        assert!(config.is_configured());
    }

    #[test]
    fn test_parse_or_falls_back_on_garbage() {
        env::set_var("SCHEDULE_TEST_PARSE_OR", "not-a-number");
        assert_eq!(parse_or("SCHEDULE_TEST_PARSE_OR", 42u64), 42);
        env::set_var("SCHEDULE_TEST_PARSE_OR", " 7 ");
        assert_eq!(parse_or("SCHEDULE_TEST_PARSE_OR", 42u64), 7);
        env::remove_var("SCHEDULE_TEST_PARSE_OR");
    }
}
