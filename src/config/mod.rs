use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// How long a loaded set of profiles is reused before reloading
    #[serde(default = "default_profile_cache_ttl_secs")]
    pub profile_cache_ttl_secs: u64,

    /// Timeout for on-match HTTP calls; unset waits indefinitely
    pub hook_timeout_secs: Option<u64>,

    /// External binary rendering CV attachments for match e-mails
    pub attachment_generator_path: Option<String>,

    /// Redirect every match e-mail to this address
    pub debug_send_emails_to: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_profile_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn profile_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_cache_ttl_secs)
    }

    pub fn hook_timeout(&self) -> Option<Duration> {
        self.hook_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig =
            envy::from_iter(vars(&[("DATABASE_URL", "postgres://localhost/cv")])).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.profile_cache_ttl(), Duration::from_secs(86_400));
        assert!(config.hook_timeout().is_none());
        assert!(config.attachment_generator_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config: AppConfig = envy::from_iter(vars(&[
            ("DATABASE_URL", "postgres://localhost/cv"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("PROFILE_CACHE_TTL_SECS", "60"),
            ("HOOK_TIMEOUT_SECS", "15"),
            ("DEBUG_SEND_EMAILS_TO", "dev@example.com"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.profile_cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.hook_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.debug_send_emails_to.as_deref(), Some("dev@example.com"));
    }

    #[test]
    fn test_database_url_required() {
        assert!(envy::from_iter::<_, AppConfig>(vars(&[])).is_err());
    }
}
