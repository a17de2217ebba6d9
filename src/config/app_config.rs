use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::cache::{CacheConfig, CacheType};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub environment: Environment,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to call the API with credentials; empty disables CORS
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Deployment environment; production hides error stacks from callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_secs: u64,
    pub backend: CacheType,
    pub redis_url: Option<String>,
    pub key_prefix: String,
    /// In-memory backend only
    pub max_capacity: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "agentflow_session".to_string(),
            ttl_secs: 86_400,
            backend: CacheType::InMemory,
            redis_url: None,
            key_prefix: "session".to_string(),
            max_capacity: 100_000,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Cache backend settings; the session store applies its own key prefix
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            cache_type: self.backend,
            redis_url: self.redis_url.clone(),
            key_prefix: None,
            max_ttl: self.ttl(),
            max_capacity: self.max_capacity,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert!(config.server.cors_origins.is_empty());
        assert_eq!(config.session.cookie_name, "agentflow_session");
        assert_eq!(config.session.ttl(), Duration::from_secs(86_400));
        assert_eq!(config.session.backend, CacheType::InMemory);
        assert!(!config.is_production());
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "environment": "production",
            "server": { "cors_origins": ["https://app.example.com"] },
            "session": { "backend": "redis", "redis_url": "redis://localhost:6379" }
        }))
        .unwrap();

        assert!(config.is_production());
        assert_eq!(config.session.backend, CacheType::Redis);
        assert_eq!(config.session.cookie_name, "agentflow_session");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.cors_origins, vec!["https://app.example.com"]);

        let cache = config.session.cache_config();
        assert_eq!(cache.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert!(cache.key_prefix.is_none());
    }
}
