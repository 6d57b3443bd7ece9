use crate::agent::DEFAULT_OLLAMA_URL;
use crate::context::ContextPolicy;
use crate::db::StorePolicy;
use crate::errors::AppError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:ollama-chat.db";
pub const DEFAULT_MODEL: &str = "mistral";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub store_policy: StorePolicy,
    pub ollama_base_url: String,
    pub default_model: String,
    pub context_policy: ContextPolicy,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            store_policy: StorePolicy::Ephemeral,
            ollama_base_url: DEFAULT_OLLAMA_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            context_policy: ContextPolicy::default(),
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    /// Reads the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(mode) = lookup("STORE_MODE") {
            config.store_policy = mode.parse()?;
        }
        if let Some(url) = lookup("OLLAMA_API_BASE_URL") {
            config.ollama_base_url = url;
        }
        if let Some(model) = lookup("DEFAULT_MODEL").filter(|m| !m.trim().is_empty()) {
            config.default_model = model;
        }
        if let Some(policy) = lookup("CONTEXT_POLICY") {
            config.context_policy = policy.parse()?;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port.parse().map_err(|_| AppError::InvalidConfig {
                key: "PORT".to_string(),
                value: port.clone(),
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.store_policy, StorePolicy::Ephemeral);
        assert_eq!(config.ollama_base_url, "http://127.0.0.1:11434");
        assert_eq!(config.default_model, "mistral");
        assert_eq!(config.context_policy, ContextPolicy::FixedIndex(1));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup(&[
            ("STORE_MODE", "durable"),
            ("DEFAULT_MODEL", "llama3.2"),
            ("CONTEXT_POLICY", "latest-reply"),
            ("PORT", "3000"),
        ]))
        .unwrap();
        assert_eq!(config.store_policy, StorePolicy::Durable);
        assert_eq!(config.default_model, "llama3.2");
        assert_eq!(config.context_policy, ContextPolicy::LatestReply);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn blank_default_model_is_ignored() {
        let config = AppConfig::from_lookup(lookup(&[("DEFAULT_MODEL", "  ")])).unwrap();
        assert_eq!(config.default_model, DEFAULT_MODEL);
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig { ref key, .. } if key == "PORT"));
    }
}
