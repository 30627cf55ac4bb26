//! Configuration types.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{DEFAULT_OPENAI_BASE_URL, LlmBackend, LlmConfig};

/// Default model used for extraction.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Service configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP server listens on.
    pub bind_addr: SocketAddr,
    /// libSQL database file holding the domain mappings.
    pub db_path: PathBuf,
    /// LLM settings. `None` when no credential is configured (degraded mode).
    pub llm: Option<LlmConfig>,
}

impl ServiceConfig {
    /// Build configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = parse_or(get("PHARMA_INQUIRY_PORT"), "PHARMA_INQUIRY_PORT", 8080)?;
        let host: IpAddr = parse_or(
            get("PHARMA_INQUIRY_BIND"),
            "PHARMA_INQUIRY_BIND",
            IpAddr::from([0, 0, 0, 0]),
        )?;
        let timeout_secs: u64 = parse_or(
            get("PHARMA_INQUIRY_HTTP_TIMEOUT_SECS"),
            "PHARMA_INQUIRY_HTTP_TIMEOUT_SECS",
            60,
        )?;

        let db_path = get("PHARMA_INQUIRY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/pharma-inquiry.db"));

        let llm = get("OPENAI_API_KEY").map(|key| LlmConfig {
            backend: LlmBackend::OpenAi,
            api_key: SecretString::from(key.trim().to_string()),
            model: get("PHARMA_INQUIRY_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        });

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            db_path,
            llm,
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{value:?}: {e}"),
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_credential() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.db_path, PathBuf::from("./data/pharma-inquiry.db"));
        assert!(config.llm.is_none());
    }

    #[test]
    fn empty_key_counts_as_absent() {
        let config = config_from(&[("OPENAI_API_KEY", "   ")]).unwrap();
        assert!(config.llm.is_none());
    }

    #[test]
    fn credential_enables_llm_with_defaults() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        let llm = config.llm.unwrap();
        assert_eq!(llm.api_key.expose_secret(), "sk-test");
        assert_eq!(llm.model, "gpt-4o-mini");
        assert_eq!(llm.base_url, "https://api.openai.com/v1");
        assert_eq!(llm.timeout, Duration::from_secs(60));
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("PHARMA_INQUIRY_MODEL", "gpt-4o"),
            ("OPENAI_BASE_URL", "http://localhost:9999/v1"),
            ("PHARMA_INQUIRY_PORT", "9090"),
            ("PHARMA_INQUIRY_BIND", "127.0.0.1"),
            ("PHARMA_INQUIRY_DB_PATH", "/tmp/x.db"),
            ("PHARMA_INQUIRY_HTTP_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9090");
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        let llm = config.llm.unwrap();
        assert_eq!(llm.model, "gpt-4o");
        assert_eq!(llm.base_url, "http://localhost:9999/v1");
        assert_eq!(llm.timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = config_from(&[("PHARMA_INQUIRY_PORT", "eighty")]).unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "PHARMA_INQUIRY_PORT"),
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }
}
