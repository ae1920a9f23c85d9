use anyhow::{Context, Result, bail};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordStoreConfig {
    /// PostgREST-compatible endpoint at `{url}/rest/v1`.
    Rest { url: String, service_key: String },
    Memory,
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub record_store: RecordStoreConfig,
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub redis_url: Option<String>,
    pub http_addr: String,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        Self::from_lookup(default_http_addr, |key| std::env::var(key).ok())
    }

    fn from_lookup(
        default_http_addr: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let record_store = match non_empty("RECORD_STORE").as_deref() {
            Some("memory") => RecordStoreConfig::Memory,
            Some("rest") | None => {
                let url = non_empty("RECORD_STORE_URL").context("RECORD_STORE_URL is required")?;
                let service_key =
                    non_empty("RECORD_STORE_KEY").context("RECORD_STORE_KEY is required")?;
                RecordStoreConfig::Rest {
                    url: url.trim_end_matches('/').to_string(),
                    service_key,
                }
            }
            Some(other) => bail!("unknown RECORD_STORE `{other}`, expected `rest` or `memory`"),
        };

        let jwt_secret = non_empty("AUTH_JWT_SECRET").context("AUTH_JWT_SECRET is required")?;
        let jwt_issuer = non_empty("AUTH_ISSUER").or_else(|| match &record_store {
            RecordStoreConfig::Rest { url, .. } => Some(format!("{url}/auth/v1")),
            RecordStoreConfig::Memory => None,
        });

        Ok(Self {
            record_store,
            jwt_secret,
            jwt_issuer,
            redis_url: non_empty("REDIS_URL"),
            http_addr: non_empty("HTTP_ADDR").unwrap_or_else(|| default_http_addr.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServiceConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        ServiceConfig::from_lookup("0.0.0.0:8080", |key| vars.get(key).cloned())
    }

    #[test]
    fn rest_store_defaults_issuer_from_url() {
        let config = load(&[
            ("RECORD_STORE_URL", "https://store.example.com/"),
            ("RECORD_STORE_KEY", "service-key"),
            ("AUTH_JWT_SECRET", "secret"),
        ])
        .unwrap();

        assert_eq!(
            config.record_store,
            RecordStoreConfig::Rest {
                url: "https://store.example.com".to_string(),
                service_key: "service-key".to_string(),
            }
        );
        assert_eq!(
            config.jwt_issuer.as_deref(),
            Some("https://store.example.com/auth/v1")
        );
        assert_eq!(config.http_addr, "0.0.0.0:8080");
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn memory_store_needs_no_url() {
        let config = load(&[
            ("RECORD_STORE", "memory"),
            ("AUTH_JWT_SECRET", "secret"),
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("REDIS_URL", "redis://localhost:6379"),
        ])
        .unwrap();

        assert_eq!(config.record_store, RecordStoreConfig::Memory);
        assert!(config.jwt_issuer.is_none());
        assert_eq!(config.http_addr, "127.0.0.1:9000");
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
    }

    #[test]
    fn missing_settings_are_reported() {
        let err = load(&[("AUTH_JWT_SECRET", "secret")]).unwrap_err();
        assert!(err.to_string().contains("RECORD_STORE_URL"));

        let err = load(&[("RECORD_STORE", "memory")]).unwrap_err();
        assert!(err.to_string().contains("AUTH_JWT_SECRET"));

        assert!(load(&[("RECORD_STORE", "sqlite"), ("AUTH_JWT_SECRET", "s")]).is_err());
    }
}
