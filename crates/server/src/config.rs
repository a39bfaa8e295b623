//! Server configuration

use anyhow::Result;
use price_lib::UnresolvedBrandPolicy;
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Model bundle written by `camprice train`
    #[serde(default = "default_bundle_path")]
    pub bundle_path: PathBuf,

    /// What to do with friendly requests whose brand cannot be encoded
    #[serde(default)]
    pub unresolved_brand_policy: UnresolvedBrandPolicy,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_bundle_path() -> PathBuf {
    PathBuf::from("camera_price_bundle.bin")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bundle_path: default_bundle_path(),
            unresolved_brand_policy: UnresolvedBrandPolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional `camprice` config file and the
    /// `CAMPRICE_*` environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("camprice").required(false))
            .add_source(config::Environment::with_prefix("CAMPRICE").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.bundle_path, PathBuf::from("camera_price_bundle.bin"));
        assert_eq!(
            config.unresolved_brand_policy,
            UnresolvedBrandPolicy::DefaultToFirstCode
        );
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn test_deserialize_overrides() {
        let config = config::Config::builder()
            .set_override("port", 8080)
            .unwrap()
            .set_override("unresolved_brand_policy", "reject")
            .unwrap()
            .build()
            .unwrap();
        let parsed: ServerConfig = config.try_deserialize().unwrap();

        assert_eq!(parsed.port, 8080);
        assert_eq!(parsed.unresolved_brand_policy, UnresolvedBrandPolicy::Reject);
        assert_eq!(parsed.host, "0.0.0.0");
    }
}
