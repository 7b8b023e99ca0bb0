use crate::config::git::GitConfig;
use crate::config::http::HttpConfig;
use crate::config::user::UserConfig;
use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::env::var;

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

impl AppConfig {
    /// Loads the configuration from `$CONFIG_FILE`, falling back to `config.toml`.
    ///
    /// A missing file is not an error: the defaults are written to that path and
    /// returned. A file that exists but does not parse is reported as
    /// [`GatewayError::Config`].
    pub fn load() -> Result<Self, GatewayError> {
        let path = Self::path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => {
                let config = AppConfig::default();
                config.save()?;
                return Ok(config);
            }
        };
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, GatewayError> {
        toml::from_str(content).map_err(|e| GatewayError::Config(e.to_string()))
    }

    /// Writes this configuration as pretty TOML to the configured path.
    pub fn save(&self) -> Result<(), GatewayError> {
        let toml_str =
            toml::to_string_pretty(self).map_err(|e| GatewayError::Config(e.to_string()))?;
        std::fs::write(Self::path(), toml_str)?;
        Ok(())
    }

    fn path() -> String {
        var("CONFIG_FILE").unwrap_or("config.toml".to_string())
    }
}

pub mod git;
pub mod http;
pub mod user;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = AppConfig::parse("").unwrap();
        assert_eq!(cfg.http.port, 3000);
        assert_eq!(cfg.http.realm, "LibreBucket");
        assert_eq!(cfg.git.binary, "git");
        assert_eq!(cfg.git.timeout(), Duration::from_secs(600));
        assert!(cfg.users.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let cfg = AppConfig::parse(
            r#"
            [http]
            host = "127.0.0.1"
            port = 8080
            realm = "Forge"

            [git]
            binary = "/usr/bin/git"
            repos_root = "/srv/repos"
            timeout_secs = 30
            stderr_limit = 1024

            [[users]]
            username = "alice"
            password_hash = "$2b$04$abcdefghijklmnopqrstuu"
            tokens = ["t1"]
            api_keys = ["k1", "k2"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.http.host, "127.0.0.1");
        assert_eq!(cfg.http.port, 8080);
        assert_eq!(cfg.http.realm, "Forge");
        assert_eq!(cfg.git.repos_root.to_str(), Some("/srv/repos"));
        assert_eq!(cfg.git.stderr_limit, 1024);
        assert_eq!(cfg.users.len(), 1);
        assert!(!cfg.users[0].is_admin);
        assert_eq!(cfg.users[0].api_keys, vec!["k1", "k2"]);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let err = AppConfig::parse("[http]\nport = \"not a number\"").unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let cfg = AppConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed = AppConfig::parse(&text).unwrap();
        assert_eq!(parsed.http.host, cfg.http.host);
        assert_eq!(parsed.http.port, cfg.http.port);
        assert_eq!(parsed.git.timeout_secs, cfg.git.timeout_secs);
    }
}
