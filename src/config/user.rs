use serde::{Deserialize, Serialize};

/// A user known to the configuration-backed credential store.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct UserConfig {
    pub username: String,
    /// bcrypt hash of the password (`$2b$...`).
    pub password_hash: String,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default)]
    pub is_admin: bool,
}
