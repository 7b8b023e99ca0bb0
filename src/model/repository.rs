use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Side-car record describing who owns a repository and whether it is public.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RepositoryMetadata {
    pub owner: String,
    #[serde(rename = "public")]
    pub is_public: bool,
    #[serde(default)]
    pub stars_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub last_commit: String,
    #[serde(default)]
    pub languages: HashMap<String, f64>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl RepositoryMetadata {
    pub fn new(owner: impl Into<String>, is_public: bool) -> Self {
        Self {
            owner: owner.into(),
            is_public,
            stars_count: 0,
            forks_count: 0,
            last_commit: String::new(),
            languages: HashMap::new(),
            created_at: Utc::now(),
        }
    }
}
