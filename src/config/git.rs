use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct GitConfig {
    /// Executable invoked as `<binary> <service> --stateless-rpc ...`.
    pub binary: String,
    /// Directory holding `<owner>/<repo>.git` bare repositories.
    pub repos_root: PathBuf,
    /// Upper bound for one exchange, after which the git process is killed.
    pub timeout_secs: u64,
    /// Bytes of git stderr kept for logging; the rest is read and discarded.
    pub stderr_limit: usize,
}

impl GitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: "git".to_string(),
            repos_root: PathBuf::from("repos"),
            timeout_secs: 600,
            stderr_limit: 64 * 1024,
        }
    }
}
