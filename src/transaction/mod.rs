use crate::config::git::GitConfig;
use crate::repository::RepositoryLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionService {
    #[serde(rename = "git-upload-pack")]
    UploadPack,
    #[serde(rename = "git-receive-pack")]
    ReceivePack,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Pull,
    Push,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyEncoding {
    Identity,
    Gzip,
}

/// One git service invocation for one HTTP exchange.
#[derive(Clone, Debug)]
pub struct Transaction {
    pub service: TransactionService,
    pub location: RepositoryLocation,
    pub git: GitConfig,
    /// Value of the client's `Git-Protocol` header, handed to git as `GIT_PROTOCOL`.
    pub protocol: Option<String>,
}

pub mod advertise;
pub mod process;
pub mod rpc;

impl TransactionService {
    pub fn from_string(s: &str) -> Option<TransactionService> {
        match s {
            "git-upload-pack" => Some(TransactionService::UploadPack),
            "git-receive-pack" => Some(TransactionService::ReceivePack),
            _ => None,
        }
    }
    /// Service name as it appears on the wire, e.g. `git-upload-pack`.
    pub fn name(&self) -> &'static str {
        match self {
            TransactionService::UploadPack => "git-upload-pack",
            TransactionService::ReceivePack => "git-receive-pack",
        }
    }
    /// Git subcommand implementing the service.
    pub fn command(&self) -> &'static str {
        match self {
            TransactionService::UploadPack => "upload-pack",
            TransactionService::ReceivePack => "receive-pack",
        }
    }
    pub fn action(&self) -> Action {
        match self {
            TransactionService::UploadPack => Action::Pull,
            TransactionService::ReceivePack => Action::Push,
        }
    }
    pub fn advertisement_content_type(&self) -> String {
        format!("application/x-{}-advertisement", self.name())
    }
    pub fn result_content_type(&self) -> String {
        format!("application/x-{}-result", self.name())
    }
}

impl fmt::Display for TransactionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl BodyEncoding {
    pub fn from_header(value: Option<&str>) -> BodyEncoding {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "gzip" || v == "x-gzip" => BodyEncoding::Gzip,
            _ => BodyEncoding::Identity,
        }
    }
}
