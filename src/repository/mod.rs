use crate::error::GatewayError;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A bare repository that has been checked to exist strictly inside the repository root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepositoryLocation {
    pub owner: String,
    pub name: String,
    path: PathBuf,
}

impl RepositoryLocation {
    /// Canonical absolute path of the `<name>.git` directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the git process is started in.
    pub fn parent(&self) -> &Path {
        self.path.parent().unwrap_or(&self.path)
    }

    /// Repository directory name relative to [`Self::parent`], e.g. `project.git`.
    pub fn dir_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or(self.path.as_os_str())
    }
}

impl fmt::Display for RepositoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Clone, Debug)]
pub struct RepoLocator {
    root: PathBuf,
}

impl RepoLocator {
    /// Creates the root directory if needed and pins it to its canonical form.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps the untrusted `owner` and `repo` URL segments to a repository location.
    ///
    /// Segments are validated before the filesystem is consulted. The repo segment
    /// may carry a `.git` suffix. A repository that does not exist is reported as
    /// [`GatewayError::RepoNotFound`], and a path that resolves outside the root
    /// (for example through a symlink) as [`GatewayError::PathEscape`].
    pub fn locate(&self, owner: &str, repo: &str) -> Result<RepositoryLocation, GatewayError> {
        validate_segment(owner)?;
        validate_segment(repo)?;
        let name = repo.strip_suffix(".git").unwrap_or(repo);
        validate_segment(name)?;

        let repo_name = format!("{}/{}", owner, name);
        let candidate = self.root.join(owner).join(format!("{}.git", name));
        let resolved = match candidate.canonicalize() {
            Ok(resolved) if resolved.is_dir() => resolved,
            _ => return Err(GatewayError::RepoNotFound(repo_name)),
        };
        if resolved == self.root || !resolved.starts_with(&self.root) {
            warn!(repo = %repo_name, "repository path resolves outside the repository root");
            return Err(GatewayError::PathEscape(repo_name));
        }
        Ok(RepositoryLocation {
            owner: owner.to_string(),
            name: name.to_string(),
            path: resolved,
        })
    }
}

/// Rejects anything that could name a different directory than a single child entry.
pub fn validate_segment(segment: &str) -> Result<(), GatewayError> {
    let unsafe_segment = segment.is_empty()
        || segment == "."
        || segment.contains('/')
        || segment.contains('\\')
        || segment.contains("..")
        || segment.contains('\0');
    if unsafe_segment {
        return Err(GatewayError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}
