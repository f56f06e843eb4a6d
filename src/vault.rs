//! Document store abstraction.
//!
//! The engine never touches the host's file system directly. Everything it
//! needs from the vault goes through [`Vault`]: existence checks for the
//! input classifier, link resolution, and binary reads for local images.
//!
//! [`FsVault`] is a plain directory-backed implementation used by the CLI
//! and the test suite.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;

use crate::{Result, VexillumError};

/// Metadata for a file that exists in the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultFile {
    /// Vault-relative path using `/` separators.
    pub path: String,
    /// Lower-cased extension without the dot (empty if none).
    pub extension: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, if the store tracks one.
    pub modified: Option<SystemTime>,
}

impl VaultFile {
    /// Build metadata from a vault-relative path, deriving the extension.
    pub fn new(path: impl Into<String>, size: u64, modified: Option<SystemTime>) -> Self {
        let path = path.into();
        let extension = extension_of(&path);
        Self {
            path,
            extension,
            size,
            modified,
        }
    }
}

/// Host document store.
///
/// Lookups are synchronous (the host keeps an in-memory index); reads are
/// async.
#[async_trait]
pub trait Vault: Send + Sync {
    /// Look up a file by vault-relative path. Folders return `None`.
    fn get_file(&self, path: &str) -> Option<VaultFile>;

    /// Resolve a wiki-link target (without brackets) as seen from the
    /// document at `context_path`.
    fn resolve_link(&self, link: &str, context_path: &str) -> Option<String>;

    /// Read the full contents of a file.
    async fn read_binary(&self, path: &str) -> Result<Vec<u8>>;
}

/// Directory-backed [`Vault`].
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a vault-relative path to an absolute one, refusing anything that
    /// would escape the root.
    fn absolute(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Depth-first search for a file whose name matches `name`, returning
    /// the shortest matching vault path.
    fn find_by_name(&self, name: &str) -> Option<String> {
        let mut stack = vec![self.root.clone()];
        let mut best: Option<String> = None;
        while let Some(dir) = stack.pop() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path.file_name().and_then(|n| n.to_str()) == Some(name)
                    && let Some(rel) = self.relative(&path)
                    && best.as_ref().is_none_or(|b| rel.len() < b.len())
                {
                    best = Some(rel);
                }
            }
        }
        best
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = rel
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();
        Some(parts.join("/"))
    }
}

#[async_trait]
impl Vault for FsVault {
    fn get_file(&self, path: &str) -> Option<VaultFile> {
        let absolute = self.absolute(path)?;
        let meta = std::fs::metadata(&absolute).ok()?;
        if !meta.is_file() {
            return None;
        }
        let rel = self.relative(&absolute)?;
        Some(VaultFile::new(rel, meta.len(), meta.modified().ok()))
    }

    fn resolve_link(&self, link: &str, context_path: &str) -> Option<String> {
        // Drop heading/block references and display aliases.
        let target = link.split(['|', '#', '^']).next()?.trim();
        if target.is_empty() {
            return None;
        }

        // Relative to the linking document first, then the vault root.
        let context_dir = context_path
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("");
        if !context_dir.is_empty() {
            let candidate = format!("{context_dir}/{target}");
            if let Some(file) = self.get_file(&candidate) {
                return Some(file.path);
            }
        }
        if let Some(file) = self.get_file(target) {
            return Some(file.path);
        }

        // Bare names resolve anywhere in the vault.
        if !target.contains('/') {
            return self.find_by_name(target);
        }
        None
    }

    async fn read_binary(&self, path: &str) -> Result<Vec<u8>> {
        let absolute = self
            .absolute(path)
            .ok_or_else(|| VexillumError::NotFound(path.to_string()))?;
        tokio::fs::read(&absolute)
            .await
            .map_err(|e| VexillumError::LocalRead {
                path: path.to_string(),
                message: e.to_string(),
            })
    }
}

/// Lower-cased extension of a path, without the dot.
pub(crate) fn extension_of(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}
