//! Registry Store - On-Disk Layout
//!
//! The output tree is a store keyed by (kind, name). Every path and every
//! published URL is derived here and nowhere else.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const API_DIR: &str = "api";
pub const INDEX_FILE: &str = "index.json";
pub const TEMPLATE_SUFFIX: &str = "template";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to reset {path}: {source}")]
    Reset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactKind {
    Component,
    Provider,
    TokenSet,
    Template,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Component,
        ArtifactKind::Provider,
        ArtifactKind::TokenSet,
        ArtifactKind::Template,
    ];

    /// Directory segment, also the records key of the kind's API document
    pub fn dir(&self) -> &'static str {
        match self {
            ArtifactKind::Component => "components",
            ArtifactKind::Provider => "providers",
            ArtifactKind::TokenSet => "tokens",
            ArtifactKind::Template => "templates",
        }
    }

    pub fn metadata_file(&self) -> &'static str {
        match self {
            ArtifactKind::Component => "component.json",
            ArtifactKind::Provider => "provider.json",
            ArtifactKind::TokenSet => "token.json",
            ArtifactKind::Template => "metadata.json",
        }
    }

    pub fn document_file(&self) -> String {
        format!("{}.json", self.dir())
    }

    pub fn noun(&self) -> &'static str {
        match self {
            ArtifactKind::Component => "component",
            ArtifactKind::Provider => "provider",
            ArtifactKind::TokenSet => "token set",
            ArtifactKind::Template => "template",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir())
    }
}

/// Output root plus the public base URL it is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryLayout {
    root: PathBuf,
    base_url: String,
}

impl RegistryLayout {
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_dir(&self) -> PathBuf {
        self.root.join(API_DIR)
    }

    pub fn document_path(&self, kind: ArtifactKind) -> PathBuf {
        self.api_dir().join(kind.document_file())
    }

    pub fn index_path(&self) -> PathBuf {
        self.api_dir().join(INDEX_FILE)
    }

    pub fn kind_dir(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.dir())
    }

    pub fn artifact_dir(&self, kind: ArtifactKind, name: &str) -> PathBuf {
        self.kind_dir(kind).join(name)
    }

    pub fn artifact_file(&self, kind: ArtifactKind, name: &str, file: &str) -> PathBuf {
        self.artifact_dir(kind, name).join(file)
    }

    pub fn metadata_path(&self, kind: ArtifactKind, name: &str) -> PathBuf {
        self.artifact_file(kind, name, kind.metadata_file())
    }

    pub fn artifact_url(&self, kind: ArtifactKind, name: &str, file: &str) -> String {
        format!("{}/{}/{}/{}", self.base_url, kind.dir(), name, file)
    }

    pub fn metadata_url(&self, kind: ArtifactKind, name: &str) -> String {
        self.artifact_url(kind, name, kind.metadata_file())
    }

    pub fn endpoint_url(&self, kind: ArtifactKind) -> String {
        format!("{}/{}/{}", self.base_url, API_DIR, kind.document_file())
    }

    pub fn index_url(&self) -> String {
        format!("{}/{}/{}", self.base_url, API_DIR, INDEX_FILE)
    }
}

/// `button.tsx` → `button.tsx.template`
pub fn template_file_name(source_file_name: &str) -> String {
    format!("{}.{}", source_file_name, TEMPLATE_SUFFIX)
}

/// `colors` → `colors.json`
pub fn token_group_file_name(group: &str) -> String {
    format!("{}.json", group)
}

/// Pretty JSON with a trailing newline. Stable for identical values.
pub fn to_document_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

pub fn write_text(path: &Path, contents: &str) -> Result<(), StoreError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)
    };
    write().map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let text = to_document_json(value)?;
    write_text(path, &text)
}

/// Empties an artifact directory so its files are rewritten from scratch.
pub fn reset_dir(path: &Path) -> Result<(), StoreError> {
    let reset = || -> std::io::Result<()> {
        if path.exists() {
            fs::remove_dir_all(path)?;
        }
        fs::create_dir_all(path)
    };
    reset().map_err(|source| StoreError::Reset {
        path: path.to_path_buf(),
        source,
    })
}

/// Artifact names are kebab-case and double as directory names.
pub fn is_artifact_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Group names become file names next to `metadata.json`
pub fn is_group_name(group: &str) -> bool {
    let reserved = ArtifactKind::Template
        .metadata_file()
        .trim_end_matches(".json");
    !group.is_empty()
        && group != reserved
        && group
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Deletes a published file. Returns whether anything was there.
pub fn remove_file(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(StoreError::Reset {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Removes artifact directories of `kind` that are no longer registered.
///
/// Only directories holding the kind's metadata file are considered ours.
pub fn prune_stale(
    layout: &RegistryLayout,
    kind: ArtifactKind,
    keep: &BTreeSet<String>,
) -> Result<Vec<String>, StoreError> {
    let dir = layout.kind_dir(kind);
    let mut removed = vec![];
    if !dir.is_dir() {
        return Ok(removed);
    }
    let entries = fs::read_dir(&dir).map_err(|source| StoreError::Reset {
        path: dir.clone(),
        source,
    })?;
    let mut stale = vec![];
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if path.is_dir() && !keep.contains(&name) && path.join(kind.metadata_file()).is_file() {
            stale.push((name, path));
        }
    }
    stale.sort();
    for (name, path) in stale {
        fs::remove_dir_all(&path).map_err(|source| StoreError::Reset {
            path: path.clone(),
            source,
        })?;
        removed.push(name);
    }
    Ok(removed)
}

/// Lists regular files in `dir` with one of `extensions`, sorted by file name.
pub fn list_files(dir: &Path, extensions: &[&str]) -> std::io::Result<Vec<PathBuf>> {
    let mut files = vec![];
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.contains(&e));
        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_derived() {
        let layout = RegistryLayout::new("/tmp/out", "https://cdn.example.com/registry/");
        assert_eq!(
            layout.artifact_url(ArtifactKind::Component, "button", "button.tsx.template"),
            "https://cdn.example.com/registry/components/button/button.tsx.template"
        );
        assert_eq!(
            layout.metadata_url(ArtifactKind::Template, "ocean"),
            "https://cdn.example.com/registry/templates/ocean/metadata.json"
        );
        assert_eq!(
            layout.endpoint_url(ArtifactKind::TokenSet),
            "https://cdn.example.com/registry/api/tokens.json"
        );
        assert_eq!(layout.index_url(), "https://cdn.example.com/registry/api/index.json");
    }

    #[test]
    fn test_paths() {
        let layout = RegistryLayout::new("/tmp/out", "https://x");
        assert_eq!(
            layout.metadata_path(ArtifactKind::Provider, "theme"),
            PathBuf::from("/tmp/out/providers/theme/provider.json")
        );
        assert_eq!(
            layout.document_path(ArtifactKind::Component),
            PathBuf::from("/tmp/out/api/components.json")
        );
    }

    #[test]
    fn test_prune_only_touches_registered_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = RegistryLayout::new(tmp.path(), "https://x");
        let kind = ArtifactKind::Component;

        for name in ["keep", "stale"] {
            write_text(&layout.metadata_path(kind, name), "{}").unwrap();
        }
        fs::create_dir_all(layout.artifact_dir(kind, "foreign")).unwrap();

        let keep: BTreeSet<String> = ["keep".to_string()].into_iter().collect();
        let removed = prune_stale(&layout, kind, &keep).unwrap();

        assert_eq!(removed, vec!["stale".to_string()]);
        assert!(layout.artifact_dir(kind, "keep").is_dir());
        assert!(layout.artifact_dir(kind, "foreign").is_dir());
        assert!(!layout.artifact_dir(kind, "stale").exists());
    }

    #[test]
    fn test_remove_file_tolerates_absence() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = RegistryLayout::new(tmp.path(), "https://x");
        let path = layout.document_path(ArtifactKind::TokenSet);
        write_text(&path, "{}").unwrap();

        assert!(remove_file(&path).unwrap());
        assert!(!path.exists());
        assert!(!remove_file(&path).unwrap());
    }

    #[test]
    fn test_list_files_filters_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        for f in ["b.tsx", "a.ts", "notes.md", "c.json"] {
            fs::write(tmp.path().join(f), "").unwrap();
        }
        let files = list_files(tmp.path(), &["ts", "tsx"]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.ts", "b.tsx"]);
    }
}
