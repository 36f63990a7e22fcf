// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Markdown documents served from a content directory.
//!
//! Request paths are resolved inside the configured root. Anything that
//! escapes the root, through `..` segments or a symlink, is refused.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use comrak::{markdown_to_html, Options};

const MARKDOWN_EXTENSION: &str = "md";

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Access to this path is denied")]
    Forbidden,

    #[error("Content not found")]
    NotFound,

    #[error("Failed to read content: {0}")]
    Io(#[from] std::io::Error),
}

/// A markdown file read from the content root.
#[derive(Debug, Clone)]
pub struct ContentDocument {
    pub filename: String,
    /// Dotted extension (`.md`), empty when the file has none.
    pub extension: String,
    pub markdown: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Top-level markdown file listed in the content index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    /// Request path without the extension.
    pub path: String,
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the document at `request_path`.
    ///
    /// A path without an extension tries `<path>.md` before the bare name.
    pub async fn read(&self, request_path: &str) -> Result<ContentDocument, ContentError> {
        let relative = relative_path(request_path)?;
        let root = match tokio::fs::canonicalize(&self.root).await {
            Ok(root) => root,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(root = %self.root.display(), "Content directory does not exist");
                return Err(ContentError::NotFound);
            }
            Err(e) => return Err(e.into()),
        };

        let candidates = if relative.extension().is_none() {
            vec![relative.with_extension(MARKDOWN_EXTENSION), relative]
        } else {
            vec![relative]
        };

        for candidate in candidates {
            let resolved = match tokio::fs::canonicalize(root.join(&candidate)).await {
                Ok(resolved) => resolved,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !resolved.starts_with(&root) {
                tracing::warn!(path = %request_path, "Content path resolves outside the root");
                return Err(ContentError::Forbidden);
            }

            let metadata = tokio::fs::metadata(&resolved).await?;
            if !metadata.is_file() {
                continue;
            }
            let markdown = tokio::fs::read_to_string(&resolved).await?;

            return Ok(ContentDocument {
                filename: file_name(&resolved),
                extension: resolved
                    .extension()
                    .map(|ext| format!(".{}", ext.to_string_lossy()))
                    .unwrap_or_default(),
                size: metadata.len(),
                last_modified: metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now()),
                markdown,
            });
        }

        Err(ContentError::NotFound)
    }

    /// Markdown files directly under the root, sorted by name.
    ///
    /// A missing root yields an empty list.
    pub async fn list(&self) -> Result<Vec<ContentEntry>, ContentError> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(MARKDOWN_EXTENSION) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            entries.push(ContentEntry {
                path: path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                filename: file_name(&path),
                size: metadata.len(),
            });
        }
        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(entries)
    }
}

/// Render markdown with GitHub extensions, hard line breaks and smart
/// punctuation. Raw HTML in the source is not passed through.
pub fn render_html(markdown: &str) -> String {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.parse.smart = true;
    options.render.hardbreaks = true;
    markdown_to_html(markdown, &options)
}

/// Only plain segments are accepted; `..`, `.` and absolute paths are refused
/// before touching the filesystem.
fn relative_path(request_path: &str) -> Result<PathBuf, ContentError> {
    let trimmed = request_path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(ContentError::NotFound);
    }

    let mut relative = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            _ => return Err(ContentError::Forbidden),
        }
    }
    Ok(relative)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
