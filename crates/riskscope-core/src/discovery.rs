use crate::extractor;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Directories never worth descending into.
const SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "vendor",
    "dist",
    "build",
    ".venv",
    "venv",
];

/// File extensions worth scanning for secrets.
const CONTENT_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "py", "rb", "go", "rs", "java", "kt", "php", "sh", "bash", "json",
    "yml", "yaml", "toml", "ini", "cfg", "conf", "env", "properties", "txt", "md",
];

/// Upper bound on content files per scan, to keep runs predictable on
/// large repositories.
pub const MAX_CONTENT_FILES: usize = 2000;

/// Files found in one repository walk.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredFiles {
    /// Recognized dependency manifests, ready for the extractor.
    pub manifests: Vec<PathBuf>,
    /// Candidate text files for secret scanning.
    pub content_files: Vec<PathBuf>,
}

/// Walk a repository tree and classify its files.
pub fn discover(root: &Path) -> Result<DiscoveredFiles> {
    if !root.exists() {
        anyhow::bail!("Path '{}' does not exist", root.display());
    }
    if !root.is_dir() {
        anyhow::bail!("'{}' is not a directory", root.display());
    }

    let pattern = format!("{}/**/*", root.display());
    let mut found = DiscoveredFiles::default();

    for entry in glob::glob(&pattern).context("Failed to read glob pattern")? {
        let Ok(path) = entry else {
            continue;
        };
        if !path.is_file() || is_skipped(&path) {
            continue;
        }

        let name = path.to_string_lossy();
        if extractor::ecosystem_for(&name).is_some() {
            found.manifests.push(path.clone());
        }
        if found.content_files.len() < MAX_CONTENT_FILES && has_scannable_extension(&path) {
            found.content_files.push(path);
        }
    }

    found.manifests.sort();
    found.content_files.sort();
    Ok(found)
}

fn is_skipped(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| SKIP_DIRS.contains(&s))
            .unwrap_or(false)
    })
}

fn has_scannable_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| CONTENT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
