// 🏗️ Project scaffolding - create the folder tree for registered projects
//
// 01_projects/{code}_{name}/{raw,extracted,samples,correspondence}/ + metadata/
// Idempotent: existing folders are left alone.

use crate::config::METADATA_DIR;
use crate::project::ProjectEntry;
use crate::resolver::{project_dir, Category};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Create a project's category folders under `root`
///
/// Returns only the directories that did not exist before.
pub fn scaffold_project(root: &Path, entry: &ProjectEntry) -> Result<Vec<PathBuf>> {
    let project = root.join(project_dir(entry));

    let mut wanted = vec![root.join(METADATA_DIR)];
    wanted.extend(Category::ALL.iter().map(|c| project.join(c.dir_name())));

    let mut created = Vec::new();
    for dir in wanted {
        if dir.is_dir() {
            continue;
        }
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        created.push(dir);
    }

    if !created.is_empty() {
        info!(project = %entry.folder_name(), created = created.len(), "scaffolded project");
    }
    Ok(created)
}

/// Scaffold every project in a listing
pub fn scaffold_all(root: &Path, entries: &[ProjectEntry]) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for entry in entries {
        created.extend(scaffold_project(root, entry)?);
    }
    Ok(created)
}
