// 📄 Extracted-File Namer
//
// 20240315_WAT01_DATA_ph-measurements.xlsx → 20240315_WAT01_DATA_ph-measurements_extracted.csv
//
// Works on any filename, conventional or not: extraction scripts call it on
// whatever already sits in a project's raw/ folder.

use crate::resolver::Category;
use crate::validator::EXTRACTED_SUFFIX;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    #[error("invalid input {0:?}: expected a filename with an extension")]
    InvalidInput(String),
}

/// Derive the extracted CSV name for a source filename
pub fn extracted_name(original: &str) -> Result<String, NamingError> {
    let stem = strip_extension(original).ok_or_else(|| NamingError::InvalidInput(original.to_string()))?;
    Ok(format!("{}{}.csv", stem, EXTRACTED_SUFFIX))
}

fn strip_extension(filename: &str) -> Option<&str> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(stem)
}

/// Map a source file under `…/raw/` to its CSV in the sibling `…/extracted/`
///
/// Sources outside a `raw/` folder get the CSV next to them.
pub fn extracted_path(source: &Path) -> Result<PathBuf, NamingError> {
    let filename = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| NamingError::InvalidInput(source.display().to_string()))?;
    let name = extracted_name(filename)?;

    let parent = source.parent().unwrap_or_else(|| Path::new(""));
    let dir = match parent.file_name().and_then(|n| n.to_str()) {
        Some(dir) if dir == Category::Raw.dir_name() => parent
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(Category::Extracted.dir_name()),
        _ => parent.to_path_buf(),
    };

    Ok(dir.join(name))
}
