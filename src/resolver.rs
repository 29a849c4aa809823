//! Path resolver: validated filename → canonical destination.
//!
//! ```text
//! 01_projects/{code}_{name}/raw/              DATA, RPRT, CERT, MISC
//! 01_projects/{code}_{name}/extracted/        derived CSVs (never an intake target)
//! 01_projects/{code}_{name}/samples/          SAMP
//! 01_projects/{code}_{name}/correspondence/   CORR
//! metadata/                                   META
//! ```

use crate::config::{METADATA_DIR, PROJECTS_DIR};
use crate::filename::DocType;
use crate::project::ProjectEntry;
use crate::validator::ValidatedFilename;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Category subfolder inside a project directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Raw,
    Extracted,
    Samples,
    Correspondence,
}

impl Category {
    /// Every project gets all four folders
    pub const ALL: [Category; 4] = [
        Category::Raw,
        Category::Extracted,
        Category::Samples,
        Category::Correspondence,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Raw => "raw",
            Category::Extracted => "extracted",
            Category::Samples => "samples",
            Category::Correspondence => "correspondence",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Where a doctype lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Inside the owning project's folder
    Project(Category),
    /// Top-level `metadata/`, outside every project
    Metadata,
}

/// Doctype → placement table
///
/// DATA files are source files, so they go to `raw/`; their derived CSVs
/// live in the sibling `extracted/`.
pub fn placement_for(doctype: DocType) -> Placement {
    match doctype {
        DocType::Data => Placement::Project(Category::Raw),
        DocType::Samp => Placement::Project(Category::Samples),
        DocType::Rprt => Placement::Project(Category::Raw),
        DocType::Corr => Placement::Project(Category::Correspondence),
        DocType::Cert => Placement::Project(Category::Raw),
        DocType::Meta => Placement::Metadata,
        DocType::Misc => Placement::Project(Category::Raw),
    }
}

/// Destination relative to the repository root, always `/`-separated
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationPath(String);

impl DestinationPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Platform path under `root`
    pub fn to_path(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |path, part| path.join(part))
    }
}

impl fmt::Display for DestinationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Project folder relative to the repository root (`01_projects/WAT01_river-sampling-2024`)
pub fn project_dir(entry: &ProjectEntry) -> String {
    format!("{}/{}", PROJECTS_DIR, entry.folder_name())
}

/// Resolve the canonical destination of a validated filename
pub fn resolve(validated: &ValidatedFilename) -> DestinationPath {
    let filename = validated.filename();

    let path = match placement_for(validated.parsed().doctype) {
        Placement::Project(category) => {
            format!("{}/{}/{}", project_dir(validated.project()), category, filename)
        }
        Placement::Metadata => format!("{}/{}", METADATA_DIR, filename),
    };

    DestinationPath(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::registry::{InMemoryRegistry, ProjectStore};
    use crate::validator::validate;

    fn resolve_raw(raw: &str) -> DestinationPath {
        let store = InMemoryRegistry::new();
        store.register("WAT01", "river-sampling-2024").unwrap();
        store.register("CHM03", "groundwater-analysis").unwrap();
        let validated = validate(parse(raw).unwrap(), &store).unwrap();
        resolve(&validated)
    }

    #[test]
    fn test_resolve_data_to_raw() {
        assert_eq!(
            resolve_raw("20240315_WAT01_DATA_ph-measurements.xlsx").as_str(),
            "01_projects/WAT01_river-sampling-2024/raw/20240315_WAT01_DATA_ph-measurements.xlsx"
        );
    }

    #[test]
    fn test_resolve_report_with_bare_year() {
        assert_eq!(
            resolve_raw("2023_CHM03_RPRT_annual-summary.pdf").as_str(),
            "01_projects/CHM03_groundwater-analysis/raw/2023_CHM03_RPRT_annual-summary.pdf"
        );
    }

    #[test]
    fn test_resolve_every_doctype() {
        let cases = [
            ("SAMP", "01_projects/WAT01_river-sampling-2024/samples/"),
            ("CORR", "01_projects/WAT01_river-sampling-2024/correspondence/"),
            ("CERT", "01_projects/WAT01_river-sampling-2024/raw/"),
            ("MISC", "01_projects/WAT01_river-sampling-2024/raw/"),
            ("META", "metadata/"),
        ];

        for (doctype, prefix) in cases {
            let raw = format!("2024_WAT01_{}_notes.txt", doctype);
            let dest = resolve_raw(&raw);
            assert_eq!(dest.as_str(), format!("{}{}", prefix, raw));
        }
    }

    #[test]
    fn test_nothing_resolves_into_extracted() {
        for doctype in DocType::ALL {
            assert_ne!(placement_for(doctype), Placement::Project(Category::Extracted));
        }
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let store = InMemoryRegistry::new();
        store.register("WAT01", "river-sampling-2024").unwrap();
        let validated = validate(parse("20240315_WAT01_DATA_ph-measurements.xlsx").unwrap(), &store).unwrap();

        assert_eq!(resolve(&validated), resolve(&validated));
    }

    #[test]
    fn test_destination_to_path() {
        let dest = resolve_raw("2024_WAT01_CORR_email.msg");
        let path = dest.to_path(Path::new("/data"));
        assert_eq!(
            path,
            Path::new("/data")
                .join("01_projects")
                .join("WAT01_river-sampling-2024")
                .join("correspondence")
                .join("2024_WAT01_CORR_email.msg")
        );
    }
}
