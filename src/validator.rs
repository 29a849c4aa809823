// 📐 Validator - semantic checks on a structurally valid filename
//
// Parse answers "is it shaped right?", validation answers "does it make sense
// here?". Checks short-circuit in a fixed order and nothing is ever coerced:
//   1. project exists in the registry
//   2. project is not archived (unless policy allows)
//   3. year is plausible: [1900, current year + 1]
//   4. description doesn't mimic a derived `_extracted.csv` name (unless policy allows)

use crate::filename::ParsedFilename;
use crate::project::{ProjectCode, ProjectEntry};
use crate::registry::{ProjectStore, RegistryError};
use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Earliest year accepted in a filename date
pub const MIN_YEAR: i32 = 1900;

/// Suffix produced by the extracted-file namer
pub const EXTRACTED_SUFFIX: &str = "_extracted";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationError {
    #[error("project {code} is not registered")]
    UnknownProject { code: String },

    #[error("project {code} is archived and not accepting new files")]
    ArchivedProject { code: String },

    #[error("year {year} is outside the plausible range {min}..={max}")]
    ImplausibleDate { year: i32, min: i32, max: i32 },

    #[error("description {description:?} collides with derived extracted-file names")]
    ReservedDescription { description: String },

    #[error("registry lookup failed: {message}")]
    Registry { message: String },
}

impl ValidationError {
    /// Stable label for reports and the intake index
    pub fn label(&self) -> &'static str {
        match self {
            ValidationError::UnknownProject { .. } => "UNKNOWN_PROJECT",
            ValidationError::ArchivedProject { .. } => "ARCHIVED_PROJECT",
            ValidationError::ImplausibleDate { .. } => "IMPLAUSIBLE_DATE",
            ValidationError::ReservedDescription { .. } => "RESERVED_DESCRIPTION",
            ValidationError::Registry { .. } => "REGISTRY_ERROR",
        }
    }

    /// Filename field the error points at
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::UnknownProject { .. }
            | ValidationError::ArchivedProject { .. }
            | ValidationError::Registry { .. } => "code",
            ValidationError::ImplausibleDate { .. } => "date",
            ValidationError::ReservedDescription { .. } => "description",
        }
    }
}

// ============================================================================
// POLICY
// ============================================================================

/// Validation policy (`metadata/policy.json`)
///
/// Missing keys fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Accept new files for archived projects
    pub allow_archived_intake: bool,

    /// Accept `*_extracted.csv` as a raw filename
    pub allow_extracted_suffix: bool,

    /// Pin "current year" (tests, reproducible batch runs); local clock otherwise
    pub reference_year: Option<i32>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        ValidationPolicy {
            allow_archived_intake: false,
            allow_extracted_suffix: false,
            reference_year: None,
        }
    }
}

impl ValidationPolicy {
    pub fn current_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(|| Local::now().year())
    }
}

// ============================================================================
// VALIDATED FILENAME
// ============================================================================

/// A filename that passed every check, paired with its project
///
/// Fields are private: the only way to get one is [`Validator::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedFilename {
    parsed: ParsedFilename,
    project: ProjectEntry,
}

impl ValidatedFilename {
    pub fn parsed(&self) -> &ParsedFilename {
        &self.parsed
    }

    pub fn project(&self) -> &ProjectEntry {
        &self.project
    }

    /// Canonical (and, since the parser is strict, original) filename
    pub fn filename(&self) -> String {
        self.parsed.to_string()
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Validator {
    policy: ValidationPolicy,
}

impl Validator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Validator { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Validate a parsed filename against the registry
    pub fn validate(
        &self,
        parsed: ParsedFilename,
        store: &dyn ProjectStore,
    ) -> Result<ValidatedFilename, ValidationError> {
        let project = self.check_project(&parsed.code, store)?;
        self.check_date(&parsed)?;
        self.check_description(&parsed)?;

        debug!(filename = %parsed, project = %project.folder_name(), "validated filename");
        Ok(ValidatedFilename { parsed, project })
    }

    fn check_project(&self, code: &ProjectCode, store: &dyn ProjectStore) -> Result<ProjectEntry, ValidationError> {
        let project = store.lookup(code).map_err(|e| match e {
            RegistryError::NotFound(_) => ValidationError::UnknownProject {
                code: code.to_string(),
            },
            other => ValidationError::Registry {
                message: other.to_string(),
            },
        })?;

        if project.is_archived() && !self.policy.allow_archived_intake {
            return Err(ValidationError::ArchivedProject {
                code: code.to_string(),
            });
        }

        Ok(project)
    }

    fn check_date(&self, parsed: &ParsedFilename) -> Result<(), ValidationError> {
        let year = parsed.date.year();
        let max = self.policy.current_year() + 1;

        if year < MIN_YEAR || year > max {
            return Err(ValidationError::ImplausibleDate {
                year,
                min: MIN_YEAR,
                max,
            });
        }
        Ok(())
    }

    fn check_description(&self, parsed: &ParsedFilename) -> Result<(), ValidationError> {
        if self.policy.allow_extracted_suffix {
            return Ok(());
        }

        if parsed.description.ends_with(EXTRACTED_SUFFIX) && parsed.extension.eq_ignore_ascii_case("csv") {
            return Err(ValidationError::ReservedDescription {
                description: parsed.description.clone(),
            });
        }
        Ok(())
    }
}

/// Validate with the default policy
pub fn validate(parsed: ParsedFilename, store: &dyn ProjectStore) -> Result<ValidatedFilename, ValidationError> {
    Validator::default().validate(parsed, store)
}

// ============================================================================
// TESTS
// ============================================================================
