// 🔎 Classifier - parse → validate → resolve for one filename
//
// The single entry point intake tools call per file. Parse and validation
// failures stay distinct kinds so reports can say which stage rejected it.

use crate::filename::ParsedFilename;
use crate::parser::{parse, ParseError};
use crate::registry::ProjectStore;
use crate::resolver::{resolve, DestinationPath};
use crate::validator::{ValidatedFilename, ValidationError, Validator};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "stage", content = "error", rename_all = "lowercase")]
pub enum ClassifyError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl ClassifyError {
    /// Stable error kind label (`BAD_CODE`, `UNKNOWN_PROJECT`, ...)
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifyError::Parse(e) => e.kind.label(),
            ClassifyError::Validation(e) => e.label(),
        }
    }

    /// Filename field the error points at
    pub fn field(&self) -> &'static str {
        match self {
            ClassifyError::Parse(e) => e.kind.field(),
            ClassifyError::Validation(e) => e.field(),
        }
    }

    /// Byte offset of the offending field (parse errors only)
    pub fn position(&self) -> Option<usize> {
        match self {
            ClassifyError::Parse(e) => Some(e.position),
            ClassifyError::Validation(_) => None,
        }
    }

    /// Human-readable detail without the stage prefix
    pub fn detail(&self) -> String {
        match self {
            ClassifyError::Parse(e) => e.detail.clone(),
            ClassifyError::Validation(e) => e.to_string(),
        }
    }
}

/// Successful classification of one filename
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub validated: ValidatedFilename,
    pub destination: DestinationPath,
}

impl Classification {
    pub fn parsed(&self) -> &ParsedFilename {
        self.validated.parsed()
    }
}

/// Classify one raw filename
pub fn classify(
    raw: &str,
    store: &dyn ProjectStore,
    validator: &Validator,
) -> Result<Classification, ClassifyError> {
    let parsed = parse(raw)?;
    let validated = validator.validate(parsed, store)?;
    let destination = resolve(&validated);

    debug!(filename = raw, destination = %destination, "classified");
    Ok(Classification {
        validated,
        destination,
    })
}
