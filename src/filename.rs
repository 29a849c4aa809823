// 🏷️ Filename Model - the naming grammar as types
//
// {date}_{code}_{doctype}_{description}.{ext}
//   20240315_WAT01_DATA_ph-measurements.xlsx
//   2023_CHM03_RPRT_annual-summary.pdf

use crate::project::ProjectCode;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// FILE DATE
// ============================================================================

/// Date prefix of a filename
///
/// A bare year is a valid, first-class precision - not a truncated date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "precision", rename_all = "lowercase")]
pub enum FileDate {
    /// `YYYYMMDD`
    Full { date: NaiveDate },

    /// `YYYY`
    Year { year: i32 },
}

impl FileDate {
    pub fn full(date: NaiveDate) -> Self {
        FileDate::Full { date }
    }

    pub fn year_only(year: i32) -> Self {
        FileDate::Year { year }
    }

    /// Year component, whatever the precision
    pub fn year(&self) -> i32 {
        match self {
            FileDate::Full { date } => date.year(),
            FileDate::Year { year } => *year,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, FileDate::Full { .. })
    }
}

impl fmt::Display for FileDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileDate::Full { date } => write!(f, "{}", date.format("%Y%m%d")),
            FileDate::Year { year } => write!(f, "{:04}", year),
        }
    }
}

// ============================================================================
// DOC TYPE
// ============================================================================

/// DocType - closed set of document purposes
///
/// Matching is case-sensitive and exact. Nothing is ever mapped to the
/// "nearest" member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocType {
    /// Measurement data (lab exports, logger dumps)
    Data,

    /// Sample logs and chain-of-custody sheets
    Samp,

    /// Reports
    Rprt,

    /// Correspondence (emails, letters)
    Corr,

    /// Certificates and accreditations
    Cert,

    /// Metadata about the dataset itself
    Meta,

    /// Anything else
    Misc,
}

impl DocType {
    pub const ALL: [DocType; 7] = [
        DocType::Data,
        DocType::Samp,
        DocType::Rprt,
        DocType::Corr,
        DocType::Cert,
        DocType::Meta,
        DocType::Misc,
    ];

    /// Tag as written in filenames
    pub fn code(&self) -> &'static str {
        match self {
            DocType::Data => "DATA",
            DocType::Samp => "SAMP",
            DocType::Rprt => "RPRT",
            DocType::Corr => "CORR",
            DocType::Cert => "CERT",
            DocType::Meta => "META",
            DocType::Misc => "MISC",
        }
    }

    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            DocType::Data => "Data",
            DocType::Samp => "Samples",
            DocType::Rprt => "Report",
            DocType::Corr => "Correspondence",
            DocType::Cert => "Certificate",
            DocType::Meta => "Metadata",
            DocType::Misc => "Miscellaneous",
        }
    }

    /// Exact, case-sensitive lookup
    pub fn from_code(raw: &str) -> Option<Self> {
        DocType::ALL.into_iter().find(|d| d.code() == raw)
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// PARSED FILENAME
// ============================================================================

/// Structured form of a conventional filename
///
/// `Display` re-assembles the canonical filename; re-parsing it yields an
/// equal value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFilename {
    pub date: FileDate,
    pub code: ProjectCode,
    pub doctype: DocType,
    pub description: String,
    pub extension: String,
}

impl ParsedFilename {
    /// Filename without the extension (`20240315_WAT01_DATA_ph-measurements`)
    pub fn stem(&self) -> String {
        format!("{}_{}_{}_{}", self.date, self.code, self.doctype, self.description)
    }
}

impl fmt::Display for ParsedFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.stem(), self.extension)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_date_display() {
        let full = FileDate::full(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(full.to_string(), "20240305");
        assert_eq!(full.year(), 2024);
        assert!(full.is_full());

        let year = FileDate::year_only(2023);
        assert_eq!(year.to_string(), "2023");
        assert_eq!(year.year(), 2023);
        assert!(!year.is_full());
    }

    #[test]
    fn test_doctype_codes_round_trip() {
        for doctype in DocType::ALL {
            assert_eq!(DocType::from_code(doctype.code()), Some(doctype));
        }
    }

    #[test]
    fn test_doctype_is_case_sensitive() {
        assert_eq!(DocType::from_code("data"), None);
        assert_eq!(DocType::from_code("Data"), None);
        assert_eq!(DocType::from_code("DATAS"), None);
        assert_eq!(DocType::from_code("REPORT"), None);
    }

    #[test]
    fn test_parsed_filename_display() {
        let parsed = ParsedFilename {
            date: FileDate::full(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()),
            code: ProjectCode::parse("WAT01").unwrap(),
            doctype: DocType::Data,
            description: "ph-measurements".to_string(),
            extension: "xlsx".to_string(),
        };

        assert_eq!(parsed.stem(), "20240315_WAT01_DATA_ph-measurements");
        assert_eq!(parsed.to_string(), "20240315_WAT01_DATA_ph-measurements.xlsx");
    }

    #[test]
    fn test_doctype_serializes_as_tag() {
        assert_eq!(serde_json::to_string(&DocType::Rprt).unwrap(), "\"RPRT\"");
    }
}
