// 📁 Project Entity - Code identity + registry values
//
// "The code is IDENTITY (never reused), the status is a VALUE (can flip)"
//
// Problem solved:
// - WAT01 always means the same project, even after it is archived
// - Folder names are derived, never typed by hand
// - Names can't carry commas, so projects.csv never needs quoting

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}[0-9]{2}$").expect("static regex"));

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$").expect("static regex")
});

// ============================================================================
// PROJECT CODE
// ============================================================================

/// Project code - 3 uppercase letters + 2 digits (e.g. `WAT01`)
///
/// Write-once identity. Only constructible through [`ProjectCode::parse`],
/// so every value in the system is grammar-valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectCode(String);

impl ProjectCode {
    /// Parse a code, returning `None` when it doesn't match the grammar
    pub fn parse(raw: &str) -> Option<Self> {
        if CODE_PATTERN.is_match(raw) {
            Some(ProjectCode(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Three-letter prefix (`WAT` in `WAT01`)
    pub fn prefix(&self) -> &str {
        &self.0[..3]
    }

    /// Two-digit sequence number (`1` in `WAT01`)
    pub fn number(&self) -> u8 {
        self.0[3..].parse().unwrap_or(0)
    }
}

impl fmt::Display for ProjectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProjectCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectCode::parse(s).ok_or_else(|| format!("invalid project code: {:?}", s))
    }
}

impl TryFrom<String> for ProjectCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProjectCode> for String {
    fn from(code: ProjectCode) -> Self {
        code.0
    }
}

// ============================================================================
// PROJECT NAME
// ============================================================================

/// Lowercase-hyphenated project name (`river-sampling-2024`)
///
/// Letters, digits and hyphens only; no leading or trailing hyphen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectName(String);

impl ProjectName {
    pub fn parse(raw: &str) -> Option<Self> {
        if NAME_PATTERN.is_match(raw) {
            Some(ProjectName(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProjectName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ProjectName::parse(&value).ok_or_else(|| format!("invalid project name: {:?}", value))
    }
}

impl From<ProjectName> for String {
    fn from(name: ProjectName) -> Self {
        name.0
    }
}

// ============================================================================
// PROJECT STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    /// Accepting new files
    Active,

    /// Retired - code stays reserved, historical files stay in place
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Archived => "archived",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(ProjectStatus::Active),
            "archived" => Some(ProjectStatus::Archived),
            _ => None,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PROJECT ENTRY
// ============================================================================

/// One row of the registry (`code,name,status`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub code: ProjectCode,
    pub name: ProjectName,
    pub status: ProjectStatus,
}

impl ProjectEntry {
    /// New projects always start active
    pub fn new(code: ProjectCode, name: ProjectName) -> Self {
        ProjectEntry {
            code,
            name,
            status: ProjectStatus::Active,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.status == ProjectStatus::Archived
    }

    /// Folder name under `01_projects/` (`WAT01_river-sampling-2024`)
    pub fn folder_name(&self) -> String {
        format!("{}_{}", self.code, self.name)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_accepts_grammar() {
        let code = ProjectCode::parse("WAT01").unwrap();
        assert_eq!(code.as_str(), "WAT01");
        assert_eq!(code.prefix(), "WAT");
        assert_eq!(code.number(), 1);
    }

    #[test]
    fn test_code_rejects_bad_shapes() {
        for raw in ["wat01", "WA01", "WATR01", "WAT1", "WAT001", "WAT0A", "", " WAT01", "ÅAT01"] {
            assert!(ProjectCode::parse(raw).is_none(), "{:?} should be rejected", raw);
        }
    }

    #[test]
    fn test_code_ordering_is_lexicographic() {
        let mut codes = vec![
            ProjectCode::parse("WAT02").unwrap(),
            ProjectCode::parse("CHM03").unwrap(),
            ProjectCode::parse("WAT01").unwrap(),
        ];
        codes.sort();
        let sorted: Vec<&str> = codes.iter().map(|c| c.as_str()).collect();
        assert_eq!(sorted, vec!["CHM03", "WAT01", "WAT02"]);
    }

    #[test]
    fn test_name_grammar() {
        assert!(ProjectName::parse("river-sampling-2024").is_some());
        assert!(ProjectName::parse("a").is_some());
        assert!(ProjectName::parse("double--hyphen").is_some());

        assert!(ProjectName::parse("").is_none());
        assert!(ProjectName::parse("-leading").is_none());
        assert!(ProjectName::parse("trailing-").is_none());
        assert!(ProjectName::parse("Upper-Case").is_none());
        assert!(ProjectName::parse("has space").is_none());
        assert!(ProjectName::parse("has,comma").is_none());
        assert!(ProjectName::parse("under_score").is_none());
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!(ProjectStatus::parse("active"), Some(ProjectStatus::Active));
        assert_eq!(ProjectStatus::parse("archived"), Some(ProjectStatus::Archived));
        assert_eq!(ProjectStatus::parse("Active"), None);
        assert_eq!(ProjectStatus::Archived.to_string(), "archived");
    }

    #[test]
    fn test_entry_folder_name() {
        let entry = ProjectEntry::new(
            ProjectCode::parse("WAT01").unwrap(),
            ProjectName::parse("river-sampling-2024").unwrap(),
        );
        assert_eq!(entry.folder_name(), "WAT01_river-sampling-2024");
        assert!(!entry.is_archived());
    }

    #[test]
    fn test_code_serde_rejects_invalid() {
        let ok: Result<ProjectCode, _> = serde_json::from_str("\"CHM03\"");
        assert!(ok.is_ok());
        let bad: Result<ProjectCode, _> = serde_json::from_str("\"chm03\"");
        assert!(bad.is_err());
    }
}
