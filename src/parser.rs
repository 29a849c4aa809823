// 🏗️ Filename Parser
// Raw filename → ParsedFilename, positionally and left-to-right
//
// The first three `_` separate date, code and doctype. Everything after the
// third `_` up to the LAST `.` is the description (underscores included),
// and what follows the last `.` is the extension.

use crate::filename::{DocType, FileDate, ParsedFilename};
use crate::project::ProjectCode;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// What was wrong with the filename's structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseErrorKind {
    /// Fewer than four `_`-delimited fields
    MissingFields,
    /// Date field is neither `YYYYMMDD` nor `YYYY`
    BadDate,
    /// Code field is not 3 uppercase letters + 2 digits
    BadCode,
    /// Doctype field is not an exact enumeration member
    UnknownDoctype,
    /// Nothing between the doctype and the extension
    EmptyDescription,
    /// Description contains `/` or `\`
    PathSeparator,
    /// No `.ext` suffix
    MissingExtension,
    /// Extension contains non-alphanumeric characters
    BadExtension,
    /// Name on disk is not valid UTF-8 (only reachable from inbox scans)
    InvalidEncoding,
}

impl ParseErrorKind {
    /// Stable label for reports and the intake index
    pub fn label(&self) -> &'static str {
        match self {
            ParseErrorKind::MissingFields => "MISSING_FIELDS",
            ParseErrorKind::BadDate => "BAD_DATE",
            ParseErrorKind::BadCode => "BAD_CODE",
            ParseErrorKind::UnknownDoctype => "UNKNOWN_DOCTYPE",
            ParseErrorKind::EmptyDescription => "EMPTY_DESCRIPTION",
            ParseErrorKind::PathSeparator => "PATH_SEPARATOR",
            ParseErrorKind::MissingExtension => "MISSING_EXTENSION",
            ParseErrorKind::BadExtension => "BAD_EXTENSION",
            ParseErrorKind::InvalidEncoding => "INVALID_ENCODING",
        }
    }

    /// Grammar field the error points at
    pub fn field(&self) -> &'static str {
        match self {
            ParseErrorKind::MissingFields | ParseErrorKind::InvalidEncoding => "filename",
            ParseErrorKind::BadDate => "date",
            ParseErrorKind::BadCode => "code",
            ParseErrorKind::UnknownDoctype => "doctype",
            ParseErrorKind::EmptyDescription | ParseErrorKind::PathSeparator => "description",
            ParseErrorKind::MissingExtension | ParseErrorKind::BadExtension => "extension",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Structural failure, with the byte offset of the offending field
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind} in {} at byte {position}: {detail}", .kind.field())]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub position: usize,
    pub detail: String,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, position: usize, detail: impl Into<String>) -> Self {
        ParseError {
            kind,
            position,
            detail: detail.into(),
        }
    }
}

// ============================================================================
// PARSER
// ============================================================================

/// Parse a raw filename against the naming grammar
///
/// # Examples:
/// ```
/// use ecodata_filing::parse;
///
/// let parsed = parse("20240315_WAT01_DATA_ph-measurements.xlsx").unwrap();
/// assert_eq!(parsed.code.as_str(), "WAT01");
/// assert_eq!(parsed.extension, "xlsx");
///
/// assert!(parse("badname.xlsx").is_err());
/// ```
pub fn parse(raw: &str) -> Result<ParsedFilename, ParseError> {
    let [(date_at, date_raw), (code_at, code_raw), (doctype_at, doctype_raw), (tail_at, tail)] =
        split_fields(raw)?;

    let date = parse_date(date_raw)
        .ok_or_else(|| ParseError::new(ParseErrorKind::BadDate, date_at, format!("{:?} is not YYYYMMDD or YYYY", date_raw)))?;

    let code = ProjectCode::parse(code_raw).ok_or_else(|| {
        ParseError::new(
            ParseErrorKind::BadCode,
            code_at,
            format!("{:?} is not 3 uppercase letters + 2 digits", code_raw),
        )
    })?;

    let doctype = DocType::from_code(doctype_raw).ok_or_else(|| {
        ParseError::new(
            ParseErrorKind::UnknownDoctype,
            doctype_at,
            format!("{:?} is not one of DATA, SAMP, RPRT, CORR, CERT, META, MISC", doctype_raw),
        )
    })?;

    let (description, extension) = split_extension(tail, tail_at)?;

    Ok(ParsedFilename {
        date,
        code,
        doctype,
        description: description.to_string(),
        extension: extension.to_string(),
    })
}

/// Split into date, code, doctype and the trailing description+extension
fn split_fields(raw: &str) -> Result<[(usize, &str); 4], ParseError> {
    let mut fields = [(0, ""); 4];
    let mut start = 0;

    for (index, slot) in fields.iter_mut().take(3).enumerate() {
        let Some(offset) = raw[start..].find('_') else {
            return Err(ParseError::new(
                ParseErrorKind::MissingFields,
                raw.len(),
                format!(
                    "expected {{date}}_{{code}}_{{doctype}}_{{description}}.{{ext}}, found {} field(s)",
                    index + 1
                ),
            ));
        };
        *slot = (start, &raw[start..start + offset]);
        start += offset + 1;
    }

    fields[3] = (start, &raw[start..]);
    Ok(fields)
}

fn parse_date(raw: &str) -> Option<FileDate> {
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    match raw.len() {
        8 => {
            let year: i32 = raw[0..4].parse().ok()?;
            let month: u32 = raw[4..6].parse().ok()?;
            let day: u32 = raw[6..8].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day).map(FileDate::full)
        }
        4 => raw.parse().ok().map(FileDate::year_only),
        _ => None,
    }
}

/// Split `description.ext` on the last `.`
fn split_extension(tail: &str, tail_at: usize) -> Result<(&str, &str), ParseError> {
    let Some((description, extension)) = tail.rsplit_once('.') else {
        if tail.is_empty() {
            return Err(ParseError::new(ParseErrorKind::EmptyDescription, tail_at, "description is empty"));
        }
        return Err(ParseError::new(
            ParseErrorKind::MissingExtension,
            tail_at + tail.len(),
            format!("{:?} has no .extension", tail),
        ));
    };

    if description.is_empty() {
        return Err(ParseError::new(ParseErrorKind::EmptyDescription, tail_at, "description is empty"));
    }

    if let Some(offset) = description.find(['/', '\\']) {
        return Err(ParseError::new(
            ParseErrorKind::PathSeparator,
            tail_at + offset,
            "description must not contain path separators",
        ));
    }

    let ext_at = tail_at + description.len() + 1;
    if extension.is_empty() {
        return Err(ParseError::new(ParseErrorKind::MissingExtension, ext_at, "extension is empty"));
    }

    if !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ParseError::new(
            ParseErrorKind::BadExtension,
            ext_at,
            format!("{:?} must be ASCII letters and digits", extension),
        ));
    }

    Ok((description, extension))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(raw: &str) -> ParseErrorKind {
        parse(raw).unwrap_err().kind
    }

    #[test]
    fn test_parse_full_date_example() {
        let parsed = parse("20240315_WAT01_DATA_ph-measurements.xlsx").unwrap();

        assert_eq!(parsed.date, FileDate::full(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()));
        assert_eq!(parsed.code.as_str(), "WAT01");
        assert_eq!(parsed.doctype, DocType::Data);
        assert_eq!(parsed.description, "ph-measurements");
        assert_eq!(parsed.extension, "xlsx");
    }

    #[test]
    fn test_parse_bare_year_example() {
        let parsed = parse("2023_CHM03_RPRT_annual-summary.pdf").unwrap();

        assert_eq!(parsed.date, FileDate::year_only(2023));
        assert_eq!(parsed.doctype, DocType::Rprt);
        assert_eq!(parsed.description, "annual-summary");
    }

    #[test]
    fn test_description_keeps_underscores_and_dots() {
        let parsed = parse("20240401_WAT01_CORR_lab_results_v1.2.pdf").unwrap();
        assert_eq!(parsed.description, "lab_results_v1.2");
        assert_eq!(parsed.extension, "pdf");
    }

    #[test]
    fn test_missing_fields() {
        let err = parse("badname.xlsx").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingFields);
        assert_eq!(err.kind.field(), "filename");

        assert_eq!(kind_of(""), ParseErrorKind::MissingFields);
        assert_eq!(kind_of("20240315_WAT01_DATA.xlsx"), ParseErrorKind::MissingFields);
    }

    #[test]
    fn test_bad_date() {
        assert_eq!(kind_of("2024315_WAT01_DATA_x.csv"), ParseErrorKind::BadDate);
        assert_eq!(kind_of("2024-03-15_WAT01_DATA_x.csv"), ParseErrorKind::BadDate);
        assert_eq!(kind_of("20241340_WAT01_DATA_x.csv"), ParseErrorKind::BadDate);
        assert_eq!(kind_of("20230229_WAT01_DATA_x.csv"), ParseErrorKind::BadDate);
        assert_eq!(kind_of("_WAT01_DATA_x.csv"), ParseErrorKind::BadDate);
        assert_eq!(kind_of("２０２４_WAT01_DATA_x.csv"), ParseErrorKind::BadDate);

        assert!(parse("20240229_WAT01_DATA_x.csv").is_ok());
    }

    #[test]
    fn test_bad_code_position() {
        let err = parse("20240315_wat01_DATA_x.csv").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::BadCode);
        assert_eq!(err.position, 9);
    }

    #[test]
    fn test_unknown_doctype_is_never_coerced() {
        let err = parse("20240315_WAT01_DTAA_x.csv").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnknownDoctype);
        assert_eq!(err.position, 15);

        assert_eq!(kind_of("20240315_WAT01_data_x.csv"), ParseErrorKind::UnknownDoctype);
    }

    #[test]
    fn test_empty_description() {
        assert_eq!(kind_of("20240315_WAT01_DATA_.xlsx"), ParseErrorKind::EmptyDescription);
        assert_eq!(kind_of("20240315_WAT01_DATA_"), ParseErrorKind::EmptyDescription);
    }

    #[test]
    fn test_path_separator_rejected() {
        let err = parse("20240315_WAT01_DATA_../../etc.csv").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::PathSeparator);
        assert_eq!(kind_of("20240315_WAT01_DATA_a\\b.csv"), ParseErrorKind::PathSeparator);
    }

    #[test]
    fn test_extension_errors() {
        let err = parse("20240315_WAT01_DATA_ph-measurements").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingExtension);
        assert_eq!(err.position, "20240315_WAT01_DATA_ph-measurements".len());

        assert_eq!(kind_of("20240315_WAT01_DATA_ph."), ParseErrorKind::MissingExtension);
        assert_eq!(kind_of("20240315_WAT01_DATA_ph.tar-gz"), ParseErrorKind::BadExtension);
    }

    #[test]
    fn test_errors_reported_left_to_right() {
        // Bad date wins over bad code, bad code wins over bad doctype
        assert_eq!(kind_of("24_wat_XXXX_.x"), ParseErrorKind::BadDate);
        assert_eq!(kind_of("24_wat_XXXX_.x").field(), "date");
        assert_eq!(kind_of("2024_wat_XXXX_.x"), ParseErrorKind::BadCode);
        assert_eq!(kind_of("2024_WAT01_XXXX_"), ParseErrorKind::UnknownDoctype);
    }

    #[test]
    fn test_parse_is_fixed_point_under_canonical_formatting() {
        let samples = [
            "20240315_WAT01_DATA_ph-measurements.xlsx",
            "2023_CHM03_RPRT_annual-summary.pdf",
            "19991231_ABC12_MISC_odd_name with spaces.txt",
            "2025_XYZ00_META_schema.v2.json",
            "20000101_QQQ99_CERT_iso-17025.PDF",
        ];

        for raw in samples {
            let parsed = parse(raw).unwrap();
            let canonical = parsed.to_string();
            assert_eq!(canonical, raw);
            assert_eq!(parse(&canonical).unwrap(), parsed);
        }
    }

    #[test]
    fn test_error_display_mentions_field_and_position() {
        let err = parse("20240315_WAT1_DATA_x.csv").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("BAD_CODE"));
        assert!(message.contains("code"));
        assert!(message.contains("byte 9"));
    }
}
