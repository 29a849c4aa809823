// 📥 Intake - inbox batch: scan → classify → plan → apply → index
//
// One bad filename never aborts the batch: every inbox file gets its own
// outcome. Nothing is ever overwritten. A destination that already holds the
// same bytes (SHA-256) is "already placed", which makes re-runs safe.

use crate::classify::{classify, ClassifyError};
use crate::parser::{parse, ParseError, ParseErrorKind};
use crate::registry::ProjectStore;
use crate::resolver::DestinationPath;
use crate::validator::Validator;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// INBOX SCAN
// ============================================================================

/// A file found in `00_inbox/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboxFile {
    /// Path relative to the inbox, forward-slash normalized
    pub relative_path: String,
    /// Absolute (or root-relative) path on disk
    #[serde(skip)]
    pub path: PathBuf,
    pub filename: String,
    /// Lowercased extension without the dot ("" if none)
    pub extension: String,
    pub size_bytes: u64,
}

/// Recursively list inbox files, skipping hidden files and folders
///
/// A missing inbox is an empty inbox.
pub fn scan_inbox(inbox: &Path) -> Result<Vec<InboxFile>> {
    let mut files = Vec::new();
    if !inbox.is_dir() {
        debug!(inbox = %inbox.display(), "inbox not found");
        return Ok(files);
    }

    collect_files(inbox, inbox, &mut files)?;
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    info!(inbox = %inbox.display(), files = files.len(), "scanned inbox");
    Ok(files)
}

fn collect_files(base: &Path, dir: &Path, out: &mut Vec<InboxFile>) -> Result<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in: {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("Failed to stat: {}", path.display()))?;

        if file_type.is_dir() {
            collect_files(base, &path, out)?;
        } else if file_type.is_file() {
            let size_bytes = entry
                .metadata()
                .with_context(|| format!("Failed to stat: {}", path.display()))?
                .len();
            let relative_path = path
                .strip_prefix(base)
                .map(normalize_path)
                .unwrap_or_else(|_| normalize_path(&path));
            let extension = Path::new(&name)
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();

            out.push(InboxFile {
                relative_path,
                path,
                filename: name,
                extension,
                size_bytes,
            });
        }
    }

    Ok(())
}

fn normalize_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// PLAN
// ============================================================================

/// What intake will do (or refuses to do) with one inbox file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IntakeOutcome {
    /// Destination is free
    Ready { destination: DestinationPath },

    /// Destination already holds identical content
    AlreadyPlaced { destination: DestinationPath },

    /// Destination is contested or occupied by different content
    Collision { destination: DestinationPath, reason: String },

    /// Filename failed parsing or validation
    Rejected { error: ClassifyError },
}

impl IntakeOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            IntakeOutcome::Ready { .. } => "ready",
            IntakeOutcome::AlreadyPlaced { .. } => "already_placed",
            IntakeOutcome::Collision { .. } => "collision",
            IntakeOutcome::Rejected { .. } => "rejected",
        }
    }

    pub fn destination(&self) -> Option<&DestinationPath> {
        match self {
            IntakeOutcome::Ready { destination }
            | IntakeOutcome::AlreadyPlaced { destination }
            | IntakeOutcome::Collision { destination, .. } => Some(destination),
            IntakeOutcome::Rejected { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ClassifyError> {
        match self {
            IntakeOutcome::Rejected { error } => Some(error),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, IntakeOutcome::Ready { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntakeRecord {
    pub file: InboxFile,
    /// Project code, when the filename parsed far enough to have one
    pub project_code: Option<String>,
    pub outcome: IntakeOutcome,
}

/// Outcome of classifying a whole inbox
#[derive(Debug, Clone, Serialize)]
pub struct IntakePlan {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub records: Vec<IntakeRecord>,
}

impl IntakePlan {
    pub fn ready(&self) -> impl Iterator<Item = &IntakeRecord> {
        self.records.iter().filter(|r| r.outcome.is_ready())
    }

    pub fn summary(&self) -> IntakeSummary {
        let mut summary = IntakeSummary {
            total: self.records.len(),
            ..IntakeSummary::default()
        };

        for record in &self.records {
            match &record.outcome {
                IntakeOutcome::Ready { .. } => summary.ready += 1,
                IntakeOutcome::AlreadyPlaced { .. } => summary.already_placed += 1,
                IntakeOutcome::Collision { .. } => summary.collisions += 1,
                IntakeOutcome::Rejected { error } => {
                    summary.rejected += 1;
                    *summary.errors_by_kind.entry(error.kind().to_string()).or_insert(0) += 1;
                }
            }
        }

        summary
    }
}

/// Classify every inbox file and detect destination collisions
pub fn plan_intake(
    root: &Path,
    files: Vec<InboxFile>,
    store: &dyn ProjectStore,
    validator: &Validator,
) -> IntakePlan {
    let classified: Vec<_> = files
        .into_iter()
        .map(|file| {
            let result = match encoding_error(&file.path) {
                Some(error) => Err(ClassifyError::from(error)),
                None => classify(&file.filename, store, validator),
            };
            (file, result)
        })
        .collect();

    let mut claims: HashMap<DestinationPath, usize> = HashMap::new();
    for (_, result) in &classified {
        if let Ok(classification) = result {
            *claims.entry(classification.destination.clone()).or_insert(0) += 1;
        }
    }

    let records = classified
        .into_iter()
        .map(|(file, result)| match result {
            Ok(classification) => {
                let project_code = Some(classification.validated.project().code.to_string());
                let destination = classification.destination;
                let claimants = claims.get(&destination).copied().unwrap_or(0);
                let outcome = check_destination(root, &file, destination, claimants);
                IntakeRecord {
                    file,
                    project_code,
                    outcome,
                }
            }
            Err(error) => {
                warn!(file = %file.relative_path, kind = error.kind(), "rejected: {}", error);
                let project_code = parse(&file.filename).ok().map(|p| p.code.to_string());
                IntakeRecord {
                    file,
                    project_code,
                    outcome: IntakeOutcome::Rejected { error },
                }
            }
        })
        .collect();

    IntakePlan {
        run_id: uuid::Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        records,
    }
}

/// A name that isn't valid UTF-8 is rejected instead of being filed under
/// its lossy (U+FFFD) rendering
fn encoding_error(path: &Path) -> Option<ParseError> {
    let name = path.file_name()?;
    if name.to_str().is_some() {
        return None;
    }

    let position = std::str::from_utf8(name.as_encoded_bytes())
        .err()
        .map(|e| e.valid_up_to())
        .unwrap_or(0);
    Some(ParseError::new(
        ParseErrorKind::InvalidEncoding,
        position,
        format!("filename {:?} is not valid UTF-8", name),
    ))
}

fn check_destination(root: &Path, file: &InboxFile, destination: DestinationPath, claimants: usize) -> IntakeOutcome {
    if claimants > 1 {
        warn!(file = %file.relative_path, destination = %destination, claimants, "collision");
        return IntakeOutcome::Collision {
            reason: format!("{} inbox files resolve to {}", claimants, destination),
            destination,
        };
    }

    let target = destination.to_path(root);
    if !target.exists() {
        return IntakeOutcome::Ready { destination };
    }

    if !target.is_file() {
        return IntakeOutcome::Collision {
            reason: "destination exists and is not a regular file".to_string(),
            destination,
        };
    }

    match (sha256_file(&file.path), sha256_file(&target)) {
        (Ok(source), Ok(existing)) if source == existing => IntakeOutcome::AlreadyPlaced { destination },
        (Ok(_), Ok(_)) => {
            warn!(file = %file.relative_path, destination = %destination, "destination holds different content");
            IntakeOutcome::Collision {
                reason: "destination exists with different content".to_string(),
                destination,
            }
        }
        (Err(e), _) | (_, Err(e)) => IntakeOutcome::Collision {
            reason: format!("could not compare contents: {}", e),
            destination,
        },
    }
}

/// SHA-256 hex digest of a file's bytes, streamed
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// APPLY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    /// Leave the inbox untouched (it may be a synced mirror)
    #[default]
    Copy,
    /// Remove the inbox file once placed
    Move,
}

/// Result of applying a plan
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    pub placed: Vec<DestinationPath>,
    /// (inbox path, reason)
    pub failed: Vec<(String, String)>,
}

/// Copy or move every `Ready` file to its destination
///
/// Per-file I/O failures are collected, not propagated.
pub fn apply_plan(root: &Path, plan: &IntakePlan, mode: TransferMode) -> ApplyReport {
    let mut report = ApplyReport::default();

    for record in plan.ready() {
        let Some(destination) = record.outcome.destination() else {
            continue;
        };

        if let Err(e) = place(&record.file.path, &destination.to_path(root)) {
            warn!(file = %record.file.relative_path, destination = %destination, "failed to place: {:#}", e);
            report.failed.push((record.file.relative_path.clone(), format!("{:#}", e)));
            continue;
        }

        info!(file = %record.file.relative_path, destination = %destination, ?mode, "placed");
        report.placed.push(destination.clone());

        // The copy is already in place; a leftover inbox file is only noise
        if mode == TransferMode::Move {
            if let Err(e) = fs::remove_file(&record.file.path) {
                warn!(file = %record.file.relative_path, "placed but could not remove inbox file: {}", e);
            }
        }
    }

    report
}

/// Copy `source` to `target` without ever leaving a partial file behind
///
/// Bytes go to a temp file next to the target, which is then linked into
/// place only if nothing appeared at `target` since planning.
fn place(source: &Path, target: &Path) -> Result<()> {
    let mut input = fs::File::open(source).with_context(|| format!("Failed to open source: {}", source.display()))?;

    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent)
        .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;
    io::copy(&mut input, tmp.as_file_mut()).with_context(|| format!("Failed to copy to: {}", target.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to flush: {}", target.display()))?;

    tmp.persist_noclobber(target)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to create destination: {}", target.display()))?;
    Ok(())
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeSummary {
    pub total: usize,
    pub ready: usize,
    pub already_placed: usize,
    pub collisions: usize,
    pub rejected: usize,
    pub errors_by_kind: BTreeMap<String, usize>,
}

impl IntakeSummary {
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} files: {} ready, {} already placed, {} collisions, {} rejected",
            self.total, self.ready, self.already_placed, self.collisions, self.rejected
        );

        if !self.errors_by_kind.is_empty() {
            let kinds: Vec<String> = self
                .errors_by_kind
                .iter()
                .map(|(kind, count)| format!("{} {}", count, kind))
                .collect();
            line.push_str(&format!(" ({})", kinds.join(", ")));
        }

        line
    }

    pub fn is_clean(&self) -> bool {
        self.collisions == 0 && self.rejected == 0
    }
}

// ============================================================================
// INTAKE INDEX (metadata/inbox_mapping.csv)
// ============================================================================

#[derive(Debug, Serialize)]
struct IndexRow<'a> {
    run_id: &'a str,
    inbox_path: &'a str,
    filename: &'a str,
    extension: &'a str,
    size_bytes: u64,
    status: &'static str,
    project_code: &'a str,
    destination: &'a str,
    error_kind: &'a str,
    error_detail: String,
}

/// Write the intake index, sorted by (project code, inbox path)
pub fn write_index(path: &Path, plan: &IntakePlan) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut records: Vec<&IntakeRecord> = plan.records.iter().collect();
    records.sort_by(|a, b| {
        a.project_code
            .as_deref()
            .unwrap_or("")
            .cmp(b.project_code.as_deref().unwrap_or(""))
            .then_with(|| a.file.relative_path.cmp(&b.file.relative_path))
    });

    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("Failed to create index: {}", path.display()))?;
    for record in &records {
        let (error_kind, error_detail) = match &record.outcome {
            IntakeOutcome::Rejected { error } => (error.kind(), error.detail()),
            IntakeOutcome::Collision { reason, .. } => ("COLLISION", reason.clone()),
            _ => ("", String::new()),
        };

        wtr.serialize(IndexRow {
            run_id: &plan.run_id,
            inbox_path: &record.file.relative_path,
            filename: &record.file.filename,
            extension: &record.file.extension,
            size_bytes: record.file.size_bytes,
            status: record.outcome.label(),
            project_code: record.project_code.as_deref().unwrap_or(""),
            destination: record.outcome.destination().map(|d| d.as_str()).unwrap_or(""),
            error_kind,
            error_detail,
        })
        .context("Failed to write index row")?;
    }
    wtr.flush().context("Failed to flush index")?;

    info!(path = %path.display(), rows = records.len(), "wrote intake index");
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
