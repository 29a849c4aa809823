// 🗂️ Project Registry - authoritative code → project mapping
//
// Codes are write-once: register never overwrites, nothing is ever deleted,
// archiving is a status flip. The registry is passed explicitly to whoever
// needs it (validator, intake, CLI) through the ProjectStore trait.

use crate::project::{ProjectCode, ProjectEntry, ProjectName, ProjectStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, info};

type Entries = BTreeMap<ProjectCode, ProjectEntry>;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("project {0} is not registered")]
    NotFound(String),

    #[error("project code {0} is already registered")]
    AlreadyExists(String),

    #[error("invalid project code {0:?}: expected 3 uppercase letters + 2 digits")]
    InvalidCode(String),

    #[error("invalid project name {0:?}: expected lowercase letters, digits and hyphens")]
    InvalidName(String),

    #[error("{path}:{line}: {reason}")]
    InvalidRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("{path}:{line}: duplicate project code {code}")]
    DuplicateRow {
        path: PathBuf,
        line: usize,
        code: String,
    },

    #[error("failed to access registry file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed registry CSV")]
    Csv(#[from] csv::Error),
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// ProjectStore - the registry contract
///
/// Implementations must make `register` atomic: the "is this code free?"
/// check and the insert happen under one exclusive guard.
pub trait ProjectStore: Send + Sync {
    /// Find a project by code
    fn lookup(&self, code: &ProjectCode) -> Result<ProjectEntry, RegistryError>;

    /// Register a new, active project (write-once)
    fn register(&self, code: &str, name: &str) -> Result<ProjectEntry, RegistryError>;

    /// Flip a project to archived (idempotent)
    fn archive(&self, code: &ProjectCode) -> Result<ProjectEntry, RegistryError>;

    /// All projects, ordered by code ascending
    fn list(&self) -> Vec<ProjectEntry>;
}

// ============================================================================
// IN-MEMORY REGISTRY
// ============================================================================

/// Registry held entirely in memory
///
/// Also the engine behind [`CsvRegistry`]: mutations build the next snapshot,
/// hand it to a persist hook, and only swap it in once the hook succeeds.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    entries: RwLock<Entries>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from existing entries (test fixtures, loaded files)
    pub fn from_entries<I>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = ProjectEntry>,
    {
        let mut map = Entries::new();
        for entry in entries {
            if map.contains_key(&entry.code) {
                return Err(RegistryError::AlreadyExists(entry.code.to_string()));
            }
            map.insert(entry.code.clone(), entry);
        }
        Ok(InMemoryRegistry {
            entries: RwLock::new(map),
        })
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Entries are plain values, so a poisoned lock still holds a usable map.
    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn register_with<F>(&self, code: &str, name: &str, persist: F) -> Result<ProjectEntry, RegistryError>
    where
        F: FnOnce(&Entries) -> Result<(), RegistryError>,
    {
        let code = ProjectCode::parse(code).ok_or_else(|| RegistryError::InvalidCode(code.to_string()))?;
        let name = ProjectName::parse(name).ok_or_else(|| RegistryError::InvalidName(name.to_string()))?;

        let mut guard = self.write();
        if guard.contains_key(&code) {
            return Err(RegistryError::AlreadyExists(code.to_string()));
        }

        let entry = ProjectEntry::new(code.clone(), name);
        let mut next = guard.clone();
        next.insert(code, entry.clone());
        persist(&next)?;
        *guard = next;

        info!(code = %entry.code, name = %entry.name, "registered project");
        Ok(entry)
    }

    fn archive_with<F>(&self, code: &ProjectCode, persist: F) -> Result<ProjectEntry, RegistryError>
    where
        F: FnOnce(&Entries) -> Result<(), RegistryError>,
    {
        let mut guard = self.write();
        let current = guard
            .get(code)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(code.to_string()))?;

        if current.is_archived() {
            debug!(code = %code, "project already archived");
            return Ok(current);
        }

        let mut archived = current;
        archived.status = ProjectStatus::Archived;
        let mut next = guard.clone();
        next.insert(code.clone(), archived.clone());
        persist(&next)?;
        *guard = next;

        info!(code = %code, "archived project");
        Ok(archived)
    }
}

impl ProjectStore for InMemoryRegistry {
    fn lookup(&self, code: &ProjectCode) -> Result<ProjectEntry, RegistryError> {
        self.read()
            .get(code)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(code.to_string()))
    }

    fn register(&self, code: &str, name: &str) -> Result<ProjectEntry, RegistryError> {
        self.register_with(code, name, |_| Ok(()))
    }

    fn archive(&self, code: &ProjectCode) -> Result<ProjectEntry, RegistryError> {
        self.archive_with(code, |_| Ok(()))
    }

    fn list(&self) -> Vec<ProjectEntry> {
        self.read().values().cloned().collect()
    }
}

// ============================================================================
// CSV-BACKED REGISTRY (metadata/projects.csv)
// ============================================================================

/// On-disk row: `code,name,status`
#[derive(Debug, Serialize, Deserialize)]
struct RegistryRow {
    code: String,
    name: String,
    status: String,
}

/// Registry persisted to `metadata/projects.csv`
///
/// Every successful register/archive rewrites the whole file (temp file +
/// rename) while the write guard is held, so the file never lags memory.
#[derive(Debug)]
pub struct CsvRegistry {
    path: PathBuf,
    inner: InMemoryRegistry,
}

impl CsvRegistry {
    /// Load the registry file; a missing file is an empty registry
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let entries = if path.exists() {
            load_rows(&path)?
        } else {
            debug!(path = %path.display(), "registry file not found, starting empty");
            Vec::new()
        };

        info!(path = %path.display(), projects = entries.len(), "loaded registry");
        Ok(CsvRegistry {
            inner: InMemoryRegistry::from_entries(entries)?,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current state to disk (normally done by every mutation)
    pub fn save(&self) -> Result<(), RegistryError> {
        let guard = self.inner.read();
        write_rows(&self.path, &guard)
    }
}

impl ProjectStore for CsvRegistry {
    fn lookup(&self, code: &ProjectCode) -> Result<ProjectEntry, RegistryError> {
        self.inner.lookup(code)
    }

    fn register(&self, code: &str, name: &str) -> Result<ProjectEntry, RegistryError> {
        self.inner
            .register_with(code, name, |next| write_rows(&self.path, next))
    }

    fn archive(&self, code: &ProjectCode) -> Result<ProjectEntry, RegistryError> {
        self.inner.archive_with(code, |next| write_rows(&self.path, next))
    }

    fn list(&self) -> Vec<ProjectEntry> {
        self.inner.list()
    }
}

fn load_rows(path: &Path) -> Result<Vec<ProjectEntry>, RegistryError> {
    let file = std::fs::File::open(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut seen = BTreeMap::new();
    let mut entries = Vec::new();

    for (index, result) in rdr.deserialize::<RegistryRow>().enumerate() {
        // +2 because: 1-indexed + header row
        let line = index + 2;
        let row = result?;

        let invalid = |reason: String| RegistryError::InvalidRow {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let code = ProjectCode::parse(&row.code)
            .ok_or_else(|| invalid(format!("invalid project code {:?}", row.code)))?;
        let name = ProjectName::parse(&row.name)
            .ok_or_else(|| invalid(format!("invalid project name {:?}", row.name)))?;
        let status = ProjectStatus::parse(&row.status)
            .ok_or_else(|| invalid(format!("invalid status {:?}", row.status)))?;

        if seen.insert(code.clone(), line).is_some() {
            return Err(RegistryError::DuplicateRow {
                path: path.to_path_buf(),
                line,
                code: code.to_string(),
            });
        }

        entries.push(ProjectEntry { code, name, status });
    }

    Ok(entries)
}

fn write_rows(path: &Path, entries: &Entries) -> Result<(), RegistryError> {
    let io_err = |source: io::Error| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(io_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
    {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file_mut());
        // Header is written explicitly so an empty registry still has one
        wtr.write_record(["code", "name", "status"])?;
        // BTreeMap iteration keeps rows sorted by code
        for entry in entries.values() {
            wtr.serialize(RegistryRow {
                code: entry.code.to_string(),
                name: entry.name.to_string(),
                status: entry.status.to_string(),
            })?;
        }
        wtr.flush().map_err(io_err)?;
    }

    tmp.persist(path).map_err(|e| io_err(e.error))?;
    debug!(path = %path.display(), projects = entries.len(), "wrote registry");
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn code(raw: &str) -> ProjectCode {
        ProjectCode::parse(raw).unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = InMemoryRegistry::new();
        let entry = registry.register("WAT01", "river-sampling-2024").unwrap();

        assert_eq!(entry.status, ProjectStatus::Active);
        assert_eq!(registry.lookup(&code("WAT01")).unwrap(), entry);
    }

    #[test]
    fn test_lookup_missing_is_not_found() {
        let registry = InMemoryRegistry::new();
        let err = registry.lookup(&code("ZZZ99")).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(c) if c == "ZZZ99"));
    }

    #[test]
    fn test_register_is_write_once() {
        let registry = InMemoryRegistry::new();
        registry.register("WAT01", "river-sampling-2024").unwrap();

        let same_name = registry.register("WAT01", "river-sampling-2024").unwrap_err();
        assert!(matches!(same_name, RegistryError::AlreadyExists(_)));

        let other_name = registry.register("WAT01", "something-else").unwrap_err();
        assert!(matches!(other_name, RegistryError::AlreadyExists(_)));

        assert_eq!(registry.lookup(&code("WAT01")).unwrap().name.as_str(), "river-sampling-2024");
    }

    #[test]
    fn test_register_rejects_invalid_code_and_name() {
        let registry = InMemoryRegistry::new();
        assert!(matches!(
            registry.register("wat01", "ok-name"),
            Err(RegistryError::InvalidCode(_))
        ));
        assert!(matches!(
            registry.register("WAT01", "Not Valid"),
            Err(RegistryError::InvalidName(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_is_ordered_by_code() {
        let registry = InMemoryRegistry::new();
        registry.register("WAT02", "lake-survey").unwrap();
        registry.register("CHM03", "groundwater-analysis").unwrap();
        registry.register("WAT01", "river-sampling-2024").unwrap();

        let codes: Vec<String> = registry.list().iter().map(|e| e.code.to_string()).collect();
        assert_eq!(codes, vec!["CHM03", "WAT01", "WAT02"]);
    }

    #[test]
    fn test_archive_flips_status_and_keeps_code_reserved() {
        let registry = InMemoryRegistry::new();
        registry.register("WAT01", "river-sampling-2024").unwrap();

        let archived = registry.archive(&code("WAT01")).unwrap();
        assert!(archived.is_archived());
        assert_eq!(registry.len(), 1);

        // Archiving twice is a no-op
        assert!(registry.archive(&code("WAT01")).unwrap().is_archived());

        // Retired codes are never reused
        assert!(matches!(
            registry.register("WAT01", "new-project"),
            Err(RegistryError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_archive_missing_is_not_found() {
        let registry = InMemoryRegistry::new();
        assert!(matches!(
            registry.archive(&code("WAT01")),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_register_same_code_only_one_wins() {
        let registry = Arc::new(InMemoryRegistry::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.register("WAT01", &format!("project-{}", i)).is_ok())
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(wins, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_from_entries_rejects_duplicates() {
        let entry = ProjectEntry::new(code("WAT01"), ProjectName::parse("a").unwrap());
        let result = InMemoryRegistry::from_entries(vec![entry.clone(), entry]);
        assert!(matches!(result, Err(RegistryError::AlreadyExists(_))));
    }

    #[test]
    fn test_csv_registry_persists_sorted_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata").join("projects.csv");

        let registry = CsvRegistry::open(&path).unwrap();
        registry.register("WAT01", "river-sampling-2024").unwrap();
        registry.register("CHM03", "groundwater-analysis").unwrap();
        registry.archive(&code("WAT01")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "code,name,status\nCHM03,groundwater-analysis,active\nWAT01,river-sampling-2024,archived\n"
        );

        let reopened = CsvRegistry::open(&path).unwrap();
        assert_eq!(reopened.list(), registry.list());
    }

    #[test]
    fn test_concurrent_csv_registrations_all_reach_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.csv");
        let registry = Arc::new(CsvRegistry::open(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.register(&format!("WAT{:02}", i), "shared-name").unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reopened = CsvRegistry::open(&path).unwrap();
        assert_eq!(reopened.list().len(), 8);
        assert_eq!(reopened.list(), registry.list());
    }

    #[test]
    fn test_failed_persist_leaves_memory_untouched() {
        let registry = InMemoryRegistry::new();
        let failed = registry.register_with("WAT01", "river", |_| {
            Err(RegistryError::InvalidCode("disk full".to_string()))
        });

        assert!(failed.is_err());
        assert!(registry.is_empty());
        assert!(registry.register("WAT01", "river").is_ok());
    }

    #[test]
    fn test_csv_registry_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = CsvRegistry::open(dir.path().join("projects.csv")).unwrap();
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_csv_registry_rejects_invalid_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.csv");

        std::fs::write(&path, "code,name,status\nWAT01,ok,active\nwat02,bad,active\n").unwrap();
        match CsvRegistry::open(&path).unwrap_err() {
            RegistryError::InvalidRow { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {:?}", other),
        }

        std::fs::write(&path, "code,name,status\nWAT01,ok,retired\n").unwrap();
        assert!(matches!(
            CsvRegistry::open(&path),
            Err(RegistryError::InvalidRow { line: 2, .. })
        ));

        std::fs::write(&path, "code,name,status\nWAT01,a,active\nWAT01,b,active\n").unwrap();
        assert!(matches!(
            CsvRegistry::open(&path),
            Err(RegistryError::DuplicateRow { line: 3, .. })
        ));
    }
}
