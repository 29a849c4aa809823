// Ecodata Filing - Core Library
// Filename convention, project registry and inbox intake for the
// environmental data repository. Used by the CLI and the tests.

pub mod project;   // Project codes, names, registry entries
pub mod registry;  // Project registry (in-memory + metadata/projects.csv)
pub mod filename;  // Parsed filename model
pub mod parser;    // Filename grammar
pub mod validator; // Registry + policy checks
pub mod resolver;  // Destination paths
pub mod extracted; // Derived names for extracted CSVs
pub mod config;    // Layout constants + policy loading
pub mod classify;  // parse → validate → resolve
pub mod intake;    // Inbox scan, plan, apply, index
pub mod scaffold;  // Project folder trees

// Re-export commonly used types
pub use project::{ProjectCode, ProjectEntry, ProjectName, ProjectStatus};
pub use registry::{CsvRegistry, InMemoryRegistry, ProjectStore, RegistryError};
pub use filename::{DocType, FileDate, ParsedFilename};
pub use parser::{parse, ParseError, ParseErrorKind};
pub use validator::{validate, ValidatedFilename, ValidationError, ValidationPolicy, Validator};
pub use resolver::{placement_for, project_dir, resolve, Category, DestinationPath, Placement};
pub use extracted::{extracted_name, extracted_path, NamingError};
pub use config::Config;
pub use classify::{classify, Classification, ClassifyError};
pub use intake::{
    apply_plan, plan_intake, scan_inbox, sha256_file, write_index,
    ApplyReport, InboxFile, IntakeOutcome, IntakePlan, IntakeRecord, IntakeSummary, TransferMode,
};
pub use scaffold::{scaffold_all, scaffold_project};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
