// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use ecodata_filing::config::{self, Config};
use ecodata_filing::{
    apply_plan, classify, extracted_name, extracted_path, plan_intake, scaffold_all, scaffold_project,
    scan_inbox, write_index, Classification, ClassifyError, CsvRegistry, IntakeOutcome, IntakePlan,
    ProjectCode, ProjectStore, TransferMode, Validator,
};

/// Filing tools for the environmental data repository
#[derive(Parser, Debug)]
#[command(name = config::APP_NAME, version = config::APP_VERSION, about)]
struct Cli {
    /// Repository root (contains 00_inbox/, 01_projects/, metadata/)
    #[arg(long, global = true, env = "ECODATA_ROOT", default_value = ".")]
    root: PathBuf,

    /// Validation policy file (default: metadata/policy.json if present)
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG wins
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a project and create its folders
    Register {
        /// Project code, e.g. WAT01
        code: String,
        /// Lowercase-hyphenated name, e.g. river-sampling-2024
        name: String,
    },

    /// Mark a project archived
    Archive {
        code: String,
    },

    /// List registered projects
    Projects,

    /// Check filenames against the convention and show where they go
    Classify {
        #[arg(required = true)]
        filenames: Vec<String>,

        /// Print one JSON record per line
        #[arg(long)]
        json: bool,
    },

    /// Plan (and optionally apply) filing of everything in the inbox
    Intake {
        /// Copy ready files into place
        #[arg(long)]
        apply: bool,

        /// Move instead of copy (implies --apply)
        #[arg(long = "move")]
        move_files: bool,

        /// Write metadata/inbox_mapping.csv
        #[arg(long)]
        index: bool,
    },

    /// Print the derived CSV name for extracted files
    ExtractedName {
        #[arg(required = true)]
        filenames: Vec<String>,

        /// Show the full target path (raw/ → extracted/) instead of the name
        #[arg(long)]
        path: bool,
    },

    /// Create folders for every registered project
    Scaffold,

    /// Interactive review of the intake plan
    Review,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("❌ {:#}", e);
            std::process::exit(2);
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match verbose {
            0 => config::DEFAULT_LOG_FILTER,
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        EnvFilter::new(level)
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Ok(false) means the command ran but found problems (non-zero exit)
fn run(cli: Cli) -> Result<bool> {
    let config = Config::load(cli.root, cli.policy.as_deref())?;

    match cli.command {
        Command::Register { code, name } => run_register(&config, &code, &name),
        Command::Archive { code } => run_archive(&config, &code),
        Command::Projects => run_projects(&config),
        Command::Classify { filenames, json } => run_classify(&config, &filenames, json),
        Command::Intake { apply, move_files, index } => {
            let mode = if move_files { Some(TransferMode::Move) } else if apply { Some(TransferMode::Copy) } else { None };
            run_intake(&config, mode, index)
        }
        Command::ExtractedName { filenames, path } => run_extracted_name(&filenames, path),
        Command::Scaffold => run_scaffold(&config),
        Command::Review => run_review(&config),
    }
}

fn open_registry(config: &Config) -> Result<CsvRegistry> {
    let path = config.registry_path();
    CsvRegistry::open(&path).with_context(|| format!("Failed to load registry: {}", path.display()))
}

fn parse_code(raw: &str) -> Result<ProjectCode> {
    match ProjectCode::parse(raw) {
        Some(code) => Ok(code),
        None => bail!("invalid project code {:?}: expected 3 uppercase letters + 2 digits", raw),
    }
}

// ============================================================================
// PROJECTS
// ============================================================================

fn run_register(config: &Config, code: &str, name: &str) -> Result<bool> {
    let registry = open_registry(config)?;
    let entry = registry.register(code, name)?;
    println!("✓ Registered {} ({})", entry.code, entry.name);

    let created = scaffold_project(&config.root, &entry)?;
    for dir in &created {
        println!("  📁 {}", display_relative(&config.root, dir));
    }

    Ok(true)
}

fn run_archive(config: &Config, code: &str) -> Result<bool> {
    let registry = open_registry(config)?;
    let entry = registry.archive(&parse_code(code)?)?;
    println!("✓ {} is now {}", entry.code, entry.status);
    Ok(true)
}

fn run_projects(config: &Config) -> Result<bool> {
    let registry = open_registry(config)?;
    let projects = registry.list();

    if projects.is_empty() {
        println!("No projects registered in {}", registry.path().display());
        return Ok(true);
    }

    println!("{:<7} {:<9} NAME", "CODE", "STATUS");
    for project in &projects {
        println!("{:<7} {:<9} {}", project.code.as_str(), project.status.as_str(), project.name);
    }
    println!("\n{} projects", projects.len());
    Ok(true)
}

fn run_scaffold(config: &Config) -> Result<bool> {
    let registry = open_registry(config)?;
    let created = scaffold_all(&config.root, &registry.list())?;

    for dir in &created {
        println!("📁 {}", display_relative(&config.root, dir));
    }
    println!("✓ {} directories created", created.len());
    Ok(true)
}

// ============================================================================
// CLASSIFY
// ============================================================================

/// One line of `classify --json` output
#[derive(Serialize)]
struct ClassifyReport<'a> {
    filename: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    classification: Option<&'a Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorReport<'a>>,
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    kind: &'static str,
    field: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<usize>,
    detail: String,
    source: &'a ClassifyError,
}

fn run_classify(config: &Config, filenames: &[String], json: bool) -> Result<bool> {
    let registry = open_registry(config)?;
    let validator = Validator::new(config.policy.clone());
    let mut failures = 0;

    for filename in filenames {
        let result = classify(filename, &registry, &validator);
        if result.is_err() {
            failures += 1;
        }

        if json {
            let report = ClassifyReport {
                filename,
                classification: result.as_ref().ok(),
                error: result.as_ref().err().map(|e| ErrorReport {
                    kind: e.kind(),
                    field: e.field(),
                    position: e.position(),
                    detail: e.detail(),
                    source: e,
                }),
            };
            println!("{}", serde_json::to_string(&report)?);
            continue;
        }

        match &result {
            Ok(classification) => println!("✓ {} → {}", filename, classification.destination),
            Err(e) => println!("✗ {}: {}", filename, describe_error(e)),
        }
    }

    if !json && filenames.len() > 1 {
        println!("\n{} checked, {} failed", filenames.len(), failures);
    }
    Ok(failures == 0)
}

fn describe_error(e: &ClassifyError) -> String {
    match e.position() {
        Some(position) => format!("{} in {} at byte {}: {}", e.kind(), e.field(), position, e.detail()),
        None => format!("{} in {}: {}", e.kind(), e.field(), e.detail()),
    }
}

// ============================================================================
// INTAKE
// ============================================================================

fn build_plan(config: &Config, registry: &CsvRegistry) -> Result<IntakePlan> {
    let inbox = config.inbox_dir();
    let files = scan_inbox(&inbox).with_context(|| format!("Failed to scan inbox: {}", inbox.display()))?;
    let validator = Validator::new(config.policy.clone());
    Ok(plan_intake(&config.root, files, registry, &validator))
}

fn run_intake(config: &Config, mode: Option<TransferMode>, index: bool) -> Result<bool> {
    println!("📥 Scanning {}", config.inbox_dir().display());
    let registry = open_registry(config)?;
    let plan = build_plan(config, &registry)?;

    for record in &plan.records {
        match &record.outcome {
            IntakeOutcome::Ready { destination } => {
                println!("  → {} → {}", record.file.relative_path, destination)
            }
            IntakeOutcome::AlreadyPlaced { destination } => {
                println!("  = {} (already at {})", record.file.relative_path, destination)
            }
            IntakeOutcome::Collision { reason, .. } => {
                println!("  ⚠ {}: {}", record.file.relative_path, reason)
            }
            IntakeOutcome::Rejected { error } => {
                println!("  ✗ {}: {}", record.file.relative_path, describe_error(error))
            }
        }
    }

    let summary = plan.summary();
    println!("\n📊 {}", summary.summary());

    if index {
        let path = config.index_path();
        write_index(&path, &plan)?;
        println!("📝 Index written to {}", path.display());
    }

    let mut ok = summary.is_clean();
    match mode {
        Some(mode) => {
            let report = apply_plan(&config.root, &plan, mode);
            println!("✓ Placed {} files", report.placed.len());
            for (file, reason) in &report.failed {
                println!("  ✗ {}: {}", file, reason);
            }
            ok &= report.failed.is_empty();
        }
        None if summary.ready > 0 => println!("Dry run. Re-run with --apply to file {} ready files.", summary.ready),
        None => {}
    }

    Ok(ok)
}

// ============================================================================
// EXTRACTED NAMES
// ============================================================================

fn run_extracted_name(filenames: &[String], full_path: bool) -> Result<bool> {
    let mut ok = true;

    for filename in filenames {
        let result = if full_path {
            extracted_path(Path::new(filename)).map(|p| p.display().to_string())
        } else {
            extracted_name(filename)
        };

        match result {
            Ok(name) => println!("{} → {}", filename, name),
            Err(e) => {
                println!("✗ {}", e);
                ok = false;
            }
        }
    }

    Ok(ok)
}

// ============================================================================
// REVIEW
// ============================================================================

#[cfg(feature = "tui")]
fn run_review(config: &Config) -> Result<bool> {
    println!("🖥️  Loading intake review...\n");

    let registry = open_registry(config)?;
    let plan = build_plan(config, &registry)?;
    println!("✓ Planned {} inbox files", plan.records.len());

    let mut app = ui::App::new(plan, registry.list());
    ui::run_ui(&mut app)?;

    println!("\n✅ Review closed");
    Ok(true)
}

#[cfg(not(feature = "tui"))]
fn run_review(_config: &Config) -> Result<bool> {
    eprintln!("❌ Review mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: ecodata intake");
    Ok(false)
}

fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
