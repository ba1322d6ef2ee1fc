use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use queryscope::config::{load_or_default, Credentials, ProjectManifest};
use queryscope::edit::atomic_write;
use queryscope::safety::ProjectGuard;
use queryscope::transform::{transform_source, Session, TransformError};
use queryscope::ts::{validate_syntax, Dialect};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

#[derive(Parser)]
#[command(name = "queryscope")]
#[command(about = "Build-time query signing for TypeScript sources", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve parts and sign scopes across a project, rewriting in place
    Transform {
        /// Path to project root (auto-detected if not specified)
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Run the pipeline read-only and report per-file results
    Check {
        /// Path to project root (auto-detected if not specified)
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Fail when signing credentials are not configured
        #[arg(long)]
        require_credentials: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Transform {
            project,
            dry_run,
            diff,
        } => cmd_transform(project, dry_run, diff),

        Commands::Check {
            project,
            require_credentials,
        } => cmd_check(project, require_credentials),
    }
}

/// Resolve the project root using multiple detection strategies
///
/// Priority order:
/// 1. Explicit --project flag
/// 2. QUERYSCOPE_PROJECT environment variable
/// 3. Auto-detect by walking up from the current directory
fn resolve_project(cli_project: Option<PathBuf>) -> Result<PathBuf> {
    // 1. Explicit flag (highest priority)
    if let Some(path) = cli_project {
        return Ok(path.canonicalize()?);
    }

    // 2. Environment variable
    if let Ok(env_path) = env::var("QUERYSCOPE_PROJECT") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: QUERYSCOPE_PROJECT is set but path doesn't exist: {}",
                env_path
            )
            .yellow()
        );
    }

    // 3. Auto-detect from current directory
    if let Some(path) = auto_detect_project() {
        println!(
            "{}",
            format!("Auto-detected project: {}", path.display()).dimmed()
        );
        return Ok(path);
    }

    // 4. Helpful error with multiple solutions
    anyhow::bail!(
        "{}\n{}\n  {}\n  {}\n  {}",
        "Could not find a TypeScript project.".red(),
        "Try one of:".bold(),
        "1. cd into your project: cd /path/to/app && queryscope transform",
        "2. Specify explicitly: queryscope transform --project /path/to/app",
        "3. Set environment variable: export QUERYSCOPE_PROJECT=/path/to/app"
    )
}

/// Auto-detect the project root by walking up from the current directory.
///
/// A directory counts as a root when it carries a queryscope.toml,
/// tsconfig.json or package.json.
fn auto_detect_project() -> Option<PathBuf> {
    let current = env::current_dir().ok()?;

    for ancestor in current.ancestors() {
        let is_root = ["queryscope.toml", "tsconfig.json", "package.json"]
            .iter()
            .any(|marker| ancestor.join(marker).exists());

        if is_root {
            return Some(ancestor.to_path_buf());
        }
    }

    None
}

/// Helper: Discover TypeScript sources under the manifest's roots.
///
/// Walks each configured root, skips excluded directory names, and returns
/// the matching files sorted by path so cross-file resolution order is
/// stable between runs.
fn discover_sources(project: &Path, manifest: &ProjectManifest) -> Result<Vec<PathBuf>> {
    let exclude = &manifest.project.exclude;
    let mut files = Vec::new();

    for root in &manifest.project.roots {
        let root_path = project.join(root);
        if !root_path.exists() {
            eprintln!(
                "{}",
                format!(
                    "Warning: configured root doesn't exist: {}",
                    root_path.display()
                )
                .yellow()
            );
            continue;
        }

        let walker = WalkDir::new(&root_path).follow_links(false).into_iter();
        for entry in walker.filter_entry(|e| !is_excluded_dir(e, exclude)) {
            let entry = entry?;
            if entry.file_type().is_file() && Dialect::from_path(entry.path()).is_some() {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    // Overlapping roots may yield the same file twice
    files.sort();
    files.dedup();

    Ok(files)
}

fn is_excluded_dir(entry: &DirEntry, exclude: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| exclude.iter().any(|ex| ex == name))
            .unwrap_or(false)
}

/// Helper: Show unified diff between original and rewritten content
fn display_diff(file: &Path, original: &str, rewritten: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (rewritten)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, rewritten);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

/// Helper: Print a transform error with diagnostics for common failure modes.
fn report_transform_error(file: &Path, err: &TransformError) {
    eprintln!("{} {}: {}", "✗".red(), file.display(), err);

    match err {
        TransformError::UnresolvedReference { .. } => {
            eprintln!("  Possible causes:");
            eprintln!("    - The part is declared after its first use");
            eprintln!("    - The declaring file sorts after this one");
            eprintln!("    - The name is misspelled");
        }
        TransformError::DuplicatePart { .. } => {
            eprintln!("  Action: Rename one of the declarations; part names are global to a run");
        }
        TransformError::QueryNotLiteral { .. } => {
            eprintln!("  Action: Inline the query as a string or template literal");
        }
        _ => {}
    }
}

fn cmd_transform(project: Option<PathBuf>, dry_run: bool, show_diff: bool) -> Result<()> {
    // 1. Resolve project root and manifest
    let project = resolve_project(project)?;
    let manifest = load_or_default(&project)?;

    // 2. Decide the signing mode once for the whole run
    let creds = Credentials::from_env();
    if creds.signing_pair().is_none() {
        println!(
            "{}",
            "QUERYSCOPE_CLIENT_ID / QUERYSCOPE_PRIVATE_KEY not set; leaving sources untouched"
                .yellow()
        );
        return Ok(());
    }
    let mut session = Session::new(&creds)?;

    // 3. Discover sources in stable order
    let sources = discover_sources(&project, &manifest)?;

    println!("Project: {}", project.display());
    println!("Sources: {}", sources.len());
    if dry_run {
        println!("{}", "[DRY RUN - no files will be modified]".cyan());
    }
    println!();

    let guard = ProjectGuard::new(&project)?;

    // 4. Transform each file; the session carries parts across files
    let mut files_rewritten = 0;
    let mut parts_removed = 0;
    let mut scopes_signed = 0;

    for file in &sources {
        let dialect = Dialect::from_path(file).unwrap_or_default();
        let original = fs::read_to_string(file)?;

        let outcome = match transform_source(&original, dialect, &mut session) {
            Ok(outcome) => outcome,
            Err(e) => {
                report_transform_error(file, &e);
                std::process::exit(1);
            }
        };

        parts_removed += outcome.stats.parts_removed;
        scopes_signed += outcome.stats.scopes_signed;

        if !outcome.changed() {
            continue;
        }

        if show_diff {
            display_diff(file, &original, &outcome.output);
        }

        if dry_run {
            println!(
                "{} {}: Would rewrite ({} parts, {} scopes)",
                "⊙".yellow(),
                file.display(),
                outcome.stats.parts_removed,
                outcome.stats.scopes_signed
            );
        } else {
            let target = guard.validate_path(file)?;
            atomic_write(&target, outcome.output.as_bytes())?;
            println!(
                "{} {}: Rewrote ({} parts, {} scopes)",
                "✓".green(),
                file.display(),
                outcome.stats.parts_removed,
                outcome.stats.scopes_signed
            );
        }

        files_rewritten += 1;
    }

    // 5. Summary
    println!();
    println!("{}", "Summary:".bold());
    println!("  {} files scanned", sources.len());
    if dry_run {
        println!(
            "  {} files would be rewritten",
            format!("{}", files_rewritten).yellow()
        );
    } else {
        println!(
            "  {} files rewritten",
            format!("{}", files_rewritten).green()
        );
    }
    println!("  {} parts removed", parts_removed);
    println!("  {} scopes signed", scopes_signed);

    Ok(())
}

fn cmd_check(project: Option<PathBuf>, require_credentials: bool) -> Result<()> {
    // 1. Resolve project root and manifest
    let project = resolve_project(project)?;
    let manifest = load_or_default(&project)?;

    // 2. Credential state decides how much of the pipeline runs
    let creds = Credentials::from_env();
    if creds.signing_pair().is_none() {
        if require_credentials {
            anyhow::bail!(
                "{}",
                "Credentials required but QUERYSCOPE_CLIENT_ID / QUERYSCOPE_PRIVATE_KEY are not set"
                    .red()
            );
        }
        println!("{}", "Credentials not set; checking syntax only".yellow());
    }
    let mut session = Session::new(&creds)?;

    // 3. Discover and check each source read-only
    let sources = discover_sources(&project, &manifest)?;

    println!("Project: {}", project.display());
    println!("Sources: {}", sources.len());
    println!();

    let mut would_rewrite = 0;
    let mut parts_removed = 0;
    let mut scopes_signed = 0;
    let mut failed = 0;

    for file in &sources {
        let dialect = Dialect::from_path(file).unwrap_or_default();
        let original = fs::read_to_string(file)?;

        // Without credentials transform_source skips parsing entirely, so
        // check syntax explicitly to keep the command useful in CI.
        if !session.signing_enabled() {
            match validate_syntax(&original, dialect) {
                Ok(()) => println!("{} {}: Syntax ok", "✓".green(), file.display()),
                Err(e) => {
                    eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                    failed += 1;
                }
            }
            continue;
        }

        let checkpoint = session.snapshot();
        match transform_source(&original, dialect, &mut session) {
            Ok(outcome) => {
                if outcome.changed() {
                    println!(
                        "{} {}: Would rewrite ({} parts, {} scopes)",
                        "⊙".yellow(),
                        file.display(),
                        outcome.stats.parts_removed,
                        outcome.stats.scopes_signed
                    );
                    would_rewrite += 1;
                    parts_removed += outcome.stats.parts_removed;
                    scopes_signed += outcome.stats.scopes_signed;
                } else {
                    println!("{} {}: No matches", "✓".green(), file.display());
                }
            }
            Err(e) => {
                report_transform_error(file, &e);
                // A failed file may have defined parts before its error;
                // drop them so later files are checked against clean state
                session.restore(checkpoint);
                failed += 1;
            }
        }
    }

    // 4. Summary
    println!();
    println!("{}", "Summary:".bold());
    println!("  {} files checked", sources.len());
    println!(
        "  {} would be rewritten",
        format!("{}", would_rewrite).yellow()
    );
    println!("  {} parts removed", parts_removed);
    println!("  {} scopes signed", scopes_signed);
    println!("  {} failed", format!("{}", failed).red());

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
