use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use kombinator::config::{
    apply_mods, check_mods, load_from_path, ApplicationError, ModResult, RecipeConfig,
};
use kombinator::edit::atomic_write;
use kombinator::TagSectionCombinator;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kombinator")]
#[command(about = "Structural edits and section merging for component markup", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug events to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every mod and combine of a recipe
    Apply {
        /// Recipe TOML file
        #[arg(short, long)]
        recipe: PathBuf,

        /// Directory recipe paths are relative to (defaults to the recipe's directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Report which recipe entries would change files, without writing
    Check {
        /// Recipe TOML file
        #[arg(short, long)]
        recipe: PathBuf,

        /// Directory recipe paths are relative to (defaults to the recipe's directory)
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Merge the sections of an override document into a source document
    Combine {
        source: PathBuf,

        #[arg(value_name = "OVERRIDE")]
        overlay: PathBuf,

        /// Sections to combine, in order
        #[arg(short, long, value_delimiter = ',', default_value = "style,script")]
        tags: Vec<String>,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the entries of a recipe
    List {
        /// Recipe TOML file
        #[arg(short, long)]
        recipe: PathBuf,

        /// Print the parsed recipe as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Apply {
            recipe,
            root,
            dry_run,
            diff,
        } => cmd_apply(&recipe, root, dry_run, diff),

        Commands::Check { recipe, root } => cmd_check(&recipe, root),

        Commands::Combine {
            source,
            overlay,
            tags,
            output,
        } => cmd_combine(&source, &overlay, tags, output),

        Commands::List { recipe, json } => cmd_list(&recipe, json),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "kombinator=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Resolve the recipe root: explicit flag, else the recipe's own directory.
fn resolve_root(recipe: &Path, root: Option<PathBuf>) -> Result<PathBuf> {
    let root = match root {
        Some(root) => root,
        None => recipe
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    root.canonicalize()
        .with_context(|| format!("recipe root {} does not exist", root.display()))
}

fn load_recipe(recipe: &Path) -> Result<RecipeConfig> {
    let config = load_from_path(recipe)?;
    println!(
        "Recipe: {}",
        if config.meta.name.is_empty() {
            recipe.display().to_string()
        } else {
            config.meta.name.clone()
        }
    );
    Ok(config)
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (combined)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn report_error(id: &str, error: &ApplicationError) {
    eprintln!("{} {}: Error - {}", "✗".red(), id, error);
    match error {
        ApplicationError::Step { .. } => {
            eprintln!("  {}", "Nothing was written for this entry".dimmed());
            eprintln!("  Possible causes:");
            eprintln!("    - The selector no longer matches the component template");
            eprintln!("    - A step runs before any find-* step sets a selector");
        }
        ApplicationError::Component(component_err) => {
            eprintln!("  Component error: {}", component_err);
        }
        _ => {}
    }
}

fn cmd_apply(recipe: &Path, root: Option<PathBuf>, dry_run: bool, show_diff: bool) -> Result<()> {
    let config = load_recipe(recipe)?;
    let root = resolve_root(recipe, root)?;
    println!("Root: {}", root.display());
    println!();

    let mut total_applied = 0;
    let mut total_unchanged = 0;
    let mut total_failed = 0;

    if dry_run {
        println!("{}", "[DRY RUN - showing what would be written]".cyan());
        for (id, result) in check_mods(&config, &root) {
            match result {
                Ok(plan) if plan.is_change() => {
                    println!("{} {}: Would write {}", "✓".green(), id, plan.file.display());
                    total_applied += 1;
                    if show_diff {
                        display_diff(&plan.file, plan.before.as_deref().unwrap_or(""), &plan.after);
                    }
                }
                Ok(plan) => {
                    println!("{} {}: Unchanged {}", "⊙".yellow(), id, plan.file.display());
                    total_unchanged += 1;
                }
                Err(e) => {
                    report_error(&id, &e);
                    total_failed += 1;
                }
            }
        }
    } else {
        // Capture previous contents for diff output.
        let before: Vec<Option<String>> = if show_diff {
            check_mods(&config, &root)
                .into_iter()
                .map(|(_, plan)| plan.ok().and_then(|p| p.before))
                .collect()
        } else {
            Vec::new()
        };

        for (index, (id, result)) in apply_mods(&config, &root).into_iter().enumerate() {
            match result {
                Ok(ModResult::Applied { file }) => {
                    println!("{} {}: Wrote {}", "✓".green(), id, file.display());
                    total_applied += 1;
                    if show_diff {
                        if let Ok(after) = fs::read_to_string(&file) {
                            let original = before.get(index).cloned().flatten().unwrap_or_default();
                            display_diff(&file, &original, &after);
                        }
                    }
                }
                Ok(ModResult::Unchanged { file }) => {
                    println!("{} {}: Unchanged {}", "⊙".yellow(), id, file.display());
                    total_unchanged += 1;
                }
                Err(e) => {
                    report_error(&id, &e);
                    total_failed += 1;
                }
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} written", format!("{}", total_applied).green());
    println!("  {} unchanged", format!("{}", total_unchanged).yellow());
    println!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_check(recipe: &Path, root: Option<PathBuf>) -> Result<()> {
    let config = load_recipe(recipe)?;
    let root = resolve_root(recipe, root)?;
    println!();

    let mut up_to_date = Vec::new();
    let mut pending = Vec::new();
    let mut failed = Vec::new();

    for (id, result) in check_mods(&config, &root) {
        match result {
            Ok(plan) if plan.is_change() => pending.push((id, plan.file)),
            Ok(_) => up_to_date.push(id),
            Err(e) => failed.push((id, e.to_string())),
        }
    }

    if !up_to_date.is_empty() {
        println!(
            "{} {} ({} entries)",
            "✓".green(),
            "UP TO DATE".green().bold(),
            up_to_date.len()
        );
        for id in &up_to_date {
            println!("  - {}", id);
        }
        println!();
    }

    if !pending.is_empty() {
        println!(
            "{} {} ({} entries)",
            "⊙".yellow(),
            "WOULD CHANGE".yellow().bold(),
            pending.len()
        );
        for (id, file) in &pending {
            println!("  - {} ({})", id, file.display().to_string().dimmed());
        }
        println!();
    }

    if !failed.is_empty() {
        println!(
            "{} {} ({} entries)",
            "✗".red(),
            "FAILED".red().bold(),
            failed.len()
        );
        for (id, reason) in &failed {
            println!("  - {} ({})", id, reason.dimmed());
        }
        println!();
    }

    if !pending.is_empty() || !failed.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_combine(
    source: &Path,
    overlay: &Path,
    tags: Vec<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let source_text = fs::read_to_string(source)
        .with_context(|| format!("failed to read {}", source.display()))?;
    let overlay_text = fs::read_to_string(overlay)
        .with_context(|| format!("failed to read {}", overlay.display()))?;

    let combined = TagSectionCombinator::with_tags(tags).combine(&source_text, &overlay_text)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            atomic_write(&path, combined.as_bytes())?;
            eprintln!("{} Wrote {}", "✓".green(), path.display());
        }
        None => print!("{}", combined),
    }

    Ok(())
}

fn cmd_list(recipe: &Path, json: bool) -> Result<()> {
    let config = load_from_path(recipe)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("{}", "Mods:".bold());
    for entry in &config.mods {
        let target = entry
            .component
            .as_deref()
            .or(entry.file.as_deref())
            .unwrap_or("?");
        println!(
            "  {} {} ({} steps)",
            entry.id.cyan(),
            target,
            entry.steps.len()
        );
        for step in &entry.steps {
            if step.is_selector() {
                println!("    {}", step.kind());
            } else {
                println!("      - {}", step.kind().dimmed());
            }
        }
    }

    println!("{}", "Combines:".bold());
    for entry in &config.combines {
        println!(
            "  {} {} + {} [{}]",
            entry.id.cyan(),
            entry.source,
            entry.overlay,
            entry.tags.join(", ")
        );
    }

    Ok(())
}
