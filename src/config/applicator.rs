//! Recipe applicator - runs mods and combines against a project tree
//!
//! The first recipe directory is output only. Every run rebuilds it from the
//! remaining directories: mods read their components from the source
//! directories, or from what an earlier entry of the same run produced, and
//! files a run does not produce are removed afterwards. Running a recipe twice
//! therefore gives the same tree, whatever its steps are.
//!
//! Entries run in recipe order (mods first, then combines). A failing entry
//! writes nothing and does not stop the entries after it.

use crate::combine::{CombineError, TagSectionCombinator};
use crate::component::{ComponentError, ComponentFile, ComponentResolver};
use crate::config::schema::{CombineDefinition, ModDefinition, RecipeConfig, Step};
use crate::edit::{atomic_write, EditError};
use crate::markup::{ElementMutator, MarkupError};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result of applying a single recipe entry
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "ModResult should be checked for success/failure"]
pub enum ModResult {
    /// Output was written
    Applied { file: PathBuf },
    /// Output already matched what is on disk
    Unchanged { file: PathBuf },
}

impl ModResult {
    pub fn file(&self) -> &Path {
        match self {
            ModResult::Applied { file } | ModResult::Unchanged { file } => file,
        }
    }
}

impl fmt::Display for ModResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModResult::Applied { file } => write!(f, "Wrote {}", file.display()),
            ModResult::Unchanged { file } => write!(f, "Unchanged {}", file.display()),
        }
    }
}

/// Output an entry would produce, computed without touching the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedWrite {
    pub file: PathBuf,
    /// Current content of `file`, if it exists
    pub before: Option<String>,
    pub after: String,
}

impl PlannedWrite {
    pub fn is_change(&self) -> bool {
        self.before.as_deref() != Some(self.after.as_str())
    }
}

/// Errors during recipe application
#[derive(Debug)]
pub enum ApplicationError {
    /// Component lookup, template extraction or write failed
    Component(ComponentError),
    /// A mod step failed; `index` is zero-based within the mod
    Step {
        index: usize,
        kind: &'static str,
        source: MarkupError,
    },
    /// Section combination failed
    Combine(CombineError),
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
    /// Mod names neither a component nor a file
    NoTarget,
    /// Input lies in the output directory but no earlier entry produced it
    Unproduced { path: PathBuf },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Edit(EditError),
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Component(e) => write!(f, "{}", e),
            ApplicationError::Step {
                index,
                kind,
                source,
            } => write!(f, "step {} ({}) failed: {}", index + 1, kind, source),
            ApplicationError::Combine(e) => write!(f, "combine failed: {}", e),
            ApplicationError::InvalidPattern { pattern, source } => {
                write!(f, "invalid pattern {:?}: {}", pattern, source)
            }
            ApplicationError::NoTarget => write!(f, "mod names neither a component nor a file"),
            ApplicationError::Unproduced { path } => write!(
                f,
                "{} is in the output directory, and no earlier entry of this run produced it",
                path.display()
            ),
            ApplicationError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ApplicationError::Edit(e) => write!(f, "edit error: {}", e),
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Component(e) => Some(e),
            ApplicationError::Step { source, .. } => Some(source),
            ApplicationError::Combine(e) => Some(e),
            ApplicationError::InvalidPattern { source, .. } => Some(source),
            ApplicationError::Io { source, .. } => Some(source),
            ApplicationError::Edit(e) => Some(e),
            ApplicationError::NoTarget | ApplicationError::Unproduced { .. } => None,
        }
    }
}

impl From<ComponentError> for ApplicationError {
    fn from(e: ComponentError) -> Self {
        ApplicationError::Component(e)
    }
}

impl From<CombineError> for ApplicationError {
    fn from(e: CombineError) -> Self {
        ApplicationError::Combine(e)
    }
}

impl From<EditError> for ApplicationError {
    fn from(e: EditError) -> Self {
        ApplicationError::Edit(e)
    }
}

/// Resolver for the components mods read: every recipe directory except the
/// first, which receives the output.
pub fn resolver_for(config: &RecipeConfig, root: &Path) -> ComponentResolver {
    let mut directories = config.meta.directories.iter().map(|dir| root.join(dir));
    let output = directories.next();
    let resolver =
        ComponentResolver::new(directories).with_extension(config.meta.extension.as_str());
    match output {
        Some(output) => resolver.with_output_dir(output),
        None => resolver,
    }
}

/// Apply a recipe to the tree under `root`.
///
/// # Returns
///
/// One result per entry, in recipe order (mods first, then combines).
/// `Unchanged` means the rebuilt file matches what was already on disk.
pub fn apply_mods(
    config: &RecipeConfig,
    root: &Path,
) -> Vec<(String, Result<ModResult, ApplicationError>)> {
    let mut run = Run::new(config, root);
    let mut results = Vec::with_capacity(config.mods.len() + config.combines.len());

    for entry in &config.mods {
        let result = run.plan_mod(entry).and_then(commit);
        log_result(&entry.id, &result);
        results.push((entry.id.clone(), result));
    }
    for entry in &config.combines {
        let result = run.plan_combine(entry).and_then(commit);
        log_result(&entry.id, &result);
        results.push((entry.id.clone(), result));
    }

    run.prune_output();
    results
}

/// Compute every entry's output without writing anything.
///
/// Entries see the output of earlier entries exactly as [`apply_mods`]
/// would produce it; `before` is what is on disk now.
pub fn check_mods(
    config: &RecipeConfig,
    root: &Path,
) -> Vec<(String, Result<PlannedWrite, ApplicationError>)> {
    let mut run = Run::new(config, root);
    let mut results = Vec::with_capacity(config.mods.len() + config.combines.len());
    for entry in &config.mods {
        results.push((entry.id.clone(), run.plan_mod(entry)));
    }
    for entry in &config.combines {
        results.push((entry.id.clone(), run.plan_combine(entry)));
    }
    results
}

fn log_result(id: &str, result: &Result<ModResult, ApplicationError>) {
    match result {
        Ok(ModResult::Applied { file }) => {
            tracing::info!(id, file = %file.display(), "applied")
        }
        Ok(ModResult::Unchanged { file }) => {
            tracing::debug!(id, file = %file.display(), "unchanged")
        }
        Err(error) => tracing::warn!(id, %error, "entry failed"),
    }
}

fn commit(plan: PlannedWrite) -> Result<ModResult, ApplicationError> {
    if !plan.is_change() {
        return Ok(ModResult::Unchanged { file: plan.file });
    }
    if let Some(parent) = plan.file.parent() {
        fs::create_dir_all(parent).map_err(|source| ApplicationError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    atomic_write(&plan.file, plan.after.as_bytes())?;
    Ok(ModResult::Applied { file: plan.file })
}

fn read_existing(path: &Path) -> Result<Option<String>, ApplicationError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ApplicationError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// State of one pass over a recipe: what each entry produced so far.
struct Run<'a> {
    root: &'a Path,
    resolver: ComponentResolver,
    output_dir: Option<PathBuf>,
    produced: BTreeMap<PathBuf, String>,
}

impl<'a> Run<'a> {
    fn new(config: &RecipeConfig, root: &'a Path) -> Self {
        let resolver = resolver_for(config, root);
        Self {
            root,
            output_dir: config.meta.directories.first().map(|dir| root.join(dir)),
            resolver,
            produced: BTreeMap::new(),
        }
    }

    fn in_output(&self, path: &Path) -> bool {
        self.output_dir
            .as_deref()
            .is_some_and(|dir| path.starts_with(dir))
    }

    /// Content of an entry's input: produced earlier in this run, or read
    /// from a source directory. The output directory itself never counts.
    fn read_input(&self, path: &Path) -> Result<String, ApplicationError> {
        if let Some(content) = self.produced.get(path) {
            return Ok(content.clone());
        }
        if self.in_output(path) {
            return Err(ApplicationError::Unproduced {
                path: path.to_path_buf(),
            });
        }
        fs::read_to_string(path).map_err(|source| ApplicationError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn load(&self, entry: &ModDefinition) -> Result<ComponentFile, ApplicationError> {
        let file = match (&entry.component, &entry.file) {
            (Some(name), _) => self.resolver.load_component(name)?,
            (None, Some(path)) => self.resolver.load_file(path)?,
            (None, None) => return Err(ApplicationError::NoTarget),
        };
        // A component an earlier mod already rewrote continues from that text.
        let earlier = file
            .target_path(None)
            .and_then(|path| self.produced.get(&path).cloned().map(|text| (path, text)));
        Ok(match earlier {
            Some((path, content)) => file.rebase(path, content),
            None => file,
        })
    }

    fn record(&mut self, plan: PlannedWrite) -> PlannedWrite {
        self.produced.insert(plan.file.clone(), plan.after.clone());
        plan
    }

    fn plan_mod(&mut self, entry: &ModDefinition) -> Result<PlannedWrite, ApplicationError> {
        let mut file = self.load(entry)?;

        let mut mutator = ElementMutator::from_template(file.template()?);
        for (index, step) in entry.steps.iter().enumerate() {
            mutator = run_step(mutator, step).map_err(|error| match error {
                StepError::Markup(source) => ApplicationError::Step {
                    index,
                    kind: step.kind(),
                    source,
                },
                StepError::Pattern(error) => error,
            })?;
        }

        file.set_template(mutator.document())?;
        if let Some(comment) = &entry.comment {
            file.add_template_comment(comment)?;
        }
        file.add_template_comment(&entry.id)?;

        let target = file
            .target_path(entry.output.as_deref().map(Path::new))
            .ok_or(ApplicationError::NoTarget)?;
        let plan = PlannedWrite {
            before: read_existing(&target)?,
            after: file.output().to_string(),
            file: target,
        };
        Ok(self.record(plan))
    }

    fn plan_combine(&mut self, entry: &CombineDefinition) -> Result<PlannedWrite, ApplicationError> {
        let source = self.read_input(&self.root.join(&entry.source))?;
        let overlay = self.read_input(&self.root.join(&entry.overlay))?;
        let after =
            TagSectionCombinator::with_tags(entry.tags.iter().cloned()).combine(&source, &overlay)?;

        let target = self.root.join(entry.output.as_deref().unwrap_or(&entry.source));
        let plan = PlannedWrite {
            before: read_existing(&target)?,
            after,
            file: target,
        };
        Ok(self.record(plan))
    }

    /// Remove whatever this run did not produce from the output directory.
    fn prune_output(&self) {
        let Some(dir) = self.output_dir.as_deref() else {
            return;
        };
        for entry in WalkDir::new(dir)
            .contents_first(true)
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
        {
            let path = entry.path();
            if entry.file_type().is_dir() {
                // Only succeeds once the directory is empty.
                let _ = fs::remove_dir(path);
            } else if !self.produced.contains_key(path) {
                match fs::remove_file(path) {
                    Ok(()) => tracing::info!(file = %path.display(), "removed stale output"),
                    Err(error) => {
                        tracing::warn!(file = %path.display(), %error, "could not remove stale output")
                    }
                }
            }
        }
    }
}

enum StepError {
    Markup(MarkupError),
    Pattern(ApplicationError),
}

impl From<MarkupError> for StepError {
    fn from(e: MarkupError) -> Self {
        StepError::Markup(e)
    }
}

fn run_step(mutator: ElementMutator, step: &Step) -> Result<ElementMutator, StepError> {
    let mutator = match step {
        Step::FindByTag { name } => mutator.find_by_tag(name.as_str()),
        Step::FindByAttribute { name } => mutator.find_by_attribute(name.as_str()),
        Step::FindByAttributeValue { name, value } => {
            mutator.find_by_attribute_value(name.as_str(), value.as_str())
        }
        Step::FindFirst => mutator.find_first(),
        Step::SetAttribute { name, value } => mutator.set_attribute(name, value)?,
        Step::RemoveAttribute { name } => mutator.remove_attribute(name)?,
        Step::ReduceAttribute { name, value } => mutator.reduce_attribute(name, value)?,
        Step::ExtendAttribute { name, value, glue } => {
            mutator.extend_attribute(name, value, glue.as_deref().unwrap_or(" "))?
        }
        Step::RegexpAttribute {
            name,
            pattern,
            replacement,
        } => {
            let regex = Regex::new(pattern).map_err(|source| {
                StepError::Pattern(ApplicationError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })?;
            mutator.regexp_attribute(name, &regex, replacement)?
        }
        Step::RemoveElement => mutator.remove_element()?,
        Step::RenameElement { name } => mutator.rename_element(name)?,
        Step::InsertBefore { html } => mutator.insert_before(html)?,
        Step::InsertAfter { html } => mutator.insert_after(html)?,
        Step::InsertInside { html } => mutator.insert_inside(html)?,
        Step::Unwrap => mutator.unwrap_element()?,
    };
    Ok(mutator)
}
