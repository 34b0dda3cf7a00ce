use crate::component::errors::ComponentError;
use crate::edit::Edit;
use crate::markup::scanner::{tokens, TagToken};
use std::path::{Path, PathBuf};

const TEMPLATE_TAG: &str = "template";
const TEMPLATE_CLOSE: &str = "</template>";

/// A loaded single-file component and its pending rewrite.
#[derive(Debug, Clone)]
pub struct ComponentFile {
    path: PathBuf,
    relative: PathBuf,
    output_dir: Option<PathBuf>,
    content: String,
    new_content: Option<String>,
}

/// Outer `<template>` block: the first opening tag paired with the last
/// closing tag, so nested `<template v-slot>` blocks stay inside.
struct TemplateBounds {
    open_start: usize,
    open_end: usize,
    close_start: usize,
    close_end: usize,
}

fn template_bounds(doc: &str) -> Option<TemplateBounds> {
    let head = tokens(doc, 0).find_map(|token| match token {
        TagToken::Open(head) if !head.self_closing && head.name(doc) == TEMPLATE_TAG => Some(head),
        _ => None,
    })?;
    let close_start = doc.rfind(TEMPLATE_CLOSE).filter(|&at| at >= head.end)?;
    Some(TemplateBounds {
        open_start: head.start,
        open_end: head.end,
        close_start,
        close_end: close_start + TEMPLATE_CLOSE.len(),
    })
}

impl ComponentFile {
    pub(crate) fn new(
        path: PathBuf,
        relative: PathBuf,
        output_dir: Option<PathBuf>,
        content: String,
    ) -> Self {
        Self {
            path,
            relative,
            output_dir,
            content,
            new_content: None,
        }
    }

    /// Where the file was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path relative to the search directory it was found in.
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn new_content(&self) -> Option<&str> {
        self.new_content.as_deref()
    }

    /// Rewritten text, or the original content when nothing was set.
    pub fn output(&self) -> &str {
        self.new_content.as_deref().unwrap_or(&self.content)
    }

    /// Body of the outer `<template>`, trimmed.
    pub fn template(&self) -> Result<&str, ComponentError> {
        let bounds = self.bounds(&self.content)?;
        Ok(self.content[bounds.open_end..bounds.close_start].trim())
    }

    /// Replace the template body of the original content with `template`.
    pub fn set_template(&mut self, template: &str) -> Result<(), ComponentError> {
        let bounds = self.bounds(&self.content)?;
        let open = &self.content[bounds.open_start..bounds.open_end];
        let mut rewritten = self.content.clone();
        Edit::replace(
            &self.content,
            bounds.open_start,
            bounds.close_end,
            format!("{open}\n{template}\n{TEMPLATE_CLOSE}"),
        )
        .apply_to(&mut rewritten)?;
        self.new_content = Some(rewritten);
        Ok(())
    }

    /// Append a `<!-- Kombinator: ... -->` marker to the end of the new
    /// template body.
    pub fn add_template_comment(&mut self, comment: &str) -> Result<(), ComponentError> {
        let current = self.new_content.as_deref().ok_or(ComponentError::TemplateNotSet)?;
        let bounds = self.bounds(current)?;
        let mut rewritten = current.to_string();
        Edit::insert(
            bounds.close_start,
            format!("\n<!-- Kombinator: {comment} -->\n"),
        )
        .apply_to(&mut rewritten)?;
        self.new_content = Some(rewritten);
        Ok(())
    }

    /// Where the output belongs, under the resolver's output directory.
    pub fn target_path(&self, relative_out: Option<&Path>) -> Option<PathBuf> {
        let relative = relative_out.unwrap_or(&self.relative);
        self.output_dir.as_ref().map(|dir| dir.join(relative))
    }

    /// Continue from `content`, an earlier rewrite of this component found
    /// at `path`. Pending changes are dropped.
    pub(crate) fn rebase(self, path: PathBuf, content: String) -> Self {
        Self {
            path,
            content,
            new_content: None,
            ..self
        }
    }

    fn bounds(&self, doc: &str) -> Result<TemplateBounds, ComponentError> {
        template_bounds(doc).ok_or_else(|| ComponentError::MissingTemplate {
            path: self.path.clone(),
        })
    }
}
