use crate::combine::errors::CombineError;
use crate::combine::extractor::{extract_section, MergeOperation};
use crate::edit::Edit;

/// Sections combined when the caller does not name any.
pub const DEFAULT_TAGS: &[&str] = &["style", "script"];

/// Merges or replaces named top-level sections of a source document with
/// those of an override document.
///
/// Tags are processed in order and each step sees the output of the
/// previous one, so the order is observable in the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSectionCombinator {
    tags: Vec<String>,
}

impl Default for TagSectionCombinator {
    fn default() -> Self {
        Self::with_tags(DEFAULT_TAGS.iter().copied())
    }
}

impl TagSectionCombinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn combine(&self, source: &str, overlay: &str) -> Result<String, CombineError> {
        let mut output = source.to_string();
        for tag in &self.tags {
            self.combine_section(&mut output, overlay, tag)?;
        }
        Ok(output)
    }

    fn combine_section(&self, output: &mut String, overlay: &str, tag: &str) -> Result<(), CombineError> {
        let Some(incoming) = extract_section(overlay, tag)? else {
            tracing::debug!(tag, "override has no section; skipping");
            return Ok(());
        };
        let existing = extract_section(output, tag)?;

        let edit = match (incoming.operation, existing) {
            (MergeOperation::Replace, None) => {
                return Err(CombineError::MissingReplaceTarget {
                    tag: tag.to_string(),
                });
            }
            (MergeOperation::Replace, Some(current)) => Edit::replace(
                output,
                current.block_start,
                current.block_end,
                incoming.block_text(),
            ),
            (MergeOperation::Merge, _) if incoming.raw_inner_content.is_empty() => {
                tracing::debug!(tag, "override section is empty; nothing to merge");
                return Ok(());
            }
            (MergeOperation::Merge, Some(current)) => Edit::insert(
                current.content_end,
                format!("\n{}", incoming.raw_inner_content),
            ),
            (MergeOperation::Merge, None) => Edit::insert(
                output.len(),
                format!(
                    "\n{}{}</{}>",
                    incoming.open_tag_text, incoming.raw_inner_content, tag
                ),
            ),
        };

        tracing::info!(tag, operation = %incoming.operation, "combining section");
        edit.apply_to(output)?;
        Ok(())
    }
}

/// Combine `source` and `overlay` over `tags`, in order.
pub fn combine(source: &str, overlay: &str, tags: &[&str]) -> Result<String, CombineError> {
    TagSectionCombinator::with_tags(tags.iter().copied()).combine(source, overlay)
}
