use crate::combine::errors::CombineError;
use crate::markup::attributes::parse_head;
use crate::markup::scanner::{tokens, Closing, TagBoundaryScanner, TagToken};
use std::fmt;
use std::str::FromStr;

/// Attribute names carrying the merge directive on an override section.
pub const DIRECTIVE_ATTRIBUTES: &[&str] = &["kombinator", "kom"];

/// Tag replaced (rather than merged) when no directive is given.
const ROOT_STRUCTURE_TAG: &str = "template";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOperation {
    Merge,
    Replace,
}

impl MergeOperation {
    pub fn default_for(tag: &str) -> Self {
        if tag == ROOT_STRUCTURE_TAG {
            MergeOperation::Replace
        } else {
            MergeOperation::Merge
        }
    }
}

impl FromStr for MergeOperation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "merge" => Ok(MergeOperation::Merge),
            "replace" => Ok(MergeOperation::Replace),
            _ => Err(()),
        }
    }
}

impl fmt::Display for MergeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeOperation::Merge => write!(f, "merge"),
            MergeOperation::Replace => write!(f, "replace"),
        }
    }
}

/// The first top-level `<tag ...>...</tag>` block of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeDirective {
    pub tag_name: String,
    pub operation: MergeOperation,
    pub raw_inner_content: String,
    /// Opening tag with the directive attribute stripped
    pub open_tag_text: String,
    pub closing_tag_text: String,
    pub block_start: usize,
    pub block_end: usize,
    pub content_start: usize,
    pub content_end: usize,
}

impl MergeDirective {
    /// The whole block as it should appear in an output document.
    pub fn block_text(&self) -> String {
        format!(
            "{}{}{}",
            self.open_tag_text, self.raw_inner_content, self.closing_tag_text
        )
    }
}

/// Extract the first `<tag>` section of `doc`, with its merge directive.
///
/// Returns `Ok(None)` when the document has no closed `<tag>` section.
pub fn extract_section(doc: &str, tag: &str) -> Result<Option<MergeDirective>, CombineError> {
    let Some(head) = tokens(doc, 0).find_map(|token| match token {
        TagToken::Open(head) if !head.self_closing && head.name(doc) == tag => Some(head),
        _ => None,
    }) else {
        return Ok(None);
    };

    let Some(bounds) = TagBoundaryScanner::new(doc).match_element(head.start) else {
        return Ok(None);
    };
    let Closing::Explicit {
        start: close_start,
        end: close_end,
    } = bounds.closing
    else {
        return Ok(None);
    };

    let parsed = parse_head(doc, &head);
    let directive = parsed
        .attributes
        .iter()
        .find(|a| DIRECTIVE_ATTRIBUTES.contains(&a.name(doc)));

    let (operation, open_tag_text) = match directive {
        Some(attr) => {
            let value = attr.value(doc).unwrap_or_default();
            let operation = value
                .parse::<MergeOperation>()
                .map_err(|()| CombineError::UnknownDirective {
                    tag: tag.to_string(),
                    value: value.to_string(),
                })?;
            let open = format!("{}{}", &doc[head.start..attr.start], &doc[attr.end..head.end]);
            (operation, open)
        }
        None => (MergeOperation::default_for(tag), head.text(doc).to_string()),
    };

    Ok(Some(MergeDirective {
        tag_name: tag.to_string(),
        operation,
        raw_inner_content: doc[head.end..close_start].to_string(),
        open_tag_text,
        closing_tag_text: doc[close_start..close_end].to_string(),
        block_start: head.start,
        block_end: close_end,
        content_start: head.end,
        content_end: close_start,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_section_with_default_merge() {
        let doc = "<template><div/></template><style scoped>.a{}</style><style>.b{}</style>";
        let style = extract_section(doc, "style").unwrap().unwrap();
        assert_eq!(style.operation, MergeOperation::Merge);
        assert_eq!(style.raw_inner_content, ".a{}");
        assert_eq!(style.open_tag_text, "<style scoped>");
        assert_eq!(&doc[style.block_start..style.block_end], "<style scoped>.a{}</style>");
    }

    #[test]
    fn template_defaults_to_replace() {
        let doc = "<template><div/></template>";
        let template = extract_section(doc, "template").unwrap().unwrap();
        assert_eq!(template.operation, MergeOperation::Replace);
    }

    #[test]
    fn nested_templates_pair_outer_close() {
        let doc = "<template><template v-if=\"x\"><a/></template></template>";
        let template = extract_section(doc, "template").unwrap().unwrap();
        assert_eq!(template.block_end, doc.len());
    }

    #[test]
    fn directive_attribute_is_read_and_stripped() {
        let doc = r#"<style lang="scss" kombinator="replace">.x{}</style>"#;
        let style = extract_section(doc, "style").unwrap().unwrap();
        assert_eq!(style.operation, MergeOperation::Replace);
        assert_eq!(style.open_tag_text, r#"<style lang="scss">"#);

        let doc = r#"<script kom="merge">let a = 1;</script>"#;
        let script = extract_section(doc, "script").unwrap().unwrap();
        assert_eq!(script.operation, MergeOperation::Merge);
        assert_eq!(script.block_text(), "<script>let a = 1;</script>");
    }

    #[test]
    fn unknown_directive_is_an_error() {
        let doc = r#"<style kombinator="append">.x{}</style>"#;
        assert!(matches!(
            extract_section(doc, "style"),
            Err(CombineError::UnknownDirective { .. })
        ));
    }

    #[test]
    fn script_content_with_markup_is_opaque() {
        let doc = "<script>const t = '</div><style>';</script><style>.a{}</style>";
        let style = extract_section(doc, "style").unwrap().unwrap();
        assert_eq!(style.raw_inner_content, ".a{}");
    }

    #[test]
    fn missing_section() {
        assert_eq!(extract_section("<template></template>", "style").unwrap(), None);
    }
}
