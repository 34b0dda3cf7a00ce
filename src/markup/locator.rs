use crate::markup::attributes::parse_head;
use crate::markup::errors::MarkupError;
use crate::markup::scanner::{tokens, Closing, TagBoundaryScanner, TagHead, TagToken};
use std::fmt;

/// How an element is picked out of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// First element with this tag name
    ByTag(String),
    /// First element carrying this attribute, with or without a value
    ByAttribute(String),
    /// First element whose attribute has exactly this quoted value
    ByAttributeValue { name: String, value: String },
    /// First element inside a root `<template>` wrapper, or the first
    /// element of the document
    First,
}

impl Selector {
    pub fn by_tag(name: impl Into<String>) -> Self {
        Selector::ByTag(name.into())
    }

    pub fn by_attribute(name: impl Into<String>) -> Self {
        Selector::ByAttribute(name.into())
    }

    pub fn by_attribute_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Selector::ByAttributeValue {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn validate(&self) -> Result<(), MarkupError> {
        let missing = match self {
            Selector::ByTag(name) if name.trim().is_empty() => Some("tag name is empty"),
            Selector::ByAttribute(name) if name.trim().is_empty() => {
                Some("attribute name is empty")
            }
            Selector::ByAttributeValue { name, .. } if name.trim().is_empty() => {
                Some("attribute name is empty")
            }
            Selector::ByAttributeValue { value, .. } if value.is_empty() => {
                Some("attribute value is empty")
            }
            _ => None,
        };
        match missing {
            Some(reason) => Err(MarkupError::InvalidSelector {
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::ByTag(name) => write!(f, "<{name}>"),
            Selector::ByAttribute(name) => write!(f, "[{name}]"),
            Selector::ByAttributeValue { name, value } => write!(f, "[{name}=\"{value}\"]"),
            Selector::First => write!(f, "first element"),
        }
    }
}

/// Offsets of one element in a specific document snapshot.
///
/// Valid only against the exact text that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementSpan {
    /// Start of the opening tag (`<`)
    pub start_index: usize,
    /// Just past the opening tag's `>` (or `/>`)
    pub end_index: usize,
    pub tag_name_start_index: usize,
    pub tag_name_end_index: usize,
    /// Matching closing tag; `None` for self-closing and void elements
    pub closing_tag_start_index: Option<usize>,
    pub closing_tag_end_index: Option<usize>,
    pub(crate) head: TagHead,
}

impl ElementSpan {
    fn new(head: TagHead, closing: Option<(usize, usize)>) -> Self {
        Self {
            start_index: head.start,
            end_index: head.end,
            tag_name_start_index: head.name_start,
            tag_name_end_index: head.name_end,
            closing_tag_start_index: closing.map(|(start, _)| start),
            closing_tag_end_index: closing.map(|(_, end)| end),
            head,
        }
    }

    pub fn is_self_closing(&self) -> bool {
        self.closing_tag_start_index.is_none()
    }

    /// End of the whole element: after the closing tag, or after the head.
    pub fn element_end(&self) -> usize {
        self.closing_tag_end_index.unwrap_or(self.end_index)
    }

    pub fn tag_name<'a>(&self, doc: &'a str) -> &'a str {
        &doc[self.tag_name_start_index..self.tag_name_end_index]
    }
}

/// Resolves a [`Selector`] to an [`ElementSpan`] over one document.
pub struct ElementLocator<'a> {
    doc: &'a str,
}

impl<'a> ElementLocator<'a> {
    pub fn new(doc: &'a str) -> Self {
        Self { doc }
    }

    /// Locate the first element matching `selector`.
    pub fn locate(&self, selector: &Selector) -> Result<ElementSpan, MarkupError> {
        selector.validate()?;

        let head = self
            .find_head(selector)
            .ok_or_else(|| MarkupError::ElementNotFound {
                selector: selector.to_string(),
            })?;

        let span = self
            .span_for(head)
            .ok_or_else(|| MarkupError::ElementNotFound {
                selector: selector.to_string(),
            })?;
        tracing::debug!(
            %selector,
            start = span.start_index,
            end = span.element_end(),
            "resolved element"
        );
        Ok(span)
    }

    fn open_tags(&self, from: usize) -> impl Iterator<Item = TagHead> + 'a {
        tokens(self.doc, from).filter_map(|token| match token {
            TagToken::Open(head) => Some(head),
            _ => None,
        })
    }

    fn find_head(&self, selector: &Selector) -> Option<TagHead> {
        let doc = self.doc;
        match selector {
            Selector::ByTag(name) => self.open_tags(0).find(|h| h.name(doc) == name),
            Selector::ByAttribute(name) => self
                .open_tags(0)
                .find(|h| parse_head(doc, h).find(doc, name).is_some()),
            Selector::ByAttributeValue { name, value } => self.open_tags(0).find(|h| {
                parse_head(doc, h)
                    .find_all(doc, name)
                    .any(|a| a.is_quoted() && a.value(doc) == Some(value.as_str()))
            }),
            Selector::First => self.first_element(),
        }
    }

    /// First element strictly inside a root `<template>`, or the first
    /// element of the document when it does not open with one. Nested slot
    /// templates never count as the wrapper.
    fn first_element(&self) -> Option<TagHead> {
        let doc = self.doc;
        let first = self.open_tags(0).next()?;
        if first.name(doc) != "template" || first.self_closing {
            return Some(first);
        }
        let template = first;

        let bounds = TagBoundaryScanner::new(doc).match_element(template.start)?;
        let Closing::Explicit { start: close, .. } = bounds.closing else {
            return None;
        };
        self.open_tags(template.end).next().filter(|h| h.start < close)
    }

    /// `None` when a non-void element never balances.
    fn span_for(&self, head: TagHead) -> Option<ElementSpan> {
        if head.self_closing {
            return Some(ElementSpan::new(head, None));
        }
        match TagBoundaryScanner::new(self.doc).match_element(head.start) {
            Some(bounds) => match bounds.closing {
                Closing::Explicit { start, end } => Some(ElementSpan::new(head, Some((start, end)))),
                Closing::SelfClosing { .. } | Closing::Void => Some(ElementSpan::new(head, None)),
            },
            None => {
                tracing::warn!(
                    tag = head.name(self.doc),
                    offset = head.start,
                    "element is never closed"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locate(doc: &str, selector: Selector) -> Result<ElementSpan, MarkupError> {
        ElementLocator::new(doc).locate(&selector)
    }

    fn code(doc: &str, span: &ElementSpan) -> String {
        doc[span.start_index..span.element_end()].to_string()
    }

    #[test]
    fn by_tag_requires_name_boundary() {
        let doc = "<divider></divider><div id=\"x\"></div>";
        let span = locate(doc, Selector::by_tag("div")).unwrap();
        assert_eq!(code(doc, &span), "<div id=\"x\"></div>");
    }

    #[test]
    fn by_tag_pairs_outer_close_under_nesting() {
        let doc = "<a><b><a></a></b></a>";
        let span = locate(doc, Selector::by_tag("a")).unwrap();
        assert_eq!(span.closing_tag_start_index, Some(17));
        assert_eq!(span.closing_tag_end_index, Some(21));
    }

    #[test]
    fn quoted_markup_characters_do_not_break_boundaries() {
        let doc = r#"<div :class="[x < '1' ? 'a' : 'b']"><span>=></span></div><p></p>"#;
        let span = locate(doc, Selector::by_tag("div")).unwrap();
        assert_eq!(
            code(doc, &span),
            r#"<div :class="[x < '1' ? 'a' : 'b']"><span>=></span></div>"#
        );
    }

    #[test]
    fn by_attribute_matches_bare_and_valued() {
        let doc = r#"<div class="foo" data-qa-info></div>"#;
        assert!(locate(doc, Selector::by_attribute("data-qa-info")).is_ok());
        assert!(locate(doc, Selector::by_attribute("class")).is_ok());
    }

    #[test]
    fn by_attribute_rejects_partial_names() {
        let doc = "<div data-attr-foo-bar></div>";
        assert!(matches!(
            locate(doc, Selector::by_attribute("class")),
            Err(MarkupError::ElementNotFound { .. })
        ));
        assert!(matches!(
            locate(doc, Selector::by_attribute("data-attr")),
            Err(MarkupError::ElementNotFound { .. })
        ));
    }

    #[test]
    fn by_attribute_value_requires_exact_value() {
        let doc = r#"<x data-for="mo"></x><y data-for="money"></y>"#;
        let span = locate(doc, Selector::by_attribute_value("data-for", "money")).unwrap();
        assert_eq!(span.tag_name(doc), "y");

        let doc = r#"<x data-for="money"></x>"#;
        assert!(matches!(
            locate(doc, Selector::by_attribute_value("data-for", "mo")),
            Err(MarkupError::ElementNotFound { .. })
        ));
        let doc = "<x data-for></x>";
        assert!(matches!(
            locate(doc, Selector::by_attribute_value("data-for", "money")),
            Err(MarkupError::ElementNotFound { .. })
        ));
    }

    #[test]
    fn first_descends_into_template() {
        let doc = "<!-- lead --><template><div><span></span></div></template>";
        let span = locate(doc, Selector::First).unwrap();
        assert_eq!(code(doc, &span), "<div><span></span></div>");
    }

    #[test]
    fn first_without_template_picks_first_tag() {
        let doc = "<!-- comment --><component/>";
        let span = locate(doc, Selector::First).unwrap();
        assert!(span.is_self_closing());
        assert_eq!(code(doc, &span), "<component/>");
    }

    #[test]
    fn first_in_empty_template_is_not_found() {
        let doc = "<template>text only</template>";
        assert!(matches!(
            locate(doc, Selector::First),
            Err(MarkupError::ElementNotFound { .. })
        ));
    }

    #[test]
    fn invalid_selectors_are_rejected() {
        assert!(matches!(
            locate("<a></a>", Selector::by_tag("")),
            Err(MarkupError::InvalidSelector { .. })
        ));
        assert!(matches!(
            locate("<a></a>", Selector::by_attribute_value("id", "")),
            Err(MarkupError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn unclosed_element_is_not_found() {
        let doc = "<div><span>";
        assert!(matches!(
            locate(doc, Selector::by_tag("div")),
            Err(MarkupError::ElementNotFound { .. })
        ));
        let doc = "<p><div></p>";
        assert!(matches!(
            locate(doc, Selector::by_tag("div")),
            Err(MarkupError::ElementNotFound { .. })
        ));
    }

    #[test]
    fn first_ignores_nested_slot_template() {
        let doc = r#"<div class="card"><template #footer><span/></template></div>"#;
        let span = locate(doc, Selector::First).unwrap();
        assert_eq!(code(doc, &span), doc);
    }

    #[test]
    fn first_skips_leading_comment_before_template() {
        let doc = "<!-- x -->\n<template>\n  <section><template #a><b/></template></section>\n</template>";
        let span = locate(doc, Selector::First).unwrap();
        assert_eq!(span.tag_name(doc), "section");
    }

    #[test]
    fn void_element_without_slash() {
        let doc = r#"<p><input type="text"></p>"#;
        let span = locate(doc, Selector::by_tag("input")).unwrap();
        assert!(span.is_self_closing());
        assert_eq!(code(doc, &span), r#"<input type="text">"#);
    }
}
