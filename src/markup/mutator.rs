use crate::edit::Edit;
use crate::markup::attributes::{parse_head, Attribute, ParsedHead};
use crate::markup::errors::MarkupError;
use crate::markup::locator::{ElementLocator, ElementSpan, Selector};
use regex::Regex;

/// Chainable editor over one document with a sticky selector.
///
/// The selector is re-resolved against the live document before every
/// operation, so edits made earlier in a chain are visible to later ones and
/// no span is ever reused after the text it came from has changed. Each
/// editing step consumes the mutator and returns it again, so a failing step
/// short-circuits the chain with `?`.
///
/// ```
/// use kombinator::ElementMutator;
///
/// # fn main() -> Result<(), kombinator::MarkupError> {
/// let out = ElementMutator::from_template(r#"<div class="foo"></div><div class="foo"></div>"#)
///     .find_by_tag("div")
///     .extend_attribute("class", "bar", " ")?
///     .into_template()?;
/// assert_eq!(out, r#"<div class="foo bar"></div><div class="foo"></div>"#);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
#[must_use = "ElementMutator does nothing until an operation or template() is called"]
pub struct ElementMutator {
    original: String,
    document: String,
    selector: Option<Selector>,
}

/// Snapshot handed to each operation: the fresh span and its parsed head.
struct Target {
    span: ElementSpan,
    head: ParsedHead,
}

impl ElementMutator {
    pub fn from_template(template: impl Into<String>) -> Self {
        let document = template.into();
        Self {
            original: document.clone(),
            document,
            selector: None,
        }
    }

    pub fn find_by_tag(self, name: impl Into<String>) -> Self {
        self.with_selector(Selector::by_tag(name))
    }

    pub fn find_by_attribute(self, name: impl Into<String>) -> Self {
        self.with_selector(Selector::by_attribute(name))
    }

    pub fn find_by_attribute_value(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_selector(Selector::by_attribute_value(name, value))
    }

    pub fn find_first(self) -> Self {
        self.with_selector(Selector::First)
    }

    /// Replace the sticky selector. Resolution is deferred to the next call.
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn selector(&self) -> Option<&Selector> {
        self.selector.as_ref()
    }

    /// Live document text, without a resolution pass.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Resolve the sticky selector against the live document.
    pub fn locate(&self) -> Result<ElementSpan, MarkupError> {
        let selector = self.selector.as_ref().ok_or_else(|| MarkupError::InvalidSelector {
            reason: "no selector set; call a find_* method first".to_string(),
        })?;
        ElementLocator::new(&self.document).locate(selector)
    }

    fn target(&self) -> Result<Target, MarkupError> {
        let span = self.locate()?;
        let head = parse_head(&self.document, &span.head);
        Ok(Target { span, head })
    }

    /// Final document text.
    ///
    /// When nothing has changed yet, the selector is still resolved so a
    /// missing or unmatched selector surfaces as an error.
    pub fn template(&self) -> Result<&str, MarkupError> {
        if self.document == self.original {
            self.locate()?;
        }
        Ok(&self.document)
    }

    pub fn into_template(self) -> Result<String, MarkupError> {
        self.template()?;
        Ok(self.document)
    }

    /// Exact text of the selected element, opening tag through closing tag.
    pub fn element_code(&self) -> Result<&str, MarkupError> {
        let span = self.locate()?;
        Ok(&self.document[span.start_index..span.element_end()])
    }

    /// Current value of `name` on the selected element; empty when absent.
    pub fn attribute_value(&self, name: &str) -> Result<String, MarkupError> {
        let target = self.target()?;
        Ok(target
            .head
            .find(&self.document, name)
            .and_then(|a| a.value(&self.document))
            .unwrap_or_default()
            .to_string())
    }

    fn splice(mut self, operation: &'static str, edits: Vec<Edit>) -> Result<Self, MarkupError> {
        if edits.is_empty() {
            tracing::debug!(operation, "no-op");
            return Ok(self);
        }
        tracing::debug!(operation, edits = edits.len(), "splicing");
        Edit::apply_batch(edits, &mut self.document)?;
        Ok(self)
    }

    /// Edit writing `value` as the value of an existing attribute. The
    /// current quote style is kept unless the value contains that quote.
    fn value_edit(&self, attr: &Attribute, value: &str) -> Edit {
        let doc = &self.document;
        match attr.value {
            Some(span) => match span.quote {
                Some(quote) if !value.contains(char::from(quote)) => {
                    Edit::replace(doc, span.start, span.end, value)
                }
                Some(quote) => {
                    let close = if doc.as_bytes().get(span.end) == Some(&quote) {
                        span.end + 1
                    } else {
                        span.end
                    };
                    Edit::replace(doc, span.start - 1, close, quote_value(value, quote))
                }
                None => Edit::replace(doc, span.start, span.end, quote_value(value, b'"')),
            },
            None => Edit::insert(attr.name_end, format!("={}", quote_value(value, b'"'))),
        }
    }

    fn new_attribute_edit(&self, head: &ParsedHead, name: &str, value: &str) -> Edit {
        Edit::insert(head.insert_at, format!(" {name}={}", quote_value(value, b'"')))
    }

    fn removal_edit(&self, attr: &Attribute) -> Edit {
        Edit::replace(&self.document, attr.start, attr.end, "")
    }

    pub fn set_attribute(self, name: &str, value: &str) -> Result<Self, MarkupError> {
        let target = self.target()?;
        let edit = match target.head.find(&self.document, name) {
            Some(attr) => self.value_edit(attr, value),
            None => self.new_attribute_edit(&target.head, name, value),
        };
        self.splice("set_attribute", vec![edit])
    }

    pub fn remove_attribute(self, name: &str) -> Result<Self, MarkupError> {
        let target = self.target()?;
        let edits = target
            .head
            .find_all(&self.document, name)
            .map(|attr| self.removal_edit(attr))
            .collect();
        self.splice("remove_attribute", edits)
    }

    /// Remove the first occurrence of `token` from the value, trimming the
    /// result; an emptied attribute is removed entirely.
    pub fn reduce_attribute(self, name: &str, token: &str) -> Result<Self, MarkupError> {
        let target = self.target()?;
        let doc = &self.document;
        let edits = target
            .head
            .find_all(doc, name)
            .filter_map(|attr| {
                let current = attr.value(doc)?;
                let reduced = current.replacen(token, "", 1);
                let reduced = reduced.trim();
                if reduced.is_empty() {
                    Some(self.removal_edit(attr))
                } else if reduced != current {
                    Some(self.value_edit(attr, reduced))
                } else {
                    None
                }
            })
            .collect();
        self.splice("reduce_attribute", edits)
    }

    /// Append `value` to the attribute joined by `glue`, creating it when absent.
    pub fn extend_attribute(self, name: &str, value: &str, glue: &str) -> Result<Self, MarkupError> {
        let target = self.target()?;
        let doc = &self.document;
        let value = value.trim();
        let mut edits: Vec<Edit> = target
            .head
            .find_all(doc, name)
            .map(|attr| {
                let current = attr.value(doc).unwrap_or_default().trim();
                if current.is_empty() {
                    self.value_edit(attr, value)
                } else {
                    self.value_edit(attr, &format!("{current}{glue}{value}"))
                }
            })
            .collect();
        if edits.is_empty() {
            edits.push(self.new_attribute_edit(&target.head, name, value));
        }
        self.splice("extend_attribute", edits)
    }

    /// Rewrite the attribute value with a regex substitution (all matches).
    pub fn regexp_attribute(self, name: &str, pattern: &Regex, replacement: &str) -> Result<Self, MarkupError> {
        let target = self.target()?;
        let attr = target
            .head
            .find(&self.document, name)
            .ok_or_else(|| MarkupError::AttributeNotFound {
                name: name.to_string(),
            })?;
        let current = attr.value(&self.document);
        let replaced = pattern
            .replace_all(current.unwrap_or_default(), replacement)
            .into_owned();
        if current == Some(replaced.as_str()) {
            return self.splice("regexp_attribute", Vec::new());
        }
        let edit = self.value_edit(attr, &replaced);
        self.splice("regexp_attribute", vec![edit])
    }

    /// Feed the current value (empty when absent) through `transform`;
    /// `None` removes the attribute, `Some(v)` sets it to `v`.
    pub fn transform_attribute_value<F>(self, name: &str, transform: F) -> Result<Self, MarkupError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let current = self.attribute_value(name)?;
        match transform(&current) {
            Some(value) => self.set_attribute(name, &value),
            None => self.remove_attribute(name),
        }
    }

    /// Delete the element, opening tag through matching closing tag.
    pub fn remove_element(self) -> Result<Self, MarkupError> {
        let span = self.locate()?;
        let edit = Edit::replace(&self.document, span.start_index, span.element_end(), "");
        self.splice("remove_element", vec![edit])
    }

    /// Rename the element; the closing tag follows when there is one.
    pub fn rename_element(self, new_name: &str) -> Result<Self, MarkupError> {
        let malformed = |c: char| c.is_whitespace() || matches!(c, '<' | '>' | '/');
        if new_name.is_empty() || new_name.contains(malformed) {
            return Err(MarkupError::UnsupportedOperation {
                operation: "rename_element",
                reason: format!("tag name {new_name:?}"),
            });
        }
        let span = self.locate()?;
        let doc = &self.document;
        let old_name = span.tag_name(doc);
        let mut edits = vec![Edit::new(
            span.tag_name_start_index,
            span.tag_name_end_index,
            new_name,
            old_name,
        )];
        if let Some(close) = span.closing_tag_start_index {
            let name_start = close + 2;
            edits.push(Edit::new(name_start, name_start + old_name.len(), new_name, old_name));
        }
        self.splice("rename_element", edits)
    }

    pub fn insert_before(self, html: &str) -> Result<Self, MarkupError> {
        let span = self.locate()?;
        self.splice("insert_before", vec![Edit::insert(span.start_index, html)])
    }

    pub fn insert_after(self, html: &str) -> Result<Self, MarkupError> {
        let span = self.locate()?;
        self.splice("insert_after", vec![Edit::insert(span.element_end(), html)])
    }

    /// Insert `html` as the last child, just before the closing tag.
    pub fn insert_inside(self, html: &str) -> Result<Self, MarkupError> {
        let span = self.locate()?;
        let Some(close) = span.closing_tag_start_index else {
            return Err(MarkupError::UnsupportedOperation {
                operation: "insert_inside",
                reason: "self closing tags".to_string(),
            });
        };
        self.splice("insert_inside", vec![Edit::insert(close, html)])
    }

    /// Replace the element with its inner content. Childless elements are
    /// removed.
    pub fn unwrap_element(self) -> Result<Self, MarkupError> {
        let span = self.locate()?;
        let (Some(close_start), Some(close_end)) =
            (span.closing_tag_start_index, span.closing_tag_end_index)
        else {
            return self.remove_element();
        };
        let doc = &self.document;
        let edits = vec![
            Edit::replace(doc, close_start, close_end, ""),
            Edit::replace(doc, span.start_index, span.end_index, ""),
        ];
        self.splice("unwrap_element", edits)
    }
}

/// Wrap `value` in `preferred` quotes, switching to the other quote when the
/// value contains the preferred one, and escaping when it contains both.
fn quote_value(value: &str, preferred: u8) -> String {
    let (quote, other) = if preferred == b'\'' { ('\'', '"') } else { ('"', '\'') };
    if !value.contains(quote) {
        format!("{quote}{value}{quote}")
    } else if !value.contains(other) {
        format!("{other}{value}{other}")
    } else {
        let entity = if quote == '"' { "&quot;" } else { "&#39;" };
        format!("{quote}{}{quote}", value.replace(quote, entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(doc: &str) -> ElementMutator {
        ElementMutator::from_template(doc)
    }

    #[test]
    fn template_without_selector_is_invalid() {
        assert!(matches!(
            edit("<div></div>").template(),
            Err(MarkupError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn template_surfaces_unmatched_selector() {
        let result = edit(r#"<div class="foo"></div>"#).find_by_tag("span").into_template();
        assert!(matches!(result, Err(MarkupError::ElementNotFound { .. })));
    }

    #[test]
    fn set_attribute_replaces_or_appends() {
        let out = edit(r#"<div class="foo" id="bar"></div>"#)
            .find_by_attribute("id")
            .set_attribute("id", "baz")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, r#"<div class="foo" id="baz"></div>"#);

        let out = edit(r#"<input type="text"/>"#)
            .find_by_tag("input")
            .set_attribute("id", "foo")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, r#"<input type="text" id="foo"/>"#);
    }

    #[test]
    fn set_attribute_on_bare_and_unquoted() {
        let out = edit("<input disabled size=3>")
            .find_by_tag("input")
            .set_attribute("disabled", "true")
            .unwrap()
            .set_attribute("size", "4")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, r#"<input disabled="true" size="4">"#);
    }

    #[test]
    fn values_containing_the_active_quote_switch_quotes() {
        let out = edit("<a title='x'></a>")
            .find_by_tag("a")
            .set_attribute("title", "it's")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, r#"<a title="it's"></a>"#);

        let out = edit(r#"<a :href="url"></a>"#)
            .find_by_tag("a")
            .set_attribute(":href", r#"link("home")"#)
            .unwrap()
            .set_attribute("data-x", r#"say "hi""#)
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, r#"<a :href='link("home")' data-x='say "hi"'></a>"#);

        let out = edit("<a></a>")
            .find_by_tag("a")
            .set_attribute("title", r#"it's "x""#)
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, r#"<a title="it's &quot;x&quot;"></a>"#);

        // The head still parses: the next attribute is found intact.
        let out = edit(r#"<a title="x" id="y"></a>"#)
            .find_by_tag("a")
            .set_attribute("title", r#"a"b"#)
            .unwrap()
            .find_by_attribute_value("id", "y")
            .set_attribute("id", "z")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, r#"<a title='a"b' id="z"></a>"#);
    }

    #[test]
    fn set_attribute_same_value_is_byte_identical() {
        let doc = r#"<div class="foo" id="bar"></div>"#;
        let out = edit(doc)
            .find_by_attribute("id")
            .set_attribute("id", "bar")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, doc);
    }

    #[test]
    fn remove_attribute_with_complex_value() {
        let out = edit(r#"<comp class="foo" :some="value1 value2"></comp>"#)
            .find_by_attribute_value("class", "foo")
            .remove_attribute(":some")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, r#"<comp class="foo"></comp>"#);
    }

    #[test]
    fn reduce_attribute_keeps_inner_spacing() {
        let out = edit(r#"<div class="foo   bar   baz"></div>"#)
            .find_by_attribute("class")
            .reduce_attribute("class", "bar")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, r#"<div class="foo      baz"></div>"#);
    }

    #[test]
    fn reduce_attribute_to_empty_removes_it() {
        let out = edit(r#"<div class="foo"></div>"#)
            .find_by_attribute("class")
            .reduce_attribute("class", "foo")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, "<div></div>");
    }

    #[test]
    fn extend_attribute_with_custom_glue() {
        let out = edit(r#"<template><div id="test" class="old-class"></div></template>"#)
            .find_by_tag("div")
            .extend_attribute("class", "new-class", " xD ")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(
            out,
            r#"<template><div id="test" class="old-class xD new-class"></div></template>"#
        );
    }

    #[test]
    fn extend_attribute_on_self_closing_deep_child() {
        let out = edit("<template><nice-one><div><other/><br/></div></nice-one></template>")
            .find_by_tag("other")
            .extend_attribute(":class", "new-class", " ")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(
            out,
            r#"<template><nice-one><div><other :class="new-class"/><br/></div></nice-one></template>"#
        );
    }

    #[test]
    fn regexp_attribute_replaces_all_matches() {
        let re = Regex::new("mon").unwrap();
        let out = edit(r#"<some-component data-for="money"></some-component>"#)
            .find_by_tag("some-component")
            .regexp_attribute("data-for", &re, "h")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, r#"<some-component data-for="hey"></some-component>"#);
    }

    #[test]
    fn regexp_attribute_requires_attribute() {
        let re = Regex::new("x").unwrap();
        let result = edit("<div></div>").find_by_tag("div").regexp_attribute("id", &re, "y");
        assert!(matches!(result, Err(MarkupError::AttributeNotFound { .. })));
    }

    #[test]
    fn attribute_value_and_transform() {
        let m = edit(r#"<a href="/x" rel="nofollow"></a>"#).find_by_tag("a");
        assert_eq!(m.attribute_value("href").unwrap(), "/x");
        assert_eq!(m.attribute_value("target").unwrap(), "");

        let out = m
            .transform_attribute_value("href", |v| Some(format!("/shop{v}")))
            .unwrap()
            .transform_attribute_value("rel", |_| None)
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, r#"<a href="/shop/x"></a>"#);
    }

    #[test]
    fn remove_and_unwrap_elements() {
        let doc = "<div class=\"container\"><h1>Hi</h1><component/><p>Lorem</p></div>";
        let out = edit(doc).find_by_tag("h1").remove_element().unwrap().into_template().unwrap();
        assert_eq!(out, "<div class=\"container\"><component/><p>Lorem</p></div>");

        let out = edit(doc).find_by_tag("div").unwrap_element().unwrap().into_template().unwrap();
        assert_eq!(out, "<h1>Hi</h1><component/><p>Lorem</p>");
    }

    #[test]
    fn unwrap_self_closing_equals_remove() {
        let doc = "<div><component/><p></p></div>";
        let unwrapped = edit(doc).find_by_tag("component").unwrap_element().unwrap();
        let removed = edit(doc).find_by_tag("component").remove_element().unwrap();
        assert_eq!(unwrapped.document(), removed.document());
        assert_eq!(unwrapped.document(), "<div><p></p></div>");
    }

    #[test]
    fn rename_element_updates_both_tags() {
        let out = edit("<div><b>x</b><b/></div>")
            .find_by_tag("b")
            .rename_element("strong")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, "<div><strong>x</strong><b/></div>");

        let out = edit("<x><comp/></x>")
            .find_by_tag("comp")
            .rename_element("other-comp")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, "<x><other-comp/></x>");
    }

    #[test]
    fn insert_around_and_inside() {
        let doc = "<div><h1>Hello</h1><component/><p>Lorem.</p></div>";
        let out = edit(doc)
            .find_by_tag("h1")
            .insert_before("<h2>A</h2>")
            .unwrap()
            .find_by_tag("component")
            .insert_after("<h2>B</h2>")
            .unwrap()
            .find_by_tag("p")
            .insert_inside("<strong>bold</strong>")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(
            out,
            "<div><h2>A</h2><h1>Hello</h1><component/><h2>B</h2><p>Lorem.<strong>bold</strong></p></div>"
        );
    }

    #[test]
    fn insert_inside_self_closing_is_unsupported() {
        let result = edit("<div><component/></div>")
            .find_by_tag("component")
            .insert_inside("<b></b>");
        let err = result.unwrap_err();
        assert!(matches!(err, MarkupError::UnsupportedOperation { .. }));
        assert_eq!(err.to_string(), "insert_inside does not support self closing tags");
    }

    #[test]
    fn element_code_matches_element() {
        let m = edit(r#"<ul><li id="a">one</li><li>two</li></ul>"#).find_by_attribute("id");
        assert_eq!(m.element_code().unwrap(), r#"<li id="a">one</li>"#);
    }

    #[test]
    fn wrap_with_sticky_selector_switching() {
        let doc = "<template>\n<h1>Hello, world!</h1>\n<component/>\n</template>";
        let out = edit(doc)
            .find_by_tag("h1")
            .insert_before("<div class=\"container\">")
            .unwrap()
            .find_by_tag("component")
            .insert_after("</div>")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(
            out,
            "<template>\n<div class=\"container\"><h1>Hello, world!</h1>\n<component/></div>\n</template>"
        );
    }

    #[test]
    fn chained_finds_move_between_elements() {
        let out = edit(r#"<div><p class="foo">Hello world</p><p class="bar">Hello again</p></div>"#)
            .find_by_tag("p")
            .remove_attribute("class")
            .unwrap()
            .find_by_attribute_value("class", "bar")
            .extend_attribute("class", "baz", " ")
            .unwrap()
            .into_template()
            .unwrap();
        assert_eq!(out, r#"<div><p>Hello world</p><p class="bar baz">Hello again</p></div>"#);
    }
}
