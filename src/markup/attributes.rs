//! Attribute lexing inside a single tag head.

use crate::markup::scanner::TagHead;

/// Inner bounds of an attribute value (quotes excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSpan {
    pub start: usize,
    pub end: usize,
    pub quote: Option<u8>,
}

/// One attribute of a tag head.
///
/// `start` includes the whitespace preceding the name, so deleting
/// `[start, end)` removes the attribute without leaving a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub start: usize,
    pub end: usize,
    pub name_start: usize,
    pub name_end: usize,
    pub value: Option<ValueSpan>,
}

impl Attribute {
    pub fn name<'a>(&self, doc: &'a str) -> &'a str {
        &doc[self.name_start..self.name_end]
    }

    /// Raw value text, `None` for a bare attribute such as `disabled`.
    pub fn value<'a>(&self, doc: &'a str) -> Option<&'a str> {
        self.value.map(|v| &doc[v.start..v.end])
    }

    pub fn is_quoted(&self) -> bool {
        self.value.is_some_and(|v| v.quote.is_some())
    }
}

/// Attributes of a tag head plus the offset where new ones are appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHead {
    pub attributes: Vec<Attribute>,
    /// Just past the last attribute (or the tag name), before any whitespace
    /// preceding the delimiter.
    pub insert_at: usize,
}

impl ParsedHead {
    pub fn find(&self, doc: &str, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name(doc) == name)
    }

    pub fn find_all<'s>(&'s self, doc: &'s str, name: &'s str) -> impl Iterator<Item = &'s Attribute> + 's {
        self.attributes.iter().filter(move |a| a.name(doc) == name)
    }
}

fn skip_whitespace(bytes: &[u8], mut i: usize, limit: usize) -> usize {
    while i < limit && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Split a tag head into attributes. Names are taken literally, so Vue-style
/// names (`:class`, `@click.prevent`, `v-bind:[key]`, `#default`) work as-is.
pub fn parse_head(doc: &str, head: &TagHead) -> ParsedHead {
    let bytes = doc.as_bytes();
    let limit = head.delimiter_start;
    let mut attributes = Vec::new();
    let mut i = head.name_end;

    loop {
        let start = i;
        i = skip_whitespace(bytes, i, limit);
        if i >= limit {
            break;
        }

        let name_start = i;
        while i < limit && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' {
            i += 1;
        }
        let name_end = i;
        if name_end == name_start {
            // Stray `=` with no name; step over it.
            i += 1;
            continue;
        }

        let after_name = skip_whitespace(bytes, i, limit);
        let mut value = None;
        let mut end = name_end;
        if after_name < limit && bytes[after_name] == b'=' {
            let value_start = skip_whitespace(bytes, after_name + 1, limit);
            match bytes.get(value_start) {
                Some(&q) if value_start < limit && (q == b'"' || q == b'\'') => {
                    let close = bytes[value_start + 1..limit]
                        .iter()
                        .position(|&b| b == q)
                        .map_or(limit, |p| value_start + 1 + p);
                    value = Some(ValueSpan {
                        start: value_start + 1,
                        end: close,
                        quote: Some(q),
                    });
                    end = (close + 1).min(limit);
                }
                _ => {
                    let mut j = value_start;
                    while j < limit && !bytes[j].is_ascii_whitespace() {
                        j += 1;
                    }
                    value = Some(ValueSpan {
                        start: value_start,
                        end: j,
                        quote: None,
                    });
                    end = j;
                }
            }
        }

        attributes.push(Attribute {
            start,
            end,
            name_start,
            name_end,
            value,
        });
        i = end;
    }

    let insert_at = attributes.last().map_or(head.name_end, |a| a.end);
    ParsedHead {
        attributes,
        insert_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::scanner::{scan_tag_at, TagToken};

    fn parse(doc: &str) -> ParsedHead {
        match scan_tag_at(doc, 0) {
            Some(TagToken::Open(head)) => parse_head(doc, &head),
            other => panic!("expected open tag, got {other:?}"),
        }
    }

    #[test]
    fn parses_quoted_bare_and_unquoted() {
        let doc = r#"<input type="text" disabled value='a b' size=10>"#;
        let head = parse(doc);
        let names: Vec<_> = head.attributes.iter().map(|a| a.name(doc)).collect();
        assert_eq!(names, vec!["type", "disabled", "value", "size"]);
        assert_eq!(head.attributes[0].value(doc), Some("text"));
        assert_eq!(head.attributes[1].value(doc), None);
        assert_eq!(head.attributes[2].value(doc), Some("a b"));
        assert_eq!(head.attributes[3].value(doc), Some("10"));
        assert!(!head.attributes[3].is_quoted());
    }

    #[test]
    fn spaces_around_equals() {
        let doc = r#"<x data-for = "money"></x>"#;
        let head = parse(doc);
        let attr = head.find(doc, "data-for").unwrap();
        assert_eq!(attr.value(doc), Some("money"));
        assert_eq!(&doc[attr.start..attr.end], r#" data-for = "money""#);
    }

    #[test]
    fn vue_attribute_names() {
        let doc = r#"<nice-one :class="a" @click="go" v-bind:[key]="v" #default>"#;
        let head = parse(doc);
        assert!(head.find(doc, ":class").is_some());
        assert!(head.find(doc, "@click").is_some());
        assert!(head.find(doc, "v-bind:[key]").is_some());
        assert!(head.find(doc, "#default").is_some());
        assert!(head.find(doc, "class").is_none());
    }

    #[test]
    fn insert_point_skips_trailing_whitespace() {
        let doc = "<p\n  id=\"my-id\"\n>";
        let head = parse(doc);
        assert_eq!(&doc[..head.insert_at], "<p\n  id=\"my-id\"");

        let doc = "<comp />";
        assert_eq!(parse(doc).insert_at, 5);
        let doc = "<comp/>";
        assert_eq!(parse(doc).insert_at, 5);
    }

    #[test]
    fn values_with_markup_characters() {
        let doc = r#"<div :class="[x < '1' ? 'a' : 'b']" @click="() => go()">"#;
        let head = parse(doc);
        assert_eq!(
            head.find(doc, ":class").unwrap().value(doc),
            Some("[x < '1' ? 'a' : 'b']")
        );
        assert_eq!(head.find(doc, "@click").unwrap().value(doc), Some("() => go()"));
    }
}
