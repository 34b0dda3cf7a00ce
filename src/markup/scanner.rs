//! Incremental tag classification over raw markup.
//!
//! No tree is built. Callers ask for the token starting at a `<`, or walk
//! tokens in document order, and pair open/close tags with an explicit depth
//! stack. Tag heads are scanned quote-aware so `>`, `<` and `=>` inside
//! attribute values never terminate a tag.

/// Elements that never carry a closing tag, even when written without `/>`.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose content is raw text; tags inside them are not markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// An opening (or self-closing) tag head: `<name attr="v" ...>` or `.../>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHead {
    /// Offset of the `<`
    pub start: usize,
    /// Offset just past the terminating `>`
    pub end: usize,
    pub name_start: usize,
    pub name_end: usize,
    /// Offset of the terminating delimiter (`/` of `/>`, or `>`)
    pub delimiter_start: usize,
    pub self_closing: bool,
}

impl TagHead {
    pub fn name<'a>(&self, doc: &'a str) -> &'a str {
        &doc[self.name_start..self.name_end]
    }

    pub fn text<'a>(&self, doc: &'a str) -> &'a str {
        &doc[self.start..self.end]
    }
}

/// A tag-like region recognized at a `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagToken {
    Open(TagHead),
    Close {
        start: usize,
        end: usize,
        name_start: usize,
        name_end: usize,
    },
    /// `<!-- ... -->`
    Comment { start: usize, end: usize },
    /// `<!DOCTYPE ...>`, `<?xml ...?>` and friends
    Declaration { start: usize, end: usize },
}

impl TagToken {
    pub fn end(&self) -> usize {
        match self {
            TagToken::Open(head) => head.end,
            TagToken::Close { end, .. }
            | TagToken::Comment { end, .. }
            | TagToken::Declaration { end, .. } => *end,
        }
    }
}

fn is_name_terminator(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

/// Read a tag name starting at `from`. Names begin with an ASCII letter.
fn scan_name(bytes: &[u8], from: usize) -> Option<usize> {
    if !bytes.get(from)?.is_ascii_alphabetic() {
        return None;
    }
    let mut i = from + 1;
    while i < bytes.len() && !is_name_terminator(bytes[i]) && bytes[i] != b'<' {
        i += 1;
    }
    Some(i)
}

/// Find the delimiter terminating a tag head, starting after the tag name.
///
/// Returns `(delimiter_start, end, self_closing)`. Quotes only open after `=`
/// so stray apostrophes in attribute names do not swallow the rest of the
/// document.
fn scan_head_end(bytes: &[u8], from: usize) -> Option<(usize, usize, bool)> {
    let mut i = from;
    let mut after_eq = false;
    while i < bytes.len() {
        match bytes[i] {
            q @ (b'"' | b'\'') if after_eq => {
                let close = bytes[i + 1..].iter().position(|&b| b == q)?;
                i += close + 2;
                after_eq = false;
                continue;
            }
            b'=' => after_eq = true,
            b'>' => {
                let self_closing = i > from && bytes[i - 1] == b'/';
                let delimiter_start = if self_closing { i - 1 } else { i };
                return Some((delimiter_start, i + 1, self_closing));
            }
            b if b.is_ascii_whitespace() => {}
            _ => after_eq = false,
        }
        i += 1;
    }
    None
}

/// Classify the tag-like region starting at `lt`, which must be a `<`.
///
/// Returns `None` when the `<` does not start a tag (`a < b`, `<3`) or when
/// the tag head is never terminated.
pub fn scan_tag_at(doc: &str, lt: usize) -> Option<TagToken> {
    let bytes = doc.as_bytes();
    if bytes.get(lt) != Some(&b'<') {
        return None;
    }

    match bytes.get(lt + 1)? {
        b'/' => {
            let name_start = lt + 2;
            let name_end = scan_name(bytes, name_start)?;
            let close = bytes[name_end..].iter().position(|&b| b == b'>')?;
            Some(TagToken::Close {
                start: lt,
                end: name_end + close + 1,
                name_start,
                name_end,
            })
        }
        b'!' if doc[lt..].starts_with("<!--") => {
            let end = doc[lt + 4..]
                .find("-->")
                .map_or(doc.len(), |pos| lt + 4 + pos + 3);
            Some(TagToken::Comment { start: lt, end })
        }
        b'!' | b'?' => {
            let end = doc[lt..].find('>').map_or(doc.len(), |pos| lt + pos + 1);
            Some(TagToken::Declaration { start: lt, end })
        }
        _ => {
            let name_start = lt + 1;
            let name_end = scan_name(bytes, name_start)?;
            let (delimiter_start, end, self_closing) = scan_head_end(bytes, name_end)?;
            Some(TagToken::Open(TagHead {
                start: lt,
                end,
                name_start,
                name_end,
                delimiter_start,
                self_closing,
            }))
        }
    }
}

/// Iterator over tag tokens in document order.
///
/// Content of raw-text elements (`script`, `style`) is skipped up to the
/// matching closing tag.
pub struct TagTokens<'a> {
    doc: &'a str,
    pos: usize,
}

pub fn tokens(doc: &str, from: usize) -> TagTokens<'_> {
    TagTokens { doc, pos: from }
}

impl Iterator for TagTokens<'_> {
    type Item = TagToken;

    fn next(&mut self) -> Option<TagToken> {
        while self.pos < self.doc.len() {
            let lt = self.pos + self.doc[self.pos..].find('<')?;
            let Some(token) = scan_tag_at(self.doc, lt) else {
                self.pos = lt + 1;
                continue;
            };
            self.pos = token.end();

            if let TagToken::Open(head) = token {
                let name = head.name(self.doc);
                if !head.self_closing && RAW_TEXT_ELEMENTS.contains(&name) {
                    let closing = format!("</{name}");
                    self.pos = self.doc[self.pos..]
                        .find(&closing)
                        .map_or(self.doc.len(), |p| self.pos + p);
                }
            }
            return Some(token);
        }
        None
    }
}

/// How an element located by [`TagBoundaryScanner`] is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closing {
    /// A matching `</name>` at `[start, end)`
    Explicit { start: usize, end: usize },
    /// `<name/>`; the span covers the trailing `/>` of the head
    SelfClosing { start: usize, end: usize },
    /// HTML void element written without `/>`
    Void,
}

/// Result of pairing an opening tag with its closing counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementBounds {
    pub head: TagHead,
    pub closing: Closing,
}

/// Depth-stack matcher pairing an opening tag with its closing tag.
pub struct TagBoundaryScanner<'a> {
    doc: &'a str,
}

impl<'a> TagBoundaryScanner<'a> {
    pub fn new(doc: &'a str) -> Self {
        Self { doc }
    }

    /// Scan from `start` and return the bounds of the first element opened
    /// there, pairing it with its closing tag under arbitrary nesting of
    /// same-named tags.
    ///
    /// Returns `None` when the document ends before the element balances.
    pub fn match_element(&self, start: usize) -> Option<ElementBounds> {
        let mut stack: Vec<TagHead> = Vec::new();

        for token in tokens(self.doc, start) {
            match token {
                TagToken::Open(head) if head.self_closing => {
                    if stack.is_empty() {
                        return Some(ElementBounds {
                            head,
                            closing: Closing::SelfClosing {
                                start: head.end - 2,
                                end: head.end,
                            },
                        });
                    }
                }
                TagToken::Open(head) if is_void_element(head.name(self.doc)) => {
                    if stack.is_empty() {
                        return Some(ElementBounds {
                            head,
                            closing: Closing::Void,
                        });
                    }
                }
                TagToken::Open(head) => stack.push(head),
                TagToken::Close {
                    start,
                    end,
                    name_start,
                    name_end,
                } => {
                    let name = &self.doc[name_start..name_end];
                    // Stray closers are ignored; a closer matching a deeper
                    // entry implicitly closes everything above it.
                    let Some(depth) = stack.iter().rposition(|h| h.name(self.doc) == name) else {
                        continue;
                    };
                    stack.truncate(depth + 1);
                    let head = stack.pop()?;
                    if stack.is_empty() {
                        return Some(ElementBounds {
                            head,
                            closing: Closing::Explicit { start, end },
                        });
                    }
                }
                TagToken::Comment { .. } | TagToken::Declaration { .. } => {}
            }
        }

        None
    }
}
