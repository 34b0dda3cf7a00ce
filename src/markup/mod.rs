//! Structural editing of component markup over raw text.
//!
//! Elements are found by incremental scanning rather than by building a DOM,
//! and every edit is a localized byte-span splice: text outside the touched
//! span stays byte-identical.

pub mod attributes;
pub mod errors;
pub mod locator;
pub mod mutator;
pub mod scanner;

pub use attributes::{parse_head, Attribute, ParsedHead};
pub use errors::MarkupError;
pub use locator::{ElementLocator, ElementSpan, Selector};
pub use mutator::ElementMutator;
pub use scanner::{scan_tag_at, tokens, Closing, ElementBounds, TagBoundaryScanner, TagHead, TagToken};
