//! Kombinator: structural edits and section merging for component markup
//!
//! Elements are located by scanning raw text (tag boundaries, nesting,
//! quoted attribute values) instead of parsing a DOM, so a change never
//! reformats anything outside the element it touches.
//!
//! # Architecture
//!
//! All edit operations compile down to a single primitive: [`Edit`], a
//! verified byte-span replacement. Intelligence lives in span acquisition
//! ([`ElementLocator`], [`TagBoundaryScanner`]), not in the application logic.
//!
//! - [`ElementMutator`] chains selector + mutation calls over one document
//! - [`TagSectionCombinator`] merges or replaces `<style>`/`<script>`/`<template>`
//!   sections of a source document with those of an override document
//! - [`component`] resolves components across layered directories
//! - [`config`] loads TOML recipes and applies them to a tree
//!
//! # Example
//!
//! ```
//! use kombinator::ElementMutator;
//!
//! let html = ElementMutator::from_template(r#"<div class="foo"></div><div class="foo"></div>"#)
//!     .find_by_tag("div")
//!     .extend_attribute("class", "bar", " ")?
//!     .into_template()?;
//!
//! assert_eq!(html, r#"<div class="foo bar"></div><div class="foo"></div>"#);
//! # Ok::<(), kombinator::MarkupError>(())
//! ```

pub mod combine;
pub mod component;
pub mod config;
pub mod edit;
pub mod markup;

// Re-exports
pub use combine::{combine, CombineError, MergeOperation, TagSectionCombinator};
pub use component::{ComponentError, ComponentFile, ComponentResolver};
pub use config::{
    apply_mods, check_mods, load_from_path, load_from_str, ApplicationError, ConfigError,
    ModResult, RecipeConfig,
};
pub use edit::{Edit, EditError, EditResult, EditVerification};
pub use markup::{ElementLocator, ElementMutator, ElementSpan, MarkupError, Selector, TagBoundaryScanner};
