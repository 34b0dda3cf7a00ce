//! Merging named top-level sections (`<script>`, `<style>`, `<template>`)
//! of a source document with those of an override document.

pub mod combinator;
pub mod errors;
pub mod extractor;

pub use combinator::{combine, TagSectionCombinator, DEFAULT_TAGS};
pub use errors::CombineError;
pub use extractor::{extract_section, MergeDirective, MergeOperation, DIRECTIVE_ATTRIBUTES};
