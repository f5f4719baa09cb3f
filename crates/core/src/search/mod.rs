//! Fuzzy title search.
//!
//! The ranker matches a free-text query against a title's primary name and
//! all of its alternate names, orders documents by relevance and reports
//! which fields matched (highlights). Highlights drive the choice of the
//! display title returned with each result.

mod fuzzy;

pub use fuzzy::*;
