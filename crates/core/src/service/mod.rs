//! Title operations exposed to clients: fetch, vote, follow and search.
//!
//! Loaded titles are memoized in the [`KvCache`](crate::cache::KvCache).
//! Writes go to the store as atomic statements and then invalidate the
//! memoized entry, both under a per-title lock, so a concurrent read can
//! never repopulate the cache with a title loaded before the write.

mod locks;
mod title_service;
mod types;

pub use locks::TitleLocks;
pub use title_service::TitleService;
pub use types::*;
