//! Feed discovery.
//!
//! On every tick the pipeline fetches the release feed, keeps only items
//! that were not in the previous snapshot, turns their headlines into
//! (series, episode) pairs, resolves the series through the external
//! catalog and appends the episode to the matching local title.
//!
//! - **Fetch**: conditional on the snapshot time; "not modified" ends the cycle
//! - **Bootstrap**: without a snapshot the fetched feed becomes the baseline
//! - **Diff**: new items by guid, feed order preserved
//! - **Match / Persist**: unresolvable items are dropped, appends are independent
//! - **Snapshot**: replaced with the fetched feed once the items are processed

mod config;
mod guard;
mod headline;
mod pipeline;
mod scheduler;
mod snapshot;
mod types;

pub use config::DiscoveryConfig;
pub use guard::{RunGuard, RunPermit};
pub use headline::{parse_headline, ParsedHeadline};
pub use pipeline::DiscoveryPipeline;
pub use scheduler::{until_next_tick, DiscoveryScheduler};
pub use snapshot::{FeedSnapshot, SnapshotStore, SNAPSHOT_FEED_KEY, SNAPSHOT_TIME_KEY};
pub use types::{CycleOutcome, CycleReport, DiscoveryError, DiscoveryStatus};
