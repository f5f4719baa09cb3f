pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod feed;
pub mod matcher;
pub mod metrics;
pub mod scoring;
pub mod search;
pub mod service;
pub mod testing;

pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Identity, NoneAuthenticator,
    SharedSecretAuthenticator,
};
pub use cache::{CacheError, KvCache, MemoryCache, RedisCache};
pub use catalog::{
    CatalogError, Episode, NewTitle, Rating, Season, SqliteTitleStore, Title, TitleStore,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, CacheBackend, Config,
    ConfigError, SanitizedConfig,
};
pub use discovery::{
    CycleOutcome, CycleReport, DiscoveryConfig, DiscoveryPipeline, DiscoveryScheduler,
    DiscoveryStatus,
};
pub use feed::{FeedSource, HttpFeedSource};
pub use matcher::{AniListMatcher, CatalogMatcher};
pub use scoring::{TitleView, ViewDetail};
pub use service::{
    ErrorKind, FollowReceipt, ServiceError, TitleLocks, TitleService, VoteReceipt,
};
