//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock dependencies injected, enabling E2E testing without a real
//! release feed or external catalog.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use animerate_core::{
    config::{
        AuthConfig, AuthMethod, CacheConfig, CatalogSearchConfig, DatabaseConfig, ServerConfig,
    },
    catalog::EpisodeAppend,
    create_authenticator,
    testing::{MockCatalogMatcher, MockFeedSource},
    Config, DiscoveryConfig, DiscoveryPipeline, DiscoveryScheduler, KvCache, MemoryCache,
    SqliteTitleStore, TitleService, TitleStore,
};
use animerate_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use animerate_core::testing::fixtures;

/// Secret used when the fixture is created with shared secret auth.
pub const TEST_SECRET: &str = "test-secret";

/// Test fixture for E2E testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - The release feed (MockFeedSource)
/// - The external catalog (MockCatalogMatcher)
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_vote() {
///     let fixture = TestFixture::new().await;
///     let id = fixture.seed_title(1, "Frieren", &[], &["1"]);
///
///     let response = fixture
///         .put(&format!("/api/v1/titles/{id}/episodes/1/vote"), json!({
///             "user": "1001", "score": 8
///         }))
///         .await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Title store shared with the router, for seeding and inspection
    pub store: Arc<SqliteTitleStore>,
    /// Cache shared with the router
    pub cache: Arc<MemoryCache>,
    /// Mock release feed - queue feeds for discovery
    pub feed: MockFeedSource,
    /// Mock external catalog - map headlines to catalog ids
    pub matcher: MockCatalogMatcher,
    /// Temporary directory holding the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let auth = if test_config.shared_secret {
            AuthConfig {
                method: AuthMethod::SharedSecret,
                secret: Some(TEST_SECRET.to_string()),
            }
        } else {
            AuthConfig {
                method: AuthMethod::None,
                secret: None,
            }
        };

        let config = Config {
            auth,
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            cache: CacheConfig::default(),
            discovery: DiscoveryConfig {
                feed_url: "https://releases.example.org/rss".to_string(),
                ..Default::default()
            },
            catalog_search: CatalogSearchConfig::default(),
        };

        let authenticator = Arc::from(
            create_authenticator(&config.auth).expect("Failed to create authenticator"),
        );
        let store =
            Arc::new(SqliteTitleStore::new(&db_path).expect("Failed to create title store"));
        let cache = Arc::new(MemoryCache::new());

        let titles = Arc::new(TitleService::new(
            Arc::clone(&store) as Arc<dyn TitleStore>,
            Arc::clone(&cache) as Arc<dyn KvCache>,
            Duration::from_secs(config.cache.title_ttl_secs),
        ));

        // Create mocks
        let feed = MockFeedSource::new();
        let matcher = MockCatalogMatcher::new();

        let pipeline = DiscoveryPipeline::new(
            Arc::new(feed.clone()),
            Arc::new(matcher.clone()),
            Arc::clone(&store) as Arc<dyn TitleStore>,
            Arc::clone(&cache) as Arc<dyn KvCache>,
            &config.discovery,
        )
        .with_title_locks(titles.title_locks());
        let scheduler = Arc::new(DiscoveryScheduler::new(
            Arc::new(pipeline),
            config.discovery.interval(),
        ));

        let state = Arc::new(AppState::new(config, authenticator, titles, Some(scheduler)));

        Self {
            router: create_router(state),
            store,
            cache,
            feed,
            matcher,
            temp_dir,
        }
    }

    /// Insert a title with the given episode labels; returns its id.
    pub fn seed_title(
        &self,
        canonical_id: i64,
        title: &str,
        extra_titles: &[&str],
        episodes: &[&str],
    ) -> String {
        let title = self
            .store
            .insert(fixtures::new_title(canonical_id, title, extra_titles))
            .expect("Failed to insert title");
        let appends: Vec<EpisodeAppend> = episodes
            .iter()
            .map(|e| EpisodeAppend {
                title_id: title.id.clone(),
                episode: e.to_string(),
            })
            .collect();
        self.store.append_episodes(&appends);
        title.id
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body), None).await
    }

    /// Send a DELETE request with JSON body.
    pub async fn delete_with_body(&self, path: &str, body: Value) -> TestResponse {
        self.request("DELETE", path, Some(body), None).await
    }

    /// Send a GET request with an Authorization header.
    pub async fn get_authorized(&self, path: &str, authorization: &str) -> TestResponse {
        self.request("GET", path, None, Some(authorization)).await
    }

    /// Send a request to the test server.
    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        authorization: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(value) = authorization {
            request_builder = request_builder.header("Authorization", value);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into()))
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Require `Authorization: Mutual <TEST_SECRET>` on protected routes
    pub shared_secret: bool,
}

impl TestConfig {
    /// Create config with shared secret auth enabled.
    pub fn with_shared_secret() -> Self {
        Self {
            shared_secret: true,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
