use std::sync::Arc;

use animerate_core::{Authenticator, Config, DiscoveryScheduler, SanitizedConfig, TitleService};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    titles: Arc<TitleService>,
    discovery: Option<Arc<DiscoveryScheduler>>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        titles: Arc<TitleService>,
        discovery: Option<Arc<DiscoveryScheduler>>,
    ) -> Self {
        Self {
            config,
            authenticator,
            titles,
            discovery,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn titles(&self) -> &TitleService {
        self.titles.as_ref()
    }

    /// The discovery scheduler, when a feed is configured.
    pub fn discovery(&self) -> Option<&Arc<DiscoveryScheduler>> {
        self.discovery.as_ref()
    }
}
