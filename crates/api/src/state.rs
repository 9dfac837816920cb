//! State handed to every route.

use std::time::Instant;

use herald_common::config::AppConfig;
use herald_engine::registry::SubscriptionRegistry;

#[derive(Clone)]
pub struct AppState {
    /// Live handle onto the same registry the dispatcher prunes.
    pub registry: SubscriptionRegistry,
    pub config: AppConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(registry: SubscriptionRegistry, config: AppConfig) -> Self {
        Self {
            registry,
            config,
            started_at: Instant::now(),
        }
    }
}
