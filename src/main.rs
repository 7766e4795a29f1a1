use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use blog_gateway::handlers::BlogStore;
use blog_gateway::middleware::{MemoryStore, RateLimiter};
use blog_gateway::{build_app, startup, Config, ResourceRouters};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (.env included)
    let config = Config::from_env()?;
    config.validate()?;

    startup::init_tracing(&config)?;
    info!("Loaded configuration for environment: {}", config.environment);

    let store = Arc::new(MemoryStore::new(config.rate_limit.window));
    startup::spawn_rate_limit_pruner(store.clone());
    let rate_limiter = RateLimiter::new(config.rate_limit.clone(), store);
    info!(
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window.as_secs(),
        "Rate limiter initialized"
    );

    let routers = ResourceRouters::with_store(BlogStore::new());
    let app = build_app(&config, routers, rate_limiter);

    startup::serve(&config, app).await
}
