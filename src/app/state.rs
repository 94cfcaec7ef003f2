use std::sync::Arc;

use crate::{catalog::Catalog, config::SiteConfig};

#[derive(Clone)]
pub struct AppState {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) config: Arc<SiteConfig>,
}

impl AppState {
    pub fn new(config: SiteConfig) -> Self {
        Self {
            catalog: Arc::new(Catalog::from_root(&config.static_dir)),
            config: Arc::new(config),
        }
    }
}

/// Build state and report what the server is about to serve. Missing
/// directories are not fatal here: the endpoint reports them per request.
pub fn build_state(config: SiteConfig) -> AppState {
    let state = AppState::new(config);
    for dir in [state.catalog.images_dir(), state.catalog.videos_dir()] {
        if !dir.is_dir() {
            tracing::warn!(path = %dir.display(), "portfolio directory missing");
        }
    }
    let index = state.config.generated_index_path();
    if !index.is_file() {
        tracing::warn!(
            path = %index.display(),
            "generated portfolio index missing; run the portfolio_index binary or rebuild"
        );
    }
    tracing::debug!(
        static_dir = %state.config.static_dir.display(),
        base_path = %state.config.base_path,
        "application state ready"
    );
    state
}
