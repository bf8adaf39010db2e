use std::sync::Arc;

use crate::config::Config;
use crate::summaries::store::SummaryStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Read side of summary storage. The scheduler holds its own handle.
    pub store: Arc<dyn SummaryStore>,
    pub config: Config,
}
