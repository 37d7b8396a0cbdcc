use std::sync::Arc;

use crate::config::Config;
use crate::parsing::pipeline::ResumePipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The parsing pipeline, already bound to a model gateway and model tag.
    pub pipeline: Arc<ResumePipeline>,
    pub config: Config,
}
