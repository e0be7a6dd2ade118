use crate::config::Config;
use crate::errors::ServiceError;
use crate::storage::Backend;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    backend: Option<Arc<Backend>>,
}

impl AppState {
    pub fn new(config: Config, backend: Option<Backend>) -> Self {
        Self {
            config: Arc::new(config),
            backend: backend.map(Arc::new),
        }
    }

    pub fn is_backend_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// The configured backend, or the error every backend-dependent route reports.
    pub fn backend(&self) -> Result<&Arc<Backend>, ServiceError> {
        self.backend.as_ref().ok_or(ServiceError::BackendNotConfigured)
    }
}
