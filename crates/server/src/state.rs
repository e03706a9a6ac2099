use std::sync::Arc;

use service::LocalStorage;

/// Shared handler state: one storage account for the whole process.
#[derive(Clone)]
pub struct ServerState {
    pub storage: Arc<LocalStorage>,
}

impl ServerState {
    pub fn new(storage: Arc<LocalStorage>) -> Self {
        Self { storage }
    }
}
