use std::sync::Arc;

use crate::{config::Config, db::connection::DbPool, utils::email::Notifier};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
    /// Delivery seam for one-time codes; swapped for a no-op in tests.
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            pool,
            config,
            notifier,
        }
    }
}
