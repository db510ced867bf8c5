/*
 * Responsibility
 * - Shared, read-only context bound to the Router (AppState)
 * - Clone is cheap (Arc inside); per-request state lives in the pipeline instead
 */
use std::sync::Arc;

use crate::config::Config;

#[derive(Clone, Debug)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

impl From<&Config> for AppInfo {
    fn from(config: &Config) -> Self {
        Self {
            name: config.app_name.clone(),
            version: config.app_version.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub info: Arc<AppInfo>,
}

impl AppState {
    pub fn new(info: AppInfo) -> Self {
        Self {
            info: Arc::new(info),
        }
    }
}
