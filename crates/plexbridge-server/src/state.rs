//! Shared server state.

use std::sync::Arc;

use plexbridge_core::config::Config;

use crate::relay::RelayCore;

/// State shared by all HTTP handlers and the peer connection.
pub struct BridgeState {
    pub config: Arc<Config>,
    pub relay: RelayCore,
}

impl BridgeState {
    pub fn new(config: Arc<Config>) -> Self {
        let relay = RelayCore::new(&config);
        Self { config, relay }
    }
}
