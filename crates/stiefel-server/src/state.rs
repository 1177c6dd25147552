//! Server run-state, separate from the static [`BootManifest`], split the
//! same way `Engine`'s static settings are kept apart from
//! `ServiceState`'s mutable run state.

use stiefel_core::BootManifest;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPhase {
    Init,
    Announcing,
    Serving,
}

pub struct ServerState {
    pub manifest: Arc<BootManifest>,
    pub key_hash: String,
    pub phase: ServerPhase,
}

impl ServerState {
    pub fn new(manifest: Arc<BootManifest>, key_hash: String) -> Self {
        ServerState {
            manifest,
            key_hash,
            phase: ServerPhase::Init,
        }
    }
}
