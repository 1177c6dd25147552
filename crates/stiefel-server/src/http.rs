//! The HTTP boot-coordination service on TCP port 4644.

use crate::error::ServerError;
use crate::nbd;
use crate::state::{ServerPhase, ServerState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stiefel_core::crypto;
use stiefel_core::manifest::build_archive;
use tokio::sync::Mutex;
use tracing::{error, info};

pub const PORT: u16 = 4644;

pub struct HttpState {
    pub server: Mutex<ServerState>,
    pub key: [u8; crypto::KEY_LEN],
    pub nbd_started: Mutex<bool>,
}

pub fn router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/boot.tar.aes", post(boot))
        .with_state(state)
}

#[derive(Serialize)]
struct HelloResponse {
    what: &'static str,
    challenge: String,
    #[serde(rename = "key-hash")]
    key_hash: String,
    #[serde(rename = "need-luks")]
    need_luks: bool,
}

async fn hello(State(state): State<Arc<HttpState>>) -> Json<HelloResponse> {
    let server = state.server.lock().await;
    Json(HelloResponse {
        what: "stiefelsystem-server",
        // Reserved for forward compatibility; not required to be fresh per request.
        challenge: server.key_hash.clone(),
        key_hash: server.key_hash.clone(),
        need_luks: server.manifest.need_luks(),
    })
}

#[derive(Deserialize)]
struct BootRequest {
    challenge: String,
    lukspw: Option<String>,
}

async fn boot(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<BootRequest>,
) -> Response {
    match handle_boot(&state, req).await {
        Ok(blob) => (
            StatusCode::OK,
            [("content-type", "application/octet-stream")],
            blob,
        )
            .into_response(),
        Err(ServerError::MissingLuks) => {
            (StatusCode::BAD_REQUEST, "LUKS passphrase required").into_response()
        }
        Err(e) => {
            error!(error = %e, "boot request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn handle_boot(state: &HttpState, req: BootRequest) -> Result<Vec<u8>, ServerError> {
    let mut server = state.server.lock().await;
    server.phase = ServerPhase::Serving;

    let export_device = if server.manifest.need_luks() {
        let encrypted_pw = req.lukspw.ok_or(ServerError::MissingLuks)?;
        let encrypted_pw = general_purpose::STANDARD
            .decode(encrypted_pw)
            .map_err(|e| ServerError::CryptsetupFailed(format!("bad base64 passphrase: {e}")))?;
        let passphrase = crypto::decrypt(&state.key, &encrypted_pw)?;
        nbd::open_luks(server.manifest.luks_device.as_deref(), &passphrase)?;
        std::path::PathBuf::from("/dev/mapper").join(nbd::EXPORT_NAME)
    } else {
        server.manifest.block_device.clone()
    };

    let mut nbd_started = state.nbd_started.lock().await;
    if !*nbd_started {
        nbd::spawn_nbd_server(&export_device)?;
        *nbd_started = true;
    }
    drop(nbd_started);

    let archive = build_archive(&server.manifest, &req.challenge)?;
    let blob = crypto::encrypt(&state.key, &archive)?;
    info!(bytes = blob.len(), "served boot.tar.aes");
    Ok(blob)
}
