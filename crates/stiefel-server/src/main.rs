use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use stiefel_core::config::Config;
use stiefel_core::manifest::BootManifest;
use tokio::sync::Mutex;
use tracing::info;

mod announcer;
mod error;
mod http;
mod nbd;
mod state;

use crate::state::{ServerPhase, ServerState};

#[derive(Parser, Debug)]
#[command(author, version, about = "stiefelsystem boot coordination server", long_about = None)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(|| stiefel_core::paths::config_path("stiefel-server"));
    let cfg = Config::load(&config_path)?;
    let key = cfg.load_key()?;
    let key_hash = stiefel_core::crypto::key_hash_hex(&key);

    let manifest = Arc::new(build_manifest(&cfg)?);
    info!(modules = ?manifest.modules, need_luks = manifest.need_luks(), "boot manifest loaded");

    let announce_socket = announcer::bind()?;
    let announcer_task = tokio::spawn(announcer::run(announce_socket, key_hash.clone()));

    let server_state = Mutex::new(ServerState::new(manifest.clone(), key_hash.clone()));
    {
        let mut guard = server_state.lock().await;
        guard.phase = ServerPhase::Announcing;
    }
    let http_state = Arc::new(http::HttpState {
        server: server_state,
        key: *key,
        nbd_started: Mutex::new(false),
    });
    let listener = tokio::net::TcpListener::bind(("::", http::PORT)).await?;
    let http_task = tokio::spawn(async move {
        axum::serve(listener, http::router(http_state)).await
    });

    info!(port = http::PORT, "stiefel-server started – all subsystems online");
    tokio::signal::ctrl_c().await?;
    info!("stiefel-server stopping");

    announcer_task.abort();
    http_task.abort();

    Ok(())
}

fn build_manifest(cfg: &Config) -> Result<BootManifest> {
    let kernel_path = cfg
        .boot
        .kernel
        .as_ref()
        .ok_or_else(|| anyhow!("boot.kernel not set in config"))?;
    let initrd_path = cfg
        .boot
        .initrd
        .as_ref()
        .ok_or_else(|| anyhow!("boot.initrd not set in config"))?;
    let disk = cfg
        .boot
        .disk
        .clone()
        .ok_or_else(|| anyhow!("boot.disk not set in config"))?;

    Ok(BootManifest {
        kernel: std::fs::read(kernel_path)?,
        initrd: std::fs::read(initrd_path)?,
        cmdline: cfg.boot.cmdline.clone(),
        modules: cfg.boot.modules.clone(),
        block_device: disk,
        luks_device: cfg.boot.luks_block.clone(),
    })
}
