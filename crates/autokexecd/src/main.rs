use anyhow::{anyhow, Result};
use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;
use stiefel_core::config::Config;
use tokio::sync::watch;
use tracing::info;

mod broadcast_watcher;
mod error;
mod kexec;
mod mac_watcher;

#[derive(Parser, Debug)]
#[command(author, version, about = "stiefelsystem autokexec trigger daemon", long_about = None)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    if kexec::already_stiefeled() {
        info!("stiefellink interface present, this host is already stiefeled - exiting");
        return Ok(());
    }

    let config_path = cli
        .config
        .unwrap_or_else(|| stiefel_core::paths::config_path("autokexecd"));
    let cfg = Config::load(&config_path)?;

    if !cfg.autokexec.mac_detection && !cfg.autokexec.broadcast {
        info!("no trigger-based launch method enabled, nothing to do");
        return Ok(());
    }

    let key = cfg.load_key()?;
    let key_hash = stiefel_core::crypto::key_hash_hex(&key);
    let hmac_key_hex = stiefel_core::crypto::autokexec_hmac_key_hex(&key);

    let (trigger_tx, mut trigger_rx) = watch::channel(false);

    let mut tasks = Vec::new();
    if cfg.autokexec.mac_detection {
        let macs: HashSet<String> = cfg.autokexec.macs.iter().cloned().collect();
        let tx = trigger_tx.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = mac_watcher::watch_for(macs, tx).await {
                tracing::warn!(error = %e, "MAC watcher exited with an error");
            }
        }));
    }
    if cfg.autokexec.broadcast {
        let tx = trigger_tx.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = broadcast_watcher::watch_for(key_hash, hmac_key_hex, tx).await {
                tracing::warn!(error = %e, "broadcast watcher exited with an error");
            }
        }));
    }
    drop(trigger_tx);

    info!("autokexecd started – waiting for a trigger");
    trigger_rx.changed().await.ok();
    if !*trigger_rx.borrow() {
        return Err(anyhow!("all trigger sources exited without firing"));
    }

    for task in tasks {
        task.abort();
    }

    let kernel = cfg
        .server_setup
        .stiefelsystem_kernel
        .ok_or_else(|| anyhow!("server_setup.stiefelsystem_kernel not set"))?;
    let initrd = cfg
        .server_setup
        .stiefelsystem_initrd
        .ok_or_else(|| anyhow!("server_setup.stiefelsystem_initrd not set"))?;

    kexec::boot_into_server(&kernel, &initrd, &cfg.server_setup.cmdline)?;

    Ok(())
}
