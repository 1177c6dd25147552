use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use clap::Parser;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use stiefel_core::config::{load_key_from, Config};
use stiefel_core::manifest::ArchiveMembers;
use tracing::info;

mod cmdline;
mod discovery;
mod error;
mod kexec;

use crate::error::ClientError;

#[derive(Parser, Debug)]
#[command(author, version, about = "stiefelsystem network boot client", long_about = None)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the 16-byte shared secret, overriding the config file.
    #[arg(long)]
    key: Option<PathBuf>,
}

#[derive(Deserialize)]
struct HelloResponse {
    what: String,
    #[serde(rename = "key-hash")]
    key_hash: String,
    #[serde(rename = "need-luks")]
    need_luks: Option<bool>,
}

#[derive(Serialize)]
struct BootRequest {
    challenge: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    lukspw: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let key_path = cli.key.clone();
    let key = match key_path {
        Some(path) => load_key_from(&path)?,
        None => {
            let config_path = cli
                .config
                .clone()
                .unwrap_or_else(|| stiefel_core::paths::config_path("stiefel-client"));
            Config::load(&config_path)?.load_key()?
        }
    };
    let key_hash = stiefel_core::crypto::key_hash_hex(&key);
    let hmac_key_hex = stiefel_core::crypto::autokexec_hmac_key_hex(&key);

    info!("searching for a stiefelsystem server");
    let found = discovery::find_server(&key_hash, &hmac_key_hex).await?;
    info!(host = %found.host, "found candidate server, probing HTTP");

    let client_mac = std::fs::read_to_string(format!("/sys/class/net/{}/address", found.zone))
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let http = reqwest::Client::builder()
        .user_agent("stiefel-client/0.1")
        .timeout(std::time::Duration::from_secs(5))
        .build()?;

    let base_url = format!("http://[{}]:4644", found.host.replace('%', "%25"));
    let hello: HelloResponse = http.get(&base_url).send().await?.json().await?;
    if hello.what != "stiefelsystem-server" {
        return Err(ClientError::NotAStiefelServer.into());
    }
    if hello.key_hash != key_hash {
        return Err(ClientError::WrongKeyHash.into());
    }
    let need_luks = hello.need_luks.unwrap_or(false);

    let lukspw = if need_luks {
        let passphrase = std::process::Command::new("systemd-ask-password")
            .arg("stiefelsystem root block device luks password")
            .output()?;
        if !passphrase.status.success() {
            return Err(ClientError::ExternalCommand("systemd-ask-password").into());
        }
        let encrypted = stiefel_core::crypto::encrypt(
            &key,
            passphrase.stdout.strip_suffix(b"\n").unwrap_or(&passphrase.stdout),
        )?;
        Some(general_purpose::STANDARD.encode(encrypted))
    } else {
        None
    };

    let mut challenge_bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut challenge_bytes);
    let challenge = general_purpose::STANDARD.encode(challenge_bytes);

    info!("requesting boot.tar.aes");
    let boot_url = format!("{base_url}/boot.tar.aes");
    let body = BootRequest {
        challenge: challenge.clone(),
        lukspw,
    };
    let response = http.post(&boot_url).json(&body).send().await?;
    let blob = response.bytes().await?.to_vec();
    if blob.len() < 32 {
        return Err(ClientError::Corrupt(blob.len()).into());
    }

    info!("decrypting boot.tar.aes");
    let archive = stiefel_core::crypto::decrypt(&key, &blob)?;
    let members = ArchiveMembers::read(&archive)?;

    let got_challenge = members.text_member("challenge")?;
    if got_challenge != challenge {
        return Err(ClientError::Replay.into());
    }
    let mut inner_cmdline = members.text_member("cmdline")?;
    if let Ok(proc_cmdline) = std::fs::read_to_string("/proc/cmdline") {
        if let Some(addition) = cmdline::inner_cmdline_addition(&proc_cmdline) {
            inner_cmdline.push(' ');
            inner_cmdline.push_str(&addition);
        }
    }
    let modules = members.stiefelmodules()?;

    for (name, data) in members.filesystem_members() {
        info!(member = name, bytes = data.len(), "materializing archive member");
        std::fs::write(format!("/{name}"), data)?;
    }

    let final_cmdline = cmdline::synthesize(
        &inner_cmdline,
        &modules,
        &found.host,
        &found.zone,
        &client_mac,
    )?;

    info!(cmdline = %final_cmdline, "booting into received kernel");
    kexec::load_and_execute(
        std::path::Path::new("/kernel"),
        std::path::Path::new("/initrd"),
        &final_cmdline,
    )?;

    Err(anyhow!("kexec returned control — this should never happen"))
}
