//! Subprocess collaborators: `cryptsetup` to open the LUKS container and
//! `nbd-server` to export the resulting block device.

use crate::error::ServerError;
use std::path::Path;
use std::process::Command;
use tracing::info;
use zeroize::Zeroizing;

pub const EXPORT_NAME: &str = "stiefelblock";
pub const NBD_PORT: u16 = 10809;

/// Open the LUKS container at `device` with `passphrase`, mapping it to
/// `/dev/mapper/stiefelblock`. No-op if `device` is `None` (plaintext boot
/// device).
pub fn open_luks(device: Option<&Path>, passphrase: &[u8]) -> Result<(), ServerError> {
    let Some(device) = device else {
        return Ok(());
    };
    let passphrase = Zeroizing::new(passphrase.to_vec());

    use std::io::Write as _;
    let mut child = Command::new("cryptsetup")
        .args(["open", "--type", "luks", "--key-file=-"])
        .arg(device)
        .arg(EXPORT_NAME)
        .stdin(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| ServerError::CryptsetupFailed(e.to_string()))?;

    child
        .stdin
        .take()
        .expect("piped stdin")
        .write_all(&passphrase)
        .map_err(|e| ServerError::CryptsetupFailed(e.to_string()))?;

    let status = child
        .wait()
        .map_err(|e| ServerError::CryptsetupFailed(e.to_string()))?;
    if !status.success() {
        return Err(ServerError::CryptsetupFailed(format!(
            "cryptsetup exited with {status}"
        )));
    }
    info!(device = %device.display(), "LUKS container opened");
    Ok(())
}

/// Render the `nbd-server` export stanza for `device` and launch it.
pub fn spawn_nbd_server(device: &Path) -> Result<std::process::Child, ServerError> {
    let config = format!(
        "[generic]\n\
         port = {NBD_PORT}\n\
         \n\
         [{EXPORT_NAME}]\n\
         exportname = {device}\n\
         readonly = false\n",
        device = device.display()
    );

    let config_path = std::env::temp_dir().join("stiefel-nbd-server.conf");
    std::fs::write(&config_path, config).map_err(ServerError::Io)?;

    let child = Command::new("nbd-server")
        .arg("-C")
        .arg(&config_path)
        .arg("-d")
        .spawn()
        .map_err(|e| ServerError::NbdFailed(e.to_string()))?;
    info!(port = NBD_PORT, export = EXPORT_NAME, "nbd-server launched");
    Ok(child)
}
