//! Final control transfer into the received kernel.

use crate::error::ClientError;
use std::path::Path;
use std::process::Command;

/// Load `kernel`/`initrd` with `cmdline` and jump. On success this call
/// never returns to the caller; any return here is itself the failure.
pub fn load_and_execute(kernel: &Path, initrd: &Path, cmdline: &str) -> Result<(), ClientError> {
    let status = Command::new("kexec")
        .arg(kernel)
        .arg(format!("--ramdisk={}", initrd.display()))
        .arg(format!("--command-line={cmdline}"))
        .status()?;
    if !status.success() {
        return Err(ClientError::ExternalCommand("kexec"));
    }
    Ok(())
}
