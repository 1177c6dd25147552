//! The kexec action common to both trigger sources.

use crate::error::AutokexecError;
use std::path::Path;
use std::process::Command;
use tracing::info;

/// Already-stiefeled hosts carry a `stiefellink` interface; autokexec must
/// never fire on one.
pub fn already_stiefeled() -> bool {
    Path::new("/sys/class/net/stiefellink").exists()
}

pub fn boot_into_server(kernel: &Path, initrd: &Path, cmdline: &[String]) -> Result<(), AutokexecError> {
    info!(?kernel, ?initrd, "booting into stiefelsystem server role");
    let status = Command::new("kexec")
        .arg(kernel)
        .arg(format!("--ramdisk={}", initrd.display()))
        .arg("--reset-vga")
        .arg("--console-vga")
        .arg(format!("--command-line={}", cmdline.join(" ")))
        .status()?;
    if !status.success() {
        return Err(AutokexecError::ExternalCommand("kexec"));
    }
    Ok(())
}
