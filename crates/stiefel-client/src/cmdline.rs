//! Kernel command-line synthesis for the kexec'd target system.

use crate::error::ClientError;
use base64::{engine::general_purpose, Engine as _};
use stiefel_core::discovery::rewrite_zone_to_stiefellink;
use stiefel_core::module::StiefelModule;

/// Extract the `stiefel_innercmdline=<base64>` token from a `/proc/cmdline`
/// line, if present, and return its decoded value. Any other token is
/// ignored; a malformed value (bad base64 or non-UTF-8) is treated as
/// absent rather than a fatal error.
pub fn inner_cmdline_addition(proc_cmdline: &str) -> Option<String> {
    let value = proc_cmdline
        .split_whitespace()
        .find_map(|tok| tok.strip_prefix("stiefel_innercmdline="))?;
    let decoded = general_purpose::STANDARD.decode(value).ok()?;
    String::from_utf8(decoded).ok()
}

/// Build the final command line handed to the received kernel, given the
/// inner cmdline from the archive, the discovered module set, the server's
/// zone-scoped address, and this client's MAC on the link that heard the
/// reply.
pub fn synthesize(
    inner_cmdline: &str,
    modules: &[StiefelModule],
    server_host: &str,
    server_zone: &str,
    client_mac: &str,
) -> Result<String, ClientError> {
    let stiefellink_host = rewrite_zone_to_stiefellink(server_host, server_zone);

    if modules.contains(&StiefelModule::SystemDebian) || modules.contains(&StiefelModule::SystemArch) {
        Ok(format!(
            "{inner_cmdline} stiefel_nbdhost={stiefellink_host} stiefel_nbdname=stiefelblock stiefel_link={client_mac}"
        ))
    } else if modules.contains(&StiefelModule::SystemGentoo)
        || modules.contains(&StiefelModule::SystemArchDracut)
    {
        Ok(format!(
            "{inner_cmdline} ifname=stiefellink:{client_mac} ip=stiefellink:link6 \
             netroot=nbd:[{stiefellink_host}]:stiefelblock:::-persist"
        ))
    } else {
        Err(ClientError::UnsupportedSystem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debian_template_uses_stiefel_nbd_variables() {
        let cmdline = synthesize(
            "root=/dev/nbd0 rw",
            &[StiefelModule::SystemDebian],
            "fe80::1%eth0",
            "eth0",
            "52:54:00:12:34:56",
        )
        .unwrap();
        assert!(cmdline.contains("stiefel_nbdhost=fe80::1%stiefellink"));
        assert!(cmdline.contains("stiefel_nbdname=stiefelblock"));
        assert!(cmdline.contains("stiefel_link=52:54:00:12:34:56"));
    }

    #[test]
    fn dracut_template_uses_netroot() {
        let cmdline = synthesize(
            "quiet",
            &[StiefelModule::SystemArchDracut],
            "fe80::2%wlan0",
            "wlan0",
            "aa:bb:cc:dd:ee:ff",
        )
        .unwrap();
        assert!(cmdline.contains("netroot=nbd:[fe80::2%stiefellink]:stiefelblock:::-persist"));
        assert!(cmdline.contains("ifname=stiefellink:aa:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn unknown_module_set_is_unsupported() {
        let err = synthesize("", &[StiefelModule::Nbd], "fe80::1%eth0", "eth0", "mac").unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedSystem));
    }

    #[test]
    fn inner_cmdline_addition_decodes_the_proc_cmdline_token() {
        let encoded = general_purpose::STANDARD.encode("debug console=ttyS0");
        let proc_cmdline = format!("BOOT_IMAGE=/vmlinuz root=/dev/sda1 stiefel_innercmdline={encoded} quiet");
        assert_eq!(
            inner_cmdline_addition(&proc_cmdline).as_deref(),
            Some("debug console=ttyS0")
        );
    }

    #[test]
    fn inner_cmdline_addition_is_none_when_token_absent() {
        assert_eq!(inner_cmdline_addition("BOOT_IMAGE=/vmlinuz root=/dev/sda1"), None);
    }

    #[test]
    fn inner_cmdline_addition_is_none_on_bad_base64() {
        assert_eq!(inner_cmdline_addition("stiefel_innercmdline=not-valid-base64!!"), None);
    }
}
