//! Network-interface helpers shared by the client and `autokexecd`: reading
//! `/sys/class/net` state and bringing an interface administratively up via
//! netlink.

use crate::error::DiscoveryError;
use futures::TryStreamExt;
use std::fs;
use std::path::Path;

/// A network interface as observed through sysfs.
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub index: u32,
    pub mac: String,
    pub operstate: String,
}

impl Interface {
    pub fn is_up(&self) -> bool {
        self.operstate == "up"
    }
}

/// Enumerate `/sys/class/net/*`, skipping the loopback device.
pub fn list_interfaces() -> std::io::Result<Vec<Interface>> {
    list_interfaces_in(Path::new("/sys/class/net"))
}

fn list_interfaces_in(root: &Path) -> std::io::Result<Vec<Interface>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == "lo" {
            continue;
        }
        let base = entry.path();
        let index: u32 = fs::read_to_string(base.join("ifindex"))
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);
        let mac = fs::read_to_string(base.join("address"))
            .unwrap_or_default()
            .trim()
            .to_string();
        let operstate = fs::read_to_string(base.join("operstate"))
            .unwrap_or_default()
            .trim()
            .to_string();
        out.push(Interface {
            name,
            index,
            mac,
            operstate,
        });
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

/// Bring `ifname` administratively up via netlink, equivalent to
/// `ip link set <ifname> up` but without shelling out.
pub async fn set_link_up(ifname: &str) -> Result<(), DiscoveryError> {
    let (connection, handle, _) = rtnetlink::new_connection().map_err(DiscoveryError::Transport)?;
    tokio::spawn(connection);

    let mut links = handle.link().get().match_name(ifname.to_string()).execute();
    let link = links
        .try_next()
        .await
        .map_err(|e| DiscoveryError::Format(format!("netlink query for {ifname} failed: {e}")))?
        .ok_or_else(|| DiscoveryError::Format(format!("interface {ifname} not found")))?;

    handle
        .link()
        .set(link.header.index)
        .up()
        .execute()
        .await
        .map_err(|e| DiscoveryError::Format(format!("failed to bring {ifname} up: {e}")))
}
