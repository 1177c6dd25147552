//! MAC-based autokexec trigger: watches for a configured network adapter to
//! appear, via netlink `NEWLINK` hotplug notifications.

use crate::error::AutokexecError;
use futures::StreamExt;
use netlink_packet_core::{NetlinkMessage, NetlinkPayload};
use netlink_packet_route::link::{LinkAttribute, LinkMessage};
use netlink_packet_route::RouteNetlinkMessage;
use netlink_sys::SocketAddr;
use rtnetlink::constants::RTMGRP_LINK;
use std::collections::HashSet;
use stiefel_core::net::list_interfaces;
use tokio::sync::watch;
use tracing::info;

/// Poll `/sys/class/net` once, then stay subscribed to `RTMGRP_LINK` and
/// recheck on every `NEWLINK`. The first matching MAC sets `trigger` and
/// returns.
pub async fn watch_for(
    macs: HashSet<String>,
    trigger: watch::Sender<bool>,
) -> Result<(), AutokexecError> {
    if let Some(found) = check_existing(&macs)? {
        info!(mac = %found, "configured adapter already present");
        let _ = trigger.send(true);
        return Ok(());
    }

    let (mut connection, _handle, mut messages) = rtnetlink::new_connection()?;
    let addr = SocketAddr::new(0, RTMGRP_LINK);
    connection
        .socket_mut()
        .bind(&addr)
        .map_err(|e| AutokexecError::Netlink(e.to_string()))?;
    tokio::spawn(connection);

    while let Some((message, _addr)) = messages.next().await {
        if *trigger.borrow() {
            return Ok(());
        }
        if let Some(mac) = newlink_mac(&message) {
            if macs.contains(&mac) {
                info!(%mac, "configured adapter appeared via hotplug");
                let _ = trigger.send(true);
                return Ok(());
            }
        }
    }
    Ok(())
}

fn check_existing(macs: &HashSet<String>) -> Result<Option<String>, AutokexecError> {
    for iface in list_interfaces()? {
        if macs.contains(&iface.mac) {
            return Ok(Some(iface.mac));
        }
    }
    Ok(None)
}

fn newlink_mac(message: &NetlinkMessage<RouteNetlinkMessage>) -> Option<String> {
    let NetlinkPayload::InnerMessage(RouteNetlinkMessage::NewLink(link)) = &message.payload else {
        return None;
    };
    link_mac(link)
}

fn link_mac(link: &LinkMessage) -> Option<String> {
    link.attributes.iter().find_map(|attr| match attr {
        LinkAttribute::Address(bytes) => Some(
            bytes
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(":"),
        ),
        _ => None,
    })
}
