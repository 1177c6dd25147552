//! Client-side discovery sender/receiver loop.
//!
//! While searching for a server, the client also completes the autokexec
//! challenge/response handshake for any autokexec-listening host it hears
//! from — this is how an operator's client machine remotely triggers a
//! laptop's autokexec service into serving: the client sends `find-server`,
//! an autokexec listener answers with `autokexec-hello` instead of
//! `server-hello`, and the client echoes back the solved challenge.

use crate::error::ClientError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};
use std::time::Duration;
use stiefel_core::discovery::{Datagram, DISCOVERY_PORT, MAX_DATAGRAM_LEN, MULTICAST_GROUP};
use stiefel_core::net::{list_interfaces, set_link_up};
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

pub struct ServerFound {
    pub host: String,
    pub zone: String,
}

/// Run discovery rounds until a server answers. Each round brings down
/// interfaces up, sends `find-server` on every up interface, then listens
/// for one second before the next round.
pub async fn find_server(key_hash: &str, hmac_key_hex: &str) -> Result<ServerFound, ClientError> {
    let socket = bind()?;
    let group: Ipv6Addr = MULTICAST_GROUP.parse().expect("valid multicast literal");

    loop {
        for iface in list_interfaces()? {
            if !iface.is_up() {
                if let Err(e) = set_link_up(&iface.name).await {
                    warn!(interface = %iface.name, error = %e, "failed to bring link up");
                }
                continue;
            }
            SockRef::from(&socket).set_multicast_if_v6(iface.index)?;
            let msg = Datagram::FindServer.encode(key_hash);
            let dest: SocketAddr = SocketAddrV6::new(group, DISCOVERY_PORT, 0, iface.index).into();
            if let Err(e) = socket.send_to(&msg, dest).await {
                warn!(interface = %iface.name, error = %e, "failed to send find-server");
            } else {
                info!(interface = %iface.name, "broadcast find-server");
            }
        }

        if let Some(found) = listen_one_round(&socket, key_hash, hmac_key_hex).await? {
            return Ok(found);
        }
    }
}

async fn listen_one_round(
    socket: &UdpSocket,
    key_hash: &str,
    hmac_key_hex: &str,
) -> Result<Option<ServerFound>, ClientError> {
    let deadline = Instant::now() + Duration::from_secs(1);
    let mut buf = [0u8; MAX_DATAGRAM_LEN];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }

        let (len, from) = match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await
        {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                warn!(error = %e, "discovery recv failed");
                continue;
            }
            Err(_) => return Ok(None),
        };

        match Datagram::parse(&buf[..len], key_hash) {
            Ok(Datagram::ServerHello) => {
                if let Some(found) = resolve_server(from)? {
                    return Ok(Some(found));
                }
            }
            Ok(Datagram::AutokexecHello { challenge }) => {
                if let Err(e) =
                    answer_autokexec_hello(socket, key_hash, hmac_key_hex, &challenge, from).await
                {
                    warn!(error = %e, peer = %from, "failed to answer autokexec-hello");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, peer = %from, "dropped malformed discovery datagram"),
        }
    }
}

/// Resolve the zone-scoped host string for a server reply, mapping the
/// kernel-reported numeric scope id back to the interface name.
fn resolve_server(from: SocketAddr) -> Result<Option<ServerFound>, ClientError> {
    let SocketAddr::V6(v6) = from else {
        return Ok(None);
    };
    let scope_id = v6.scope_id();
    let zone = list_interfaces()?
        .into_iter()
        .find(|iface| iface.index == scope_id)
        .map(|iface| iface.name);
    let Some(zone) = zone else {
        return Ok(None);
    };
    Ok(Some(ServerFound {
        host: format!("{}%{}", v6.ip(), zone),
        zone,
    }))
}

async fn answer_autokexec_hello(
    socket: &UdpSocket,
    key_hash: &str,
    hmac_key_hex: &str,
    challenge: &str,
    from: SocketAddr,
) -> Result<(), ClientError> {
    let mut mac = HmacSha256::new_from_slice(hmac_key_hex.as_bytes())
        .expect("HMAC accepts a key of any length");
    mac.update(challenge.as_bytes());
    let response = hex::encode(mac.finalize().into_bytes());

    info!(peer = %from, "solving autokexec challenge to trigger remote boot");
    let reply = Datagram::AutokexecReboot { response }.encode(key_hash);
    socket
        .send_to(&reply, from)
        .await
        .map_err(stiefel_core::error::DiscoveryError::Transport)?;
    Ok(())
}

fn bind() -> Result<UdpSocket, ClientError> {
    let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    let addr: SocketAddr = SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0).into();
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;
    Ok(UdpSocket::from_std(socket.into())?)
}
