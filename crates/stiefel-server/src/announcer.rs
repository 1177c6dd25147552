//! Discovery-port announcer: answers `find-server` with `server-hello`.

use crate::error::ServerError;
use socket2::{Domain, Protocol, Socket, Type};
use stiefel_core::discovery::{Datagram, DISCOVERY_PORT, MAX_DATAGRAM_LEN, MULTICAST_GROUP};
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};
use tokio::net::UdpSocket;
use tracing::{info, warn};

pub fn bind() -> Result<UdpSocket, ServerError> {
    let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_only_v6(false)?;
    socket.set_multicast_loop_v6(true)?;
    let addr: SocketAddr = SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, DISCOVERY_PORT, 0, 0).into();
    socket.bind(&addr.into())?;
    let group: Ipv6Addr = MULTICAST_GROUP.parse().expect("valid multicast literal");
    socket.join_multicast_v6(&group, 0)?;
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into()).map_err(ServerError::Io)
}

/// Run forever, answering every valid `find-server` with `server-hello`.
pub async fn run(socket: UdpSocket, key_hash: String) -> Result<(), ServerError> {
    let mut buf = [0u8; MAX_DATAGRAM_LEN];
    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "announcer recv failed");
                continue;
            }
        };

        match Datagram::parse(&buf[..len], &key_hash) {
            Ok(Datagram::FindServer) => {
                let reply = Datagram::ServerHello.encode(&key_hash);
                if let Err(e) = socket.send_to(&reply, from).await {
                    warn!(error = %e, peer = %from, "failed to send server-hello");
                } else {
                    info!(peer = %from, "answered find-server with server-hello");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, peer = %from, "dropped malformed discovery datagram"),
        }
    }
}
