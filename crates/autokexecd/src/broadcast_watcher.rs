//! Broadcast-based autokexec trigger: answers discovery `find-server`
//! requests with a fresh challenge, verifies the HMAC response against it
//! using the derived autokexec HMAC key.

use crate::error::AutokexecError;
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};
use stiefel_core::discovery::{Datagram, DISCOVERY_PORT, MAX_DATAGRAM_LEN, MULTICAST_GROUP};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

pub async fn watch_for(
    key_hash: String,
    hmac_key_hex: String,
    trigger: watch::Sender<bool>,
) -> Result<(), AutokexecError> {
    let socket = bind()?;

    let mut challenge_bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut challenge_bytes);
    let challenge = general_purpose::STANDARD.encode(challenge_bytes);

    info!("listening for discovery messages to offer autokexec-hello");
    let mut buf = [0u8; MAX_DATAGRAM_LEN];
    loop {
        if *trigger.borrow() {
            return Ok(());
        }
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "broadcast watcher recv failed");
                continue;
            }
        };

        match Datagram::parse(&buf[..len], &key_hash) {
            Ok(Datagram::FindServer) => {
                info!(peer = %from, "challenging discovering peer");
                let reply = Datagram::AutokexecHello {
                    challenge: challenge.clone(),
                }
                .encode(&key_hash);
                if let Err(e) = socket.send_to(&reply, from).await {
                    warn!(error = %e, peer = %from, "failed to send autokexec-hello");
                }
            }
            Ok(Datagram::AutokexecReboot { response }) => {
                if verify_response(&hmac_key_hex, &challenge, &response) {
                    info!(peer = %from, "autokexec-reboot response verified, triggering");
                    let _ = trigger.send(true);
                    return Ok(());
                } else {
                    warn!(peer = %from, "autokexec-reboot response failed HMAC check");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, peer = %from, "dropped malformed discovery datagram"),
        }
    }
}

/// Constant-time verification of the HMAC response via `Mac::verify_slice`,
/// avoiding a hand-rolled comparison.
fn verify_response(hmac_key_hex: &str, challenge: &str, response_hex: &str) -> bool {
    let Ok(response_bytes) = hex::decode(response_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(hmac_key_hex.as_bytes()) else {
        return false;
    };
    mac.update(challenge.as_bytes());
    mac.verify_slice(&response_bytes).is_ok()
}

fn bind() -> Result<UdpSocket, AutokexecError> {
    let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_multicast_loop_v6(true)?;
    let addr: SocketAddr = SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, DISCOVERY_PORT, 0, 0).into();
    socket.bind(&addr.into())?;
    let group: Ipv6Addr = MULTICAST_GROUP.parse().expect("valid multicast literal");
    socket.join_multicast_v6(&group, 0)?;
    socket.set_nonblocking(true)?;
    Ok(UdpSocket::from_std(socket.into())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_response_accepts_the_correct_hmac() {
        let mut mac = HmacSha256::new_from_slice(b"HKhex").unwrap();
        mac.update(b"challenge-bytes");
        let response = hex::encode(mac.finalize().into_bytes());
        assert!(verify_response("HKhex", "challenge-bytes", &response));
    }

    #[test]
    fn verify_response_rejects_wrong_hmac() {
        assert!(!verify_response("HKhex", "challenge-bytes", "00112233"));
    }
}
