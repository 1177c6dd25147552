//! Framing and filtering for discovery datagrams.
//!
//! Every datagram is ASCII and `:`-delimited. A peer only ever acts on a
//! datagram whose key-hash field matches its own `KH` — everything else is
//! silently discarded.

use crate::error::DiscoveryError;

pub const DISCOVERY_PORT: u16 = 61570;
pub const MULTICAST_GROUP: &str = "ff02::1";
pub const MAX_DATAGRAM_LEN: usize = 1024;

const PREFIX: &str = "stiefelsystem:discovery";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datagram {
    FindServer,
    ServerHello,
    AutokexecHello { challenge: String },
    AutokexecReboot { response: String },
}

impl Datagram {
    /// Render this datagram for the given key-hash, ready to send.
    pub fn encode(&self, key_hash: &str) -> Vec<u8> {
        let body = match self {
            Datagram::FindServer => format!("{PREFIX}:find-server:{key_hash}"),
            Datagram::ServerHello => format!("{PREFIX}:server-hello:{key_hash}"),
            Datagram::AutokexecHello { challenge } => {
                format!("{PREFIX}:autokexec-hello:{key_hash}:{challenge}")
            }
            Datagram::AutokexecReboot { response } => {
                format!("{PREFIX}:autokexec-reboot:{key_hash}:{response}")
            }
        };
        body.into_bytes()
    }

    /// Parse a received datagram, accepting it only if its key-hash field
    /// equals `expected_key_hash`. Any mismatch - unknown tag, wrong
    /// key-hash, or malformed trailing fields - is reported as an error so
    /// the caller can log-and-drop it.
    pub fn parse(raw: &[u8], expected_key_hash: &str) -> Result<Datagram, DiscoveryError> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| DiscoveryError::Format("datagram is not valid UTF-8".into()))?;
        if !text.starts_with(&format!("{PREFIX}:")) {
            return Err(DiscoveryError::UnknownTag);
        }
        let rest = &text[PREFIX.len() + 1..];
        let mut fields = rest.splitn(3, ':');
        let kind = fields.next().ok_or(DiscoveryError::UnknownTag)?;

        match kind {
            "find-server" => {
                let kh = fields.next().ok_or(DiscoveryError::UnknownTag)?;
                check_key_hash(kh, expected_key_hash)?;
                Ok(Datagram::FindServer)
            }
            "server-hello" => {
                let kh = fields.next().ok_or(DiscoveryError::UnknownTag)?;
                check_key_hash(kh, expected_key_hash)?;
                Ok(Datagram::ServerHello)
            }
            "autokexec-hello" => {
                let kh = fields.next().ok_or(DiscoveryError::UnknownTag)?;
                check_key_hash(kh, expected_key_hash)?;
                let challenge = fields
                    .next()
                    .ok_or_else(|| DiscoveryError::Format("missing challenge field".into()))?;
                Ok(Datagram::AutokexecHello {
                    challenge: challenge.to_string(),
                })
            }
            "autokexec-reboot" => {
                let kh = fields.next().ok_or(DiscoveryError::UnknownTag)?;
                check_key_hash(kh, expected_key_hash)?;
                let response = fields
                    .next()
                    .ok_or_else(|| DiscoveryError::Format("missing response field".into()))?;
                Ok(Datagram::AutokexecReboot {
                    response: response.to_string(),
                })
            }
            _ => Err(DiscoveryError::UnknownTag),
        }
    }
}

fn check_key_hash(got: &str, expected: &str) -> Result<(), DiscoveryError> {
    if got == expected {
        Ok(())
    } else {
        Err(DiscoveryError::KeyHashMismatch)
    }
}

/// Split an IPv6 zone-scoped address string (`fe80::1%eth0`) into the
/// address and the interface-name zone. Returns `None` if there is no zone
/// suffix.
pub fn split_zone(scoped: &str) -> Option<(&str, &str)> {
    scoped.split_once('%')
}

/// Rewrite the zone id of a scoped IPv6 address literal from the
/// discovered interface name to the literal `stiefellink`.
pub fn rewrite_zone_to_stiefellink(scoped: &str, discovered_zone: &str) -> String {
    match split_zone(scoped) {
        Some((addr, zone)) if zone == discovered_zone => format!("{addr}%stiefellink"),
        _ => scoped.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_and_parse_find_server() {
        let kh = "deadbeef";
        let raw = Datagram::FindServer.encode(kh);
        assert_eq!(Datagram::parse(&raw, kh).unwrap(), Datagram::FindServer);
    }

    #[test]
    fn wrong_key_hash_is_rejected() {
        let raw = Datagram::ServerHello.encode("aaaa");
        assert!(matches!(
            Datagram::parse(&raw, "bbbb"),
            Err(DiscoveryError::KeyHashMismatch)
        ));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let raw = b"not-stiefelsystem-at-all";
        assert!(matches!(
            Datagram::parse(raw, "aaaa"),
            Err(DiscoveryError::UnknownTag)
        ));
    }

    #[test]
    fn autokexec_hello_round_trips_challenge() {
        let kh = "cafef00d";
        let raw = Datagram::AutokexecHello {
            challenge: "AAAAAAAAAAAAAAAAAAAAAA==".to_string(),
        }
        .encode(kh);
        match Datagram::parse(&raw, kh).unwrap() {
            Datagram::AutokexecHello { challenge } => {
                assert_eq!(challenge, "AAAAAAAAAAAAAAAAAAAAAA==")
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn zone_rewrite_targets_discovered_interface_only() {
        assert_eq!(
            rewrite_zone_to_stiefellink("fe80::1%eth0", "eth0"),
            "fe80::1%stiefellink"
        );
        assert_eq!(
            rewrite_zone_to_stiefellink("fe80::1%wlan0", "eth0"),
            "fe80::1%wlan0"
        );
    }
}
