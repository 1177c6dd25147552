//! Confirms the autokexec challenge/response wire format agrees between a
//! simulated broadcaster (what `autokexecd` sends) and a simulated
//! responder (what `stiefel-client` computes), both built only from
//! `stiefel-core` + the HMAC primitive, since neither binary crate exposes
//! a library target.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use stiefel_core::crypto::autokexec_hmac_key_hex;
use stiefel_core::discovery::Datagram;

type HmacSha256 = Hmac<Sha256>;

#[test]
fn challenge_response_round_trips_through_the_datagram_encoding() {
    let key = [9u8; 16];
    let hk = autokexec_hmac_key_hex(&key);
    let kh = "deadbeefcafef00d";

    let challenge = "AAAAAAAAAAAAAAAAAAAAAA==".to_string();
    let hello = Datagram::AutokexecHello {
        challenge: challenge.clone(),
    }
    .encode(kh);
    let Datagram::AutokexecHello {
        challenge: received_challenge,
    } = Datagram::parse(&hello, kh).unwrap()
    else {
        panic!("expected AutokexecHello");
    };
    assert_eq!(received_challenge, challenge);

    let mut mac = HmacSha256::new_from_slice(hk.as_bytes()).unwrap();
    mac.update(received_challenge.as_bytes());
    let response = hex::encode(mac.finalize().into_bytes());

    let reboot = Datagram::AutokexecReboot {
        response: response.clone(),
    }
    .encode(kh);
    let Datagram::AutokexecReboot {
        response: received_response,
    } = Datagram::parse(&reboot, kh).unwrap()
    else {
        panic!("expected AutokexecReboot");
    };

    let mut verifier = HmacSha256::new_from_slice(hk.as_bytes()).unwrap();
    verifier.update(challenge.as_bytes());
    let decoded = hex::decode(&received_response).unwrap();
    assert!(verifier.verify_slice(&decoded).is_ok());
}
