//! Exercises the manifest/archive pipeline the HTTP handler builds on,
//! using only the shared `stiefel-core` types (the axum app itself needs a
//! bound socket and is covered by manual/integration testing instead).

use stiefel_core::crypto::{decrypt, encrypt};
use stiefel_core::manifest::{build_archive, ArchiveMembers, BootManifest};
use stiefel_core::module::StiefelModule;
use std::path::PathBuf;

fn manifest_with_luks() -> BootManifest {
    BootManifest {
        kernel: b"k".to_vec(),
        initrd: b"i".to_vec(),
        cmdline: vec!["quiet".into()],
        modules: vec![StiefelModule::SystemGentoo],
        block_device: PathBuf::from("/dev/sda1"),
        luks_device: Some(PathBuf::from("/dev/sda2")),
    }
}

#[test]
fn served_archive_embeds_the_requesters_challenge() {
    let manifest = manifest_with_luks();
    let archive = build_archive(&manifest, "req-challenge").unwrap();
    let members = ArchiveMembers::read(&archive).unwrap();
    assert_eq!(members.challenge().unwrap(), b"req-challenge");
}

#[test]
fn encrypted_response_blob_decrypts_back_to_the_same_archive() {
    let manifest = manifest_with_luks();
    let key = [3u8; 16];
    let archive = build_archive(&manifest, "c").unwrap();
    let blob = encrypt(&key, &archive).unwrap();
    assert_eq!(decrypt(&key, &blob).unwrap(), archive);
}

#[test]
fn manifest_with_luks_device_reports_need_luks() {
    assert!(manifest_with_luks().need_luks());
}
