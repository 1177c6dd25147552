//! `cmdline` synthesis itself is unit-tested inline in `src/cmdline.rs`;
//! this covers the shared pieces of the pipeline it depends on.

use stiefel_core::discovery::rewrite_zone_to_stiefellink;
use stiefel_core::module::{parse_module_list, StiefelModule};

#[test]
fn archive_derived_module_list_selects_the_debian_template() {
    let modules = parse_module_list("system-debian nbd");
    assert!(modules.contains(&StiefelModule::SystemDebian));
    assert!(!modules.contains(&StiefelModule::SystemGentoo));
}

#[test]
fn server_zone_is_rewritten_before_being_embedded_in_cmdline() {
    let rewritten = rewrite_zone_to_stiefellink("fe80::5%enp3s0", "enp3s0");
    assert_eq!(rewritten, "fe80::5%stiefellink");
}
