//! Closed set of stiefelsystem module identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StiefelModule {
    Nbd,
    Lvm,
    I915,
    Debug,
    ClevoFancontrol,
    R8152,
    SystemDebian,
    SystemArch,
    SystemArchDracut,
    SystemGentoo,
}

impl StiefelModule {
    pub const ALL: &'static [StiefelModule] = &[
        StiefelModule::Nbd,
        StiefelModule::Lvm,
        StiefelModule::I915,
        StiefelModule::Debug,
        StiefelModule::ClevoFancontrol,
        StiefelModule::R8152,
        StiefelModule::SystemDebian,
        StiefelModule::SystemArch,
        StiefelModule::SystemArchDracut,
        StiefelModule::SystemGentoo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StiefelModule::Nbd => "nbd",
            StiefelModule::Lvm => "lvm",
            StiefelModule::I915 => "i915",
            StiefelModule::Debug => "debug",
            StiefelModule::ClevoFancontrol => "clevo-fancontrol",
            StiefelModule::R8152 => "r8152",
            StiefelModule::SystemDebian => "system-debian",
            StiefelModule::SystemArch => "system-arch",
            StiefelModule::SystemArchDracut => "system-arch-dracut",
            StiefelModule::SystemGentoo => "system-gentoo",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<StiefelModule> {
        Self::ALL.iter().copied().find(|m| m.as_str() == s)
    }
}

impl fmt::Display for StiefelModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse the space-separated `stiefelmodules` archive member. Unknown
/// tokens are dropped silently; only cmdline synthesis treats an
/// unrecognised module set as fatal.
pub fn parse_module_list(raw: &str) -> Vec<StiefelModule> {
    raw.split(' ')
        .filter(|s| !s.is_empty())
        .filter_map(StiefelModule::from_str_opt)
        .collect()
}

pub fn format_module_list(modules: &[StiefelModule]) -> String {
    modules
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire_format() {
        let modules = [StiefelModule::SystemDebian, StiefelModule::Nbd];
        let rendered = format_module_list(&modules);
        assert_eq!(rendered, "system-debian nbd");
        assert_eq!(parse_module_list(&rendered), modules.to_vec());
    }

    #[test]
    fn unknown_token_is_dropped() {
        assert_eq!(
            parse_module_list("system-debian not-a-real-module"),
            vec![StiefelModule::SystemDebian]
        );
    }
}
