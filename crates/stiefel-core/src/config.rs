//! Typed, explicitly-constructed configuration, loaded once at startup and
//! passed to each component rather than kept as global state.

use crate::crypto::KEY_LEN;
use crate::error::ConfigError;
use crate::module::StiefelModule;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the file holding the 16-byte shared secret `K`.
    pub key_path: PathBuf,

    #[serde(default)]
    pub boot: BootConfig,
    #[serde(default)]
    pub autokexec: AutokexecConfig,
    #[serde(default)]
    pub server_setup: ServerSetupConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootConfig {
    pub disk: Option<PathBuf>,
    pub luks_block: Option<PathBuf>,
    pub kernel: Option<PathBuf>,
    pub initrd: Option<PathBuf>,
    #[serde(default)]
    pub cmdline: Vec<String>,
    #[serde(default)]
    pub modules: Vec<StiefelModule>,
}

/// Configuration for the `autokexecd` service that runs on the laptop.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutokexecConfig {
    #[serde(default)]
    pub mac_detection: bool,
    #[serde(default)]
    pub broadcast: bool,
    #[serde(default)]
    pub macs: Vec<String>,
}

/// Where to find the pre-staged stiefelOS kernel/initrd that autokexec
/// loads to enter the serving role, plus the cmdline to boot it with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSetupConfig {
    pub stiefelsystem_kernel: Option<PathBuf>,
    pub stiefelsystem_initrd: Option<PathBuf>,
    #[serde(default)]
    pub cmdline: Vec<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Read the 16-byte shared secret from `key_path`.
    pub fn load_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>, ConfigError> {
        load_key_from(&self.key_path)
    }
}

pub fn load_key_from(path: &Path) -> Result<Zeroizing<[u8; KEY_LEN]>, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::KeyRead {
        path: path.display().to_string(),
        source,
    })?;
    if bytes.len() != KEY_LEN {
        return Err(ConfigError::KeyLength {
            path: path.display().to_string(),
            found: bytes.len(),
        });
    }
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&bytes);
    Ok(Zeroizing::new(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_minimal_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"key_path = "/etc/stiefel/key""#).unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.key_path, PathBuf::from("/etc/stiefel/key"));
        assert!(!cfg.autokexec.broadcast);
    }

    #[test]
    fn loads_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
key_path = "/etc/stiefel/key"

[boot]
disk = "/dev/sda"
cmdline = ["root=/dev/nbd0", "rw"]
modules = ["system-debian", "nbd"]

[autokexec]
mac_detection = true
broadcast = true
macs = ["52:54:00:12:34:56"]

[server_setup]
stiefelsystem_kernel = "/boot/stiefel-kernel"
stiefelsystem_initrd = "/boot/stiefel-initrd"
cmdline = ["console=ttyS0"]
"#
        )
        .unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.boot.modules, vec![StiefelModule::SystemDebian, StiefelModule::Nbd]);
        assert!(cfg.autokexec.mac_detection);
        assert_eq!(cfg.autokexec.macs, vec!["52:54:00:12:34:56".to_string()]);
        assert_eq!(
            cfg.server_setup.stiefelsystem_kernel,
            Some(PathBuf::from("/boot/stiefel-kernel"))
        );
    }

    #[test]
    fn key_of_wrong_length_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3]).unwrap();
        assert!(matches!(
            load_key_from(file.path()),
            Err(ConfigError::KeyLength { found: 3, .. })
        ));
    }

    #[test]
    fn key_of_correct_length_loads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[9u8; KEY_LEN]).unwrap();
        let key = load_key_from(file.path()).unwrap();
        assert_eq!(*key, [9u8; KEY_LEN]);
    }
}
