//! The server-side boot manifest and the boot payload archive it produces
//! per client request.

use crate::error::ManifestError;
use crate::module::{format_module_list, parse_module_list, StiefelModule};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;

/// Static, per-host record of what to serve. Constructed once at startup
/// from `Config` and shared read-only across the announcer and HTTP tasks.
#[derive(Debug, Clone)]
pub struct BootManifest {
    pub kernel: Vec<u8>,
    pub initrd: Vec<u8>,
    pub cmdline: Vec<String>,
    pub modules: Vec<StiefelModule>,
    pub block_device: PathBuf,
    pub luks_device: Option<PathBuf>,
}

impl BootManifest {
    pub fn need_luks(&self) -> bool {
        self.luks_device.is_some()
    }

    pub fn cmdline_line(&self) -> String {
        self.cmdline.join(" ")
    }
}

/// Build the uncompressed POSIX ustar boot payload archive for a single
/// client request, embedding the echoed `challenge`.
pub fn build_archive(manifest: &BootManifest, challenge: &str) -> Result<Vec<u8>, ManifestError> {
    let mut builder = tar::Builder::new(Vec::new());
    append_member(&mut builder, "challenge", challenge.as_bytes())?;
    append_member(&mut builder, "cmdline", manifest.cmdline_line().as_bytes())?;
    append_member(
        &mut builder,
        "stiefelmodules",
        format_module_list(&manifest.modules).as_bytes(),
    )?;
    append_member(&mut builder, "kernel", &manifest.kernel)?;
    append_member(&mut builder, "initrd", &manifest.initrd)?;
    let bytes = builder.into_inner().map_err(ManifestError::Archive)?;
    Ok(bytes)
}

fn append_member(
    builder: &mut tar::Builder<Vec<u8>>,
    name: &str,
    data: &[u8],
) -> Result<(), ManifestError> {
    let mut header = tar::Header::new_ustar();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, name, data)
        .map_err(ManifestError::Archive)
}

/// The members of a decoded boot archive, keyed by member name, as read on
/// the client side.
pub struct ArchiveMembers {
    pub entries: BTreeMap<String, Vec<u8>>,
}

impl ArchiveMembers {
    pub fn read(archive_bytes: &[u8]) -> Result<ArchiveMembers, ManifestError> {
        let mut archive = tar::Archive::new(archive_bytes);
        let mut entries = BTreeMap::new();
        for entry in archive.entries().map_err(ManifestError::Archive)? {
            let mut entry = entry.map_err(ManifestError::Archive)?;
            let name = entry
                .path()
                .map_err(ManifestError::Archive)?
                .to_string_lossy()
                .into_owned();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).map_err(ManifestError::Archive)?;
            entries.insert(name, data);
        }
        Ok(ArchiveMembers { entries })
    }

    pub fn challenge(&self) -> Result<&[u8], ManifestError> {
        self.entries
            .get("challenge")
            .map(|v| v.as_slice())
            .ok_or(ManifestError::MissingMember("challenge"))
    }

    pub fn text_member(&self, name: &'static str) -> Result<String, ManifestError> {
        let bytes = self
            .entries
            .get(name)
            .ok_or(ManifestError::MissingMember(name))?;
        String::from_utf8(bytes.clone()).map_err(|_| ManifestError::InvalidUtf8(name))
    }

    pub fn stiefelmodules(&self) -> Result<Vec<StiefelModule>, ManifestError> {
        Ok(parse_module_list(&self.text_member("stiefelmodules")?))
    }

    /// All members other than `challenge`, `cmdline`, `stiefelmodules` - the
    /// set the client materializes to `/<member-name>` before kexec.
    pub fn filesystem_members(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .filter(|(name, _)| !matches!(name.as_str(), "challenge" | "cmdline" | "stiefelmodules"))
            .map(|(name, data)| (name.as_str(), data.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> BootManifest {
        BootManifest {
            kernel: b"fake-kernel-bytes".to_vec(),
            initrd: b"fake-initrd-bytes".to_vec(),
            cmdline: vec!["root=/dev/nbd0".into(), "rw".into()],
            modules: vec![StiefelModule::SystemDebian],
            block_device: PathBuf::from("/dev/sda"),
            luks_device: None,
        }
    }

    #[test]
    fn archive_round_trips_challenge_and_members() {
        let m = manifest();
        let archive = build_archive(&m, "my-nonce").unwrap();
        let members = ArchiveMembers::read(&archive).unwrap();
        assert_eq!(members.challenge().unwrap(), b"my-nonce");
        assert_eq!(members.text_member("cmdline").unwrap(), "root=/dev/nbd0 rw");
        assert_eq!(members.stiefelmodules().unwrap(), vec![StiefelModule::SystemDebian]);
        let kernel = members.entries.get("kernel").unwrap();
        assert_eq!(kernel, &m.kernel);
    }

    #[test]
    fn need_luks_reflects_luks_device() {
        let mut m = manifest();
        assert!(!m.need_luks());
        m.luks_device = Some(PathBuf::from("/dev/mapper/root"));
        assert!(m.need_luks());
    }

    #[test]
    fn filesystem_members_excludes_protocol_fields() {
        let m = manifest();
        let archive = build_archive(&m, "nonce").unwrap();
        let members = ArchiveMembers::read(&archive).unwrap();
        let names: Vec<&str> = members.filesystem_members().map(|(n, _)| n).collect();
        assert!(names.contains(&"kernel"));
        assert!(names.contains(&"initrd"));
        assert!(!names.contains(&"challenge"));
        assert!(!names.contains(&"cmdline"));
        assert!(!names.contains(&"stiefelmodules"));
    }
}
