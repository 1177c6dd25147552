use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] stiefel_core::error::ConfigError),

    #[error(transparent)]
    Manifest(#[from] stiefel_core::error::ManifestError),

    #[error(transparent)]
    Crypto(#[from] stiefel_core::error::CryptoError),

    #[error(transparent)]
    Discovery(#[from] stiefel_core::error::DiscoveryError),

    #[error("boot request required a LUKS passphrase but none was supplied")]
    MissingLuks,

    #[error("cryptsetup invocation failed: {0}")]
    CryptsetupFailed(String),

    #[error("nbd-server invocation failed: {0}")]
    NbdFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
