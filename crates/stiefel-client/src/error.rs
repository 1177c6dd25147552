use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] stiefel_core::error::ConfigError),

    #[error(transparent)]
    Crypto(#[from] stiefel_core::error::CryptoError),

    #[error(transparent)]
    Manifest(#[from] stiefel_core::error::ManifestError),

    #[error(transparent)]
    Discovery(#[from] stiefel_core::error::DiscoveryError),

    #[error("no stiefelsystem server answered discovery within the search window")]
    NoServerFound,

    #[error("server replied with a different key-hash than ours")]
    WrongKeyHash,

    #[error("server sent a what != stiefelsystem-server payload")]
    NotAStiefelServer,

    #[error("boot.tar.aes response was {0} bytes, too short to be valid")]
    Corrupt(usize),

    #[error("challenge in the returned archive did not match what we sent - possible replay")]
    Replay,

    #[error("stiefelmodules set did not match any known boot template")]
    UnsupportedSystem,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("external command {0:?} failed")]
    ExternalCommand(&'static str),
}
