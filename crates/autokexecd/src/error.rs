use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutokexecError {
    #[error(transparent)]
    Config(#[from] stiefel_core::error::ConfigError),

    #[error(transparent)]
    Discovery(#[from] stiefel_core::error::DiscoveryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("netlink request failed: {0}")]
    Netlink(String),

    #[error("external command {0:?} failed")]
    ExternalCommand(&'static str),
}
