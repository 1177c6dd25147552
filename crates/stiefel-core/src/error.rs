use thiserror::Error;

/// Errors from the authenticated-encryption primitive.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("blob too short to contain nonce and tag: {0} bytes")]
    Format(usize),

    #[error("authentication tag mismatch")]
    Auth,

    #[error("AEAD primitive returned a {0}-byte tag, expected 16")]
    BadTagLength(usize),
}

/// Errors from parsing or filtering discovery datagrams.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("datagram does not start with a recognised stiefelsystem tag")]
    UnknownTag,

    #[error("datagram key-hash does not match the local key")]
    KeyHashMismatch,

    #[error("malformed field in datagram: {0}")]
    Format(String),

    #[error("network I/O failed: {0}")]
    Transport(#[from] std::io::Error),
}

/// Errors raised while building or reading a boot payload archive.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("archive I/O failed: {0}")]
    Archive(#[from] std::io::Error),

    #[error("member {0:?} missing from boot archive")]
    MissingMember(&'static str),

    #[error("member {0:?} is not valid UTF-8")]
    InvalidUtf8(&'static str),
}

/// Errors loading the shared `Config`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to read key file {path}: {source}")]
    KeyRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("key file {path} must contain exactly 16 bytes, found {found}")]
    KeyLength { path: String, found: usize },
}
