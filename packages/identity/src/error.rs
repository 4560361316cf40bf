//! Error handling for DTLS identity operations

use thiserror::Error;

/// Identity-specific errors
///
/// Every failure is surfaced to the caller; nothing in this crate retries.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Key pair or certificate could not be produced
    #[error("Certificate generation failed: {0}")]
    Generation(String),

    /// Hash algorithm token outside the supported set
    #[error("Unsupported fingerprint hash algorithm: {0}")]
    UnsupportedHashAlgorithm(String),

    /// Certificate or key bytes are malformed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// No private key can be associated with the certificate
    #[error("Private key not found: {0}")]
    KeyNotFound(String),

    /// The host crypto provider or key store cannot expose the key in a usable form
    #[error("Unsupported on this platform: {0}")]
    UnsupportedPlatform(String),

    /// Archive password is wrong or the archive is corrupt
    #[error("Archive access failed: {0}")]
    ArchiveAccess(String),

    /// Certificate store has nothing under the requested label
    #[error("Certificate not found in store: {0}")]
    CertificateNotFound(String),

    /// Key material was loaded as store-only and cannot leave its handle
    #[error("Private key is not exportable: {0}")]
    NotExportable(String),

    /// The crypto provider rejected a signing operation
    #[error("Signing failed: {0}")]
    Signing(String),

    /// File access failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IdentityError {
    /// Create a `Generation` error
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Create an `Encoding` error
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a `KeyNotFound` error
    pub fn key_not_found(msg: impl Into<String>) -> Self {
        Self::KeyNotFound(msg.into())
    }

    /// Create an `UnsupportedPlatform` error
    pub fn unsupported_platform(msg: impl Into<String>) -> Self {
        Self::UnsupportedPlatform(msg.into())
    }

    /// Create an `ArchiveAccess` error
    pub fn archive_access(msg: impl Into<String>) -> Self {
        Self::ArchiveAccess(msg.into())
    }

    /// Whether the caller may log and skip instead of aborting session setup
    #[must_use]
    pub fn is_platform_limitation(&self) -> bool {
        matches!(self, Self::UnsupportedPlatform(_))
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, IdentityError>;
