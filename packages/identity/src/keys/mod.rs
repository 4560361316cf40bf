//! Private key capabilities
//!
//! Private keys reach the protocol layer only as a [`KeyHandle`]: something that
//! can sign. Raw PKCS#8 export is an optional extra that store-only keys refuse.
//!
//! - `ring_key`: the ring-backed handle used for every key source
//! - `verify`: signature verification against a certificate's public key

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Result;

pub mod ring_key;
pub mod verify;

pub use ring_key::RingKeyHandle;
pub use verify::verify_signature;

/// Elliptic curves available for ECDSA identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcdsaCurve {
    /// NIST P-256 with SHA-256 signatures
    P256,
    /// NIST P-384 with SHA-384 signatures
    P384,
}

impl EcdsaCurve {
    /// Field size in bits
    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            Self::P256 => 256,
            Self::P384 => 384,
        }
    }
}

/// Asymmetric key algorithm of an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// RSA with PKCS#1 v1.5 SHA-256 signatures
    Rsa {
        /// Modulus size in bits
        bits: u32,
    },
    /// ECDSA over a named curve
    Ecdsa(EcdsaCurve),
}

impl KeyAlgorithm {
    /// RSA modulus sizes the generator accepts
    pub const RSA_SIZES: [u32; 3] = [2048, 3072, 4096];

    /// RSA-2048, the default session identity strength
    #[must_use]
    pub fn rsa_2048() -> Self {
        Self::Rsa { bits: 2048 }
    }

    /// Key size in bits (modulus for RSA, field size for ECDSA)
    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            Self::Rsa { bits } => bits,
            Self::Ecdsa(curve) => curve.bits(),
        }
    }

    /// Short family name, e.g. `RSA`
    #[must_use]
    pub fn family(self) -> &'static str {
        match self {
            Self::Rsa { .. } => "RSA",
            Self::Ecdsa(_) => "ECDSA",
        }
    }
}

impl Default for KeyAlgorithm {
    fn default() -> Self {
        Self::rsa_2048()
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa { bits } => write!(f, "RSA-{bits}"),
            Self::Ecdsa(EcdsaCurve::P256) => f.write_str("ECDSA-P256"),
            Self::Ecdsa(EcdsaCurve::P384) => f.write_str("ECDSA-P384"),
        }
    }
}

/// Signing capability over a private key
///
/// Implementations must be safe to share across threads; each call is independent.
pub trait KeyHandle: Send + Sync + fmt::Debug {
    /// Algorithm of the underlying key
    fn algorithm(&self) -> KeyAlgorithm;

    /// Public half in certificate encoding: the `subjectPublicKey` bit string
    /// contents (PKCS#1 `RSAPublicKey` for RSA, an uncompressed point for ECDSA)
    fn public_key(&self) -> &[u8];

    /// Sign `message` with the algorithm's certificate signature scheme
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Signing` if the provider rejects the operation.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;

    /// Export the private key as PKCS#8 DER when the source allows it
    fn export_pkcs8(&self) -> Option<SecretBytes> {
        None
    }
}

/// A zeroize-on-drop wrapper for secret bytes.
///
/// Used for PKCS#8 material so key bytes don't linger in memory after teardown.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    /// Wrap secret bytes
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the secret bytes.
    ///
    /// The returned slice should not be copied into storage that outlives this value.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for SecretBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// Explicitly no byte dump
impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes({} bytes)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_algorithm_display() {
        assert_eq!(KeyAlgorithm::rsa_2048().to_string(), "RSA-2048");
        assert_eq!(
            KeyAlgorithm::Ecdsa(EcdsaCurve::P384).to_string(),
            "ECDSA-P384"
        );
        assert_eq!(KeyAlgorithm::Ecdsa(EcdsaCurve::P256).bits(), 256);
        assert_eq!(KeyAlgorithm::default(), KeyAlgorithm::Rsa { bits: 2048 });
    }

    #[test]
    fn test_secret_bytes_debug_hides_content() {
        let secret = SecretBytes::new(vec![0xde, 0xad, 0xbe, 0xef]);
        let rendered = format!("{secret:?}");
        assert_eq!(rendered, "SecretBytes(4 bytes)");
        assert!(!rendered.contains("de"));
    }
}
