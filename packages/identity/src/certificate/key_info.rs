//! Public key algorithm extraction
//!
//! Identifies the key family and size from a certificate's
//! `SubjectPublicKeyInfo`, and decides whether the host crypto provider can
//! operate it.

use const_oid::db::rfc5912::{
    ID_EC_PUBLIC_KEY, RSA_ENCRYPTION, SECP_224_R_1, SECP_256_R_1, SECP_384_R_1, SECP_521_R_1,
};
use const_oid::db::rfc8410::{ID_ED_448, ID_ED_25519};
use const_oid::ObjectIdentifier;
use der::asn1::UintRef;
use der::{Decode, Sequence};
use spki::SubjectPublicKeyInfoOwned;

use crate::error::{IdentityError, Result};
use crate::keys::{EcdsaCurve, KeyAlgorithm};

/// Smallest RSA modulus the signing provider accepts
pub const MIN_RSA_BITS: u32 = 2048;

/// PKCS#1 `RSAPublicKey`
#[derive(Sequence)]
struct RsaPublicKey<'a> {
    modulus: UintRef<'a>,
    #[allow(dead_code)]
    public_exponent: UintRef<'a>,
}

/// Public key family as written in the certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyKind {
    /// `rsaEncryption` with the modulus size when it could be read
    Rsa {
        /// Modulus size in bits
        bits: Option<u32>,
    },
    /// `id-ecPublicKey` on a named curve
    Ec {
        /// Curve OID from the algorithm parameters
        curve: Option<ObjectIdentifier>,
    },
    /// Ed25519
    Ed25519,
    /// Ed448
    Ed448,
    /// Anything else, by OID
    Other(ObjectIdentifier),
}

impl PublicKeyKind {
    /// Human-readable family name
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Rsa { .. } => "RSA".to_string(),
            Self::Ec { .. } => "ECDSA".to_string(),
            Self::Ed25519 => "Ed25519".to_string(),
            Self::Ed448 => "Ed448".to_string(),
            Self::Other(oid) => format!("Unknown({oid})"),
        }
    }

    /// Key size in bits, when known
    #[must_use]
    pub fn bits(&self) -> Option<u32> {
        match self {
            Self::Rsa { bits } => *bits,
            Self::Ec { curve } => curve.as_ref().and_then(|oid| curve_bits(oid)),
            Self::Ed25519 => Some(256),
            Self::Ed448 => Some(448),
            Self::Other(_) => None,
        }
    }

    /// Map onto an algorithm this crate can sign with
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::UnsupportedPlatform` for keys the provider cannot
    /// operate: RSA below [`MIN_RSA_BITS`], curves other than P-256/P-384, EdDSA.
    pub fn supported_algorithm(&self) -> Result<KeyAlgorithm> {
        match self {
            Self::Rsa { bits: Some(bits) } if *bits >= MIN_RSA_BITS => {
                Ok(KeyAlgorithm::Rsa { bits: *bits })
            }
            Self::Rsa { bits: Some(bits) } => Err(IdentityError::unsupported_platform(format!(
                "RSA-{bits} keys are below the {MIN_RSA_BITS}-bit provider minimum"
            ))),
            Self::Rsa { bits: None } => Err(IdentityError::encoding(
                "RSA public key modulus could not be read",
            )),
            Self::Ec { curve: Some(curve) } if *curve == SECP_256_R_1 => {
                Ok(KeyAlgorithm::Ecdsa(EcdsaCurve::P256))
            }
            Self::Ec { curve: Some(curve) } if *curve == SECP_384_R_1 => {
                Ok(KeyAlgorithm::Ecdsa(EcdsaCurve::P384))
            }
            Self::Ec { curve } => Err(IdentityError::unsupported_platform(format!(
                "ECDSA curve {} has no signing support in this provider",
                curve.map_or_else(|| "<missing>".to_string(), |oid| oid.to_string())
            ))),
            other => Err(IdentityError::unsupported_platform(format!(
                "{} keys have no signing support in this provider",
                other.name()
            ))),
        }
    }
}

/// Classify the public key of a certificate
pub fn extract_public_key_kind(spki: &SubjectPublicKeyInfoOwned) -> PublicKeyKind {
    let oid = spki.algorithm.oid;

    if oid == RSA_ENCRYPTION {
        PublicKeyKind::Rsa {
            bits: rsa_modulus_bits(spki.subject_public_key.raw_bytes()),
        }
    } else if oid == ID_EC_PUBLIC_KEY {
        let curve = spki
            .algorithm
            .parameters
            .as_ref()
            .and_then(|params| params.decode_as::<ObjectIdentifier>().ok());
        PublicKeyKind::Ec { curve }
    } else if oid == ID_ED_25519 {
        PublicKeyKind::Ed25519
    } else if oid == ID_ED_448 {
        PublicKeyKind::Ed448
    } else {
        PublicKeyKind::Other(oid)
    }
}

fn curve_bits(curve: &ObjectIdentifier) -> Option<u32> {
    match *curve {
        SECP_224_R_1 => Some(224),
        SECP_256_R_1 => Some(256),
        SECP_384_R_1 => Some(384),
        SECP_521_R_1 => Some(521),
        _ => None,
    }
}

/// Bit length of a big-endian positive integer
fn compute_bit_length(bytes: &[u8]) -> Option<u32> {
    let start = bytes.iter().position(|&b| b != 0)?;
    let effective = &bytes[start..];
    let high_bits = 8u32 - effective[0].leading_zeros();
    let rest_bits = u32::try_from((effective.len() - 1) * 8).ok()?;
    Some(high_bits + rest_bits)
}

fn rsa_modulus_bits(public_key: &[u8]) -> Option<u32> {
    let key = RsaPublicKey::from_der(public_key).ok()?;
    compute_bit_length(key.modulus.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_bit_length() {
        assert_eq!(compute_bit_length(&[0x00, 0x80, 0x00]), Some(16));
        assert_eq!(compute_bit_length(&[0x01]), Some(1));
        assert_eq!(compute_bit_length(&[0x00, 0x00]), None);
        assert_eq!(compute_bit_length(&[]), None);
    }

    #[test]
    fn test_unsupported_kinds_are_platform_limitations() {
        let small_rsa = PublicKeyKind::Rsa { bits: Some(1024) };
        assert!(matches!(
            small_rsa.supported_algorithm(),
            Err(IdentityError::UnsupportedPlatform(_))
        ));

        let p521 = PublicKeyKind::Ec {
            curve: Some(SECP_521_R_1),
        };
        assert_eq!(p521.bits(), Some(521));
        assert!(matches!(
            p521.supported_algorithm(),
            Err(IdentityError::UnsupportedPlatform(_))
        ));

        assert!(matches!(
            PublicKeyKind::Ed25519.supported_algorithm(),
            Err(IdentityError::UnsupportedPlatform(_))
        ));
    }

    #[test]
    fn test_supported_kinds() {
        let rsa = PublicKeyKind::Rsa { bits: Some(3072) };
        assert_eq!(
            rsa.supported_algorithm().ok(),
            Some(KeyAlgorithm::Rsa { bits: 3072 })
        );

        let p384 = PublicKeyKind::Ec {
            curve: Some(SECP_384_R_1),
        };
        assert_eq!(
            p384.supported_algorithm().ok(),
            Some(KeyAlgorithm::Ecdsa(EcdsaCurve::P384))
        );
    }
}
