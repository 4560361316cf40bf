//! ring-backed key handle
//!
//! Every key source (generated, archive, store) ends up here once its PKCS#8
//! material is available. Store-only keys are built without retaining the
//! PKCS#8 bytes, so they can sign but never export.

use std::fmt;

use ring::rand::SystemRandom;
use ring::signature::{
    self, EcdsaKeyPair, EcdsaSigningAlgorithm, KeyPair as _, RsaKeyPair,
};

use super::{EcdsaCurve, KeyAlgorithm, KeyHandle, SecretBytes};
use crate::error::{IdentityError, Result};

enum RingKeyPair {
    Rsa(RsaKeyPair),
    Ecdsa(EcdsaKeyPair),
}

/// Signing handle over a ring key pair
pub struct RingKeyHandle {
    algorithm: KeyAlgorithm,
    key_pair: RingKeyPair,
    public_key: Vec<u8>,
    pkcs8: Option<SecretBytes>,
    rng: SystemRandom,
}

fn ecdsa_signing_algorithm(curve: EcdsaCurve) -> &'static EcdsaSigningAlgorithm {
    match curve {
        EcdsaCurve::P256 => &signature::ECDSA_P256_SHA256_ASN1_SIGNING,
        EcdsaCurve::P384 => &signature::ECDSA_P384_SHA384_ASN1_SIGNING,
    }
}

impl RingKeyHandle {
    /// Build a handle from PKCS#8 DER
    ///
    /// `algorithm` selects the parser; for RSA the modulus size is taken from the
    /// key itself. With `exportable` false the PKCS#8 bytes are not retained.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Encoding` if ring rejects the key material.
    pub fn from_pkcs8(pkcs8: &[u8], algorithm: KeyAlgorithm, exportable: bool) -> Result<Self> {
        let rng = SystemRandom::new();

        let (algorithm, key_pair, public_key) = match algorithm {
            KeyAlgorithm::Rsa { .. } => {
                let key_pair = RsaKeyPair::from_pkcs8(pkcs8)
                    .map_err(|e| IdentityError::encoding(format!("RSA key rejected: {e}")))?;
                let bits = u32::try_from(key_pair.public().modulus_len() * 8)
                    .map_err(|_| IdentityError::encoding("RSA modulus too large"))?;
                let public_key = key_pair.public_key().as_ref().to_vec();
                (
                    KeyAlgorithm::Rsa { bits },
                    RingKeyPair::Rsa(key_pair),
                    public_key,
                )
            }
            KeyAlgorithm::Ecdsa(curve) => {
                let key_pair =
                    EcdsaKeyPair::from_pkcs8(ecdsa_signing_algorithm(curve), pkcs8, &rng)
                        .map_err(|e| {
                            IdentityError::encoding(format!("ECDSA {curve:?} key rejected: {e}"))
                        })?;
                let public_key = key_pair.public_key().as_ref().to_vec();
                (algorithm, RingKeyPair::Ecdsa(key_pair), public_key)
            }
        };

        Ok(Self {
            algorithm,
            key_pair,
            public_key,
            pkcs8: exportable.then(|| SecretBytes::new(pkcs8.to_vec())),
            rng,
        })
    }

    /// Whether [`KeyHandle::export_pkcs8`] will return the key
    #[must_use]
    pub fn is_exportable(&self) -> bool {
        self.pkcs8.is_some()
    }

    /// Drop the retained PKCS#8 bytes, leaving a sign-only handle
    #[must_use]
    pub fn into_sign_only(mut self) -> Self {
        self.pkcs8 = None;
        self
    }
}

impl KeyHandle for RingKeyHandle {
    fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        match &self.key_pair {
            RingKeyPair::Rsa(key_pair) => {
                let mut signature = vec![0u8; key_pair.public().modulus_len()];
                key_pair
                    .sign(
                        &signature::RSA_PKCS1_SHA256,
                        &self.rng,
                        message,
                        &mut signature,
                    )
                    .map_err(|_| IdentityError::Signing("RSA signature rejected".to_string()))?;
                Ok(signature)
            }
            RingKeyPair::Ecdsa(key_pair) => key_pair
                .sign(&self.rng, message)
                .map(|sig| sig.as_ref().to_vec())
                .map_err(|_| IdentityError::Signing("ECDSA signature rejected".to_string())),
        }
    }

    fn export_pkcs8(&self) -> Option<SecretBytes> {
        self.pkcs8.clone()
    }
}

impl fmt::Debug for RingKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingKeyHandle")
            .field("algorithm", &self.algorithm)
            .field("exportable", &self.is_exportable())
            .finish_non_exhaustive()
    }
}
