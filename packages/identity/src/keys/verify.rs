//! Signature verification against a certificate's public key

use ring::signature::{self, UnparsedPublicKey, VerificationAlgorithm};

use super::{EcdsaCurve, KeyAlgorithm};
use crate::certificate::Certificate;
use crate::error::Result;

fn verification_algorithm(algorithm: KeyAlgorithm) -> &'static dyn VerificationAlgorithm {
    match algorithm {
        KeyAlgorithm::Rsa { .. } => &signature::RSA_PKCS1_2048_8192_SHA256,
        KeyAlgorithm::Ecdsa(EcdsaCurve::P256) => &signature::ECDSA_P256_SHA256_ASN1,
        KeyAlgorithm::Ecdsa(EcdsaCurve::P384) => &signature::ECDSA_P384_SHA384_ASN1,
    }
}

/// Check `signature` over `message` with the certificate's public key
///
/// The scheme is the one [`KeyHandle::sign`](super::KeyHandle::sign) produces for
/// the certificate's key algorithm. A bad signature is `Ok(false)`.
///
/// # Errors
///
/// Returns `IdentityError::UnsupportedPlatform` if the certificate key algorithm
/// cannot be operated here.
pub fn verify_signature(certificate: &Certificate, message: &[u8], signature: &[u8]) -> Result<bool> {
    let algorithm = certificate.key_algorithm()?;
    let public_key =
        UnparsedPublicKey::new(verification_algorithm(algorithm), certificate.public_key());
    Ok(public_key.verify(message, signature).is_ok())
}
