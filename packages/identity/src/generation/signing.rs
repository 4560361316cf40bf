//! Key pair creation and self-signing
//!
//! ECDSA key pairs come straight from rcgen. RSA key pairs are produced by the
//! `rsa` crate and handed to rcgen as PKCS#8, since the signing backend cannot
//! generate RSA keys itself.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use rcgen::{
    CertificateParams, DistinguishedName, DnType, IsCa, KeyPair, KeyUsagePurpose, SerialNumber,
};
use rsa::pkcs8::EncodePrivateKey;
use rsa::RsaPrivateKey;

use super::GeneratorConfig;
use crate::certificate::{Certificate, KeyUsageFlags};
use crate::error::{IdentityError, Result};
use crate::identity::{Identity, IdentitySource, KeyMaterial};
use crate::keys::{EcdsaCurve, KeyAlgorithm, RingKeyHandle};

/// Generate key pair and certificate, then wrap them as an [`Identity`]
pub(crate) fn generate_identity(config: &GeneratorConfig) -> Result<Identity> {
    validate_config(config)?;

    let key_pair = generate_key_pair(config.key_algorithm)?;
    let params = certificate_params(config)?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| IdentityError::generation(format!("Self-signing failed: {e}")))?;

    let certificate = Certificate::from_der(cert.der().to_vec())?;
    let handle = RingKeyHandle::from_pkcs8(&key_pair.serialize_der(), config.key_algorithm, true)
        .map_err(|e| IdentityError::generation(format!("Generated key unusable: {e}")))?;

    tracing::debug!(
        algorithm = %config.key_algorithm,
        subject = %config.subject_name,
        validity_secs = config.validity.as_secs(),
        "Generated self-signed identity"
    );

    Ok(Identity::new(
        certificate,
        IdentitySource::Generated,
        KeyMaterial::InMemory(Arc::new(handle)),
    ))
}

fn validate_config(config: &GeneratorConfig) -> Result<()> {
    if let KeyAlgorithm::Rsa { bits } = config.key_algorithm {
        if !KeyAlgorithm::RSA_SIZES.contains(&bits) {
            return Err(IdentityError::generation(format!(
                "Unsupported RSA key size {bits}, expected one of {:?}",
                KeyAlgorithm::RSA_SIZES
            )));
        }
    }
    if config.validity.is_zero() {
        return Err(IdentityError::generation("Validity must be positive"));
    }
    if config.subject_name.trim().is_empty() {
        return Err(IdentityError::generation("Subject name must not be empty"));
    }
    Ok(())
}

/// Create a key pair rcgen can sign with
fn generate_key_pair(algorithm: KeyAlgorithm) -> Result<KeyPair> {
    match algorithm {
        KeyAlgorithm::Rsa { bits } => {
            let mut rng = rand::rng();
            let private_key = RsaPrivateKey::new(&mut rng, bits as usize).map_err(|e| {
                IdentityError::generation(format!("RSA key generation failed: {e}"))
            })?;
            let pkcs8 = private_key.to_pkcs8_der().map_err(|e| {
                IdentityError::generation(format!("RSA key encoding failed: {e}"))
            })?;
            KeyPair::try_from(pkcs8.as_bytes())
                .map_err(|e| IdentityError::generation(format!("RSA key rejected: {e}")))
        }
        KeyAlgorithm::Ecdsa(curve) => {
            let alg = match curve {
                EcdsaCurve::P256 => &rcgen::PKCS_ECDSA_P256_SHA256,
                EcdsaCurve::P384 => &rcgen::PKCS_ECDSA_P384_SHA384,
            };
            KeyPair::generate_for(alg).map_err(|e| {
                IdentityError::generation(format!("ECDSA key generation failed: {e}"))
            })
        }
    }
}

fn certificate_params(config: &GeneratorConfig) -> Result<CertificateParams> {
    let mut params = CertificateParams::new(Vec::<String>::new())
        .map_err(|e| IdentityError::generation(format!("Invalid certificate parameters: {e}")))?;

    let mut distinguished_name = DistinguishedName::new();
    distinguished_name.push(DnType::CommonName, config.subject_name.as_str());
    params.distinguished_name = distinguished_name;

    setup_validity_period(&mut params, config.validity)?;

    params.is_ca = IsCa::ExplicitNoCa;
    params.key_usages = key_usages(config.key_usage);
    params.serial_number = Some(random_serial());

    Ok(params)
}

fn setup_validity_period(params: &mut CertificateParams, validity: Duration) -> Result<()> {
    let now = SystemTime::now();
    let not_after = now
        .checked_add(validity)
        .ok_or_else(|| IdentityError::generation("Validity period overflows the clock"))?;
    params.not_before = now.into();
    params.not_after = not_after.into();
    Ok(())
}

fn key_usages(flags: KeyUsageFlags) -> Vec<KeyUsagePurpose> {
    let mut usages = Vec::new();
    if flags.digital_signature {
        usages.push(KeyUsagePurpose::DigitalSignature);
    }
    if flags.key_encipherment {
        usages.push(KeyUsagePurpose::KeyEncipherment);
    }
    if flags.key_cert_sign {
        usages.push(KeyUsagePurpose::KeyCertSign);
    }
    usages
}

/// 16 random bytes, positive and without a leading zero octet
fn random_serial() -> SerialNumber {
    let mut bytes: [u8; 16] = rand::random();
    bytes[0] = (bytes[0] & 0x7f) | 0x40;
    SerialNumber::from(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_rsa_size() {
        let config = GeneratorConfig {
            key_algorithm: KeyAlgorithm::Rsa { bits: 1024 },
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(IdentityError::Generation(_))
        ));
    }

    #[test]
    fn test_rejects_zero_validity() {
        let config = GeneratorConfig {
            validity: Duration::ZERO,
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(IdentityError::Generation(_))
        ));
    }

    #[test]
    fn test_rejects_empty_subject() {
        let config = GeneratorConfig {
            subject_name: "  ".to_string(),
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(IdentityError::Generation(_))
        ));
    }

    #[test]
    fn test_serial_is_positive() {
        for _ in 0..32 {
            let serial = random_serial();
            let bytes = serial.to_bytes();
            assert_eq!(bytes.len(), 16);
            assert!(bytes[0] & 0x80 == 0);
            assert!(bytes[0] != 0);
        }
    }

    #[test]
    fn test_key_usage_mapping() {
        let usages = key_usages(KeyUsageFlags {
            digital_signature: true,
            key_encipherment: false,
            key_cert_sign: false,
        });
        assert_eq!(usages, vec![KeyUsagePurpose::DigitalSignature]);
    }
}
