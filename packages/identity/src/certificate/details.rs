//! Certificate details extraction
//!
//! Pulls subject, issuer, validity, basic constraints and key usage out of a
//! decoded certificate using x509-cert.

use std::time::SystemTime;

use const_oid::AssociatedOid;
use der::Decode;
use x509_cert::ext::pkix::{BasicConstraints, KeyUsage};
use x509_cert::Certificate as X509CertCert;

use super::key_info::{extract_public_key_kind, PublicKeyKind};

/// Key usage bits relevant to a DTLS identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyUsageFlags {
    /// `digitalSignature`
    pub digital_signature: bool,
    /// `keyEncipherment`
    pub key_encipherment: bool,
    /// `keyCertSign`
    pub key_cert_sign: bool,
}

/// Inspected certificate fields
#[derive(Debug, Clone)]
pub struct CertificateDetails {
    /// Subject distinguished name (RFC 4514)
    pub subject: String,
    /// Issuer distinguished name (RFC 4514)
    pub issuer: String,
    /// Serial number, big-endian
    pub serial_number: Vec<u8>,
    /// Start of validity
    pub not_before: SystemTime,
    /// End of validity
    pub not_after: SystemTime,
    /// `cA` flag of the basic constraints extension, `None` when absent
    pub is_ca: Option<bool>,
    /// Key usage extension, `None` when absent
    pub key_usage: Option<KeyUsageFlags>,
    /// Public key family and size
    pub public_key: PublicKeyKind,
}

impl CertificateDetails {
    /// Issuer equals subject
    #[must_use]
    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }

    /// Serial number as lowercase hex
    #[must_use]
    pub fn serial_hex(&self) -> String {
        hex::encode(&self.serial_number)
    }
}

/// Extract details from a decoded certificate
pub fn extract_certificate_details(cert: &X509CertCert) -> CertificateDetails {
    let tbs = &cert.tbs_certificate;

    let mut is_ca = None;
    let mut key_usage = None;

    if let Some(extensions) = &tbs.extensions {
        for ext in extensions {
            if ext.extn_id == BasicConstraints::OID {
                match BasicConstraints::from_der(ext.extn_value.as_bytes()) {
                    Ok(constraints) => is_ca = Some(constraints.ca),
                    Err(e) => tracing::warn!("Unreadable basic constraints extension: {}", e),
                }
            } else if ext.extn_id == KeyUsage::OID {
                match KeyUsage::from_der(ext.extn_value.as_bytes()) {
                    Ok(usage) => {
                        key_usage = Some(KeyUsageFlags {
                            digital_signature: usage.digital_signature(),
                            key_encipherment: usage.key_encipherment(),
                            key_cert_sign: usage.key_cert_sign(),
                        });
                    }
                    Err(e) => tracing::warn!("Unreadable key usage extension: {}", e),
                }
            }
        }
    }

    CertificateDetails {
        subject: tbs.subject.to_string(),
        issuer: tbs.issuer.to_string(),
        serial_number: tbs.serial_number.as_bytes().to_vec(),
        not_before: tbs.validity.not_before.to_system_time(),
        not_after: tbs.validity.not_after.to_system_time(),
        is_ca,
        key_usage,
        public_key: extract_public_key_kind(&tbs.subject_public_key_info),
    }
}
