//! Certificate fingerprints for out-of-band identity binding
//!
//! A fingerprint is a hash over the certificate's full DER encoding, rendered as
//! uppercase hex pairs separated by colons and tagged with the lowercase hash
//! token registered for SDP (<https://www.rfc-editor.org/rfc/rfc8122#section-5>):
//!
//! ```text
//! sha-256:AB:CD:EF:...
//! ```
//!
//! The session description carries the same digest as `sha-256 AB:CD:EF:...`,
//! see [`Fingerprint::to_sdp_value`].

use std::fmt;
use std::str::FromStr;

use digest::Digest;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::certificate::Certificate;
use crate::error::{IdentityError, Result};

/// Hash functions allowed for certificate fingerprints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-1, kept for interop with legacy endpoints
    #[serde(rename = "sha-1")]
    Sha1,
    /// SHA-256
    #[default]
    #[serde(rename = "sha-256")]
    Sha256,
    /// SHA-384
    #[serde(rename = "sha-384")]
    Sha384,
    /// SHA-512
    #[serde(rename = "sha-512")]
    Sha512,
}

impl HashAlgorithm {
    /// Every supported algorithm, strongest last
    pub const ALL: [HashAlgorithm; 4] = [Self::Sha1, Self::Sha256, Self::Sha384, Self::Sha512];

    /// Lowercase SDP token, e.g. `sha-256`
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::Sha1 => "sha-1",
            Self::Sha256 => "sha-256",
            Self::Sha384 => "sha-384",
            Self::Sha512 => "sha-512",
        }
    }

    /// Digest length in bytes
    #[must_use]
    pub fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Whether `name` is an accepted hash token
    #[must_use]
    pub fn is_supported(name: &str) -> bool {
        name.parse::<Self>().is_ok()
    }

    /// Hash `data`
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => sha1::Sha1::digest(data).to_vec(),
            Self::Sha256 => sha2::Sha256::digest(data).to_vec(),
            Self::Sha384 => sha2::Sha384::digest(data).to_vec(),
            Self::Sha512 => sha2::Sha512::digest(data).to_vec(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for HashAlgorithm {
    type Err = IdentityError;

    /// Tokens are case-insensitive (RFC 8122 section 5)
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.token().eq_ignore_ascii_case(s))
            .ok_or_else(|| IdentityError::UnsupportedHashAlgorithm(s.to_string()))
    }
}

/// A certificate fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "FingerprintRepr", try_from = "FingerprintRepr")]
pub struct Fingerprint {
    algorithm: HashAlgorithm,
    digest: Vec<u8>,
}

impl Fingerprint {
    /// Wrap an already computed digest
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Encoding` if the digest length does not match the
    /// algorithm.
    pub fn from_digest(algorithm: HashAlgorithm, digest: impl Into<Vec<u8>>) -> Result<Self> {
        let digest = digest.into();
        if digest.len() != algorithm.digest_len() {
            return Err(IdentityError::encoding(format!(
                "{algorithm} digest must be {} bytes, got {}",
                algorithm.digest_len(),
                digest.len()
            )));
        }
        Ok(Self { algorithm, digest })
    }

    /// Hash algorithm used
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Raw digest bytes
    #[must_use]
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Uppercase hex pairs separated by colons, e.g. `AB:CD:EF`
    #[must_use]
    pub fn value(&self) -> String {
        self.digest
            .iter()
            .map(|byte| format!("{byte:02X}"))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// SDP attribute value: `sha-256 AB:CD:...`
    #[must_use]
    pub fn to_sdp_value(&self) -> String {
        format!("{} {}", self.algorithm.token(), self.value())
    }

    /// Whether `certificate` hashes to this fingerprint
    ///
    /// The digest comparison is constant-time.
    #[must_use]
    pub fn matches(&self, certificate: &Certificate) -> bool {
        let actual = fingerprint(certificate, self.algorithm);
        self.digest.ct_eq(&actual.digest).into()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.token(), self.value())
    }
}

impl FromStr for Fingerprint {
    type Err = IdentityError;

    /// Accepts `sha-256:AB:CD:...` and the SDP form `sha-256 AB:CD:...`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (token, value) = s
            .split_once(' ')
            .or_else(|| s.split_once(':'))
            .ok_or_else(|| IdentityError::encoding(format!("malformed fingerprint: {s}")))?;

        let algorithm = token.parse::<HashAlgorithm>()?;
        let value = value.trim();

        if !value.split(':').all(|pair| pair.len() == 2) {
            return Err(IdentityError::encoding(format!(
                "fingerprint value must be colon-separated hex pairs: {value}"
            )));
        }

        let digest = hex::decode(value.replace(':', ""))
            .map_err(|e| IdentityError::encoding(format!("invalid fingerprint hex: {e}")))?;

        Self::from_digest(algorithm, digest)
    }
}

/// Wire shape used for signaling, `{"algorithm": "sha-256", "value": "AB:..."}`
#[derive(Serialize, Deserialize)]
struct FingerprintRepr {
    algorithm: HashAlgorithm,
    value: String,
}

impl From<Fingerprint> for FingerprintRepr {
    fn from(fingerprint: Fingerprint) -> Self {
        Self {
            algorithm: fingerprint.algorithm,
            value: fingerprint.value(),
        }
    }
}

impl TryFrom<FingerprintRepr> for Fingerprint {
    type Error = IdentityError;

    fn try_from(repr: FingerprintRepr) -> Result<Self> {
        format!("{} {}", repr.algorithm.token(), repr.value).parse()
    }
}

/// Fingerprint a certificate
///
/// Hashes the certificate's full DER encoding.
#[must_use]
pub fn fingerprint(certificate: &Certificate, algorithm: HashAlgorithm) -> Fingerprint {
    Fingerprint {
        algorithm,
        digest: algorithm.digest(certificate.der()),
    }
}

/// Fingerprint a certificate with an algorithm given by its SDP token
///
/// # Errors
///
/// Returns `IdentityError::UnsupportedHashAlgorithm` if `algorithm` is not one
/// of `sha-1`, `sha-256`, `sha-384`, `sha-512`.
pub fn fingerprint_with(certificate: &Certificate, algorithm: &str) -> Result<Fingerprint> {
    Ok(fingerprint(certificate, algorithm.parse()?))
}

/// Fingerprint raw DER bytes
///
/// # Errors
///
/// Returns `IdentityError::Encoding` if the bytes are not a DER certificate.
pub fn fingerprint_der(der: &[u8], algorithm: HashAlgorithm) -> Result<Fingerprint> {
    let certificate = Certificate::from_der(der.to_vec())?;
    Ok(fingerprint(&certificate, algorithm))
}
