//! Self-signed certificate generation
//!
//! Produces a fresh [`Identity`] per session endpoint: a new key pair and a
//! self-signed end-entity certificate over it. DTLS-SRTP peers authenticate by
//! fingerprint, so the certificate carries no SANs and no chain.
//!
//! ```no_run
//! use dtls_identity::{CertificateGenerator, EcdsaCurve};
//! use std::time::Duration;
//!
//! let identity = CertificateGenerator::new()
//!     .ecdsa(EcdsaCurve::P256)
//!     .valid_for(Duration::from_secs(24 * 60 * 60))
//!     .generate()?;
//! # Ok::<(), dtls_identity::IdentityError>(())
//! ```

use std::time::Duration;

use crate::certificate::KeyUsageFlags;
use crate::error::Result;
use crate::identity::Identity;
use crate::keys::{EcdsaCurve, KeyAlgorithm};

pub mod signing;

/// Common name used when none is configured
pub const DEFAULT_SUBJECT_NAME: &str = "WebRTC";

/// Validity used when none is configured
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Generator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Key algorithm and size
    pub key_algorithm: KeyAlgorithm,
    /// Time from `not_before` (now) to `not_after`
    pub validity: Duration,
    /// Subject and issuer common name
    pub subject_name: String,
    /// Key usage bits written into the certificate
    pub key_usage: KeyUsageFlags,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            key_algorithm: KeyAlgorithm::default(),
            validity: DEFAULT_VALIDITY,
            subject_name: DEFAULT_SUBJECT_NAME.to_string(),
            key_usage: KeyUsageFlags {
                digital_signature: true,
                key_encipherment: true,
                key_cert_sign: false,
            },
        }
    }
}

impl GeneratorConfig {
    /// RSA-2048 valid for 30 days, the widest interop choice
    #[must_use]
    pub fn session() -> Self {
        Self::default()
    }

    /// P-256 valid for one day, for short-lived calls where generation speed matters
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            key_algorithm: KeyAlgorithm::Ecdsa(EcdsaCurve::P256),
            validity: Duration::from_secs(24 * 60 * 60),
            ..Self::default()
        }
    }
}

/// Builder for self-signed session identities
#[derive(Debug, Clone, Default)]
pub struct CertificateGenerator {
    config: GeneratorConfig,
}

impl CertificateGenerator {
    /// Start from [`GeneratorConfig::default`]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    #[must_use]
    pub fn with_config(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Use an RSA key of `bits` (2048, 3072 or 4096)
    #[must_use]
    pub fn rsa(mut self, bits: u32) -> Self {
        self.config.key_algorithm = KeyAlgorithm::Rsa { bits };
        self
    }

    /// Use an ECDSA key on `curve`
    #[must_use]
    pub fn ecdsa(mut self, curve: EcdsaCurve) -> Self {
        self.config.key_algorithm = KeyAlgorithm::Ecdsa(curve);
        self
    }

    /// Set the key algorithm directly
    #[must_use]
    pub fn key_algorithm(mut self, algorithm: KeyAlgorithm) -> Self {
        self.config.key_algorithm = algorithm;
        self
    }

    /// Set the validity window
    #[must_use]
    pub fn valid_for(mut self, validity: Duration) -> Self {
        self.config.validity = validity;
        self
    }

    /// Set the validity window in days
    #[must_use]
    pub fn valid_for_days(self, days: u32) -> Self {
        self.valid_for(Duration::from_secs(u64::from(days) * 24 * 60 * 60))
    }

    /// Set the subject common name
    #[must_use]
    pub fn subject(mut self, name: impl Into<String>) -> Self {
        self.config.subject_name = name.into();
        self
    }

    /// Set the key usage bits
    #[must_use]
    pub fn key_usage(mut self, key_usage: KeyUsageFlags) -> Self {
        self.config.key_usage = key_usage;
        self
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate the identity
    ///
    /// # Errors
    ///
    /// See [`generate`].
    pub fn generate(&self) -> Result<Identity> {
        generate(&self.config)
    }
}

/// Generate a self-signed identity from `config`
///
/// The returned identity holds an exportable in-memory key and reports
/// [`IdentitySource::Generated`](crate::IdentitySource::Generated).
///
/// # Errors
///
/// Returns `IdentityError::Generation` for an RSA size outside
/// [`KeyAlgorithm::RSA_SIZES`], a zero or unrepresentable validity, an empty
/// subject, or any key generation or signing failure.
pub fn generate(config: &GeneratorConfig) -> Result<Identity> {
    signing::generate_identity(config)
}
