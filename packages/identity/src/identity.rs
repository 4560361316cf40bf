//! Session identities
//!
//! An [`Identity`] is a certificate plus whatever is known about its private key.
//! Identities are created once per session endpoint (generated, loaded from an
//! archive or PEM bundle, or looked up in a store) and never mutated afterwards.
//! The protocol layer receives a [`HandshakeIdentity`], which can sign but never
//! hands out key bytes.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::archive::KeyStorage;
use crate::certificate::Certificate;
use crate::error::Result;
use crate::fingerprint::{fingerprint, Fingerprint, HashAlgorithm};
use crate::keys::{KeyAlgorithm, KeyHandle, SecretBytes};
use crate::pem_bundle::{export_pem, PemBundle};
use crate::resolver::resolve_private_key;
use crate::store::CertificateStore;

/// Where an identity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentitySource {
    /// Produced in-process by the certificate generator
    Generated,
    /// Imported from a PKCS#12 archive or PEM bundle
    LoadedArchive,
    /// Looked up in a certificate store
    LoadedStore,
    /// A bare certificate with no key, e.g. a peer's
    PublicOnly,
}

/// How the private key of an identity can be reached
pub(crate) enum KeyMaterial {
    /// No associable key
    None,
    /// Operable key already in memory
    InMemory(Arc<dyn KeyHandle>),
    /// PKCS#8 bytes that still need to be turned into an operable key
    Pkcs8 {
        pkcs8: SecretBytes,
        storage: KeyStorage,
    },
    /// Key held by a store under `label`; the store only exposes signing
    Store {
        store: Arc<dyn CertificateStore>,
        label: String,
    },
}

/// A certificate and its private key material
pub struct Identity {
    certificate: Certificate,
    source: IdentitySource,
    key: KeyMaterial,
    resolved: OnceCell<Arc<dyn KeyHandle>>,
}

impl Identity {
    pub(crate) fn new(certificate: Certificate, source: IdentitySource, key: KeyMaterial) -> Self {
        Self {
            certificate,
            source,
            key,
            resolved: OnceCell::new(),
        }
    }

    /// Wrap a certificate that has no private key
    #[must_use]
    pub fn from_certificate(certificate: Certificate) -> Self {
        Self::new(certificate, IdentitySource::PublicOnly, KeyMaterial::None)
    }

    /// The certificate
    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Where this identity came from
    #[must_use]
    pub fn source(&self) -> IdentitySource {
        self.source
    }

    /// Whether any private key material is associated
    ///
    /// `true` does not guarantee resolution succeeds; a store may have lost the
    /// key or the host may be unable to operate it.
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        !matches!(self.key, KeyMaterial::None)
    }

    /// Fingerprint of the certificate
    #[must_use]
    pub fn fingerprint(&self, algorithm: HashAlgorithm) -> Fingerprint {
        fingerprint(&self.certificate, algorithm)
    }

    /// Resolve the private key into a signing handle
    ///
    /// # Errors
    ///
    /// See [`resolve_private_key`].
    pub fn private_key(&self) -> Result<Arc<dyn KeyHandle>> {
        resolve_private_key(self)
    }

    /// Everything the DTLS handshake needs from this endpoint
    ///
    /// # Errors
    ///
    /// Fails when the private key cannot be resolved; see [`resolve_private_key`].
    pub fn handshake_identity(&self, algorithm: HashAlgorithm) -> Result<HandshakeIdentity> {
        let signer = self.private_key()?;
        Ok(HandshakeIdentity {
            certificate: self.certificate.clone(),
            fingerprint: self.fingerprint(algorithm),
            signer,
        })
    }

    /// Certificate PEM plus the PKCS#8 key PEM when the key is exportable
    ///
    /// # Errors
    ///
    /// See [`export_pem`].
    pub fn to_pem(&self) -> Result<PemBundle> {
        export_pem(self)
    }

    pub(crate) fn key_material(&self) -> &KeyMaterial {
        &self.key
    }

    pub(crate) fn resolved(&self) -> &OnceCell<Arc<dyn KeyHandle>> {
        &self.resolved
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match &self.key {
            KeyMaterial::None => "none",
            KeyMaterial::InMemory(_) => "in-memory",
            KeyMaterial::Pkcs8 { .. } => "pkcs8",
            KeyMaterial::Store { .. } => "store",
        };
        f.debug_struct("Identity")
            .field("certificate", &self.certificate)
            .field("source", &self.source)
            .field("key", &key)
            .finish()
    }
}

/// Identity as seen by the DTLS handshake: certificate, fingerprint, and a sign operation
#[derive(Debug, Clone)]
pub struct HandshakeIdentity {
    certificate: Certificate,
    fingerprint: Fingerprint,
    signer: Arc<dyn KeyHandle>,
}

impl HandshakeIdentity {
    /// Certificate presented in the handshake
    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Fingerprint to publish in the session description
    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Signing algorithm of the key
    #[must_use]
    pub fn key_algorithm(&self) -> KeyAlgorithm {
        self.signer.algorithm()
    }

    /// Sign handshake bytes with the endpoint's private key
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Signing` if the provider rejects the operation.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.signer.sign(message)
    }
}
