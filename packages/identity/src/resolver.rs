//! Private key resolution
//!
//! Turns whatever key material an [`Identity`] carries into a signing handle:
//!
//! - in-memory keys (generated, PEM) pass through
//! - archive keys are parsed once into a ring handle, honoring the storage flag
//! - store keys are looked up by certificate
//!
//! The resolved handle must carry the certificate's public key. The result is
//! cached on the identity, so the archive transform runs at most once no matter
//! how many threads ask.

use std::sync::Arc;

use crate::archive::KeyStorage;
use crate::certificate::Certificate;
use crate::error::{IdentityError, Result};
use crate::identity::{Identity, KeyMaterial};
use crate::keys::{KeyHandle, RingKeyHandle, SecretBytes};

/// Resolves an identity's private key into an operable signing handle
#[derive(Debug, Clone, Copy, Default)]
pub struct PrivateKeyResolver;

impl PrivateKeyResolver {
    /// Create a resolver
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolve the private key of `identity`
    ///
    /// # Errors
    ///
    /// See [`resolve_private_key`].
    pub fn resolve(&self, identity: &Identity) -> Result<Arc<dyn KeyHandle>> {
        resolve_private_key(identity)
    }
}

/// Resolve the private key of `identity`
///
/// # Errors
///
/// - `KeyNotFound` when no key is associated, the store lost it, or the key
///   does not match the certificate
/// - `UnsupportedPlatform` when the key algorithm cannot be operated here
/// - `ArchiveAccess` when archive key bytes cannot be parsed
pub fn resolve_private_key(identity: &Identity) -> Result<Arc<dyn KeyHandle>> {
    if let Some(handle) = identity.resolved().get() {
        return Ok(Arc::clone(handle));
    }

    let certificate = identity.certificate();
    let handle = match identity.key_material() {
        KeyMaterial::None => {
            return Err(IdentityError::key_not_found(format!(
                "no private key associated with certificate {}",
                certificate.details().subject
            )));
        }
        KeyMaterial::InMemory(handle) => Arc::clone(handle),
        KeyMaterial::Pkcs8 { pkcs8, storage } => transform_archive_key(certificate, pkcs8, *storage)?,
        KeyMaterial::Store { store, label } => {
            store.signer(label, certificate)?.ok_or_else(|| {
                IdentityError::key_not_found(format!(
                    "store {} holds no key under {label}",
                    store.name()
                ))
            })?
        }
    };

    ensure_matches(certificate, handle.as_ref())?;

    tracing::trace!(
        source = ?identity.source(),
        algorithm = %handle.algorithm(),
        "Resolved private key"
    );

    // A concurrent resolver may have won; both handles are equivalent
    Ok(Arc::clone(identity.resolved().get_or_init(|| handle)))
}

fn transform_archive_key(
    certificate: &Certificate,
    pkcs8: &SecretBytes,
    storage: KeyStorage,
) -> Result<Arc<dyn KeyHandle>> {
    let algorithm = certificate.key_algorithm().map_err(|e| {
        tracing::warn!("Archive key cannot be operated here: {}", e);
        e
    })?;
    let handle = RingKeyHandle::from_pkcs8(pkcs8.as_bytes(), algorithm, storage.is_exportable())
        .map_err(|e| IdentityError::archive_access(format!("archive key unusable: {e}")))?;
    Ok(Arc::new(handle))
}

/// The handle's public key must be the certificate's
fn ensure_matches(certificate: &Certificate, handle: &dyn KeyHandle) -> Result<()> {
    if handle.public_key() != certificate.public_key() {
        return Err(IdentityError::key_not_found(format!(
            "{} key does not match certificate {}",
            handle.algorithm(),
            certificate.details().subject
        )));
    }
    Ok(())
}
