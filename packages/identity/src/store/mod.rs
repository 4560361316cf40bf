//! Certificate stores
//!
//! A store holds certificates by label and can hand out a signing handle for
//! the key under a label. Keys inside a store never leave it: [`load_from_store`]
//! identities can sign but not export.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::certificate::Certificate;
use crate::error::{IdentityError, Result};
use crate::identity::{Identity, IdentitySource, KeyMaterial};
use crate::keys::{KeyHandle, RingKeyHandle};

pub mod keyring_store;

pub use keyring_store::KeyringStore;

/// A source of certificates and their private keys
pub trait CertificateStore: Send + Sync + fmt::Debug {
    /// Store name for diagnostics
    fn name(&self) -> &str;

    /// Look up a certificate by label
    ///
    /// # Errors
    ///
    /// Returns an error when the store itself is unreachable; a missing label
    /// is `Ok(None)`.
    fn certificate(&self, label: &str) -> Result<Option<Certificate>>;

    /// Signing handle for the private key stored under `label`
    ///
    /// `certificate` is the one [`load_from_store`] found under that label; the
    /// resolver checks the handle against it.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable or the key cannot be
    /// operated; a missing key is `Ok(None)`.
    fn signer(&self, label: &str, certificate: &Certificate)
        -> Result<Option<Arc<dyn KeyHandle>>>;
}

/// Load an identity from a store by label
///
/// The key is looked up lazily on first resolution.
///
/// # Errors
///
/// Returns `IdentityError::CertificateNotFound` if the label is unknown, or the
/// store's own error.
pub fn load_from_store(store: Arc<dyn CertificateStore>, label: &str) -> Result<Identity> {
    let Some(certificate) = store.certificate(label)? else {
        tracing::debug!(store = store.name(), label, "Certificate not in store");
        return Err(IdentityError::CertificateNotFound(format!(
            "{label} in {}",
            store.name()
        )));
    };

    tracing::debug!(store = store.name(), label, "Loaded certificate from store");

    Ok(Identity::new(
        certificate,
        IdentitySource::LoadedStore,
        KeyMaterial::Store {
            store,
            label: label.to_owned(),
        },
    ))
}

/// Signing handle that can never export, for keys entering a store
pub(crate) fn sign_only_copy(identity: &Identity, store: &str) -> Result<RingKeyHandle> {
    let handle = identity.private_key()?;
    let pkcs8 = handle.export_pkcs8().ok_or_else(|| {
        IdentityError::NotExportable(format!(
            "{} key cannot be imported into store {store}",
            handle.algorithm()
        ))
    })?;
    RingKeyHandle::from_pkcs8(pkcs8.as_bytes(), handle.algorithm(), false)
}

#[derive(Debug)]
struct StoreEntry {
    certificate: Certificate,
    key: Option<Arc<dyn KeyHandle>>,
}

/// Process-local store
///
/// Each label owns its certificate and key; importing the same certificate
/// under two labels keeps two independent entries. Imported keys are kept as
/// sign-only handles.
#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    entries: RwLock<HashMap<String, StoreEntry>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Import an identity's certificate and key under `label`
    ///
    /// Replaces whatever the label held before.
    ///
    /// # Errors
    ///
    /// Fails if the key cannot be resolved or is not exportable from its
    /// current holder.
    pub fn import(&self, label: impl Into<String>, identity: &Identity) -> Result<()> {
        let key: Arc<dyn KeyHandle> = Arc::new(sign_only_copy(identity, &self.name)?);
        let label = label.into();
        tracing::debug!(store = %self.name, label = %label, "Imported identity");
        self.insert(label, identity.certificate().clone(), Some(key));
        Ok(())
    }

    /// Add a certificate without a key
    pub fn add_certificate(&self, label: impl Into<String>, certificate: Certificate) {
        self.insert(label.into(), certificate, None);
    }

    /// Remove the certificate and key under `label`; returns whether it existed
    pub fn remove(&self, label: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(label)
            .is_some()
    }

    /// Number of labels held
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no labels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, label: String, certificate: Certificate, key: Option<Arc<dyn KeyHandle>>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(label, StoreEntry { certificate, key });
    }
}

impl CertificateStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn certificate(&self, label: &str) -> Result<Option<Certificate>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(label)
            .map(|entry| entry.certificate.clone()))
    }

    fn signer(
        &self,
        label: &str,
        _certificate: &Certificate,
    ) -> Result<Option<Arc<dyn KeyHandle>>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(label)
            .and_then(|entry| entry.key.clone()))
    }
}
