//! OS credential store backed by the `keyring` crate
//!
//! Entries live under one service name: `cert:<label>` holds the certificate
//! DER and `key:<label>` the PKCS#8 key, both base64 encoded. Keys read back
//! from the credential store are sign-only.
//!
//! Which credential manager backs the store is chosen at build time through
//! the `native-keyring` and `secret-service` features.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::Zeroizing;

use super::CertificateStore;
use crate::certificate::Certificate;
use crate::error::{IdentityError, Result};
use crate::identity::Identity;
use crate::keys::{KeyHandle, RingKeyHandle, SecretBytes};

/// Certificate store in the platform credential manager
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Use `service` as the credential namespace
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Store an identity's certificate and key under `label`
    ///
    /// Replaces whatever the label held before. A failed certificate write
    /// leaves no key behind.
    ///
    /// # Errors
    ///
    /// Returns `NotExportable` if the key cannot leave its current handle and
    /// `UnsupportedPlatform` if the credential store is unavailable.
    pub fn import(&self, label: &str, identity: &Identity) -> Result<()> {
        let handle = identity.private_key()?;
        let pkcs8 = handle.export_pkcs8().ok_or_else(|| {
            IdentityError::NotExportable(format!(
                "{} key cannot be imported into keyring {}",
                handle.algorithm(),
                self.service
            ))
        })?;

        write_pair(
            label,
            identity.certificate().der(),
            pkcs8.as_bytes(),
            |user, data| self.write(user, data),
            |user| self.delete(user),
        )?;

        tracing::debug!(service = %self.service, label, "Imported identity into keyring");
        Ok(())
    }

    /// Delete the certificate and key under `label`
    ///
    /// Missing entries are not an error.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` if the credential store is unavailable.
    pub fn remove(&self, label: &str) -> Result<()> {
        self.delete(&cert_user(label))?;
        self.delete(&key_user(label))
    }

    fn entry(&self, user: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, user).map_err(|e| map_keyring_error(e, "open"))
    }

    fn write(&self, user: &str, data: &[u8]) -> Result<()> {
        let encoded = Zeroizing::new(STANDARD.encode(data));
        self.entry(user)?
            .set_password(&encoded)
            .map_err(|e| map_keyring_error(e, "write"))
    }

    fn read(&self, user: &str) -> Result<Option<SecretBytes>> {
        let encoded = match self.entry(user)?.get_password() {
            Ok(encoded) => Zeroizing::new(encoded),
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(map_keyring_error(e, "read")),
        };
        STANDARD
            .decode(encoded.as_bytes())
            .map(|bytes| Some(SecretBytes::new(bytes)))
            .map_err(|e| IdentityError::encoding(format!("Invalid keyring entry {user}: {e}")))
    }

    fn delete(&self, user: &str) -> Result<()> {
        match self.entry(user)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(map_keyring_error(e, "delete")),
        }
    }
}

impl CertificateStore for KeyringStore {
    fn name(&self) -> &str {
        &self.service
    }

    fn certificate(&self, label: &str) -> Result<Option<Certificate>> {
        self.read(&cert_user(label))?
            .map(|der| Certificate::from_der(der.as_bytes().to_vec()))
            .transpose()
    }

    fn signer(
        &self,
        label: &str,
        certificate: &Certificate,
    ) -> Result<Option<Arc<dyn KeyHandle>>> {
        let Some(pkcs8) = self.read(&key_user(label))? else {
            return Ok(None);
        };
        let algorithm = certificate.key_algorithm()?;
        let handle = RingKeyHandle::from_pkcs8(pkcs8.as_bytes(), algorithm, false)?;
        Ok(Some(Arc::new(handle)))
    }
}

/// Write the key, then the certificate; a failed certificate write removes the
/// key again
fn write_pair(
    label: &str,
    certificate_der: &[u8],
    pkcs8: &[u8],
    mut write: impl FnMut(&str, &[u8]) -> Result<()>,
    mut delete: impl FnMut(&str) -> Result<()>,
) -> Result<()> {
    write(&key_user(label), pkcs8)?;
    if let Err(error) = write(&cert_user(label), certificate_der) {
        if let Err(cleanup) = delete(&key_user(label)) {
            tracing::warn!(label, "Orphaned keyring key: {}", cleanup);
        }
        return Err(error);
    }
    Ok(())
}

fn cert_user(label: &str) -> String {
    format!("cert:{label}")
}

fn key_user(label: &str) -> String {
    format!("key:{label}")
}

fn map_keyring_error(error: keyring::Error, operation: &str) -> IdentityError {
    match error {
        keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
            IdentityError::unsupported_platform(format!("Keyring {operation} failed: {error}"))
        }
        keyring::Error::NoEntry => {
            IdentityError::key_not_found(format!("Keyring {operation}: no entry"))
        }
        other => IdentityError::encoding(format!("Keyring {operation} failed: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_names() {
        assert_eq!(cert_user("session"), "cert:session");
        assert_eq!(key_user("session"), "key:session");
    }

    #[test]
    fn test_failed_certificate_write_removes_key() {
        let log = std::cell::RefCell::new(Vec::new());
        let result = write_pair(
            "session",
            b"cert",
            b"key",
            |user, _| {
                log.borrow_mut().push(format!("write {user}"));
                if user.starts_with("cert:") {
                    Err(IdentityError::unsupported_platform("credential store locked"))
                } else {
                    Ok(())
                }
            },
            |user| {
                log.borrow_mut().push(format!("delete {user}"));
                Ok(())
            },
        );

        assert!(matches!(result, Err(IdentityError::UnsupportedPlatform(_))));
        assert_eq!(
            log.into_inner(),
            ["write key:session", "write cert:session", "delete key:session"]
        );
    }

    #[test]
    fn test_failed_key_write_touches_nothing_else() {
        let mut writes = 0;
        let result = write_pair(
            "session",
            b"cert",
            b"key",
            |_, _| {
                writes += 1;
                Err(IdentityError::unsupported_platform("no credential service"))
            },
            |_| panic!("nothing to clean up"),
        );
        assert!(result.is_err());
        assert_eq!(writes, 1);
    }

    #[test]
    fn test_platform_errors_map_to_unsupported_platform() {
        let error = keyring::Error::NoStorageAccess("locked".into());
        assert!(map_keyring_error(error, "read").is_platform_limitation());
    }
}
