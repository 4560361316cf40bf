//! PKCS#12 identity archives
//!
//! Archives bundle a certificate with its (usually password-protected) private
//! key. On load the archive MAC is checked when present, the first key bag is
//! taken as the key and the certificate sharing its local key ID as the leaf.
//! The key stays PKCS#8 until it is first resolved; [`KeyStorage`] decides
//! whether the resolved handle may export it again.
//!
//! Legacy (3DES/RC2, SHA-1 MAC) and current (PBES2/AES, SHA-2 MAC) archives
//! both load. Exports use PBES2 with AES-256-CBC and an HMAC-SHA256 MAC.

use std::fmt;
use std::path::Path;

use zeroize::Zeroize;

use crate::certificate::Certificate;
use crate::error::{IdentityError, Result};
use crate::fingerprint::HashAlgorithm;
use crate::identity::{Identity, IdentitySource, KeyMaterial};
use crate::keys::SecretBytes;
use crate::resolver::resolve_private_key;

mod codec;
mod pbe;

/// Whether a loaded private key may leave its handle again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyStorage {
    /// Key bytes stay available for re-export
    #[default]
    Exportable,
    /// Key can sign but never be exported
    StoreOnly,
}

impl KeyStorage {
    /// Whether resolved handles keep their PKCS#8 bytes
    #[must_use]
    pub fn is_exportable(self) -> bool {
        matches!(self, Self::Exportable)
    }
}

/// Archive load options
#[derive(Clone, Default)]
pub struct ArchiveOptions {
    /// Archive password; `None` is the empty password
    pub password: Option<String>,
    /// How the loaded key is held
    pub storage: KeyStorage,
}

impl ArchiveOptions {
    /// No password, exportable key
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the archive password
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the key storage flag
    #[must_use]
    pub fn storage(mut self, storage: KeyStorage) -> Self {
        self.storage = storage;
        self
    }

    /// Hold the key as [`KeyStorage::StoreOnly`]
    #[must_use]
    pub fn store_only(self) -> Self {
        self.storage(KeyStorage::StoreOnly)
    }

    fn password_str(&self) -> &str {
        self.password.as_deref().unwrap_or("")
    }
}

impl fmt::Debug for ArchiveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveOptions")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("storage", &self.storage)
            .finish()
    }
}

/// Load an identity from PKCS#12 bytes
///
/// An archive without a key bag yields an identity whose key resolution fails
/// with `KeyNotFound`. Archives without a MAC or encryption load with the empty
/// password.
///
/// # Errors
///
/// - `ArchiveAccess` if the archive is malformed, the password is wrong, or it
///   contains no certificate
/// - `UnsupportedPlatform` if it uses a MAC or cipher this build cannot process
/// - `Encoding` if the certificate does not decode
pub fn load_archive(bytes: &[u8], options: &ArchiveOptions) -> Result<Identity> {
    let mut contents = codec::decode(bytes, options.password_str())?;

    let key_bag = (!contents.keys.is_empty()).then(|| contents.keys.remove(0));
    let leaf = contents
        .leaf_for(key_bag.as_ref())
        .ok_or_else(|| IdentityError::archive_access("Archive contains no certificate"))?;
    let certificate = Certificate::from_der(contents.certificates.swap_remove(leaf).der)?;

    let key = match key_bag {
        Some(mut bag) => KeyMaterial::Pkcs8 {
            pkcs8: SecretBytes::new(std::mem::take(&mut *bag.pkcs8)),
            storage: options.storage,
        },
        None => {
            tracing::debug!("Archive has no private key; identity is public-only");
            KeyMaterial::None
        }
    };

    tracing::debug!(
        subject = %certificate.details().subject,
        storage = ?options.storage,
        "Loaded PKCS#12 archive"
    );

    Ok(Identity::new(certificate, IdentitySource::LoadedArchive, key))
}

/// Load an identity from a PKCS#12 file
///
/// # Errors
///
/// Returns `IdentityError::Io` if the file cannot be read, otherwise see
/// [`load_archive`].
pub fn load_archive_file(path: impl AsRef<Path>, options: &ArchiveOptions) -> Result<Identity> {
    let mut bytes = std::fs::read(path.as_ref())?;
    let result = load_archive(&bytes, options);
    bytes.zeroize();
    result
}

/// Export an identity as PKCS#12
///
/// `password` of `None` is the empty password.
///
/// # Errors
///
/// - `KeyNotFound` (or another resolution error) if the key cannot be resolved
/// - `NotExportable` if the key was loaded store-only or lives in a store
/// - `ArchiveAccess` if the archive cannot be assembled, for example when the
///   password or friendly name has characters outside the BMP
pub fn export_archive(
    identity: &Identity,
    password: Option<&str>,
    friendly_name: &str,
) -> Result<Vec<u8>> {
    let handle = resolve_private_key(identity)?;
    let pkcs8 = handle.export_pkcs8().ok_or_else(|| {
        IdentityError::NotExportable(format!(
            "{} key of {} cannot leave its handle",
            handle.algorithm(),
            identity.certificate().details().subject
        ))
    })?;

    let certificate = identity.certificate();
    let bytes = codec::encode(
        certificate.der(),
        pkcs8.as_bytes(),
        password.unwrap_or(""),
        friendly_name,
        &HashAlgorithm::Sha1.digest(certificate.der()),
    )?;

    tracing::debug!(
        subject = %certificate.details().subject,
        friendly_name,
        "Exported PKCS#12 archive"
    );

    Ok(bytes)
}

/// Export an identity as a PKCS#12 file, creating parent directories
///
/// # Errors
///
/// See [`export_archive`]; file system failures return `IdentityError::Io`.
pub fn write_archive_file(
    identity: &Identity,
    path: impl AsRef<Path>,
    password: Option<&str>,
    friendly_name: &str,
) -> Result<()> {
    let path = path.as_ref();
    let bytes = export_archive(identity, password, friendly_name)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}
