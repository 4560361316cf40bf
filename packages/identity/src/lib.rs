#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

//! DTLS-SRTP session identities
//!
//! Everything a media endpoint needs to prove who it is during a DTLS
//! handshake, without a certificate authority:
//!
//! - [`CertificateGenerator`] creates a key pair and a self-signed certificate
//! - [`fingerprint`] hashes the certificate for the `a=fingerprint` SDP line
//! - [`PrivateKeyResolver`] turns generated, archived or stored keys into a
//!   signing handle the handshake can use
//!
//! ```no_run
//! use dtls_identity::{generate, GeneratorConfig, HashAlgorithm};
//!
//! let identity = generate(&GeneratorConfig::ephemeral())?;
//! let handshake = identity.handshake_identity(HashAlgorithm::Sha256)?;
//! println!("a=fingerprint:{}", handshake.fingerprint().to_sdp_value());
//! let signature = handshake.sign(b"ServerKeyExchange params")?;
//! # let _ = signature;
//! # Ok::<(), dtls_identity::IdentityError>(())
//! ```

pub mod archive;
pub mod certificate;
pub mod error;
pub mod fingerprint;
pub mod generation;
pub mod identity;
pub mod keys;
pub mod pem_bundle;
pub mod resolver;
pub mod store;

pub use archive::{
    export_archive, load_archive, load_archive_file, write_archive_file, ArchiveOptions,
    KeyStorage,
};
pub use certificate::{Certificate, CertificateDetails, KeyUsageFlags, PublicKeyKind};
pub use error::{IdentityError, Result};
pub use fingerprint::{fingerprint, fingerprint_der, fingerprint_with, Fingerprint, HashAlgorithm};
pub use generation::{generate, CertificateGenerator, GeneratorConfig};
pub use identity::{HandshakeIdentity, Identity, IdentitySource};
pub use keys::{verify_signature, EcdsaCurve, KeyAlgorithm, KeyHandle, SecretBytes};
pub use pem_bundle::{export_pem, load_pem, load_pem_files, PemBundle};
pub use resolver::{resolve_private_key, PrivateKeyResolver};
pub use store::{load_from_store, CertificateStore, KeyringStore, MemoryStore};
