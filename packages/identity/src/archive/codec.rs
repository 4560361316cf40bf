//! PKCS#12 container layout
//!
//! A PFX wraps an authenticated safe: a sequence of content infos, each plain or
//! password-encrypted, holding safe bags. Certificate bags, shrouded key bags
//! and plain key bags are read; other bag types are skipped. Written archives
//! hold one encrypted certificate safe and one shrouded key bag, sealed with an
//! HMAC-SHA256 MAC.

use cms::content_info::{CmsVersion, ContentInfo};
use cms::encrypted_data::EncryptedData;
use cms::enveloped_data::EncryptedContentInfo;
use const_oid::ObjectIdentifier;
use der::asn1::{BmpString, OctetString, SetOfVec};
use der::{Any, AnyRef, Decode, Encode};
use pkcs12::cert_type::CertBag;
use pkcs12::pbe_params::EncryptedPrivateKeyInfo;
use pkcs12::pfx::{Pfx, Version};
use pkcs12::safe_bag::{SafeBag, SafeContents};
use x509_cert::attr::{Attribute, Attributes};
use zeroize::Zeroizing;

use super::pbe::{self, assembly, malformed};
use crate::error::{IdentityError, Result};

const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
const ID_ENCRYPTED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.6");
const FRIENDLY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.20");
const LOCAL_KEY_ID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.21");

/// Certificates and keys found in an archive, in archive order
#[derive(Default)]
pub(crate) struct ArchiveContents {
    pub certificates: Vec<CertificateBag>,
    pub keys: Vec<KeyBag>,
}

pub(crate) struct CertificateBag {
    pub der: Vec<u8>,
    pub local_key_id: Option<Vec<u8>>,
}

pub(crate) struct KeyBag {
    pub pkcs8: Zeroizing<Vec<u8>>,
    pub local_key_id: Option<Vec<u8>>,
}

impl ArchiveContents {
    /// Index of the certificate paired with `key`, else the first certificate
    pub fn leaf_for(&self, key: Option<&KeyBag>) -> Option<usize> {
        let paired = key
            .and_then(|key| key.local_key_id.as_ref())
            .and_then(|id| {
                self.certificates
                    .iter()
                    .position(|cert| cert.local_key_id.as_ref() == Some(id))
            });
        paired.or_else(|| (!self.certificates.is_empty()).then_some(0))
    }
}

/// Verify and unpack an archive
pub(crate) fn decode(bytes: &[u8], password: &str) -> Result<ArchiveContents> {
    // Only version 3 decodes
    let pfx = Pfx::from_der(bytes).map_err(malformed)?;
    if pfx.auth_safe.content_type != ID_DATA {
        return Err(IdentityError::unsupported_platform(format!(
            "PKCS#12 public-key integrity mode ({}) is not supported",
            pfx.auth_safe.content_type
        )));
    }

    let auth_safe = octets(&pfx.auth_safe.content)?;
    match &pfx.mac_data {
        Some(mac_data) => pbe::verify_mac(mac_data, password, &auth_safe)?,
        None => tracing::debug!("Archive has no MAC; integrity not verified"),
    }

    let mut contents = ArchiveContents::default();
    for safe in Vec::<ContentInfo>::from_der(&auth_safe).map_err(malformed)? {
        for bag in open_safe(&safe, password)? {
            read_bag(&bag, password, &mut contents)?;
        }
    }
    Ok(contents)
}

/// Seal one certificate and its PKCS#8 key into an archive
pub(crate) fn encode(
    certificate_der: &[u8],
    pkcs8: &[u8],
    password: &str,
    friendly_name: &str,
    local_key_id: &[u8],
) -> Result<Vec<u8>> {
    let attributes = bag_attributes(friendly_name, local_key_id).map_err(assembly)?;

    let cert_bag = CertBag {
        cert_id: pkcs12::PKCS_12_X509_CERT_OID,
        cert_value: OctetString::new(certificate_der).map_err(assembly)?,
    };
    let cert_safe: SafeContents = vec![SafeBag {
        bag_id: pkcs12::PKCS_12_CERT_BAG_OID,
        bag_value: cert_bag.to_der().map_err(assembly)?,
        bag_attributes: Some(attributes.clone()),
    }];
    let (content_enc_alg, ciphertext) =
        pbe::encrypt(&cert_safe.to_der().map_err(assembly)?, password)?;
    let encrypted = EncryptedData {
        version: CmsVersion::V0,
        enc_content_info: EncryptedContentInfo {
            content_type: ID_DATA,
            content_enc_alg,
            encrypted_content: Some(OctetString::new(ciphertext).map_err(assembly)?),
        },
        unprotected_attrs: None,
    };
    let certificates = ContentInfo {
        content_type: ID_ENCRYPTED_DATA,
        content: Any::from_der(&encrypted.to_der().map_err(assembly)?).map_err(assembly)?,
    };

    let (encryption_algorithm, ciphertext) = pbe::encrypt(pkcs8, password)?;
    let shrouded = EncryptedPrivateKeyInfo {
        encryption_algorithm,
        encrypted_data: OctetString::new(ciphertext).map_err(assembly)?,
    };
    let key_safe: SafeContents = vec![SafeBag {
        bag_id: pkcs12::PKCS_12_PKCS8_KEY_BAG_OID,
        bag_value: shrouded.to_der().map_err(assembly)?,
        bag_attributes: Some(attributes),
    }];
    let keys = data_content(key_safe.to_der().map_err(assembly)?)?;

    let auth_safe = vec![certificates, keys].to_der().map_err(assembly)?;
    let mac_data = pbe::compute_mac(&auth_safe, password)?;

    Pfx {
        version: Version::V3,
        auth_safe: data_content(auth_safe)?,
        mac_data: Some(mac_data),
    }
    .to_der()
    .map_err(assembly)
}

fn open_safe(safe: &ContentInfo, password: &str) -> Result<SafeContents> {
    let plaintext = match safe.content_type {
        ID_DATA => Zeroizing::new(octets(&safe.content)?),
        ID_ENCRYPTED_DATA => {
            let encrypted = EncryptedData::from_der(&safe.content.to_der().map_err(malformed)?)
                .map_err(malformed)?;
            let info = &encrypted.enc_content_info;
            match &info.encrypted_content {
                Some(ciphertext) => {
                    pbe::decrypt(&info.content_enc_alg, ciphertext.as_bytes(), password)?
                }
                None => return Ok(Vec::new()),
            }
        }
        other => {
            return Err(IdentityError::unsupported_platform(format!(
                "PKCS#12 safe of content type {other} is not supported"
            )));
        }
    };
    SafeContents::from_der(&plaintext).map_err(malformed)
}

fn read_bag(bag: &SafeBag, password: &str, contents: &mut ArchiveContents) -> Result<()> {
    let local_key_id = local_key_id(bag);
    match bag.bag_id {
        pkcs12::PKCS_12_CERT_BAG_OID => {
            let cert_bag = CertBag::from_der(bag_value(bag)?).map_err(malformed)?;
            if cert_bag.cert_id != pkcs12::PKCS_12_X509_CERT_OID {
                tracing::debug!(cert_type = %cert_bag.cert_id, "Skipping non-X.509 certificate bag");
                return Ok(());
            }
            contents.certificates.push(CertificateBag {
                der: cert_bag.cert_value.into_bytes(),
                local_key_id,
            });
        }
        pkcs12::PKCS_12_PKCS8_KEY_BAG_OID => {
            let shrouded = EncryptedPrivateKeyInfo::from_der(bag_value(bag)?).map_err(malformed)?;
            let pkcs8 = pbe::decrypt(
                &shrouded.encryption_algorithm,
                shrouded.encrypted_data.as_bytes(),
                password,
            )?;
            contents.keys.push(KeyBag { pkcs8, local_key_id });
        }
        pkcs12::PKCS_12_KEY_BAG_OID => {
            contents.keys.push(KeyBag {
                pkcs8: Zeroizing::new(bag_value(bag)?.to_vec()),
                local_key_id,
            });
        }
        other => tracing::debug!(bag_type = %other, "Skipping PKCS#12 bag"),
    }
    Ok(())
}

/// Content of the explicitly tagged `bagValue`
fn bag_value(bag: &SafeBag) -> Result<&[u8]> {
    AnyRef::from_der(&bag.bag_value)
        .map(AnyRef::value)
        .map_err(malformed)
}

fn local_key_id(bag: &SafeBag) -> Option<Vec<u8>> {
    bag.bag_attributes
        .as_ref()?
        .iter()
        .find(|attribute| attribute.oid == LOCAL_KEY_ID)?
        .values
        .iter()
        .next()
        .and_then(|value| value.decode_as::<OctetString>().ok())
        .map(OctetString::into_bytes)
}

fn bag_attributes(friendly_name: &str, local_key_id: &[u8]) -> der::Result<Attributes> {
    let name = Any::from_der(&BmpString::from_utf8(friendly_name)?.to_der()?)?;
    let key_id = Any::from_der(&OctetString::new(local_key_id)?.to_der()?)?;

    let mut attributes = Attributes::new();
    attributes.insert(Attribute {
        oid: FRIENDLY_NAME,
        values: SetOfVec::from_iter([name])?,
    })?;
    attributes.insert(Attribute {
        oid: LOCAL_KEY_ID,
        values: SetOfVec::from_iter([key_id])?,
    })?;
    Ok(attributes)
}

fn octets(content: &Any) -> Result<Vec<u8>> {
    let encoded = content.to_der().map_err(malformed)?;
    Ok(OctetString::from_der(&encoded).map_err(malformed)?.into_bytes())
}

fn data_content(bytes: Vec<u8>) -> Result<ContentInfo> {
    let octets = OctetString::new(bytes).map_err(assembly)?;
    Ok(ContentInfo {
        content_type: ID_DATA,
        content: Any::from_der(&octets.to_der().map_err(assembly)?).map_err(assembly)?,
    })
}
