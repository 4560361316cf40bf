//! Password-based protection of PKCS#12 contents
//!
//! Integrity: HMAC over SHA-1, SHA-256, SHA-384 or SHA-512, keyed through the
//! PKCS#12 KDF. Privacy: PBES2 (PBKDF2 or scrypt with AES-CBC) and the legacy
//! PKCS#12 schemes with 3DES or RC2. Any other algorithm is reported as a
//! platform limitation, never as a bad password.

use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockCipher, BlockDecryptMut, KeyInit, KeyIvInit};
use const_oid::ObjectIdentifier;
use der::asn1::OctetString;
use der::{Any, Decode, Encode};
use des::TdesEde3;
use pkcs12::digest_info::DigestInfo;
use pkcs12::kdf::{derive_key_utf8, Pkcs12KeyType};
use pkcs12::mac_data::MacData;
use pkcs12::pbe_params::{Pbes2Params, Pkcs12PbeParams};
use pkcs5::pbes2;
use rc2::Rc2;
use ring::hmac;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

use crate::error::{IdentityError, Result};

const SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
const SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
const SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");
const SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");

const PBES2: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.5.13");
const PBKDF2: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.5.12");
const SCRYPT: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.11591.4.11");
const AES_128_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.2");
const AES_192_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.22");
const AES_256_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.42");

/// PBKDF2 and MAC iteration count for exported archives
const EXPORT_ITERATIONS: u16 = 2048;

/// Check the archive MAC over the authenticated safe
pub(crate) fn verify_mac(mac_data: &MacData, password: &str, data: &[u8]) -> Result<()> {
    let key = mac_key(
        mac_data.mac.algorithm.oid,
        password,
        mac_data.mac_salt.as_bytes(),
        mac_data.iterations,
    )?;
    hmac::verify(&key, data, mac_data.mac.digest.as_bytes()).map_err(|_| {
        IdentityError::archive_access("MAC verification failed: wrong password or corrupt archive")
    })
}

/// HMAC-SHA256 MAC over the authenticated safe
pub(crate) fn compute_mac(data: &[u8], password: &str) -> Result<MacData> {
    let salt: [u8; 16] = rand::random();
    let iterations = i32::from(EXPORT_ITERATIONS);
    let key = mac_key(SHA256, password, &salt, iterations)?;
    let tag = hmac::sign(&key, data);

    Ok(MacData {
        mac: DigestInfo {
            algorithm: AlgorithmIdentifierOwned {
                oid: SHA256,
                parameters: None,
            },
            digest: OctetString::new(tag.as_ref()).map_err(assembly)?,
        },
        mac_salt: OctetString::new(salt.to_vec()).map_err(assembly)?,
        iterations,
    })
}

fn mac_key(digest: ObjectIdentifier, password: &str, salt: &[u8], iterations: i32) -> Result<hmac::Key> {
    let (algorithm, key) = match digest {
        SHA1 => (
            hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            derive_key_utf8::<Sha1>(password, salt, Pkcs12KeyType::Mac, iterations, 20),
        ),
        SHA256 => (
            hmac::HMAC_SHA256,
            derive_key_utf8::<Sha256>(password, salt, Pkcs12KeyType::Mac, iterations, 32),
        ),
        SHA384 => (
            hmac::HMAC_SHA384,
            derive_key_utf8::<Sha384>(password, salt, Pkcs12KeyType::Mac, iterations, 48),
        ),
        SHA512 => (
            hmac::HMAC_SHA512,
            derive_key_utf8::<Sha512>(password, salt, Pkcs12KeyType::Mac, iterations, 64),
        ),
        other => {
            return Err(IdentityError::unsupported_platform(format!(
                "PKCS#12 MAC digest {other} is not supported"
            )));
        }
    };
    let key = Zeroizing::new(key.map_err(unencodable_password)?);
    Ok(hmac::Key::new(algorithm, key.as_slice()))
}

/// Decrypt bag or safe contents protected with `algorithm`
pub(crate) fn decrypt(
    algorithm: &AlgorithmIdentifierOwned,
    ciphertext: &[u8],
    password: &str,
) -> Result<Zeroizing<Vec<u8>>> {
    let params = algorithm
        .parameters
        .as_ref()
        .ok_or_else(|| {
            IdentityError::archive_access(format!("{} carries no parameters", algorithm.oid))
        })?
        .to_der()
        .map_err(malformed)?;

    match algorithm.oid {
        PBES2 => pbes2_decrypt(&params, ciphertext, password),
        pkcs12::PKCS_12_PBE_WITH_SHAAND3_KEY_TRIPLE_DES_CBC => {
            legacy_decrypt::<TdesEde3>(&params, ciphertext, password, 24)
        }
        pkcs12::PKCS_12_PBE_WITH_SHAAND128_BIT_RC2_CBC => {
            legacy_decrypt::<Rc2>(&params, ciphertext, password, 16)
        }
        pkcs12::PKCS_12_PBEWITH_SHAAND40_BIT_RC2_CBC => {
            legacy_decrypt::<Rc2>(&params, ciphertext, password, 5)
        }
        other => Err(IdentityError::unsupported_platform(format!(
            "PKCS#12 encryption scheme {other} is not supported"
        ))),
    }
}

/// Encrypt with PBES2: PBKDF2-HMAC-SHA256 and AES-256-CBC
pub(crate) fn encrypt(plaintext: &[u8], password: &str) -> Result<(AlgorithmIdentifierOwned, Vec<u8>)> {
    let salt: [u8; 16] = rand::random();
    let iv: [u8; 16] = rand::random();
    let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(u32::from(EXPORT_ITERATIONS), &salt, &iv)
        .map_err(|e| IdentityError::archive_access(format!("PBES2 parameters rejected: {e}")))?;
    let ciphertext = params
        .encrypt(password.as_bytes(), plaintext)
        .map_err(|e| IdentityError::archive_access(format!("PBES2 encryption failed: {e}")))?;
    let parameters = Any::from_der(&params.to_der().map_err(assembly)?).map_err(assembly)?;

    Ok((
        AlgorithmIdentifierOwned {
            oid: PBES2,
            parameters: Some(parameters),
        },
        ciphertext,
    ))
}

fn pbes2_decrypt(params: &[u8], ciphertext: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>> {
    let outline = Pbes2Params::from_der(params).map_err(malformed)?;
    let kdf_known = matches!(outline.kdf.oid, PBKDF2 | SCRYPT);
    let cipher_known = matches!(outline.encryption.oid, AES_128_CBC | AES_192_CBC | AES_256_CBC);
    if !kdf_known || !cipher_known {
        return Err(IdentityError::unsupported_platform(format!(
            "PBES2 with {} and {} is not supported",
            outline.kdf.oid, outline.encryption.oid
        )));
    }

    let params = pbes2::Parameters::from_der(params).map_err(|e| {
        IdentityError::unsupported_platform(format!("PBES2 parameters are not supported: {e}"))
    })?;
    params
        .decrypt(password.as_bytes(), ciphertext)
        .map(Zeroizing::new)
        .map_err(|e| match e {
            pkcs5::Error::UnsupportedAlgorithm { oid } => {
                IdentityError::unsupported_platform(format!("PBES2 algorithm {oid} is not supported"))
            }
            _ => wrong_password(),
        })
}

/// PKCS#12 appendix B PBE: key and IV both come from the SHA-1 KDF
fn legacy_decrypt<C>(
    params: &[u8],
    ciphertext: &[u8],
    password: &str,
    key_len: usize,
) -> Result<Zeroizing<Vec<u8>>>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    let params = Pkcs12PbeParams::from_der(params).map_err(malformed)?;
    let salt = params.salt.as_bytes();
    let key = Zeroizing::new(
        derive_key_utf8::<Sha1>(password, salt, Pkcs12KeyType::EncryptionKey, params.iterations, key_len)
            .map_err(unencodable_password)?,
    );
    let iv = derive_key_utf8::<Sha1>(password, salt, Pkcs12KeyType::Iv, params.iterations, 8)
        .map_err(unencodable_password)?;

    let decryptor = cbc::Decryptor::<C>::new_from_slices(&key, &iv)
        .map_err(|_| IdentityError::archive_access("PBE key or IV has the wrong length"))?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| wrong_password())
}

fn wrong_password() -> IdentityError {
    IdentityError::archive_access("Decryption failed: wrong password or corrupt archive")
}

fn unencodable_password(e: der::Error) -> IdentityError {
    IdentityError::archive_access(format!("Password cannot be encoded as BMPString: {e}"))
}

pub(crate) fn malformed(e: der::Error) -> IdentityError {
    IdentityError::archive_access(format!("Malformed PKCS#12 archive: {e}"))
}

pub(crate) fn assembly(e: der::Error) -> IdentityError {
    IdentityError::archive_access(format!("Failed to assemble PKCS#12 archive: {e}"))
}
