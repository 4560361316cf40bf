//! Integration tests for self-signed identity generation

use std::collections::HashSet;
use std::time::{Duration, SystemTime};

use dtls_identity::{
    generate, verify_signature, CertificateGenerator, EcdsaCurve, GeneratorConfig,
    HashAlgorithm, IdentityError, IdentitySource, KeyAlgorithm, PublicKeyKind,
};

#[test]
fn test_default_generation_produces_webrtc_identity() {
    let before = SystemTime::now() - Duration::from_secs(1);
    let identity = CertificateGenerator::new()
        .generate()
        .expect("default generation should succeed");

    assert_eq!(identity.source(), IdentitySource::Generated);
    assert!(identity.has_private_key());

    let details = identity.certificate().details();
    assert_eq!(details.subject, "CN=WebRTC");
    assert!(details.is_self_issued(), "certificate must be self-signed");
    assert_eq!(details.is_ca, Some(false));

    let usage = details.key_usage.expect("key usage extension present");
    assert!(usage.digital_signature);
    assert!(usage.key_encipherment);
    assert!(!usage.key_cert_sign);

    assert_eq!(details.public_key, PublicKeyKind::Rsa { bits: Some(2048) });
    assert!(details.not_before >= before);
    assert!(details.not_before <= SystemTime::now());
    assert_eq!(
        details
            .not_after
            .duration_since(details.not_before)
            .expect("not_after follows not_before"),
        Duration::from_secs(30 * 24 * 60 * 60)
    );
}

#[test]
fn test_generated_key_signs_for_its_certificate() {
    for algorithm in [
        KeyAlgorithm::rsa_2048(),
        KeyAlgorithm::Ecdsa(EcdsaCurve::P256),
        KeyAlgorithm::Ecdsa(EcdsaCurve::P384),
    ] {
        let identity = CertificateGenerator::new()
            .key_algorithm(algorithm)
            .generate()
            .expect("generation should succeed");

        assert_eq!(identity.certificate().key_algorithm().ok(), Some(algorithm));

        let handshake = identity
            .handshake_identity(HashAlgorithm::Sha256)
            .expect("generated key resolves");
        assert_eq!(handshake.key_algorithm(), algorithm);

        let message = b"client_random || server_random || params";
        let signature = handshake.sign(message).expect("signing succeeds");
        assert!(
            verify_signature(identity.certificate(), message, &signature)
                .expect("verification runs"),
            "{algorithm} signature must verify against the certificate"
        );
        assert!(!verify_signature(identity.certificate(), b"tampered", &signature)
            .expect("verification runs"));
    }
}

#[test]
fn test_configured_subject_and_validity() {
    let identity = CertificateGenerator::new()
        .ecdsa(EcdsaCurve::P256)
        .subject("endpoint-42")
        .valid_for_days(1)
        .generate()
        .expect("generation should succeed");

    let details = identity.certificate().details();
    assert_eq!(details.subject, "CN=endpoint-42");
    assert_eq!(details.public_key.bits(), Some(256));
    assert_eq!(
        details
            .not_after
            .duration_since(details.not_before)
            .expect("not_after follows not_before"),
        Duration::from_secs(86_400)
    );
}

#[test]
fn test_one_hour_rsa_validity() {
    let identity = CertificateGenerator::new()
        .rsa(2048)
        .valid_for(Duration::from_secs(3600))
        .generate()
        .expect("generation should succeed");

    let details = identity.certificate().details();
    let window = details
        .not_after
        .duration_since(details.not_before)
        .expect("not_after follows not_before");
    assert!(window.as_secs().abs_diff(3600) <= 1, "window was {window:?}");
}

#[test]
fn test_ephemeral_preset() {
    let identity = generate(&GeneratorConfig::ephemeral()).expect("ephemeral generation");
    assert_eq!(
        identity.certificate().key_algorithm().ok(),
        Some(KeyAlgorithm::Ecdsa(EcdsaCurve::P256))
    );
}

#[test]
fn test_invalid_parameters_fail_with_generation_error() {
    let too_small = CertificateGenerator::new().rsa(1024).generate();
    assert!(matches!(too_small, Err(IdentityError::Generation(_))));

    let odd_size = CertificateGenerator::new().rsa(2049).generate();
    assert!(matches!(odd_size, Err(IdentityError::Generation(_))));

    let no_validity = CertificateGenerator::new()
        .ecdsa(EcdsaCurve::P256)
        .valid_for(Duration::ZERO)
        .generate();
    assert!(matches!(no_validity, Err(IdentityError::Generation(_))));

    let unbounded = CertificateGenerator::new()
        .ecdsa(EcdsaCurve::P256)
        .valid_for(Duration::MAX)
        .generate();
    assert!(matches!(unbounded, Err(IdentityError::Generation(_))));
}

#[test]
fn test_each_generation_is_unique() {
    let config = GeneratorConfig::ephemeral();
    let first = generate(&config).expect("first generation");
    let second = generate(&config).expect("second generation");

    assert_ne!(first.certificate(), second.certificate());
    assert_ne!(
        first.fingerprint(HashAlgorithm::Sha256),
        second.fingerprint(HashAlgorithm::Sha256)
    );
    assert_ne!(
        first.certificate().details().serial_number,
        second.certificate().details().serial_number
    );
}

#[test]
fn test_concurrent_generation() {
    let config = GeneratorConfig::ephemeral();

    let fingerprints: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    generate(&config)
                        .expect("concurrent generation should succeed")
                        .fingerprint(HashAlgorithm::Sha256)
                        .to_string()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("generator thread panicked"))
            .collect()
    });

    let unique: HashSet<_> = fingerprints.iter().collect();
    assert_eq!(unique.len(), fingerprints.len());
}
