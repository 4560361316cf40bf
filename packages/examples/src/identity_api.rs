//! Generate a session identity and print what goes into the SDP offer

use dtls_identity::{
    verify_signature, CertificateGenerator, EcdsaCurve, GeneratorConfig, HashAlgorithm,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("DTLS identity example");

    // RSA-2048, 30 days, CN=WebRTC
    let session = CertificateGenerator::with_config(GeneratorConfig::session()).generate()?;
    let details = session.certificate().details();
    println!("\n=== Session identity ===");
    println!("subject:   {}", details.subject);
    println!("serial:    {}", details.serial_hex());
    println!("key:       {}", session.certificate().key_algorithm()?);
    for algorithm in HashAlgorithm::ALL {
        println!("{:<10} {}", algorithm.token(), session.fingerprint(algorithm).value());
    }

    let ephemeral = CertificateGenerator::new()
        .ecdsa(EcdsaCurve::P256)
        .subject("call-7f3a")
        .valid_for_days(1)
        .generate()?;

    let handshake = ephemeral.handshake_identity(HashAlgorithm::Sha256)?;
    println!("\n=== SDP ===");
    println!("a=fingerprint:{}", handshake.fingerprint().to_sdp_value());
    println!("a=setup:actpass");

    println!("\n=== Signaling JSON ===");
    println!("{}", serde_json::to_string_pretty(handshake.fingerprint())?);

    let transcript = b"client_random server_random ecdh_params";
    let signature = handshake.sign(transcript)?;
    let valid = verify_signature(handshake.certificate(), transcript, &signature)?;
    log::info!("Handshake signature verified: {valid}");
    println!("\nsignature: {} bytes, verified: {valid}", signature.len());

    Ok(())
}
