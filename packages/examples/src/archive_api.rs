//! Load a PKCS#12 identity, falling back to a generated one
//!
//! ```text
//! cargo run --bin archive_api -- path/to/identity.pfx password
//! ```

use std::env;

use dtls_identity::{
    export_archive, generate, load_archive, load_archive_file, ArchiveOptions, GeneratorConfig,
    HashAlgorithm, Identity,
};

fn load_or_generate(
    path: Option<&str>,
    password: Option<&str>,
) -> Result<Identity, Box<dyn std::error::Error>> {
    let mut options = ArchiveOptions::new();
    if let Some(password) = password {
        options = options.password(password);
    }

    match path {
        Some(path) => Ok(load_archive_file(path, &options)?),
        None => {
            log::info!("No archive given, generating an ephemeral identity");
            let identity = generate(&GeneratorConfig::ephemeral())?;
            let bytes = export_archive(&identity, password, "session")?;
            Ok(load_archive(&bytes, &options.store_only())?)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let identity = load_or_generate(
        args.first().map(String::as_str),
        args.get(1).map(String::as_str),
    )?;

    println!("source:      {:?}", identity.source());
    println!("subject:     {}", identity.certificate().details().subject);
    println!("fingerprint: {}", identity.fingerprint(HashAlgorithm::Sha256));

    match identity.private_key() {
        Ok(key) => println!(
            "private key: {} (exportable: {})",
            key.algorithm(),
            key.export_pkcs8().is_some()
        ),
        Err(e) if e.is_platform_limitation() => {
            log::warn!("Private key unusable on this host: {e}");
            println!("private key: unavailable ({e})");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
