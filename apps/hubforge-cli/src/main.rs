//! Command line front end for the response fixture factory.
//!
//! Prints a base64 `SAMLResponse` by default so the output can be pasted
//! straight into a form post. `--format xml` and `--format json` expose the
//! raw document and a summary for scripting.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use hubforge_saml::model::{EIDAS_LOA_HIGH, EIDAS_LOA_LOW, EIDAS_LOA_SUBSTANTIAL};
use hubforge_saml::{
    AuthnResponse, Base64Encoder, CountryResponseConfig, DigestAlgorithm, EncryptionAlgorithm,
    IdpResponseConfig, PemKeyPair, ResponseEncoder, ResponseFactory, SignatureAlgorithm,
    DEFAULT_PERSISTENT_ID, DEFAULT_REQUEST_ID,
};

#[derive(Parser)]
#[command(name = "hubforge")]
#[command(version, about = "Generate SAML response fixtures for hub tests", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the two-assertion response a domestic identity provider sends
    Idp(IdpArgs),
    /// Build the single-assertion response a country proxy node sends
    Country(CountryArgs),
}

#[derive(Args)]
struct IdpArgs {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct CountryArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Audience entity id written into the assertion conditions
    #[arg(long)]
    audience: Option<String>,

    /// Recipient endpoint written on the subject confirmation
    #[arg(long)]
    recipient: Option<String>,

    /// eIDAS level of assurance asserted by the proxy node
    #[arg(long, value_enum, default_value = "substantial")]
    level_of_assurance: LoaArg,

    /// Persistent name identifier for the subject
    #[arg(long, default_value = DEFAULT_PERSISTENT_ID)]
    persistent_id: String,
}

#[derive(Args)]
struct CommonArgs {
    /// AuthnRequest id the response answers
    #[arg(long, default_value = DEFAULT_REQUEST_ID)]
    request_id: String,

    /// Issuer entity id, looked up in the built-in key table unless
    /// --signing-cert/--signing-key are given
    #[arg(long)]
    issuer: Option<String>,

    /// Destination endpoint written on the response
    #[arg(long)]
    destination: Option<String>,

    /// PEM certificate to sign with instead of the built-in table
    #[arg(long, value_name = "FILE", requires = "signing_key")]
    signing_cert: Option<PathBuf>,

    /// PEM private key matching --signing-cert
    #[arg(long, value_name = "FILE", requires = "signing_cert")]
    signing_key: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "rsa-sha256")]
    signature_algorithm: SignatureArg,

    #[arg(long, value_enum, default_value = "sha256")]
    digest_algorithm: DigestArg,

    #[arg(long, value_enum, default_value = "aes128-cbc")]
    encryption_algorithm: EncryptionArg,

    /// Output form for the generated response
    #[arg(long, value_enum, default_value = "encoded")]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Base64 of the response document
    Encoded,
    /// The response document itself
    Xml,
    /// JSON summary including the encoded document
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum SignatureArg {
    RsaSha1,
    RsaSha256,
    RsaSha384,
    RsaSha512,
}

impl From<SignatureArg> for SignatureAlgorithm {
    fn from(value: SignatureArg) -> Self {
        match value {
            SignatureArg::RsaSha1 => SignatureAlgorithm::RsaSha1,
            SignatureArg::RsaSha256 => SignatureAlgorithm::RsaSha256,
            SignatureArg::RsaSha384 => SignatureAlgorithm::RsaSha384,
            SignatureArg::RsaSha512 => SignatureAlgorithm::RsaSha512,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DigestArg {
    Sha1,
    Sha256,
    Sha512,
}

impl From<DigestArg> for DigestAlgorithm {
    fn from(value: DigestArg) -> Self {
        match value {
            DigestArg::Sha1 => DigestAlgorithm::Sha1,
            DigestArg::Sha256 => DigestAlgorithm::Sha256,
            DigestArg::Sha512 => DigestAlgorithm::Sha512,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum EncryptionArg {
    Aes128Cbc,
    Aes256Cbc,
    Aes128Gcm,
    Aes256Gcm,
}

impl From<EncryptionArg> for EncryptionAlgorithm {
    fn from(value: EncryptionArg) -> Self {
        match value {
            EncryptionArg::Aes128Cbc => EncryptionAlgorithm::Aes128Cbc,
            EncryptionArg::Aes256Cbc => EncryptionAlgorithm::Aes256Cbc,
            EncryptionArg::Aes128Gcm => EncryptionAlgorithm::Aes128Gcm,
            EncryptionArg::Aes256Gcm => EncryptionAlgorithm::Aes256Gcm,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LoaArg {
    Low,
    Substantial,
    High,
}

impl LoaArg {
    fn uri(self) -> &'static str {
        match self {
            LoaArg::Low => EIDAS_LOA_LOW,
            LoaArg::Substantial => EIDAS_LOA_SUBSTANTIAL,
            LoaArg::High => EIDAS_LOA_HIGH,
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Idp(args) => run_idp(args),
        Commands::Country(args) => run_country(args),
    }
}

/// Diagnostics go to stderr so stdout stays a clean fixture stream.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hubforge_saml=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_idp(args: IdpArgs) -> anyhow::Result<()> {
    let keys = load_key_pair(
        args.common.signing_cert.as_deref(),
        args.common.signing_key.as_deref(),
    )?;
    let defaults = IdpResponseConfig::default();
    let config = IdpResponseConfig {
        request_id: args.common.request_id,
        issuer: args.common.issuer.unwrap_or(defaults.issuer),
        destination: args.common.destination.unwrap_or(defaults.destination),
        keys,
        signature_algorithm: args.common.signature_algorithm.into(),
        digest_algorithm: args.common.digest_algorithm.into(),
        encryption_algorithm: args.common.encryption_algorithm.into(),
    };

    let factory = ResponseFactory::default();
    let response = factory
        .response_from_idp(&config)
        .context("building idp response")?;
    print_response(&response, args.common.format)
}

fn run_country(args: CountryArgs) -> anyhow::Result<()> {
    let keys = load_key_pair(
        args.common.signing_cert.as_deref(),
        args.common.signing_key.as_deref(),
    )?;
    let defaults = CountryResponseConfig::default();
    let config = CountryResponseConfig {
        request_id: args.common.request_id,
        issuer: args.common.issuer.unwrap_or(defaults.issuer),
        destination: args.common.destination.unwrap_or(defaults.destination),
        audience: args.audience.unwrap_or(defaults.audience),
        recipient: args.recipient.unwrap_or(defaults.recipient),
        authn_context: args.level_of_assurance.uri().to_string(),
        persistent_id: args.persistent_id,
        keys,
        signature_algorithm: args.common.signature_algorithm.into(),
        digest_algorithm: args.common.digest_algorithm.into(),
        encryption_algorithm: args.common.encryption_algorithm.into(),
    };

    let factory = ResponseFactory::default();
    let response = factory
        .response_from_country(&config)
        .context("building country response")?;
    print_response(&response, args.common.format)
}

fn load_key_pair(cert: Option<&Path>, key: Option<&Path>) -> anyhow::Result<Option<PemKeyPair>> {
    let (cert, key) = match (cert, key) {
        (Some(cert), Some(key)) => (cert, key),
        _ => return Ok(None),
    };
    let certificate = fs::read_to_string(cert)
        .with_context(|| format!("reading certificate {}", cert.display()))?;
    let private_key = fs::read_to_string(key)
        .with_context(|| format!("reading private key {}", key.display()))?;
    Ok(Some(PemKeyPair::new(certificate, private_key)))
}

fn print_response(response: &AuthnResponse, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Encoded => println!("{}", Base64Encoder.encode(response.xml())),
        OutputFormat::Xml => println!("{}", response.xml()),
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "id": response.id(),
                "issuer": response.issuer(),
                "in_response_to": response.in_response_to(),
                "destination": response.destination(),
                "encrypted_assertions": response.encrypted_assertions().len(),
                "saml_response": Base64Encoder.encode(response.xml()),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
