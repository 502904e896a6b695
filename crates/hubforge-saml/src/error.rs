//! Error types for fixture generation

use thiserror::Error;

/// Result type for response-building operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error for the response factory
#[derive(Debug, Error)]
pub enum Error {
    /// Credential resolution or key loading failed
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Signing an assertion or response envelope failed
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// Encrypting an assertion for the hub failed
    #[error(transparent)]
    Encryption(#[from] EncryptionError),
}

/// Errors raised while turning PEM material into usable credentials
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Certificate PEM could not be parsed
    #[error("Invalid certificate PEM: {0}")]
    InvalidCertificate(#[source] openssl::error::ErrorStack),

    /// Private key PEM could not be parsed
    #[error("Invalid private key PEM: {0}")]
    InvalidPrivateKey(#[source] openssl::error::ErrorStack),

    /// Certificate and private key are not a pair
    #[error("Certificate public key does not match the private key")]
    KeyMismatch,

    /// No built-in credentials registered for the requested issuer
    #[error("No signing credentials registered for entity: {0}")]
    UnknownEntity(String),

    /// Key material operation failed inside OpenSSL
    #[error("Credential operation failed: {0}")]
    Crypto(#[from] openssl::error::ErrorStack),
}

/// Errors raised while producing an enveloped XML signature
#[derive(Debug, Error)]
pub enum SigningError {
    /// The document does not carry the ID the signature must reference
    #[error("No element with ID {0} to bind the signature to")]
    ReferenceNotFound(String),

    /// The document has no Issuer element to anchor the signature after
    #[error("Signed element has no Issuer child")]
    MissingIssuer,

    /// Digest or signature computation failed inside OpenSSL
    #[error("Signature computation failed: {0}")]
    Crypto(#[from] openssl::error::ErrorStack),
}

/// Errors raised while encrypting or decrypting an assertion
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// Session key cannot be OAEP-wrapped by the recipient's RSA key
    #[error("{algorithm} session key does not fit an OAEP block for a {modulus_bits}-bit RSA key")]
    KeyTooLargeForWrap {
        algorithm: crate::algorithm::EncryptionAlgorithm,
        modulus_bits: usize,
    },

    /// Cipher, key wrap, or random generation failed inside OpenSSL
    #[error("Encryption operation failed: {0}")]
    Crypto(#[from] openssl::error::ErrorStack),

    /// EncryptedAssertion document is missing required parts
    #[error("Malformed EncryptedAssertion: {0}")]
    MalformedDocument(String),

    /// EncryptedData names an algorithm this crate does not implement
    #[error("Unsupported encryption algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// CipherValue content is not valid base64
    #[error("Invalid base64 in CipherValue: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Decrypted bytes are not a UTF-8 XML document
    #[error("Decrypted assertion is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}
