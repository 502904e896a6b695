//! SAML 2.0 authentication response fixtures for hub relying-party tests
//!
//! This crate builds the signed-and-encrypted SAML `Response` documents a
//! hub receives from the identity providers and eIDAS country proxies it
//! federates with, so that consuming services can be exercised without a
//! live federation. It provides:
//! - PEM-backed signing and encryption credentials
//! - Assertion assembly with enveloped XML signatures (sign-then-encrypt)
//! - The domestic two-assertion response shape (matching dataset + authn)
//! - The country single-assertion response shape (persistent `NameID`)
//! - Built-in test keys and entity ids for the stub federation
//!
//! Responses are only ever *produced* here. Validating a response against
//! hub policy is the consuming service's job, not this crate's.

pub mod algorithm;
pub mod assertion;
pub mod attributes;
pub mod credentials;
pub mod encryption;
pub mod error;
pub mod model;
pub mod response;
pub mod serialize;
pub mod signing;
pub mod test_keys;
pub mod xml;

pub use algorithm::{DigestAlgorithm, EncryptionAlgorithm, SignatureAlgorithm};
pub use assertion::{build_signed_assertion, AssertionConfig, EncryptedAssertion, SignedAssertion};
pub use credentials::{EncryptionCredential, PemKeyPair, SigningCredential};
pub use error::{CredentialError, EncryptionError, Error, Result, SigningError};
pub use response::{
    AuthnResponse, CountryResponseConfig, IdpResponseConfig, ResponseFactory, DEFAULT_PERSISTENT_ID,
    DEFAULT_REQUEST_ID,
};
pub use serialize::{Base64Encoder, ResponseEncoder};
pub use test_keys::TestKeyStore;
