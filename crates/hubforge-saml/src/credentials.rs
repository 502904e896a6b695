//! PEM-backed signing and encryption credentials
//!
//! A credential is built from a certificate / private key PEM pair and is
//! rejected up front when the two halves do not belong together, so a bad
//! fixture fails at construction rather than producing a response the hub
//! would mysteriously refuse.

use base64::{engine::general_purpose::STANDARD, Engine};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private, Public};
use openssl::sign::Signer;
use openssl::x509::X509;
use serde::{Deserialize, Serialize};

use crate::error::CredentialError;

/// A certificate and private key as PEM text, the form key material is
/// carried in before it becomes a usable credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PemKeyPair {
    pub certificate: String,
    pub private_key: String,
}

impl PemKeyPair {
    #[must_use]
    pub fn new(certificate: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            certificate: certificate.into(),
            private_key: private_key.into(),
        }
    }
}

/// Credential an issuer signs assertions and response envelopes with
#[derive(Debug, Clone)]
pub struct SigningCredential {
    certificate: X509,
    key: PKey<Private>,
}

impl SigningCredential {
    /// Parse a certificate and private key PEM pair.
    ///
    /// Fails with [`CredentialError::KeyMismatch`] when the certificate's
    /// public key does not belong to the private key.
    pub fn from_pem(certificate_pem: &str, private_key_pem: &str) -> Result<Self, CredentialError> {
        let certificate = X509::from_pem(certificate_pem.as_bytes())
            .map_err(CredentialError::InvalidCertificate)?;
        let key = PKey::private_key_from_pem(private_key_pem.as_bytes())
            .map_err(CredentialError::InvalidPrivateKey)?;
        let public = certificate.public_key()?;
        if !public.public_eq(&key) {
            return Err(CredentialError::KeyMismatch);
        }
        Ok(Self { certificate, key })
    }

    pub fn from_pair(pair: &PemKeyPair) -> Result<Self, CredentialError> {
        Self::from_pem(&pair.certificate, &pair.private_key)
    }

    /// Certificate as base64 DER, the form `ds:X509Certificate` carries
    pub fn certificate_base64_der(&self) -> Result<String, ErrorStack> {
        Ok(STANDARD.encode(self.certificate.to_der()?))
    }

    /// RSA-sign `data` under the given digest
    pub fn sign(&self, digest: MessageDigest, data: &[u8]) -> Result<Vec<u8>, ErrorStack> {
        let mut signer = Signer::new(digest, &self.key)?;
        signer.update(data)?;
        signer.sign_to_vec()
    }
}

/// Credential assertions are encrypted to, held by the hub.
///
/// Carries both halves of the pair: fixtures encrypt with the public key
/// and tests decrypt with the private one.
#[derive(Debug, Clone)]
pub struct EncryptionCredential {
    public_key: PKey<Public>,
    private_key: PKey<Private>,
}

impl EncryptionCredential {
    /// Parse a certificate and private key PEM pair, with the same
    /// pairing check as [`SigningCredential::from_pem`].
    pub fn from_pem(certificate_pem: &str, private_key_pem: &str) -> Result<Self, CredentialError> {
        let certificate = X509::from_pem(certificate_pem.as_bytes())
            .map_err(CredentialError::InvalidCertificate)?;
        let private_key = PKey::private_key_from_pem(private_key_pem.as_bytes())
            .map_err(CredentialError::InvalidPrivateKey)?;
        let public_key = certificate.public_key()?;
        if !public_key.public_eq(&private_key) {
            return Err(CredentialError::KeyMismatch);
        }
        Ok(Self {
            public_key,
            private_key,
        })
    }

    pub fn from_pair(pair: &PemKeyPair) -> Result<Self, CredentialError> {
        Self::from_pem(&pair.certificate, &pair.private_key)
    }

    pub(crate) fn public_key(&self) -> &PKey<Public> {
        &self.public_key
    }

    pub(crate) fn private_key(&self) -> &PKey<Private> {
        &self.private_key
    }
}
