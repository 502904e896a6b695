//! Enveloped XML signatures over emitted documents
//!
//! Signing happens on the exact bytes of the unsigned element as this
//! crate emits it, which is already in canonical form. The digest covers
//! the whole element, the `SignedInfo` referencing that digest is then
//! RSA-signed, and the finished `ds:Signature` is spliced in directly
//! after the element's `Issuer` child as SAML requires. Because the
//! splice never reformats anything, stripping the signature back out
//! recovers the digested bytes exactly.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::algorithm::{DigestAlgorithm, SignatureAlgorithm};
use crate::credentials::SigningCredential;
use crate::error::SigningError;
use crate::xml::{self, DSIG_NS, ENVELOPED_SIGNATURE_URI, EXC_C14N_URI};

/// Signs elements with one credential and algorithm choice
pub struct XmlSigner<'a> {
    credential: &'a SigningCredential,
    signature_algorithm: SignatureAlgorithm,
    digest_algorithm: DigestAlgorithm,
}

impl<'a> XmlSigner<'a> {
    #[must_use]
    pub fn new(
        credential: &'a SigningCredential,
        signature_algorithm: SignatureAlgorithm,
        digest_algorithm: DigestAlgorithm,
    ) -> Self {
        Self {
            credential,
            signature_algorithm,
            digest_algorithm,
        }
    }

    /// Produce the signed form of `element`, whose `ID` attribute must
    /// be `reference_id`.
    ///
    /// The signature is bound to that id through the `ds:Reference` URI,
    /// so a document quoting a stale id cannot be signed by accident.
    pub fn sign_enveloped(&self, element: &str, reference_id: &str) -> Result<String, SigningError> {
        let id_attr = format!("ID=\"{reference_id}\"");
        if !element.contains(&id_attr) {
            return Err(SigningError::ReferenceNotFound(reference_id.to_string()));
        }

        let digest =
            openssl::hash::hash(self.digest_algorithm.message_digest(), element.as_bytes())?;
        let signed_info = build_signed_info(
            reference_id,
            &STANDARD.encode(digest),
            self.signature_algorithm,
            self.digest_algorithm,
        );

        let signature_value = self
            .credential
            .sign(self.signature_algorithm.message_digest(), signed_info.as_bytes())?;
        let certificate = self.credential.certificate_base64_der()?;

        let signature = format!(
            "<ds:Signature xmlns:ds=\"{DSIG_NS}\">{signed_info}\
             <ds:SignatureValue>{}</ds:SignatureValue>\
             <ds:KeyInfo><ds:X509Data><ds:X509Certificate>{certificate}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>\
             </ds:Signature>",
            STANDARD.encode(signature_value),
        );

        let insert_at =
            xml::after_first(element, "</saml:Issuer>").ok_or(SigningError::MissingIssuer)?;

        tracing::debug!(
            reference_id,
            algorithm = %self.signature_algorithm,
            "signed element"
        );

        let mut signed = String::with_capacity(element.len() + signature.len());
        signed.push_str(&element[..insert_at]);
        signed.push_str(&signature);
        signed.push_str(&element[insert_at..]);
        Ok(signed)
    }
}

fn build_signed_info(
    reference_id: &str,
    digest_b64: &str,
    signature_algorithm: SignatureAlgorithm,
    digest_algorithm: DigestAlgorithm,
) -> String {
    format!(
        "<ds:SignedInfo>\
         <ds:CanonicalizationMethod Algorithm=\"{EXC_C14N_URI}\"/>\
         <ds:SignatureMethod Algorithm=\"{}\"/>\
         <ds:Reference URI=\"#{reference_id}\">\
         <ds:Transforms>\
         <ds:Transform Algorithm=\"{ENVELOPED_SIGNATURE_URI}\"/>\
         <ds:Transform Algorithm=\"{EXC_C14N_URI}\"/>\
         </ds:Transforms>\
         <ds:DigestMethod Algorithm=\"{}\"/>\
         <ds:DigestValue>{digest_b64}</ds:DigestValue>\
         </ds:Reference>\
         </ds:SignedInfo>",
        signature_algorithm.uri(),
        digest_algorithm.uri(),
    )
}
