//! Assertion assembly: emit, sign, then encrypt
//!
//! An assertion is always emitted with its children in schema order,
//! `Issuer`, `Subject`, `Conditions`, `AuthnStatement`,
//! `AttributeStatement`, with the enveloped signature spliced in after
//! the issuer. Every build mints a fresh document id and the signature
//! reference is bound to that id, never to one recycled from an earlier
//! build. Encryption is a separate step over the finished signed bytes,
//! so an assertion can also be inspected unencrypted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::algorithm::{DigestAlgorithm, EncryptionAlgorithm, SignatureAlgorithm};
use crate::attributes::AttributeStatement;
use crate::credentials::{EncryptionCredential, SigningCredential};
use crate::encryption;
use crate::error::{EncryptionError, SigningError};
use crate::model::{self, AuthnStatement, Conditions, Subject, BEARER_METHOD};
use crate::signing::XmlSigner;
use crate::xml::{escape, SAML_NS, XSI_NS, XS_NS};

/// Everything an assertion says, minus the key material that signs it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionConfig {
    pub issuer: String,
    pub subject: Subject,
    pub conditions: Option<Conditions>,
    pub authn_statement: Option<AuthnStatement>,
    pub attributes: AttributeStatement,
    pub issue_instant: DateTime<Utc>,
}

/// A signed assertion ready to encrypt or embed as-is
#[derive(Debug, Clone)]
pub struct SignedAssertion {
    id: String,
    xml: String,
}

impl SignedAssertion {
    /// Document id the signature reference is bound to
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Encrypt the signed bytes to the given credential
    pub fn encrypt(
        &self,
        credential: &EncryptionCredential,
        algorithm: EncryptionAlgorithm,
    ) -> Result<EncryptedAssertion, EncryptionError> {
        encryption::encrypt_assertion(&self.xml, credential, algorithm)
            .map(|xml| EncryptedAssertion { xml })
    }
}

/// A `saml:EncryptedAssertion` document
#[derive(Debug, Clone)]
pub struct EncryptedAssertion {
    xml: String,
}

impl EncryptedAssertion {
    #[must_use]
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Recover the signed assertion inside, for inspection in tests
    pub fn decrypt(&self, credential: &EncryptionCredential) -> Result<String, EncryptionError> {
        encryption::decrypt_assertion(&self.xml, credential)
    }
}

/// Emit and sign an assertion under a fresh document id
pub fn build_signed_assertion(
    config: &AssertionConfig,
    credential: &SigningCredential,
    signature_algorithm: SignatureAlgorithm,
    digest_algorithm: DigestAlgorithm,
) -> Result<SignedAssertion, SigningError> {
    let id = format!("_assert_{}", Uuid::new_v4());

    let mut out = String::with_capacity(2048);
    out.push_str(&format!(
        r#"<saml:Assertion xmlns:saml="{SAML_NS}" ID="{id}" Version="2.0" IssueInstant="{}">"#,
        model::format_instant(config.issue_instant),
    ));
    out.push_str(&format!(
        "<saml:Issuer>{}</saml:Issuer>",
        escape(&config.issuer)
    ));
    write_subject(&mut out, &config.subject);
    if let Some(conditions) = &config.conditions {
        write_conditions(&mut out, conditions);
    }
    if let Some(statement) = &config.authn_statement {
        write_authn_statement(&mut out, statement);
    }
    write_attribute_statement(&mut out, &config.attributes);
    out.push_str("</saml:Assertion>");

    let signer = XmlSigner::new(credential, signature_algorithm, digest_algorithm);
    let xml = signer.sign_enveloped(&out, &id)?;

    tracing::debug!(assertion_id = %id, issuer = %config.issuer, "built signed assertion");
    Ok(SignedAssertion { id, xml })
}

fn write_subject(out: &mut String, subject: &Subject) {
    out.push_str("<saml:Subject>");
    if let Some(name_id) = &subject.name_id {
        out.push_str(&format!(
            r#"<saml:NameID Format="{}">{}</saml:NameID>"#,
            escape(&name_id.format),
            escape(&name_id.value),
        ));
    }
    out.push_str(&format!(r#"<saml:SubjectConfirmation Method="{BEARER_METHOD}">"#));
    out.push_str("<saml:SubjectConfirmationData");
    if let Some(in_response_to) = &subject.confirmation.in_response_to {
        out.push_str(&format!(r#" InResponseTo="{}""#, escape(in_response_to)));
    }
    if let Some(recipient) = &subject.confirmation.recipient {
        out.push_str(&format!(r#" Recipient="{}""#, escape(recipient)));
    }
    out.push_str(&format!(
        r#" NotOnOrAfter="{}"/>"#,
        model::format_instant(subject.confirmation.not_on_or_after),
    ));
    out.push_str("</saml:SubjectConfirmation></saml:Subject>");
}

fn write_conditions(out: &mut String, conditions: &Conditions) {
    out.push_str(&format!(
        r#"<saml:Conditions NotBefore="{}" NotOnOrAfter="{}">"#,
        model::format_instant(conditions.not_before),
        model::format_instant(conditions.not_on_or_after),
    ));
    if !conditions.audiences.is_empty() {
        out.push_str("<saml:AudienceRestriction>");
        for audience in &conditions.audiences {
            out.push_str(&format!(
                "<saml:Audience>{}</saml:Audience>",
                escape(audience)
            ));
        }
        out.push_str("</saml:AudienceRestriction>");
    }
    out.push_str("</saml:Conditions>");
}

fn write_authn_statement(out: &mut String, statement: &AuthnStatement) {
    out.push_str(&format!(
        r#"<saml:AuthnStatement AuthnInstant="{}">"#,
        model::format_instant(statement.authn_instant),
    ));
    out.push_str(&format!(
        "<saml:AuthnContext><saml:AuthnContextClassRef>{}</saml:AuthnContextClassRef></saml:AuthnContext>",
        escape(&statement.class_ref),
    ));
    out.push_str("</saml:AuthnStatement>");
}

fn write_attribute_statement(out: &mut String, statement: &AttributeStatement) {
    out.push_str("<saml:AttributeStatement>");
    for attribute in &statement.attributes {
        out.push_str(&format!(r#"<saml:Attribute Name="{}""#, escape(&attribute.name)));
        if let Some(friendly) = &attribute.friendly_name {
            out.push_str(&format!(r#" FriendlyName="{}""#, escape(friendly)));
        }
        if let Some(format) = &attribute.format {
            out.push_str(&format!(r#" NameFormat="{}""#, escape(format)));
        }
        out.push('>');
        for value in &attribute.values {
            out.push_str(&format!(
                r#"<saml:AttributeValue xmlns:xs="{XS_NS}" xmlns:xsi="{XSI_NS}" xsi:type="xs:string">{}</saml:AttributeValue>"#,
                escape(value),
            ));
        }
        out.push_str("</saml:Attribute>");
    }
    out.push_str("</saml:AttributeStatement>");
}
