//! Response assembly for the two shapes the hub consumes
//!
//! Domestic IdP responses carry two encrypted assertions, the matching
//! dataset first and the authentication context second, each signed
//! before encryption. Country responses carry a single assertion with a
//! persistent `NameID`, an audience restriction, and a recipient on the
//! bearer confirmation. In both shapes the envelope is signed last, after
//! the encrypted assertions are in place, so its digest covers them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::algorithm::{DigestAlgorithm, EncryptionAlgorithm, SignatureAlgorithm};
use crate::assertion::{build_signed_assertion, AssertionConfig, EncryptedAssertion};
use crate::attributes::{self, AttributeStatement};
use crate::credentials::{EncryptionCredential, PemKeyPair, SigningCredential};
use crate::error::{CredentialError, Error};
use crate::model::{
    self, AuthnStatement, Conditions, NameId, Subject, SubjectConfirmation,
    AUTHN_CONTEXT_PASSWORD_PROTECTED_TRANSPORT, EIDAS_LOA_SUBSTANTIAL, STATUS_SUCCESS,
};
use crate::serialize::{Base64Encoder, ResponseEncoder};
use crate::signing::XmlSigner;
use crate::test_keys::{
    TestKeyStore, HUB_EIDAS_RESPONSE_ENDPOINT, HUB_ENTITY_ID, HUB_RESPONSE_ENDPOINT,
    STUB_COUNTRY_ONE, STUB_IDP_ONE,
};
use crate::xml::{escape, SAMLP_NS, SAML_NS};

/// Request id stamped into responses when the caller does not supply the
/// one their scenario is answering.
pub const DEFAULT_REQUEST_ID: &str = "a-request";

/// Persistent id country assertions carry unless overridden
pub const DEFAULT_PERSISTENT_ID: &str = "UK/GB/12345";

/// Settings for a domestic IdP response. Every field has a working
/// default, so a scenario only overrides what it is actually about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdpResponseConfig {
    pub request_id: String,
    pub issuer: String,
    pub destination: String,
    /// Signing pair to use instead of the store's entry for `issuer`
    pub keys: Option<PemKeyPair>,
    pub signature_algorithm: SignatureAlgorithm,
    pub digest_algorithm: DigestAlgorithm,
    pub encryption_algorithm: EncryptionAlgorithm,
}

impl Default for IdpResponseConfig {
    fn default() -> Self {
        Self {
            request_id: DEFAULT_REQUEST_ID.to_string(),
            issuer: STUB_IDP_ONE.to_string(),
            destination: HUB_RESPONSE_ENDPOINT.to_string(),
            keys: None,
            signature_algorithm: SignatureAlgorithm::default(),
            digest_algorithm: DigestAlgorithm::default(),
            encryption_algorithm: EncryptionAlgorithm::default(),
        }
    }
}

/// Settings for an eIDAS country proxy response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryResponseConfig {
    pub request_id: String,
    pub issuer: String,
    pub destination: String,
    /// Audience the assertion's conditions are restricted to
    pub audience: String,
    /// Recipient stamped on the bearer confirmation
    pub recipient: String,
    /// Authentication context class the caller's journey asserted
    pub authn_context: String,
    pub persistent_id: String,
    /// Signing pair to use instead of the store's entry for `issuer`
    pub keys: Option<PemKeyPair>,
    pub signature_algorithm: SignatureAlgorithm,
    pub digest_algorithm: DigestAlgorithm,
    pub encryption_algorithm: EncryptionAlgorithm,
}

impl Default for CountryResponseConfig {
    fn default() -> Self {
        Self {
            request_id: DEFAULT_REQUEST_ID.to_string(),
            issuer: STUB_COUNTRY_ONE.to_string(),
            destination: HUB_EIDAS_RESPONSE_ENDPOINT.to_string(),
            audience: HUB_ENTITY_ID.to_string(),
            recipient: HUB_EIDAS_RESPONSE_ENDPOINT.to_string(),
            authn_context: EIDAS_LOA_SUBSTANTIAL.to_string(),
            persistent_id: DEFAULT_PERSISTENT_ID.to_string(),
            keys: None,
            signature_algorithm: SignatureAlgorithm::default(),
            digest_algorithm: DigestAlgorithm::default(),
            encryption_algorithm: EncryptionAlgorithm::default(),
        }
    }
}

/// A finished, signed response with the assertions that went into it
#[derive(Debug, Clone)]
pub struct AuthnResponse {
    id: String,
    issuer: String,
    in_response_to: String,
    destination: String,
    encrypted_assertions: Vec<EncryptedAssertion>,
    xml: String,
}

impl AuthnResponse {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn in_response_to(&self) -> &str {
        &self.in_response_to
    }

    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// The encrypted assertions in envelope order
    #[must_use]
    pub fn encrypted_assertions(&self) -> &[EncryptedAssertion] {
        &self.encrypted_assertions
    }

    /// The signed response document
    #[must_use]
    pub fn xml(&self) -> &str {
        &self.xml
    }
}

/// Builds responses from a key store and a transport encoding.
///
/// The store is handed over at construction, so which keys sign what is
/// explicit in the test setup rather than hidden behind a global. Fresh
/// credentials are derived from PEM on every build; nothing is cached
/// between calls.
pub struct ResponseFactory<E = Base64Encoder> {
    keys: TestKeyStore,
    encoder: E,
}

impl ResponseFactory<Base64Encoder> {
    #[must_use]
    pub fn new(keys: TestKeyStore) -> Self {
        Self {
            keys,
            encoder: Base64Encoder,
        }
    }
}

impl Default for ResponseFactory<Base64Encoder> {
    fn default() -> Self {
        Self::new(TestKeyStore::builtin())
    }
}

impl<E: ResponseEncoder> ResponseFactory<E> {
    #[must_use]
    pub fn with_encoder(keys: TestKeyStore, encoder: E) -> Self {
        Self { keys, encoder }
    }

    /// Two-assertion response as a domestic IdP would return it
    pub fn response_from_idp(&self, config: &IdpResponseConfig) -> Result<AuthnResponse, Error> {
        let now = Utc::now();
        let signing = self.signing_credential(&config.issuer, config.keys.as_ref())?;
        let encrypting = self.hub_encryption_credential()?;

        let matching_dataset = build_signed_assertion(
            &AssertionConfig {
                issuer: config.issuer.clone(),
                subject: Subject {
                    name_id: None,
                    confirmation: SubjectConfirmation::bearer(config.request_id.as_str(), now),
                },
                conditions: None,
                authn_statement: None,
                attributes: attributes::matching_dataset_statement(),
                issue_instant: now,
            },
            &signing,
            config.signature_algorithm,
            config.digest_algorithm,
        )?;

        let authn = build_signed_assertion(
            &AssertionConfig {
                issuer: config.issuer.clone(),
                subject: Subject {
                    name_id: None,
                    confirmation: SubjectConfirmation::bearer(config.request_id.as_str(), now),
                },
                conditions: None,
                authn_statement: Some(AuthnStatement::new(
                    AUTHN_CONTEXT_PASSWORD_PROTECTED_TRANSPORT,
                    now,
                )),
                attributes: attributes::ip_address_statement(),
                issue_instant: now,
            },
            &signing,
            config.signature_algorithm,
            config.digest_algorithm,
        )?;

        // Matching dataset rides first, authn context second.
        let encrypted = vec![
            matching_dataset.encrypt(&encrypting, config.encryption_algorithm)?,
            authn.encrypt(&encrypting, config.encryption_algorithm)?,
        ];

        let response = self.assemble(
            now,
            &config.issuer,
            &config.request_id,
            &config.destination,
            encrypted,
            &signing,
            config.signature_algorithm,
            config.digest_algorithm,
        )?;
        tracing::info!(
            response_id = %response.id,
            issuer = %config.issuer,
            "built domestic idp response"
        );
        Ok(response)
    }

    /// Single-assertion response as an eIDAS country proxy would return it
    pub fn response_from_country(
        &self,
        config: &CountryResponseConfig,
    ) -> Result<AuthnResponse, Error> {
        let now = Utc::now();
        let signing = self.signing_credential(&config.issuer, config.keys.as_ref())?;
        let encrypting = self.hub_encryption_credential()?;

        let mut confirmation = SubjectConfirmation::bearer(config.request_id.as_str(), now);
        confirmation.recipient = Some(config.recipient.clone());

        let assertion = build_signed_assertion(
            &AssertionConfig {
                issuer: config.issuer.clone(),
                subject: Subject {
                    name_id: Some(NameId::persistent(config.persistent_id.as_str())),
                    confirmation,
                },
                conditions: Some(Conditions::for_audience(config.audience.as_str(), now)),
                authn_statement: Some(AuthnStatement::new(config.authn_context.as_str(), now)),
                attributes: eidas_attribute_statement(&config.persistent_id),
                issue_instant: now,
            },
            &signing,
            config.signature_algorithm,
            config.digest_algorithm,
        )?;

        let encrypted = vec![assertion.encrypt(&encrypting, config.encryption_algorithm)?];
        let response = self.assemble(
            now,
            &config.issuer,
            &config.request_id,
            &config.destination,
            encrypted,
            &signing,
            config.signature_algorithm,
            config.digest_algorithm,
        )?;
        tracing::info!(
            response_id = %response.id,
            issuer = %config.issuer,
            "built country response"
        );
        Ok(response)
    }

    /// [`Self::response_from_idp`] followed by the transport encoding
    pub fn encoded_response_from_idp(&self, config: &IdpResponseConfig) -> Result<String, Error> {
        Ok(self.encoder.encode(self.response_from_idp(config)?.xml()))
    }

    /// [`Self::response_from_country`] followed by the transport encoding
    pub fn encoded_response_from_country(
        &self,
        config: &CountryResponseConfig,
    ) -> Result<String, Error> {
        Ok(self.encoder.encode(self.response_from_country(config)?.xml()))
    }

    fn signing_credential(
        &self,
        issuer: &str,
        explicit: Option<&PemKeyPair>,
    ) -> Result<SigningCredential, CredentialError> {
        let pair = match explicit {
            Some(pair) => pair,
            None => self
                .keys
                .signing_pair(issuer)
                .ok_or_else(|| CredentialError::UnknownEntity(issuer.to_string()))?,
        };
        SigningCredential::from_pair(pair)
    }

    fn hub_encryption_credential(&self) -> Result<EncryptionCredential, CredentialError> {
        EncryptionCredential::from_pair(self.keys.hub_encryption_pair())
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        now: DateTime<Utc>,
        issuer: &str,
        request_id: &str,
        destination: &str,
        encrypted_assertions: Vec<EncryptedAssertion>,
        signing: &SigningCredential,
        signature_algorithm: SignatureAlgorithm,
        digest_algorithm: DigestAlgorithm,
    ) -> Result<AuthnResponse, Error> {
        let id = format!("_resp_{}", Uuid::new_v4());

        let mut out = String::with_capacity(8192);
        out.push_str(&format!(
            r#"<samlp:Response xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" ID="{id}" Version="2.0" IssueInstant="{}" Destination="{}" InResponseTo="{}">"#,
            model::format_instant(now),
            escape(destination),
            escape(request_id),
        ));
        out.push_str(&format!("<saml:Issuer>{}</saml:Issuer>", escape(issuer)));
        out.push_str(&format!(
            r#"<samlp:Status><samlp:StatusCode Value="{STATUS_SUCCESS}"/></samlp:Status>"#
        ));
        for encrypted in &encrypted_assertions {
            out.push_str(encrypted.xml());
        }
        out.push_str("</samlp:Response>");

        let signer = XmlSigner::new(signing, signature_algorithm, digest_algorithm);
        let xml = signer.sign_enveloped(&out, &id)?;
        tracing::debug!(
            response_id = %id,
            assertions = encrypted_assertions.len(),
            "signed response envelope"
        );

        Ok(AuthnResponse {
            id,
            issuer: issuer.to_string(),
            in_response_to: request_id.to_string(),
            destination: destination.to_string(),
            encrypted_assertions,
            xml,
        })
    }
}

fn eidas_attribute_statement(person_identifier: &str) -> AttributeStatement {
    AttributeStatement::new(vec![
        attributes::first_name("Silvia"),
        attributes::family_name("Moreno"),
        attributes::date_of_birth("1982-05-17"),
        attributes::person_identifier(person_identifier),
        attributes::current_address("4 Calle Mayor, 28013 Madrid, ES"),
        attributes::gender("Female"),
    ])
}
