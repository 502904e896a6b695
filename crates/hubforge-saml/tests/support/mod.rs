//! Shared helpers for response fixture tests
//!
//! Provides a pull parser that flattens a response or assertion document
//! into the fields tests assert on, decryption against the built-in hub
//! key, and independent re-verification of enveloped signatures.

#![allow(dead_code)]

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use openssl::sign::Verifier;
use openssl::x509::X509;
use quick_xml::events::Event;
use quick_xml::Reader;

use hubforge_saml::response::AuthnResponse;
use hubforge_saml::xml::{extract_element, remove_element};
use hubforge_saml::{DigestAlgorithm, EncryptionCredential, SignatureAlgorithm};

/// Flattened view of a response or assertion document
#[derive(Debug, Default, Clone)]
pub struct ParsedDocument {
    pub response_id: Option<String>,
    pub destination: Option<String>,
    pub in_response_to: Option<String>,
    pub issue_instant: Option<String>,
    pub status_code: Option<String>,
    pub issuers: Vec<String>,
    pub assertion_ids: Vec<String>,
    pub encrypted_assertion_count: usize,
    pub name_id: Option<String>,
    pub name_id_format: Option<String>,
    pub confirmation_method: Option<String>,
    pub confirmation_in_response_to: Option<String>,
    pub confirmation_recipient: Option<String>,
    pub confirmation_not_on_or_after: Option<String>,
    pub not_before: Option<String>,
    pub not_on_or_after: Option<String>,
    pub audiences: Vec<String>,
    pub authn_instant: Option<String>,
    pub authn_context_class_refs: Vec<String>,
    pub attribute_order: Vec<String>,
    pub attributes: HashMap<String, Vec<String>>,
    pub signature_count: usize,
    pub signature_algorithms: Vec<String>,
    pub digest_algorithms: Vec<String>,
    pub reference_uris: Vec<String>,
}

/// Parse a document into its flattened view
pub fn parse_document(xml: &str) -> Result<ParsedDocument, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut parsed = ParsedDocument::default();
    let mut current_element = String::new();
    let mut current_attribute_name: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                current_element = name.clone();

                match name.as_str() {
                    "Response" => {
                        for attr in e.attributes().flatten() {
                            let key =
                                String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
                            let value = String::from_utf8_lossy(&attr.value).to_string();
                            match key.as_str() {
                                "ID" => parsed.response_id = Some(value),
                                "Destination" => parsed.destination = Some(value),
                                "IssueInstant" => parsed.issue_instant = Some(value),
                                "InResponseTo" => parsed.in_response_to = Some(value),
                                _ => {}
                            }
                        }
                    }
                    "Assertion" => {
                        for attr in e.attributes().flatten() {
                            let key =
                                String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
                            if key == "ID" {
                                parsed
                                    .assertion_ids
                                    .push(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                    }
                    "EncryptedAssertion" => {
                        parsed.encrypted_assertion_count += 1;
                    }
                    "StatusCode" => {
                        for attr in e.attributes().flatten() {
                            let key =
                                String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
                            if key == "Value" {
                                parsed.status_code =
                                    Some(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                    }
                    "NameID" => {
                        for attr in e.attributes().flatten() {
                            let key =
                                String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
                            if key == "Format" {
                                parsed.name_id_format =
                                    Some(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                    }
                    "SubjectConfirmation" => {
                        for attr in e.attributes().flatten() {
                            let key =
                                String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
                            if key == "Method" {
                                parsed.confirmation_method =
                                    Some(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                    }
                    "SubjectConfirmationData" => {
                        for attr in e.attributes().flatten() {
                            let key =
                                String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
                            let value = String::from_utf8_lossy(&attr.value).to_string();
                            match key.as_str() {
                                "InResponseTo" => parsed.confirmation_in_response_to = Some(value),
                                "Recipient" => parsed.confirmation_recipient = Some(value),
                                "NotOnOrAfter" => {
                                    parsed.confirmation_not_on_or_after = Some(value);
                                }
                                _ => {}
                            }
                        }
                    }
                    "Conditions" => {
                        for attr in e.attributes().flatten() {
                            let key =
                                String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
                            let value = String::from_utf8_lossy(&attr.value).to_string();
                            match key.as_str() {
                                "NotBefore" => parsed.not_before = Some(value),
                                "NotOnOrAfter" => parsed.not_on_or_after = Some(value),
                                _ => {}
                            }
                        }
                    }
                    "AuthnStatement" => {
                        for attr in e.attributes().flatten() {
                            let key =
                                String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
                            if key == "AuthnInstant" {
                                parsed.authn_instant =
                                    Some(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                    }
                    "Attribute" => {
                        for attr in e.attributes().flatten() {
                            let key =
                                String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
                            if key == "Name" {
                                let value = String::from_utf8_lossy(&attr.value).to_string();
                                parsed.attribute_order.push(value.clone());
                                current_attribute_name = Some(value);
                            }
                        }
                    }
                    "Signature" => {
                        parsed.signature_count += 1;
                    }
                    "SignatureMethod" => {
                        for attr in e.attributes().flatten() {
                            let key =
                                String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
                            if key == "Algorithm" {
                                parsed
                                    .signature_algorithms
                                    .push(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                    }
                    "DigestMethod" => {
                        for attr in e.attributes().flatten() {
                            let key =
                                String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
                            if key == "Algorithm" {
                                parsed
                                    .digest_algorithms
                                    .push(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                    }
                    "Reference" => {
                        for attr in e.attributes().flatten() {
                            let key =
                                String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
                            if key == "URI" {
                                parsed
                                    .reference_uris
                                    .push(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current_element.as_str() {
                    "Issuer" => parsed.issuers.push(text),
                    "NameID" => parsed.name_id = Some(text),
                    "Audience" => parsed.audiences.push(text),
                    "AuthnContextClassRef" => parsed.authn_context_class_refs.push(text),
                    "AttributeValue" => {
                        if let Some(ref attr_name) = current_attribute_name {
                            parsed
                                .attributes
                                .entry(attr_name.clone())
                                .or_default()
                                .push(text);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "Attribute" {
                    current_attribute_name = None;
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse error: {e}")),
            _ => {}
        }
    }

    Ok(parsed)
}

/// The hub-side decryption credential the built-in store encrypts to
pub fn hub_credential() -> EncryptionCredential {
    EncryptionCredential::from_pem(
        hubforge_saml::test_keys::HUB_ENCRYPTION_CERT,
        hubforge_saml::test_keys::HUB_ENCRYPTION_KEY,
    )
    .expect("built-in hub pair must parse")
}

/// Decrypt every assertion in a response with the built-in hub key
pub fn decrypt_assertions(response: &AuthnResponse) -> Vec<String> {
    let credential = hub_credential();
    response
        .encrypted_assertions()
        .iter()
        .map(|encrypted| encrypted.decrypt(&credential).expect("assertion decrypts"))
        .collect()
}

/// Re-verify an enveloped signature from scratch: recompute the digest
/// over the document minus its signature, check it against the stored
/// `DigestValue`, check the reference points at the document's own id,
/// and verify the RSA signature over `SignedInfo` with the given
/// certificate.
pub fn verify_enveloped_signature(signed_xml: &str, certificate_pem: &str) -> Result<(), String> {
    let signature = extract_element(signed_xml, "ds:Signature").ok_or("no ds:Signature")?;
    let signed_info = extract_element(signature, "ds:SignedInfo").ok_or("no ds:SignedInfo")?;

    let reference_uri = attribute_value(signed_info, "Reference", "URI")
        .ok_or("no Reference URI in SignedInfo")?;
    let document_id = root_id(signed_xml).ok_or("document has no ID attribute")?;
    if reference_uri != format!("#{document_id}") {
        return Err(format!(
            "reference {reference_uri} does not point at document id {document_id}"
        ));
    }

    let digest_uri = attribute_value(signed_info, "DigestMethod", "Algorithm")
        .ok_or("no DigestMethod in SignedInfo")?;
    let digest_algorithm =
        DigestAlgorithm::from_uri(&digest_uri).ok_or("unknown digest algorithm")?;
    let stored_digest = element_text(signed_info, "ds:DigestValue").ok_or("no DigestValue")?;

    let without_signature =
        remove_element(signed_xml, "ds:Signature").ok_or("cannot strip signature")?;
    let recomputed = openssl::hash::hash(
        digest_algorithm.message_digest(),
        without_signature.as_bytes(),
    )
    .map_err(|e| e.to_string())?;
    if STANDARD.encode(recomputed) != stored_digest {
        return Err("digest mismatch: signed bytes were altered".to_string());
    }

    let signature_uri = attribute_value(signed_info, "SignatureMethod", "Algorithm")
        .ok_or("no SignatureMethod in SignedInfo")?;
    let signature_algorithm =
        SignatureAlgorithm::from_uri(&signature_uri).ok_or("unknown signature algorithm")?;
    let signature_b64 = element_text(signature, "ds:SignatureValue").ok_or("no SignatureValue")?;
    let signature_bytes = STANDARD
        .decode(signature_b64.trim())
        .map_err(|e| e.to_string())?;

    let certificate = X509::from_pem(certificate_pem.as_bytes()).map_err(|e| e.to_string())?;
    let public_key = certificate.public_key().map_err(|e| e.to_string())?;
    let mut verifier = Verifier::new(signature_algorithm.message_digest(), &public_key)
        .map_err(|e| e.to_string())?;
    verifier
        .update(signed_info.as_bytes())
        .map_err(|e| e.to_string())?;
    let valid = verifier.verify(&signature_bytes).map_err(|e| e.to_string())?;
    if !valid {
        return Err("RSA signature does not verify".to_string());
    }
    Ok(())
}

/// ID attribute of the document's root element
fn root_id(xml: &str) -> Option<String> {
    let root_tag_end = xml.find('>')?;
    attribute_in_fragment(&xml[..root_tag_end], "ID")
}

fn attribute_value(fragment: &str, element: &str, attribute: &str) -> Option<String> {
    let at = fragment.find(&format!("<ds:{element}"))?;
    let rest = &fragment[at..];
    let tag_end = rest.find('>')?;
    attribute_in_fragment(&rest[..tag_end], attribute)
}

fn attribute_in_fragment(fragment: &str, attribute: &str) -> Option<String> {
    let marker = format!("{attribute}=\"");
    let start = fragment.find(&marker)? + marker.len();
    let end = fragment[start..].find('"')?;
    Some(fragment[start..start + end].to_string())
}

fn element_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)?;
    Some(xml[start..start + end].to_string())
}
