//! Assertion encryption to the hub's key
//!
//! A fresh session key encrypts the signed assertion bytes, and the
//! session key itself travels RSA-OAEP-wrapped inside an
//! `xenc:EncryptedKey`. The payload `CipherValue` carries IV and
//! ciphertext concatenated, with the 16-byte tag appended for GCM modes,
//! matching how XML-Enc consumers expect the octets laid out.
//!
//! Decryption exists so tests can open the fixtures they produce. It is
//! not a general XML-Enc consumer and only accepts the layout emitted
//! here.

use base64::{engine::general_purpose::STANDARD, Engine};
use openssl::rand::rand_bytes;
use openssl::rsa::Padding;
use openssl::symm;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::algorithm::{EncryptionAlgorithm, KEY_TRANSPORT_RSA_OAEP};
use crate::credentials::EncryptionCredential;
use crate::error::EncryptionError;
use crate::xml::{DSIG_NS, SAML_NS, XMLENC_NS};

// OAEP with SHA-1 spends 2 digest lengths plus 2 bytes of each RSA block.
const OAEP_OVERHEAD_BYTES: usize = 42;

const GCM_TAG_BYTES: usize = 16;

/// Wrap a signed assertion in a `saml:EncryptedAssertion` addressed to
/// the given credential.
///
/// Fails with [`EncryptionError::KeyTooLargeForWrap`] before touching any
/// plaintext when the session key cannot fit an OAEP block under the
/// recipient's RSA modulus.
pub fn encrypt_assertion(
    assertion_xml: &str,
    credential: &EncryptionCredential,
    algorithm: EncryptionAlgorithm,
) -> Result<String, EncryptionError> {
    let rsa = credential.public_key().rsa()?;
    let modulus_len = rsa.size() as usize;
    if algorithm.key_len() + OAEP_OVERHEAD_BYTES > modulus_len {
        return Err(EncryptionError::KeyTooLargeForWrap {
            algorithm,
            modulus_bits: modulus_len * 8,
        });
    }

    let mut session_key = vec![0u8; algorithm.key_len()];
    rand_bytes(&mut session_key)?;
    let mut iv = vec![0u8; algorithm.iv_len()];
    rand_bytes(&mut iv)?;

    let mut payload = iv.clone();
    if algorithm.is_gcm() {
        let mut tag = [0u8; GCM_TAG_BYTES];
        let ciphertext = symm::encrypt_aead(
            algorithm.cipher(),
            &session_key,
            Some(&iv),
            &[],
            assertion_xml.as_bytes(),
            &mut tag,
        )?;
        payload.extend_from_slice(&ciphertext);
        payload.extend_from_slice(&tag);
    } else {
        let ciphertext = symm::encrypt(
            algorithm.cipher(),
            &session_key,
            Some(&iv),
            assertion_xml.as_bytes(),
        )?;
        payload.extend_from_slice(&ciphertext);
    }

    let mut wrapped_key = vec![0u8; modulus_len];
    let wrapped_len = rsa.public_encrypt(&session_key, &mut wrapped_key, Padding::PKCS1_OAEP)?;
    wrapped_key.truncate(wrapped_len);

    tracing::debug!(%algorithm, plaintext_len = assertion_xml.len(), "encrypted assertion");

    Ok(format!(
        "<saml:EncryptedAssertion xmlns:saml=\"{SAML_NS}\">\
         <xenc:EncryptedData xmlns:xenc=\"{XMLENC_NS}\" Type=\"{XMLENC_NS}Element\">\
         <xenc:EncryptionMethod Algorithm=\"{}\"/>\
         <ds:KeyInfo xmlns:ds=\"{DSIG_NS}\">\
         <xenc:EncryptedKey>\
         <xenc:EncryptionMethod Algorithm=\"{KEY_TRANSPORT_RSA_OAEP}\"/>\
         <xenc:CipherData><xenc:CipherValue>{}</xenc:CipherValue></xenc:CipherData>\
         </xenc:EncryptedKey>\
         </ds:KeyInfo>\
         <xenc:CipherData><xenc:CipherValue>{}</xenc:CipherValue></xenc:CipherData>\
         </xenc:EncryptedData>\
         </saml:EncryptedAssertion>",
        algorithm.uri(),
        STANDARD.encode(&wrapped_key),
        STANDARD.encode(&payload),
    ))
}

/// Open an `EncryptedAssertion` produced by [`encrypt_assertion`] and
/// return the signed assertion document inside it.
pub fn decrypt_assertion(
    encrypted_xml: &str,
    credential: &EncryptionCredential,
) -> Result<String, EncryptionError> {
    let parts = parse_encrypted(encrypted_xml)?;
    let algorithm = EncryptionAlgorithm::from_uri(&parts.data_algorithm)
        .ok_or_else(|| EncryptionError::UnsupportedAlgorithm(parts.data_algorithm.clone()))?;

    let wrapped_key = STANDARD.decode(parts.key_cipher_value)?;
    let payload = STANDARD.decode(parts.data_cipher_value)?;

    let rsa = credential.private_key().rsa()?;
    let mut session_key = vec![0u8; rsa.size() as usize];
    let key_len = rsa.private_decrypt(&wrapped_key, &mut session_key, Padding::PKCS1_OAEP)?;
    session_key.truncate(key_len);
    if session_key.len() != algorithm.key_len() {
        return Err(EncryptionError::MalformedDocument(format!(
            "session key is {} bytes, {algorithm} needs {}",
            session_key.len(),
            algorithm.key_len(),
        )));
    }

    let iv_len = algorithm.iv_len();
    let min_len = if algorithm.is_gcm() { iv_len + GCM_TAG_BYTES } else { iv_len };
    if payload.len() < min_len {
        return Err(EncryptionError::MalformedDocument(
            "CipherValue shorter than IV and tag".to_string(),
        ));
    }

    let plaintext = if algorithm.is_gcm() {
        let (iv, rest) = payload.split_at(iv_len);
        let (ciphertext, tag) = rest.split_at(rest.len() - GCM_TAG_BYTES);
        symm::decrypt_aead(algorithm.cipher(), &session_key, Some(iv), &[], ciphertext, tag)?
    } else {
        let (iv, ciphertext) = payload.split_at(iv_len);
        symm::decrypt(algorithm.cipher(), &session_key, Some(iv), ciphertext)?
    };

    Ok(String::from_utf8(plaintext)?)
}

struct EncryptedParts {
    data_algorithm: String,
    key_cipher_value: String,
    data_cipher_value: String,
}

fn parse_encrypted(xml: &str) -> Result<EncryptedParts, EncryptionError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut data_algorithm: Option<String> = None;
    let mut key_cipher_value: Option<String> = None;
    let mut data_cipher_value: Option<String> = None;
    let mut in_encrypted_key = false;
    let mut in_cipher_value = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                match e.local_name().as_ref() {
                    b"EncryptedKey" => in_encrypted_key = true,
                    b"EncryptionMethod" if !in_encrypted_key => {
                        for attr in e.attributes() {
                            let attr = attr.map_err(|err| {
                                EncryptionError::MalformedDocument(err.to_string())
                            })?;
                            if attr.key.as_ref() == b"Algorithm" {
                                let value = attr.unescape_value().map_err(|err| {
                                    EncryptionError::MalformedDocument(err.to_string())
                                })?;
                                data_algorithm = Some(value.into_owned());
                            }
                        }
                    }
                    b"CipherValue" => in_cipher_value = true,
                    _ => {}
                }
            }
            Ok(Event::Text(ref t)) if in_cipher_value => {
                let value = t
                    .unescape()
                    .map_err(|err| EncryptionError::MalformedDocument(err.to_string()))?
                    .into_owned();
                if in_encrypted_key {
                    key_cipher_value = Some(value);
                } else {
                    data_cipher_value = Some(value);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"EncryptedKey" => in_encrypted_key = false,
                b"CipherValue" => in_cipher_value = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(EncryptionError::MalformedDocument(err.to_string())),
            _ => {}
        }
    }

    Ok(EncryptedParts {
        data_algorithm: data_algorithm.ok_or_else(|| {
            EncryptionError::MalformedDocument("missing EncryptedData EncryptionMethod".to_string())
        })?,
        key_cipher_value: key_cipher_value.ok_or_else(|| {
            EncryptionError::MalformedDocument("missing EncryptedKey CipherValue".to_string())
        })?,
        data_cipher_value: data_cipher_value.ok_or_else(|| {
            EncryptionError::MalformedDocument("missing CipherData CipherValue".to_string())
        })?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_keys;

    const PLAINTEXT: &str =
        "<saml:Assertion xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\" ID=\"_a\">\
         <saml:Issuer>https://stub-idp-one.test</saml:Issuer></saml:Assertion>";

    fn hub_credential() -> EncryptionCredential {
        EncryptionCredential::from_pem(
            test_keys::HUB_ENCRYPTION_CERT,
            test_keys::HUB_ENCRYPTION_KEY,
        )
        .unwrap()
    }

    #[test]
    fn cbc_round_trip_recovers_plaintext() {
        let credential = hub_credential();
        let encrypted =
            encrypt_assertion(PLAINTEXT, &credential, EncryptionAlgorithm::Aes128Cbc).unwrap();

        assert!(encrypted.starts_with("<saml:EncryptedAssertion"));
        assert!(encrypted.contains("Type=\"http://www.w3.org/2001/04/xmlenc#Element\""));
        assert!(encrypted.contains(EncryptionAlgorithm::Aes128Cbc.uri()));
        assert!(encrypted.contains(KEY_TRANSPORT_RSA_OAEP));
        assert!(!encrypted.contains("stub-idp-one"));

        let decrypted = decrypt_assertion(&encrypted, &credential).unwrap();
        assert_eq!(decrypted, PLAINTEXT);
    }

    #[test]
    fn gcm_round_trip_recovers_plaintext() {
        let credential = hub_credential();
        let encrypted =
            encrypt_assertion(PLAINTEXT, &credential, EncryptionAlgorithm::Aes256Gcm).unwrap();
        assert!(encrypted.contains(EncryptionAlgorithm::Aes256Gcm.uri()));
        let decrypted = decrypt_assertion(&encrypted, &credential).unwrap();
        assert_eq!(decrypted, PLAINTEXT);
    }

    #[test]
    fn fresh_session_key_per_call() {
        let credential = hub_credential();
        let first =
            encrypt_assertion(PLAINTEXT, &credential, EncryptionAlgorithm::Aes128Cbc).unwrap();
        let second =
            encrypt_assertion(PLAINTEXT, &credential, EncryptionAlgorithm::Aes128Cbc).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn undersized_rsa_key_rejects_aes256_before_encrypting() {
        let credential = EncryptionCredential::from_pem(
            test_keys::UNDERSIZED_RSA_CERT,
            test_keys::UNDERSIZED_RSA_KEY,
        )
        .unwrap();
        let err = encrypt_assertion(PLAINTEXT, &credential, EncryptionAlgorithm::Aes256Cbc)
            .unwrap_err();
        assert!(matches!(
            err,
            EncryptionError::KeyTooLargeForWrap {
                algorithm: EncryptionAlgorithm::Aes256Cbc,
                modulus_bits: 512,
            }
        ));
    }

    #[test]
    fn undersized_rsa_key_still_wraps_aes128() {
        let credential = EncryptionCredential::from_pem(
            test_keys::UNDERSIZED_RSA_CERT,
            test_keys::UNDERSIZED_RSA_KEY,
        )
        .unwrap();
        let encrypted =
            encrypt_assertion(PLAINTEXT, &credential, EncryptionAlgorithm::Aes128Cbc).unwrap();
        let decrypted = decrypt_assertion(&encrypted, &credential).unwrap();
        assert_eq!(decrypted, PLAINTEXT);
    }

    #[test]
    fn wrong_recipient_key_cannot_decrypt() {
        let hub = hub_credential();
        let other = EncryptionCredential::from_pem(
            test_keys::STUB_IDP_ONE_CERT,
            test_keys::STUB_IDP_ONE_KEY,
        )
        .unwrap();
        let encrypted =
            encrypt_assertion(PLAINTEXT, &hub, EncryptionAlgorithm::Aes128Cbc).unwrap();
        assert!(decrypt_assertion(&encrypted, &other).is_err());
    }

    #[test]
    fn document_without_cipher_values_is_malformed() {
        let credential = hub_credential();
        let bare = format!(
            "<saml:EncryptedAssertion xmlns:saml=\"{SAML_NS}\">\
             <xenc:EncryptedData xmlns:xenc=\"{XMLENC_NS}\">\
             <xenc:EncryptionMethod Algorithm=\"{}\"/>\
             </xenc:EncryptedData></saml:EncryptedAssertion>",
            EncryptionAlgorithm::Aes128Cbc.uri()
        );
        let err = decrypt_assertion(&bare, &credential).unwrap_err();
        assert!(matches!(err, EncryptionError::MalformedDocument(_)));
    }

    #[test]
    fn unknown_algorithm_uri_is_reported() {
        let credential = hub_credential();
        let encrypted =
            encrypt_assertion(PLAINTEXT, &credential, EncryptionAlgorithm::Aes128Cbc).unwrap();
        let tampered = encrypted.replace(
            EncryptionAlgorithm::Aes128Cbc.uri(),
            "http://www.w3.org/2001/04/xmlenc#tripledes-cbc",
        );
        let err = decrypt_assertion(&tampered, &credential).unwrap_err();
        assert!(matches!(err, EncryptionError::UnsupportedAlgorithm(uri)
            if uri.ends_with("tripledes-cbc")));
    }
}
