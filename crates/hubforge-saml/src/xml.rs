//! Namespace constants and small helpers for working with emitted markup
//!
//! Documents in this crate are emitted in canonical form (single line, no
//! insignificant whitespace, attributes in a fixed order), so signing and
//! later surgery on them can work on the exact bytes. The helpers here
//! locate elements by qualified name inside such documents.

pub const SAML_NS: &str = "urn:oasis:names:tc:SAML:2.0:assertion";
pub const SAMLP_NS: &str = "urn:oasis:names:tc:SAML:2.0:protocol";
pub const DSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";
pub const XMLENC_NS: &str = "http://www.w3.org/2001/04/xmlenc#";
pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub const EXC_C14N_URI: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const ENVELOPED_SIGNATURE_URI: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

/// Escape text for use in XML content or attribute values
#[must_use]
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Byte range of the first element with the given qualified name,
/// from `<tag` through `</tag>` inclusive.
///
/// The scan assumes elements of the same name do not nest, which holds
/// for every element this crate goes looking for.
fn element_span(xml: &str, tag: &str) -> Option<std::ops::Range<usize>> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut from = 0;
    loop {
        let start = from + xml[from..].find(&open)?;
        let boundary = xml.as_bytes().get(start + open.len());
        // Reject prefix collisions such as SignatureValue when
        // searching for Signature.
        match boundary {
            Some(b' ') | Some(b'>') | Some(b'/') => {
                let end = start + xml[start..].find(&close)? + close.len();
                return Some(start..end);
            }
            _ => from = start + open.len(),
        }
    }
}

/// First element with the given qualified name, including its tags
#[must_use]
pub fn extract_element<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    element_span(xml, tag).map(|span| &xml[span])
}

/// Document with the first element of the given qualified name removed
#[must_use]
pub fn remove_element(xml: &str, tag: &str) -> Option<String> {
    let span = element_span(xml, tag)?;
    let mut out = String::with_capacity(xml.len() - span.len());
    out.push_str(&xml[..span.start]);
    out.push_str(&xml[span.end..]);
    Some(out)
}

/// Offset just past the first occurrence of `needle`
pub(crate) fn after_first(xml: &str, needle: &str) -> Option<usize> {
    xml.find(needle).map(|at| at + needle.len())
}
