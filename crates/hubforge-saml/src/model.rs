//! Assertion building blocks: subject, conditions, authentication statement

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const STATUS_SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";
pub const BEARER_METHOD: &str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";
pub const NAMEID_FORMAT_PERSISTENT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent";

pub const AUTHN_CONTEXT_PASSWORD_PROTECTED_TRANSPORT: &str =
    "urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport";

pub const EIDAS_LOA_LOW: &str = "http://eidas.europa.eu/LoA/low";
pub const EIDAS_LOA_SUBSTANTIAL: &str = "http://eidas.europa.eu/LoA/substantial";
pub const EIDAS_LOA_HIGH: &str = "http://eidas.europa.eu/LoA/high";

/// How long a bearer confirmation and the surrounding conditions stay
/// valid, measured from the build instant.
pub const VALIDITY_WINDOW_MINUTES: i64 = 5;

/// Clock-skew allowance applied to `Conditions/@NotBefore`
pub const NOT_BEFORE_SKEW_MINUTES: i64 = 2;

/// A `saml:NameID` value with its format URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    pub value: String,
    pub format: String,
}

impl NameId {
    /// Persistent-format name id, the form country assertions carry
    #[must_use]
    pub fn persistent(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: NAMEID_FORMAT_PERSISTENT.to_string(),
        }
    }
}

/// Bearer confirmation data for a subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectConfirmation {
    pub in_response_to: Option<String>,
    pub recipient: Option<String>,
    pub not_on_or_after: DateTime<Utc>,
}

impl SubjectConfirmation {
    /// Confirmation tied to a request id, expiring after the standard
    /// validity window from `now`.
    #[must_use]
    pub fn bearer(in_response_to: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            in_response_to: Some(in_response_to.into()),
            recipient: None,
            not_on_or_after: now + Duration::minutes(VALIDITY_WINDOW_MINUTES),
        }
    }
}

/// Assertion subject. Domestic assertions leave `name_id` unset; country
/// assertions carry a persistent one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub name_id: Option<NameId>,
    pub confirmation: SubjectConfirmation,
}

/// `saml:Conditions` window with its audience restriction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    pub not_before: DateTime<Utc>,
    pub not_on_or_after: DateTime<Utc>,
    pub audiences: Vec<String>,
}

impl Conditions {
    /// Standard window around `now`, restricted to one audience
    #[must_use]
    pub fn for_audience(audience: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            not_before: now - Duration::minutes(NOT_BEFORE_SKEW_MINUTES),
            not_on_or_after: now + Duration::minutes(VALIDITY_WINDOW_MINUTES),
            audiences: vec![audience.into()],
        }
    }
}

/// `saml:AuthnStatement` content: when and under which context class the
/// authentication happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthnStatement {
    pub authn_instant: DateTime<Utc>,
    pub class_ref: String,
}

impl AuthnStatement {
    #[must_use]
    pub fn new(class_ref: impl Into<String>, authn_instant: DateTime<Utc>) -> Self {
        Self {
            authn_instant,
            class_ref: class_ref.into(),
        }
    }
}

/// Render an instant the way SAML timestamps are emitted, UTC with a
/// trailing `Z` and no sub-second part.
#[must_use]
pub(crate) fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
