//! Attribute catalog for matching-dataset and eIDAS assertion payloads
//!
//! Two families of attributes appear in fixture assertions. Domestic IdP
//! assertions carry the hub's matching-dataset vocabulary (`MDS_*` names
//! plus the transaction IP address). Country assertions carry the eIDAS
//! natural-person attributes under their registry URIs. Constructors here
//! fill in the name, friendly name, and name format so call sites only
//! supply values.

use serde::{Deserialize, Serialize};

pub const ATTRNAME_FORMAT_URI: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:uri";
pub const ATTRNAME_FORMAT_UNSPECIFIED: &str =
    "urn:oasis:names:tc:SAML:2.0:attrname-format:unspecified";

pub const EIDAS_CURRENT_GIVEN_NAME: &str =
    "http://eidas.europa.eu/attributes/naturalperson/CurrentGivenName";
pub const EIDAS_CURRENT_FAMILY_NAME: &str =
    "http://eidas.europa.eu/attributes/naturalperson/CurrentFamilyName";
pub const EIDAS_DATE_OF_BIRTH: &str =
    "http://eidas.europa.eu/attributes/naturalperson/DateOfBirth";
pub const EIDAS_PERSON_IDENTIFIER: &str =
    "http://eidas.europa.eu/attributes/naturalperson/PersonIdentifier";
pub const EIDAS_CURRENT_ADDRESS: &str =
    "http://eidas.europa.eu/attributes/naturalperson/CurrentAddress";
pub const EIDAS_GENDER: &str = "http://eidas.europa.eu/attributes/naturalperson/Gender";

pub const MDS_FIRST_NAME: &str = "MDS_firstname";
pub const MDS_MIDDLE_NAME: &str = "MDS_middlename";
pub const MDS_SURNAME: &str = "MDS_surname";
pub const MDS_DATE_OF_BIRTH: &str = "MDS_dateofbirth";
pub const MDS_GENDER: &str = "MDS_gender";
pub const MDS_CURRENT_ADDRESS: &str = "MDS_currentaddress";
pub const TXN_IP_ADDRESS: &str = "TXN_IPaddress";

/// IP address stamped into domestic authn assertions unless overridden.
/// Drawn from the TEST-NET-3 documentation range.
pub const DEFAULT_IP_ADDRESS: &str = "203.0.113.1";

/// A SAML attribute as it will be emitted: name, optional friendly name
/// and name format, and one or more string values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub friendly_name: Option<String>,
    pub format: Option<String>,
    pub values: Vec<String>,
}

impl Attribute {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        friendly_name: Option<&str>,
        format: Option<&str>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            friendly_name: friendly_name.map(str::to_string),
            format: format.map(str::to_string),
            values: vec![value.into()],
        }
    }
}

/// Ordered set of attributes emitted as one `saml:AttributeStatement`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeStatement {
    pub attributes: Vec<Attribute>,
}

impl AttributeStatement {
    #[must_use]
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self { attributes }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl From<Vec<Attribute>> for AttributeStatement {
    fn from(attributes: Vec<Attribute>) -> Self {
        Self { attributes }
    }
}

fn eidas(name: &str, friendly: &str, value: impl Into<String>) -> Attribute {
    Attribute::new(name, Some(friendly), Some(ATTRNAME_FORMAT_URI), value)
}

/// eIDAS `CurrentGivenName`
#[must_use]
pub fn first_name(value: impl Into<String>) -> Attribute {
    eidas(EIDAS_CURRENT_GIVEN_NAME, "FirstName", value)
}

/// eIDAS `CurrentFamilyName`
#[must_use]
pub fn family_name(value: impl Into<String>) -> Attribute {
    eidas(EIDAS_CURRENT_FAMILY_NAME, "FamilyName", value)
}

/// eIDAS `DateOfBirth`, value in `YYYY-MM-DD` form
#[must_use]
pub fn date_of_birth(value: impl Into<String>) -> Attribute {
    eidas(EIDAS_DATE_OF_BIRTH, "DateOfBirth", value)
}

/// eIDAS `PersonIdentifier`, the cross-border unique id
#[must_use]
pub fn person_identifier(value: impl Into<String>) -> Attribute {
    eidas(EIDAS_PERSON_IDENTIFIER, "PersonIdentifier", value)
}

/// eIDAS `CurrentAddress`
#[must_use]
pub fn current_address(value: impl Into<String>) -> Attribute {
    eidas(EIDAS_CURRENT_ADDRESS, "CurrentAddress", value)
}

/// eIDAS `Gender`
#[must_use]
pub fn gender(value: impl Into<String>) -> Attribute {
    eidas(EIDAS_GENDER, "Gender", value)
}

/// Transaction IP address attribute carried by domestic authn assertions
#[must_use]
pub fn ip_address(value: impl Into<String>) -> Attribute {
    Attribute::new(
        TXN_IP_ADDRESS,
        Some("IPAddress"),
        Some(ATTRNAME_FORMAT_UNSPECIFIED),
        value,
    )
}

fn mds(name: &str, friendly: &str, value: &str) -> Attribute {
    Attribute::new(name, Some(friendly), Some(ATTRNAME_FORMAT_UNSPECIFIED), value)
}

/// The full matching dataset a domestic IdP asserts about its test user
#[must_use]
pub fn matching_dataset_statement() -> AttributeStatement {
    AttributeStatement::new(vec![
        mds(MDS_FIRST_NAME, "firstname", "Georgina"),
        mds(MDS_MIDDLE_NAME, "middlename", "Grace"),
        mds(MDS_SURNAME, "surname", "Bartholomew"),
        mds(MDS_DATE_OF_BIRTH, "dateofbirth", "1984-02-29"),
        mds(MDS_GENDER, "gender", "Female"),
        mds(MDS_CURRENT_ADDRESS, "currentaddress", "10 Example Terrace, London, EC2A 99ZZ"),
    ])
}

/// Statement carrying only the default transaction IP address
#[must_use]
pub fn ip_address_statement() -> AttributeStatement {
    AttributeStatement::new(vec![ip_address(DEFAULT_IP_ADDRESS)])
}
