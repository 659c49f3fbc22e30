//! Certificate holder authorization template

use eac_asn1::{Asn1, Oid, Tag};

use crate::{
    constants::{
        ROLE_AUTHENTICATION_TERMINALS, ROLE_INSPECTION_SYSTEMS, ROLE_SIGNATURE_TERMINALS, TAG_CHAT,
        TAG_DISCRETIONARY_DATA,
    },
    error::{Error, Result},
};

/// Role and access rights granted to a certificate holder (`7F4C`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chat {
    role: Oid,
    authorization: Vec<u8>,
}

impl Chat {
    /// Create a template for `role` with the given relative authorization bits
    ///
    /// Authentication terminals carry five bytes of access rights, inspection
    /// systems and signature terminals one byte.
    pub fn new(role: Oid, authorization: Vec<u8>) -> Result<Self> {
        let expected = match role {
            r if r == ROLE_AUTHENTICATION_TERMINALS => 5,
            r if r == ROLE_INSPECTION_SYSTEMS || r == ROLE_SIGNATURE_TERMINALS => 1,
            _ => return Err(Error::InvalidCertificate("unknown terminal role in CHAT")),
        };
        if authorization.len() != expected {
            return Err(Error::InvalidCertificate("relative authorization has wrong length"));
        }
        Ok(Self {
            role,
            authorization,
        })
    }

    /// Terminal role
    pub const fn role(&self) -> &Oid {
        &self.role
    }

    /// Relative authorization bit mask
    pub fn authorization(&self) -> &[u8] {
        &self.authorization
    }

    /// Decode from a `7F4C` element
    pub fn from_asn1(node: &Asn1) -> Result<Self> {
        if node.tag() != TAG_CHAT {
            return Err(Error::InvalidCertificate("not a CHAT element"));
        }
        let role = node
            .find(Tag::OBJECT_IDENTIFIER)
            .ok_or(Error::MissingElement("CHAT role"))?
            .to_oid()?;
        let authorization = node
            .find(TAG_DISCRETIONARY_DATA)
            .ok_or(Error::MissingElement("CHAT relative authorization"))?
            .value()
            .into_owned();
        Self::new(role, authorization)
    }

    /// Decode from DER bytes
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        Self::from_asn1(&Asn1::parse(bytes)?)
    }

    /// Encode as a `7F4C` element
    pub fn to_asn1(&self) -> Asn1 {
        Asn1::constructed(
            TAG_CHAT,
            vec![
                Asn1::from_oid(&self.role),
                Asn1::primitive(TAG_DISCRETIONARY_DATA, self.authorization.clone()),
            ],
        )
    }

    /// DER encoding
    pub fn encode(&self) -> Vec<u8> {
        self.to_asn1().encode()
    }
}
