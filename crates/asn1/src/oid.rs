//! Object identifier elements

use crate::{Asn1, Oid, Tag, error::Result, error::StructureError};

impl Asn1 {
    /// Create an OBJECT IDENTIFIER element
    pub fn from_oid(oid: &Oid) -> Self {
        Self::primitive(Tag::OBJECT_IDENTIFIER, oid.as_bytes())
    }

    /// Interpret this element as an OBJECT IDENTIFIER
    pub fn to_oid(&self) -> Result<Oid> {
        if self.tag() != Tag::OBJECT_IDENTIFIER {
            return Err(StructureError::UnexpectedTag {
                expected: Tag::OBJECT_IDENTIFIER,
                actual: self.tag(),
            }
            .into());
        }
        Ok(Oid::from_bytes(&self.value())?)
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::Error;

    #[test]
    fn test_oid_element() {
        let oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.2.2.3");
        let node = Asn1::from_oid(&oid);
        assert_eq!(node.encode(), hex!("06 0A 04007F00070202020203").to_vec());
        assert_eq!(node.to_oid().unwrap(), oid);
    }

    #[test]
    fn test_oid_wrong_tag() {
        let node = Asn1::primitive(Tag::OCTET_STRING, vec![0x04, 0x00]);
        assert!(matches!(
            node.to_oid(),
            Err(Error::Structure(StructureError::UnexpectedTag { .. }))
        ));
    }
}
