//! Card verifiable certificates

use std::fmt;

use eac_asn1::{Asn1, Oid};

use crate::{
    chat::Chat,
    constants::TAG_CV_CERTIFICATE,
    ec::EcDomainParameters,
    ecdsa::SignatureAlgorithm,
    error::{Error, Result},
    key::{OidPublicKey, domain_from_asn1},
    path::{CvcPath, cvc},
};

/// A calendar date in the unpacked BCD `YYMMDD` form used by CV certificates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CvcDate {
    year: u16,
    month: u8,
    day: u8,
}

impl CvcDate {
    /// Create a date, the year must lie in 2000..=2099
    pub fn new(year: u16, month: u8, day: u8) -> Result<Self> {
        if !(2000..=2099).contains(&year) || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(Error::InvalidCertificate("date out of range"));
        }
        Ok(Self { year, month, day })
    }

    /// Decode six unpacked BCD digits
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let digits: [u8; 6] = bytes
            .try_into()
            .map_err(|_| Error::InvalidCertificate("date must have six digits"))?;
        if digits.iter().any(|d| *d > 9) {
            return Err(Error::InvalidCertificate("date digit out of range"));
        }
        Self::new(
            2000 + u16::from(digits[0] * 10 + digits[1]),
            digits[2] * 10 + digits[3],
            digits[4] * 10 + digits[5],
        )
    }

    /// Encode as six unpacked BCD digits
    pub const fn to_bytes(self) -> [u8; 6] {
        let yy = (self.year - 2000) as u8;
        [
            yy / 10,
            yy % 10,
            self.month / 10,
            self.month % 10,
            self.day / 10,
            self.day % 10,
        ]
    }
}

impl fmt::Display for CvcDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Decode a CAR or CHR, which are ISO 8859-1 strings
pub(crate) fn reference_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| char::from(*b)).collect()
}

/// A parsed CV certificate (`7F21`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CvCertificate {
    node: Asn1,
}

impl CvCertificate {
    /// Parse a certificate from DER bytes
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        Self::from_asn1(Asn1::parse(bytes)?)
    }

    /// Wrap a parsed `7F21` element
    pub fn from_asn1(node: Asn1) -> Result<Self> {
        if node.tag() != TAG_CV_CERTIFICATE {
            return Err(Error::InvalidCertificate("top level tag is not 7F21"));
        }
        if node.child(cvc::BODY.as_path()).is_none() {
            return Err(Error::MissingElement("certificate body"));
        }
        Ok(Self { node })
    }

    /// The underlying tree
    pub const fn as_asn1(&self) -> &Asn1 {
        &self.node
    }

    /// DER encoding
    pub fn encode(&self) -> Vec<u8> {
        self.node.encode()
    }

    /// Element at `path`
    pub fn element(&self, path: &CvcPath) -> Option<&Asn1> {
        self.node.child(path.as_path())
    }

    fn required(&self, path: &CvcPath) -> Result<&Asn1> {
        self.element(path).ok_or(Error::MissingElement(path.as_path().name()))
    }

    /// Certificate body, the signed part
    pub fn body(&self) -> Result<&Asn1> {
        self.required(&cvc::BODY)
    }

    /// Certificate holder reference
    pub fn holder_reference(&self) -> Result<String> {
        Ok(reference_string(&self.required(&cvc::HOLDER_REFERENCE)?.value()))
    }

    /// Certification authority reference
    pub fn authority_reference(&self) -> Result<String> {
        Ok(reference_string(&self.required(&cvc::CA_REFERENCE)?.value()))
    }

    /// Algorithm identifier carried by the public key
    pub fn public_key_oid(&self) -> Result<Oid> {
        Ok(self.required(&cvc::PUBLIC_KEY_OID)?.to_oid()?)
    }

    /// Signature algorithm named by the public key
    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm> {
        SignatureAlgorithm::from_oid(&self.public_key_oid()?)
    }

    /// Explicit domain parameters of the public key
    pub fn domain_parameters(&self) -> Result<EcDomainParameters> {
        domain_from_asn1(self.required(&cvc::PUBLIC_KEY)?)?
            .ok_or(Error::MissingElement("domain parameters"))
    }

    /// Public key, taking the curve from `issuer_domain` if not explicit
    pub fn public_key(&self, issuer_domain: Option<&EcDomainParameters>) -> Result<OidPublicKey> {
        OidPublicKey::from_asn1(self.required(&cvc::PUBLIC_KEY)?, issuer_domain)
    }

    /// Certificate holder authorization template, if present
    pub fn chat(&self) -> Result<Option<Chat>> {
        self.element(&cvc::CHAT).map(Chat::from_asn1).transpose()
    }

    /// Effective date, if present
    pub fn effective_date(&self) -> Result<Option<CvcDate>> {
        self.element(&cvc::EFFECTIVE_DATE)
            .map(|n| CvcDate::from_bytes(&n.value()))
            .transpose()
    }

    /// Expiration date, if present
    pub fn expiration_date(&self) -> Result<Option<CvcDate>> {
        self.element(&cvc::EXPIRATION_DATE)
            .map(|n| CvcDate::from_bytes(&n.value()))
            .transpose()
    }

    /// Certificate extensions, if present
    pub fn extensions(&self) -> Option<&Asn1> {
        self.element(&cvc::EXTENSIONS)
    }

    /// Signature bytes
    pub fn signature(&self) -> Result<Vec<u8>> {
        Ok(self.required(&cvc::SIGNATURE)?.value().into_owned())
    }

    /// Verify the certificate signature with the issuer's key
    pub fn verify(&self, issuer_key: &OidPublicKey) -> Result<()> {
        issuer_key.verify(&self.body()?.encode(), &self.signature()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constants::TA_ECDSA_SHA_256, ec::NamedCurve, test_support};

    #[test]
    fn test_root_certificate_accessors() {
        let (root, key) = test_support::root_certificate(NamedCurve::BrainpoolP256r1, TA_ECDSA_SHA_256);
        let cert = CvCertificate::from_der(&root.encode()).unwrap();

        assert_eq!(cert.holder_reference().unwrap(), "DETESTeID00001");
        assert_eq!(cert.authority_reference().unwrap(), "DECVCAeID00102");
        assert_eq!(cert.public_key_oid().unwrap(), TA_ECDSA_SHA_256);
        assert_eq!(
            cert.domain_parameters().unwrap().named_curve(),
            Some(NamedCurve::BrainpoolP256r1)
        );
        assert_eq!(cert.effective_date().unwrap(), Some(CvcDate::new(2024, 1, 15).unwrap()));
        assert_eq!(cert.expiration_date().unwrap().unwrap().to_string(), "2024-04-15");
        assert!(cert.chat().unwrap().is_some());
        cert.verify(&cert.public_key(None).unwrap()).unwrap();
        assert_eq!(cert.public_key(None).unwrap().key(), &key.public_key().unwrap());
    }

    #[test]
    fn test_rejects_other_top_level_tags() {
        let node = Asn1::constructed(eac_asn1::Tag::new(0x67), vec![]);
        assert!(CvCertificate::from_asn1(node).is_err());
    }

    #[test]
    fn test_deeply_nested_input_is_an_error() {
        let mut encoded = Vec::new();
        for _ in 0..=eac_asn1::MAX_DEPTH {
            let mut outer = vec![0x30, 0x82];
            outer.extend_from_slice(&u16::try_from(encoded.len()).unwrap().to_be_bytes());
            outer.append(&mut encoded);
            encoded = outer;
        }
        let mut der = vec![0x7F, 0x21, 0x82];
        der.extend_from_slice(&u16::try_from(encoded.len()).unwrap().to_be_bytes());
        der.append(&mut encoded);

        assert!(matches!(
            CvCertificate::from_der(&der),
            Err(Error::Asn1(eac_asn1::Error::Decode(err))) if err.kind == eac_asn1::DecodeErrorKind::TooDeep
        ));
    }

    #[test]
    fn test_date_encoding() {
        let date = CvcDate::from_bytes(&[2, 5, 1, 2, 3, 1]).unwrap();
        assert_eq!(date.to_string(), "2025-12-31");
        assert_eq!(date.to_bytes(), [2, 5, 1, 2, 3, 1]);
        assert!(CvcDate::from_bytes(&[2, 5, 1, 3, 0, 1]).is_err());
        assert!(CvcDate::from_bytes(&[2, 5, 1, 2]).is_err());
    }
}
