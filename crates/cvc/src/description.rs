//! Certificate description (TR-03110 part 4, `id-description`)
//!
//! A certificate description names the issuer and subject of a terminal
//! certificate and the terms of usage shown to the card holder. A
//! certificate refers to it through a hash stored in a discretionary data
//! extension.

use eac_asn1::{Asn1, Oid, Tag};

use crate::{
    constants::{DESCRIPTION_HTML_FORMAT, DESCRIPTION_PDF_FORMAT, DESCRIPTION_PLAIN_FORMAT},
    ecdsa::HashAlgorithm,
    error::{Error, Result},
};

const TAG_ISSUER_NAME: Tag = Tag::new(0xA1);
const TAG_ISSUER_URL: Tag = Tag::new(0xA2);
const TAG_SUBJECT_NAME: Tag = Tag::new(0xA3);
const TAG_SUBJECT_URL: Tag = Tag::new(0xA4);
const TAG_TERMS_OF_USAGE: Tag = Tag::new(0xA5);
const TAG_REDIRECT_URL: Tag = Tag::new(0xA6);
const TAG_COMM_CERTIFICATES: Tag = Tag::new(0xA7);

/// Terms of usage in one of the three registered formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermsOfUsage {
    /// UTF-8 plain text
    PlainText(String),
    /// HTML as IA5String
    Html(String),
    /// PDF document
    Pdf(Vec<u8>),
}

impl TermsOfUsage {
    const fn format(&self) -> Oid {
        match self {
            Self::PlainText(_) => DESCRIPTION_PLAIN_FORMAT,
            Self::Html(_) => DESCRIPTION_HTML_FORMAT,
            Self::Pdf(_) => DESCRIPTION_PDF_FORMAT,
        }
    }

    fn to_asn1(&self) -> Asn1 {
        match self {
            Self::PlainText(text) => Asn1::primitive(Tag::UTF8_STRING, text.as_bytes()),
            Self::Html(html) => Asn1::primitive(Tag::IA5_STRING, html.as_bytes()),
            Self::Pdf(pdf) => Asn1::primitive(Tag::OCTET_STRING, pdf.clone()),
        }
    }
}

/// Description of a terminal certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDescription {
    issuer_name: String,
    issuer_url: Option<String>,
    subject_name: String,
    subject_url: Option<String>,
    terms_of_usage: TermsOfUsage,
    redirect_url: Option<String>,
    comm_certificates: Vec<Vec<u8>>,
}

impl CertificateDescription {
    /// Create a description with the mandatory fields
    pub fn new(
        issuer_name: impl Into<String>,
        subject_name: impl Into<String>,
        terms_of_usage: TermsOfUsage,
    ) -> Self {
        Self {
            issuer_name: issuer_name.into(),
            issuer_url: None,
            subject_name: subject_name.into(),
            subject_url: None,
            terms_of_usage,
            redirect_url: None,
            comm_certificates: Vec::new(),
        }
    }

    /// Set the issuer URL
    pub fn with_issuer_url(mut self, url: impl Into<String>) -> Self {
        self.issuer_url = Some(url.into());
        self
    }

    /// Set the subject URL
    pub fn with_subject_url(mut self, url: impl Into<String>) -> Self {
        self.subject_url = Some(url.into());
        self
    }

    /// Set the redirect URL
    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    /// Add the hash of a communication certificate
    pub fn with_comm_certificate(mut self, hash: Vec<u8>) -> Self {
        self.comm_certificates.push(hash);
        self
    }

    /// Issuer name
    pub fn issuer_name(&self) -> &str {
        &self.issuer_name
    }

    /// Subject name
    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    /// Subject URL
    pub fn subject_url(&self) -> Option<&str> {
        self.subject_url.as_deref()
    }

    /// Terms of usage
    pub const fn terms_of_usage(&self) -> &TermsOfUsage {
        &self.terms_of_usage
    }

    /// Hashes of the communication certificates
    pub fn comm_certificates(&self) -> &[Vec<u8>] {
        &self.comm_certificates
    }

    /// Encode as a `30` SEQUENCE
    pub fn to_asn1(&self) -> Asn1 {
        let tagged = |tag: Tag, inner: Asn1| Asn1::constructed(tag, vec![inner]);
        let printable = |value: &str| Asn1::primitive(Tag::PRINTABLE_STRING, value.as_bytes());
        let utf8 = |value: &str| Asn1::primitive(Tag::UTF8_STRING, value.as_bytes());

        let mut children = vec![
            Asn1::from_oid(&self.terms_of_usage.format()),
            tagged(TAG_ISSUER_NAME, utf8(&self.issuer_name)),
        ];
        if let Some(url) = &self.issuer_url {
            children.push(tagged(TAG_ISSUER_URL, printable(url)));
        }
        children.push(tagged(TAG_SUBJECT_NAME, utf8(&self.subject_name)));
        if let Some(url) = &self.subject_url {
            children.push(tagged(TAG_SUBJECT_URL, printable(url)));
        }
        children.push(tagged(TAG_TERMS_OF_USAGE, self.terms_of_usage.to_asn1()));
        if let Some(url) = &self.redirect_url {
            children.push(tagged(TAG_REDIRECT_URL, printable(url)));
        }
        if !self.comm_certificates.is_empty() {
            let hashes = self
                .comm_certificates
                .iter()
                .map(|hash| Asn1::primitive(Tag::OCTET_STRING, hash.clone()))
                .collect();
            children.push(tagged(TAG_COMM_CERTIFICATES, Asn1::constructed(Tag::SET, hashes)));
        }
        Asn1::constructed(Tag::SEQUENCE, children)
    }

    /// DER encoding
    pub fn encode(&self) -> Vec<u8> {
        self.to_asn1().encode()
    }

    /// Hash of the DER encoding, as stored in a certificate extension
    pub fn hash(&self, algorithm: HashAlgorithm) -> Vec<u8> {
        algorithm.digest(&self.encode())
    }

    /// Decode from DER bytes
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let node = Asn1::parse(bytes)?;
        if node.tag() != Tag::SEQUENCE {
            return Err(Error::InvalidCertificate("certificate description is not a SEQUENCE"));
        }
        let format = node
            .find(Tag::OBJECT_IDENTIFIER)
            .ok_or(Error::MissingElement("description type"))?
            .to_oid()?;

        let inner = |tag: Tag| node.find(tag).and_then(|n| n.children().first());
        let text = |tag: Tag| -> Result<Option<String>> {
            inner(tag)
                .map(|n| {
                    String::from_utf8(n.value().into_owned())
                        .map_err(|_| Error::InvalidCertificate("description text is not UTF-8"))
                })
                .transpose()
        };

        let terms = inner(TAG_TERMS_OF_USAGE).ok_or(Error::MissingElement("terms of usage"))?;
        let terms_of_usage = if format == DESCRIPTION_PDF_FORMAT {
            TermsOfUsage::Pdf(terms.value().into_owned())
        } else {
            let body = String::from_utf8(terms.value().into_owned())
                .map_err(|_| Error::InvalidCertificate("terms of usage are not UTF-8"))?;
            if format == DESCRIPTION_HTML_FORMAT {
                TermsOfUsage::Html(body)
            } else if format == DESCRIPTION_PLAIN_FORMAT {
                TermsOfUsage::PlainText(body)
            } else {
                return Err(Error::InvalidCertificate("unknown description type"));
            }
        };

        let comm_certificates: Vec<Vec<u8>> = inner(TAG_COMM_CERTIFICATES)
            .map(|set| set.children().iter().map(|h| h.value().into_owned()).collect())
            .unwrap_or_default();

        Ok(Self {
            issuer_name: text(TAG_ISSUER_NAME)?.ok_or(Error::MissingElement("issuer name"))?,
            issuer_url: text(TAG_ISSUER_URL)?,
            subject_name: text(TAG_SUBJECT_NAME)?.ok_or(Error::MissingElement("subject name"))?,
            subject_url: text(TAG_SUBJECT_URL)?,
            terms_of_usage,
            redirect_url: text(TAG_REDIRECT_URL)?,
            comm_certificates,
        })
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    fn sample() -> CertificateDescription {
        CertificateDescription::new(
            "Governikus Test DVCA",
            "Test Service Provider",
            TermsOfUsage::PlainText("Name, Anschrift und E-Mail-Adresse des Diensteanbieters".into()),
        )
        .with_issuer_url("http://www.governikus.de")
        .with_subject_url("https://sp.example.org")
        .with_comm_certificate(vec![0xAB; 32])
    }

    #[test]
    fn test_description_round_trip() {
        let description = sample();
        let encoded = description.encode();
        assert_eq!(encoded[0], 0x30);
        assert_eq!(CertificateDescription::from_der(&encoded).unwrap(), description);
    }

    #[test]
    fn test_description_layout() {
        let description = CertificateDescription::new("I", "S", TermsOfUsage::Html("<b/>".into()));
        assert_eq!(
            description.encode(),
            hex!(
                "30 1E"
                "06 0A 04007F00070301030102"
                "A1 03 0C 01 49"
                "A3 03 0C 01 53"
                "A5 06 16 04 3C622F3E"
            )
            .to_vec()
        );
    }

    #[test]
    fn test_hash_depends_on_algorithm() {
        let description = sample();
        assert_eq!(description.hash(HashAlgorithm::Sha256).len(), 32);
        assert_eq!(description.hash(HashAlgorithm::Sha512).len(), 64);
    }
}
