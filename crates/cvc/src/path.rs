//! Named locations inside certificate requests and CV certificates
//!
//! Request paths are rooted at the authentication wrapper (`67`), certificate
//! paths at the CV certificate itself (`7F21`). The two sets are distinct
//! types so a request can only be navigated with request paths.

use std::fmt;

use eac_asn1::Asn1Path;

macro_rules! path_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Asn1Path);

        impl $name {
            /// The underlying tree path
            pub const fn as_path(&self) -> &Asn1Path {
                &self.0
            }
        }

        impl AsRef<Asn1Path> for $name {
            fn as_ref(&self) -> &Asn1Path {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

path_type!(
    /// A location inside a certificate request
    CertificateRequestPath
);

path_type!(
    /// A location inside a CV certificate
    CvcPath
);

/// Certificate request locations
pub mod request {
    use eac_asn1::Asn1Path;

    use super::CertificateRequestPath as P;
    use crate::constants::*;

    /// Authentication wrapper, the request root
    pub static AUTHENTICATION: P = P(Asn1Path::root("AUTHENTICATION", TAG_AUTHENTICATION));
    /// Inner CV certificate
    pub static CV_CERTIFICATE: P = P(Asn1Path::new(
        "CV_CERTIFICATE",
        TAG_CV_CERTIFICATE,
        0,
        Some(&AUTHENTICATION.0),
    ));
    /// Certificate body
    pub static CV_CERTIFICATE_BODY: P = P(Asn1Path::new(
        "CV_CERTIFICATE_BODY",
        TAG_CERTIFICATE_BODY,
        0,
        Some(&CV_CERTIFICATE.0),
    ));
    /// Certification authority reference inside the body
    pub static CA_REFERENCE: P = P(Asn1Path::new(
        "CA_REFERENCE",
        TAG_CA_REFERENCE,
        0,
        Some(&CV_CERTIFICATE_BODY.0),
    ));
    /// Certificate holder reference
    pub static HOLDER_REFERENCE: P = P(Asn1Path::new(
        "HOLDER_REFERENCE",
        TAG_HOLDER_REFERENCE,
        0,
        Some(&CV_CERTIFICATE_BODY.0),
    ));
    /// Public key
    pub static PUBLIC_KEY: P = P(Asn1Path::new(
        "PUBLIC_KEY",
        TAG_PUBLIC_KEY,
        0,
        Some(&CV_CERTIFICATE_BODY.0),
    ));
    /// Certificate holder authorization template
    pub static CHAT: P = P(Asn1Path::new("CHAT", TAG_CHAT, 0, Some(&CV_CERTIFICATE_BODY.0)));
    /// Effective date
    pub static EFFECTIVE_DATE: P = P(Asn1Path::new(
        "EFFECTIVE_DATE",
        TAG_EFFECTIVE_DATE,
        0,
        Some(&CV_CERTIFICATE_BODY.0),
    ));
    /// Expiration date
    pub static EXPIRATION_DATE: P = P(Asn1Path::new(
        "EXPIRATION_DATE",
        TAG_EXPIRATION_DATE,
        0,
        Some(&CV_CERTIFICATE_BODY.0),
    ));
    /// Inner signature over the body
    pub static SIGNATURE: P = P(Asn1Path::new(
        "SIGNATURE",
        TAG_SIGNATURE,
        0,
        Some(&CV_CERTIFICATE.0),
    ));
    /// Certificate extensions
    pub static CERTIFICATE_EXTENSIONS: P = P(Asn1Path::new(
        "CERTIFICATE_EXTENSIONS",
        TAG_EXTENSIONS,
        0,
        Some(&CV_CERTIFICATE_BODY.0),
    ));
    /// First discretionary data template
    pub static EXTENSIONS_DISCRETIONARY_DATA_FIRST: P = P(Asn1Path::new(
        "EXTENSIONS_DISCRETIONARY_DATA_FIRST",
        TAG_DISCRETIONARY_DATA_TEMPLATE,
        0,
        Some(&CERTIFICATE_EXTENSIONS.0),
    ));
    /// Object identifier of the first template
    pub static DISCRETIONARY_DATA_FIRST_OID: P = P(Asn1Path::new(
        "DISCRETIONARY_DATA_FIRST_OID",
        eac_asn1::Tag::OBJECT_IDENTIFIER,
        0,
        Some(&EXTENSIONS_DISCRETIONARY_DATA_FIRST.0),
    ));
    /// Hash of the first template
    pub static DISCRETIONARY_DATA_FIRST_HASH: P = P(Asn1Path::new(
        "DISCRETIONARY_DATA_FIRST_HASH",
        TAG_EXTENSION_HASH,
        0,
        Some(&EXTENSIONS_DISCRETIONARY_DATA_FIRST.0),
    ));
    /// Second discretionary data template
    pub static EXTENSIONS_DISCRETIONARY_DATA_SECOND: P = P(Asn1Path::new(
        "EXTENSIONS_DISCRETIONARY_DATA_SECOND",
        TAG_DISCRETIONARY_DATA_TEMPLATE,
        1,
        Some(&CERTIFICATE_EXTENSIONS.0),
    ));
    /// Object identifier of the second template
    pub static DISCRETIONARY_DATA_SECOND_OID: P = P(Asn1Path::new(
        "DISCRETIONARY_DATA_SECOND_OID",
        eac_asn1::Tag::OBJECT_IDENTIFIER,
        0,
        Some(&EXTENSIONS_DISCRETIONARY_DATA_SECOND.0),
    ));
    /// Hash of the second template
    pub static DISCRETIONARY_DATA_SECOND_HASH: P = P(Asn1Path::new(
        "DISCRETIONARY_DATA_SECOND_HASH",
        TAG_EXTENSION_HASH,
        0,
        Some(&EXTENSIONS_DISCRETIONARY_DATA_SECOND.0),
    ));
    /// Certification authority reference of the outer signature
    pub static OUTER_CA_REFERENCE: P = P(Asn1Path::new(
        "OUTER_CA_REFERENCE",
        TAG_CA_REFERENCE,
        0,
        Some(&AUTHENTICATION.0),
    ));
    /// Outer signature
    pub static OUTER_SIGNATURE: P = P(Asn1Path::new(
        "OUTER_SIGNATURE",
        TAG_SIGNATURE,
        0,
        Some(&AUTHENTICATION.0),
    ));
}

/// CV certificate locations
pub mod cvc {
    use eac_asn1::{Asn1Path, Tag};

    use super::CvcPath as P;
    use crate::constants::*;

    /// The certificate itself
    pub static CV_CERTIFICATE: P = P(Asn1Path::root("CV_CERTIFICATE", TAG_CV_CERTIFICATE));
    /// Certificate body
    pub static BODY: P = P(Asn1Path::new("BODY", TAG_CERTIFICATE_BODY, 0, Some(&CV_CERTIFICATE.0)));
    /// Profile identifier
    pub static PROFILE_IDENTIFIER: P = P(Asn1Path::new(
        "PROFILE_IDENTIFIER",
        TAG_PROFILE_IDENTIFIER,
        0,
        Some(&BODY.0),
    ));
    /// Certification authority reference
    pub static CA_REFERENCE: P = P(Asn1Path::new("CA_REFERENCE", TAG_CA_REFERENCE, 0, Some(&BODY.0)));
    /// Public key
    pub static PUBLIC_KEY: P = P(Asn1Path::new("PUBLIC_KEY", TAG_PUBLIC_KEY, 0, Some(&BODY.0)));
    /// Object identifier of the public key
    pub static PUBLIC_KEY_OID: P = P(Asn1Path::new(
        "PUBLIC_KEY_OID",
        Tag::OBJECT_IDENTIFIER,
        0,
        Some(&PUBLIC_KEY.0),
    ));
    /// Certificate holder reference
    pub static HOLDER_REFERENCE: P = P(Asn1Path::new(
        "HOLDER_REFERENCE",
        TAG_HOLDER_REFERENCE,
        0,
        Some(&BODY.0),
    ));
    /// Certificate holder authorization template
    pub static CHAT: P = P(Asn1Path::new("CHAT", TAG_CHAT, 0, Some(&BODY.0)));
    /// Effective date
    pub static EFFECTIVE_DATE: P = P(Asn1Path::new(
        "EFFECTIVE_DATE",
        TAG_EFFECTIVE_DATE,
        0,
        Some(&BODY.0),
    ));
    /// Expiration date
    pub static EXPIRATION_DATE: P = P(Asn1Path::new(
        "EXPIRATION_DATE",
        TAG_EXPIRATION_DATE,
        0,
        Some(&BODY.0),
    ));
    /// Certificate extensions
    pub static EXTENSIONS: P = P(Asn1Path::new("EXTENSIONS", TAG_EXTENSIONS, 0, Some(&BODY.0)));
    /// Signature
    pub static SIGNATURE: P = P(Asn1Path::new(
        "SIGNATURE",
        TAG_SIGNATURE,
        0,
        Some(&CV_CERTIFICATE.0),
    ));
}
