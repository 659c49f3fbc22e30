//! TR-03110 tags and object identifiers

use eac_asn1::{Oid, Tag};

/// Authentication wrapper of a certificate request
pub const TAG_AUTHENTICATION: Tag = Tag::new(0x67);
/// CV certificate
pub const TAG_CV_CERTIFICATE: Tag = Tag::new(0x7F21);
/// Certificate body
pub const TAG_CERTIFICATE_BODY: Tag = Tag::new(0x7F4E);
/// Certificate profile identifier
pub const TAG_PROFILE_IDENTIFIER: Tag = Tag::new(0x5F29);
/// Certification authority reference
pub const TAG_CA_REFERENCE: Tag = Tag::new(0x42);
/// Certificate holder reference
pub const TAG_HOLDER_REFERENCE: Tag = Tag::new(0x5F20);
/// Certificate holder authorization template
pub const TAG_CHAT: Tag = Tag::new(0x7F4C);
/// Certificate effective date
pub const TAG_EFFECTIVE_DATE: Tag = Tag::new(0x5F25);
/// Certificate expiration date
pub const TAG_EXPIRATION_DATE: Tag = Tag::new(0x5F24);
/// Public key
pub const TAG_PUBLIC_KEY: Tag = Tag::new(0x7F49);
/// Signature
pub const TAG_SIGNATURE: Tag = Tag::new(0x5F37);
/// Certificate extensions
pub const TAG_EXTENSIONS: Tag = Tag::new(0x65);
/// Discretionary data template
pub const TAG_DISCRETIONARY_DATA_TEMPLATE: Tag = Tag::new(0x73);
/// Discretionary data
pub const TAG_DISCRETIONARY_DATA: Tag = Tag::new(0x53);
/// Hash inside a discretionary data template
pub const TAG_EXTENSION_HASH: Tag = Tag::new(0x80);

/// Prime modulus `p`
pub const TAG_EC_PRIME: Tag = Tag::new(0x81);
/// First coefficient `a`
pub const TAG_EC_A: Tag = Tag::new(0x82);
/// Second coefficient `b`
pub const TAG_EC_B: Tag = Tag::new(0x83);
/// Base point `G`
pub const TAG_EC_GENERATOR: Tag = Tag::new(0x84);
/// Order `n` of the base point
pub const TAG_EC_ORDER: Tag = Tag::new(0x85);
/// Public point
pub const TAG_EC_PUBLIC_POINT: Tag = Tag::new(0x86);
/// Cofactor `h`
pub const TAG_EC_COFACTOR: Tag = Tag::new(0x87);

/// id-TA-ECDSA-SHA-1
pub const TA_ECDSA_SHA_1: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.2.2.1");
/// id-TA-ECDSA-SHA-224
pub const TA_ECDSA_SHA_224: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.2.2.2");
/// id-TA-ECDSA-SHA-256
pub const TA_ECDSA_SHA_256: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.2.2.3");
/// id-TA-ECDSA-SHA-384
pub const TA_ECDSA_SHA_384: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.2.2.4");
/// id-TA-ECDSA-SHA-512
pub const TA_ECDSA_SHA_512: Oid = Oid::new_unwrap("0.4.0.127.0.7.2.2.2.2.5");

/// id-description, the certificate description extension
pub const CERTIFICATE_DESCRIPTION: Oid = Oid::new_unwrap("0.4.0.127.0.7.3.1.3.1");
/// Plain text terms of usage
pub const DESCRIPTION_PLAIN_FORMAT: Oid = Oid::new_unwrap("0.4.0.127.0.7.3.1.3.1.1");
/// HTML terms of usage
pub const DESCRIPTION_HTML_FORMAT: Oid = Oid::new_unwrap("0.4.0.127.0.7.3.1.3.1.2");
/// PDF terms of usage
pub const DESCRIPTION_PDF_FORMAT: Oid = Oid::new_unwrap("0.4.0.127.0.7.3.1.3.1.3");
/// id-sector, the terminal sector extension
pub const TERMINAL_SECTOR: Oid = Oid::new_unwrap("0.4.0.127.0.7.3.1.3.2");

/// id-IS, inspection systems
pub const ROLE_INSPECTION_SYSTEMS: Oid = Oid::new_unwrap("0.4.0.127.0.7.3.1.2.1");
/// id-AT, authentication terminals
pub const ROLE_AUTHENTICATION_TERMINALS: Oid = Oid::new_unwrap("0.4.0.127.0.7.3.1.2.2");
/// id-ST, signature terminals
pub const ROLE_SIGNATURE_TERMINALS: Oid = Oid::new_unwrap("0.4.0.127.0.7.3.1.2.3");

/// id-ecPublicKey
pub const EC_PUBLIC_KEY: Oid = Oid::new_unwrap("1.2.840.10045.2.1");
/// brainpoolP256r1
pub const BRAINPOOL_P256R1: Oid = Oid::new_unwrap("1.3.36.3.3.2.8.1.1.7");
/// brainpoolP384r1
pub const BRAINPOOL_P384R1: Oid = Oid::new_unwrap("1.3.36.3.3.2.8.1.1.11");
/// brainpoolP512r1
pub const BRAINPOOL_P512R1: Oid = Oid::new_unwrap("1.3.36.3.3.2.8.1.1.13");
