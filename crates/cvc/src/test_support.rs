//! Certificate fixtures for unit tests

use eac_asn1::{Asn1, Oid};

use crate::{
    certificate::{CvCertificate, CvcDate},
    chat::Chat,
    constants::*,
    ec::NamedCurve,
    ecdsa::SignatureAlgorithm,
    key::EcPrivateKey,
};

pub(crate) const ROOT_CAR: &str = "DECVCAeID00102";
pub(crate) const TERMINAL_CHR: &str = "DETESTeID00001";
pub(crate) const TERMINAL_CAR: &str = "DEDVeIDDTR101";

pub(crate) fn authentication_chat() -> Chat {
    Chat::new(ROLE_AUTHENTICATION_TERMINALS, vec![0x00, 0x00, 0x00, 0x01, 0x10]).unwrap()
}

/// Discretionary data template `73 { 06 oid, 80 hash }`
pub(crate) fn discretionary_data(oid: &Oid, hash: &[u8]) -> Asn1 {
    Asn1::constructed(
        TAG_DISCRETIONARY_DATA_TEMPLATE,
        vec![Asn1::from_oid(oid), Asn1::primitive(TAG_EXTENSION_HASH, hash.to_vec())],
    )
}

fn sign(body: Asn1, signer: &EcPrivateKey, oid: Oid) -> CvCertificate {
    let algorithm = SignatureAlgorithm::from_oid(&oid).unwrap();
    let signature = signer.sign(algorithm, &body.encode()).unwrap();
    CvCertificate::from_asn1(Asn1::constructed(
        TAG_CV_CERTIFICATE,
        vec![body, Asn1::primitive(TAG_SIGNATURE, signature)],
    ))
    .unwrap()
}

fn body(car: &str, chr: &str, public_key: Asn1, extensions: Option<Asn1>) -> Asn1 {
    let mut children = vec![
        Asn1::primitive(TAG_PROFILE_IDENTIFIER, vec![0x00]),
        Asn1::primitive(TAG_CA_REFERENCE, car.as_bytes()),
        public_key,
        Asn1::primitive(TAG_HOLDER_REFERENCE, chr.as_bytes()),
        authentication_chat().to_asn1(),
        Asn1::primitive(TAG_EFFECTIVE_DATE, CvcDate::new(2024, 1, 15).unwrap().to_bytes()),
        Asn1::primitive(TAG_EXPIRATION_DATE, CvcDate::new(2024, 4, 15).unwrap().to_bytes()),
    ];
    children.extend(extensions);
    Asn1::constructed(TAG_CERTIFICATE_BODY, children)
}

/// `7F49` with explicit domain parameters, the public point set to `generator`
pub(crate) fn explicit_public_key(p: &[u8], a: &[u8], b: &[u8], generator: &[u8], order: &[u8]) -> Asn1 {
    Asn1::constructed(
        TAG_PUBLIC_KEY,
        vec![
            Asn1::from_oid(&TA_ECDSA_SHA_256),
            Asn1::primitive(TAG_EC_PRIME, p.to_vec()),
            Asn1::primitive(TAG_EC_A, a.to_vec()),
            Asn1::primitive(TAG_EC_B, b.to_vec()),
            Asn1::primitive(TAG_EC_GENERATOR, generator.to_vec()),
            Asn1::primitive(TAG_EC_ORDER, order.to_vec()),
            Asn1::primitive(TAG_EC_PUBLIC_POINT, generator.to_vec()),
        ],
    )
}

/// Certificate around an arbitrary `7F49` element, signed by a throwaway key
pub(crate) fn certificate_with_key(public_key: Asn1) -> CvCertificate {
    let signer = EcPrivateKey::generate(&NamedCurve::BrainpoolP256r1.domain());
    sign(body(ROOT_CAR, TERMINAL_CHR, public_key, None), &signer, TA_ECDSA_SHA_256)
}

/// Self-signed certificate with explicit domain parameters
pub(crate) fn root_certificate(curve: NamedCurve, oid: Oid) -> (CvCertificate, EcPrivateKey) {
    let key = EcPrivateKey::generate(&curve.domain());
    let public_key = key.public_key().unwrap().with_oid(oid).to_asn1(true);
    let body = body(ROOT_CAR, TERMINAL_CHR, public_key, None);
    (sign(body, &key, oid), key)
}

/// Terminal certificate with a short form key, issued by a throwaway key
pub(crate) fn terminal_certificate(
    chr: &str,
    curve: NamedCurve,
    oid: Oid,
    extensions: Option<Asn1>,
) -> (CvCertificate, EcPrivateKey) {
    let domain = curve.domain();
    let key = EcPrivateKey::generate(&domain);
    let issuer = EcPrivateKey::generate(&domain);
    let public_key = key.public_key().unwrap().with_oid(oid).to_asn1(false);
    let body = body(TERMINAL_CAR, chr, public_key, extensions);
    (sign(body, &issuer, oid), key)
}
