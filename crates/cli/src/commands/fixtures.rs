//! Certificates and files for command tests

use std::path::{Path, PathBuf};

use eac_asn1::Asn1;
use eac_cvc::{
    Chat, CvCertificate, CvcDate, EcPrivateKey, NamedCurve, SignatureAlgorithm, constants::*,
};

pub(crate) const ROOT_CHR: &str = "DECVCAeID00102";
pub(crate) const TERMINAL_CHR: &str = "DETESTeID00001";

pub(crate) fn chat() -> Chat {
    Chat::new(ROLE_AUTHENTICATION_TERMINALS, vec![0x00, 0x00, 0x00, 0x01, 0x10]).unwrap()
}

fn certificate(car: &str, chr: &str, public_key: Asn1, signer: &EcPrivateKey) -> CvCertificate {
    let body = Asn1::constructed(
        TAG_CERTIFICATE_BODY,
        vec![
            Asn1::primitive(TAG_PROFILE_IDENTIFIER, vec![0x00]),
            Asn1::primitive(TAG_CA_REFERENCE, car.as_bytes()),
            public_key,
            Asn1::primitive(TAG_HOLDER_REFERENCE, chr.as_bytes()),
            chat().to_asn1(),
            Asn1::primitive(TAG_EFFECTIVE_DATE, CvcDate::new(2024, 1, 15).unwrap().to_bytes()),
            Asn1::primitive(TAG_EXPIRATION_DATE, CvcDate::new(2024, 4, 15).unwrap().to_bytes()),
        ],
    );
    let signature = signer
        .sign(SignatureAlgorithm::ECDSA_SHA_256, &body.encode())
        .unwrap();
    CvCertificate::from_asn1(Asn1::constructed(
        TAG_CV_CERTIFICATE,
        vec![body, Asn1::primitive(TAG_SIGNATURE, signature)],
    ))
    .unwrap()
}

/// Self-signed root with explicit brainpoolP256r1 parameters
pub(crate) fn root() -> (CvCertificate, EcPrivateKey) {
    let key = EcPrivateKey::generate(&NamedCurve::BrainpoolP256r1.domain());
    let public_key = key.public_key().unwrap().with_oid(TA_ECDSA_SHA_256).to_asn1(true);
    (certificate(ROOT_CHR, ROOT_CHR, public_key, &key), key)
}

/// Terminal certificate issued by `issuer`, short form key
pub(crate) fn terminal(issuer: &EcPrivateKey) -> (CvCertificate, EcPrivateKey) {
    let key = EcPrivateKey::generate(issuer.domain());
    let public_key = key.public_key().unwrap().with_oid(TA_ECDSA_SHA_256).to_asn1(false);
    (certificate(ROOT_CHR, TERMINAL_CHR, public_key, issuer), key)
}

/// Root whose `7F49` carries `p = 1, a = b = 0, G = (0, 0), n = 0`
pub(crate) fn degenerate_root() -> CvCertificate {
    let generator = vec![0x04, 0x00, 0x00];
    let public_key = Asn1::constructed(
        TAG_PUBLIC_KEY,
        vec![
            Asn1::from_oid(&TA_ECDSA_SHA_256),
            Asn1::primitive(TAG_EC_PRIME, vec![0x01]),
            Asn1::primitive(TAG_EC_A, vec![0x00]),
            Asn1::primitive(TAG_EC_B, vec![0x00]),
            Asn1::primitive(TAG_EC_GENERATOR, generator.clone()),
            Asn1::primitive(TAG_EC_ORDER, vec![0x00]),
            Asn1::primitive(TAG_EC_PUBLIC_POINT, generator),
        ],
    );
    let signer = EcPrivateKey::generate(&NamedCurve::BrainpoolP256r1.domain());
    certificate(ROOT_CHR, ROOT_CHR, public_key, &signer)
}

pub(crate) fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
