//! EC key material
//!
//! [`EcPublicKey`] is bare key material as held by a key service.
//! [`OidPublicKey`] additionally names the TA-ECDSA algorithm the key is used
//! with and is what goes into the `7F49` element of a certificate.

use std::fmt;

use eac_asn1::{Asn1, Oid, Tag};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use zeroize::Zeroizing;

use crate::{
    constants::*,
    ec::{AffinePoint, EcDomainParameters, NamedCurve, to_fixed_be},
    ecdsa::SignatureAlgorithm,
    error::{Error, Result},
};

/// EC public key without an algorithm identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcPublicKey {
    domain: EcDomainParameters,
    point: AffinePoint,
}

impl EcPublicKey {
    /// Create a public key, checking that `point` lies on the curve
    pub fn new(domain: EcDomainParameters, point: AffinePoint) -> Result<Self> {
        if !domain.contains(&point) {
            return Err(Error::InvalidPoint);
        }
        Ok(Self { domain, point })
    }

    /// Curve of the key
    pub const fn domain(&self) -> &EcDomainParameters {
        &self.domain
    }

    /// Public point
    pub const fn point(&self) -> &AffinePoint {
        &self.point
    }

    /// Uncompressed encoding of the public point
    pub fn encoded_point(&self) -> Vec<u8> {
        self.domain.encode_point(&self.point)
    }

    /// Attach the algorithm identifier the key is used with
    pub fn with_oid(self, oid: Oid) -> OidPublicKey {
        OidPublicKey { oid, key: self }
    }
}

/// Public key tagged with its TA-ECDSA algorithm identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidPublicKey {
    oid: Oid,
    key: EcPublicKey,
}

impl OidPublicKey {
    /// Algorithm identifier
    pub const fn oid(&self) -> &Oid {
        &self.oid
    }

    /// Key material
    pub const fn key(&self) -> &EcPublicKey {
        &self.key
    }

    /// The signature algorithm named by the identifier
    pub fn algorithm(&self) -> Result<SignatureAlgorithm> {
        SignatureAlgorithm::from_oid(&self.oid)
    }

    /// Encode as a `7F49` public key element
    ///
    /// The full form carries the domain parameters (`81`..`85`, `87`) next to
    /// the public point `86` and is used inside CV certificates. The short
    /// form carries only the identifier and the point.
    pub fn to_asn1(&self, full: bool) -> Asn1 {
        let domain = self.key.domain();
        let mut children = vec![Asn1::from_oid(&self.oid)];
        if full {
            children.extend([
                Asn1::primitive(TAG_EC_PRIME, domain.p().to_bytes_be()),
                Asn1::primitive(TAG_EC_A, domain.a().to_bytes_be()),
                Asn1::primitive(TAG_EC_B, domain.b().to_bytes_be()),
                Asn1::primitive(TAG_EC_GENERATOR, domain.encode_point(domain.generator())),
                Asn1::primitive(TAG_EC_ORDER, domain.order().to_bytes_be()),
            ]);
        }
        children.push(Asn1::primitive(TAG_EC_PUBLIC_POINT, self.key.encoded_point()));
        if full {
            children.push(Asn1::primitive(TAG_EC_COFACTOR, domain.cofactor().to_bytes_be()));
        }
        Asn1::constructed(TAG_PUBLIC_KEY, children)
    }

    /// Decode a `7F49` public key element
    ///
    /// Keys in the short form take their curve from `fallback`, usually the
    /// domain parameters of the issuing certificate.
    pub fn from_asn1(node: &Asn1, fallback: Option<&EcDomainParameters>) -> Result<Self> {
        if node.tag() != TAG_PUBLIC_KEY {
            return Err(Error::UnsupportedKeyType("not a public key element"));
        }
        let oid = node
            .find(Tag::OBJECT_IDENTIFIER)
            .ok_or(Error::UnsupportedKeyType("public key carries no algorithm identifier"))?
            .to_oid()?;
        let domain = match domain_from_asn1(node)? {
            Some(domain) => domain,
            None => fallback.cloned().ok_or(Error::MissingElement("domain parameters"))?,
        };
        let point_bytes = node
            .find(TAG_EC_PUBLIC_POINT)
            .ok_or(Error::MissingElement("public point"))?
            .value();
        let point = domain.decode_point(&point_bytes)?;
        Ok(EcPublicKey::new(domain, point)?.with_oid(oid))
    }

    /// Verify `signature` over `message` with this key's algorithm
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        self.algorithm()?
            .verify(self.key.domain(), self.key.point(), message, signature)
    }
}

/// Explicit domain parameters of a `7F49` element, `None` if absent
pub(crate) fn domain_from_asn1(node: &Asn1) -> Result<Option<EcDomainParameters>> {
    let Some(prime) = node.find(TAG_EC_PRIME) else {
        return Ok(None);
    };
    let integer = |tag: Tag, name: &'static str| -> Result<BigUint> {
        node.find(tag)
            .map(|n| BigUint::from_bytes_be(&n.value()))
            .ok_or(Error::MissingElement(name))
    };
    let p = BigUint::from_bytes_be(&prime.value());
    let a = integer(TAG_EC_A, "curve coefficient a")?;
    let b = integer(TAG_EC_B, "curve coefficient b")?;
    let order = integer(TAG_EC_ORDER, "base point order")?;
    let cofactor = node
        .find(TAG_EC_COFACTOR)
        .map_or_else(BigUint::one, |n| BigUint::from_bytes_be(&n.value()));
    let generator_bytes = node
        .find(TAG_EC_GENERATOR)
        .ok_or(Error::MissingElement("base point"))?
        .value();

    let field_len = crate::ec::byte_len(&p);
    if generator_bytes.len() != 1 + 2 * field_len || generator_bytes[0] != 0x04 {
        return Err(Error::InvalidPoint);
    }
    let generator = AffinePoint {
        x: BigUint::from_bytes_be(&generator_bytes[1..=field_len]),
        y: BigUint::from_bytes_be(&generator_bytes[1 + field_len..]),
    };
    EcDomainParameters::new(p, a, b, generator, order, cofactor).map(Some)
}

/// EC private key, the scalar is wiped on drop
#[derive(Clone)]
pub struct EcPrivateKey {
    domain: EcDomainParameters,
    scalar: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for EcPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcPrivateKey")
            .field("curve", &self.domain.named_curve())
            .finish_non_exhaustive()
    }
}

impl EcPrivateKey {
    /// Generate a fresh key on `domain`
    pub fn generate(domain: &EcDomainParameters) -> Self {
        let scalar = domain.random_scalar(&mut rand::rng());
        Self {
            scalar: Zeroizing::new(to_fixed_be(&scalar, domain.order_len())),
            domain: domain.clone(),
        }
    }

    /// Create a key from its big-endian scalar
    pub fn from_scalar_bytes(domain: &EcDomainParameters, bytes: &[u8]) -> Result<Self> {
        let scalar = BigUint::from_bytes_be(bytes);
        if scalar.is_zero() || &scalar >= domain.order() {
            return Err(Error::InvalidPrivateKey("scalar out of range"));
        }
        Ok(Self {
            scalar: Zeroizing::new(to_fixed_be(&scalar, domain.order_len())),
            domain: domain.clone(),
        })
    }

    /// Curve of the key
    pub const fn domain(&self) -> &EcDomainParameters {
        &self.domain
    }

    /// Big-endian scalar, padded to the order length
    pub fn scalar_bytes(&self) -> &[u8] {
        &self.scalar
    }

    /// The matching public key
    pub fn public_key(&self) -> Result<EcPublicKey> {
        let point = self
            .domain
            .mul_generator(&BigUint::from_bytes_be(&self.scalar))
            .ok_or(Error::InvalidPrivateKey("scalar maps to infinity"))?;
        EcPublicKey::new(self.domain.clone(), point)
    }

    /// Sign `message` with `algorithm`
    pub fn sign(&self, algorithm: SignatureAlgorithm, message: &[u8]) -> Result<Vec<u8>> {
        algorithm.sign(&self.domain, &BigUint::from_bytes_be(&self.scalar), message)
    }

    /// Encode as an unencrypted PKCS#8 `PrivateKeyInfo` (RFC 5208, RFC 5915)
    ///
    /// Only keys on a registered named curve can be encoded.
    pub fn to_pkcs8(&self) -> Result<Zeroizing<Vec<u8>>> {
        let curve = self.domain.named_curve().ok_or(Error::UnknownCurve)?;
        let ec_private_key = Asn1::constructed(
            Tag::SEQUENCE,
            vec![
                Asn1::primitive(Tag::INTEGER, vec![0x01]),
                Asn1::primitive(Tag::OCTET_STRING, self.scalar.to_vec()),
            ],
        );
        let info = Asn1::constructed(
            Tag::SEQUENCE,
            vec![
                Asn1::primitive(Tag::INTEGER, vec![0x00]),
                Asn1::constructed(
                    Tag::SEQUENCE,
                    vec![Asn1::from_oid(&EC_PUBLIC_KEY), Asn1::from_oid(&curve.oid())],
                ),
                Asn1::primitive(Tag::OCTET_STRING, ec_private_key.encode()),
            ],
        );
        Ok(Zeroizing::new(info.encode()))
    }

    /// Decode an unencrypted PKCS#8 `PrivateKeyInfo` on a registered named curve
    pub fn from_pkcs8(bytes: &[u8]) -> Result<Self> {
        let info = Asn1::parse(bytes)?;
        let [version, algorithm, private_key, ..] = info.children() else {
            return Err(Error::InvalidPrivateKey("truncated PrivateKeyInfo"));
        };
        if version.tag() != Tag::INTEGER || version.value().as_ref() != [0x00] {
            return Err(Error::InvalidPrivateKey("unsupported PrivateKeyInfo version"));
        }
        let [key_type, curve, ..] = algorithm.children() else {
            return Err(Error::InvalidPrivateKey("truncated algorithm identifier"));
        };
        if key_type.to_oid()? != EC_PUBLIC_KEY {
            return Err(Error::InvalidPrivateKey("not an EC key"));
        }
        let curve = NamedCurve::from_oid(&curve.to_oid()?).ok_or(Error::UnknownCurve)?;

        if private_key.tag() != Tag::OCTET_STRING {
            return Err(Error::InvalidPrivateKey("private key is not an OCTET STRING"));
        }
        let ec_private_key = Asn1::parse(&private_key.value())?;
        let scalar = ec_private_key
            .find(Tag::OCTET_STRING)
            .ok_or(Error::InvalidPrivateKey("missing private scalar"))?;
        Self::from_scalar_bytes(&curve.domain(), &scalar.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::explicit_public_key;

    #[test]
    fn test_full_public_key_round_trip() {
        let domain = NamedCurve::BrainpoolP256r1.domain();
        let private = EcPrivateKey::generate(&domain);
        let key = private.public_key().unwrap().with_oid(TA_ECDSA_SHA_256);

        let node = key.to_asn1(true);
        let tags: Vec<_> = node.children().iter().map(|c| c.tag().value()).collect();
        assert_eq!(tags, vec![0x06, 0x81, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87]);

        let decoded = OidPublicKey::from_asn1(&Asn1::parse(&node.encode()).unwrap(), None).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_short_public_key_needs_domain() {
        let domain = NamedCurve::BrainpoolP384r1.domain();
        let key = EcPrivateKey::generate(&domain)
            .public_key()
            .unwrap()
            .with_oid(TA_ECDSA_SHA_384);
        let node = key.to_asn1(false);
        assert_eq!(node.children().len(), 2);
        assert!(matches!(
            OidPublicKey::from_asn1(&node, None),
            Err(Error::MissingElement(_))
        ));
        assert_eq!(OidPublicKey::from_asn1(&node, Some(&domain)).unwrap(), key);
    }

    #[test]
    fn test_degenerate_domain_parameters_rejected() {
        // p = 1, a = b = 0, G = (0, 0), n = 0
        let encoded = explicit_public_key(&[0x01], &[0x00], &[0x00], &[0x04, 0x00, 0x00], &[0x00]).encode();
        let node = Asn1::parse(&encoded).unwrap();
        assert!(matches!(domain_from_asn1(&node), Err(Error::InvalidCertificate(_))));
        assert!(OidPublicKey::from_asn1(&node, None).is_err());

        // valid curve over GF(17) with an order of 1
        let node = explicit_public_key(&[0x11], &[0x02], &[0x02], &[0x04, 0x05, 0x01], &[0x01]);
        assert!(matches!(domain_from_asn1(&node), Err(Error::InvalidCertificate(_))));

        // same curve, generator off the curve
        let node = explicit_public_key(&[0x11], &[0x02], &[0x02], &[0x04, 0x05, 0x02], &[0x13]);
        assert!(matches!(domain_from_asn1(&node), Err(Error::InvalidPoint)));

        let node = explicit_public_key(&[0x11], &[0x02], &[0x02], &[0x04, 0x05, 0x01], &[0x13]);
        let domain = domain_from_asn1(&node).unwrap().unwrap();
        assert_eq!(domain.order(), &BigUint::from(19u32));
    }

    #[test]
    fn test_public_key_without_oid_is_rejected() {
        let domain = NamedCurve::BrainpoolP256r1.domain();
        let node = Asn1::constructed(
            TAG_PUBLIC_KEY,
            vec![Asn1::primitive(TAG_EC_PUBLIC_POINT, domain.encode_point(domain.generator()))],
        );
        assert!(matches!(
            OidPublicKey::from_asn1(&node, Some(&domain)),
            Err(Error::UnsupportedKeyType(_))
        ));
    }

    #[test]
    fn test_pkcs8_round_trip() {
        for curve in NamedCurve::ALL {
            let private = EcPrivateKey::generate(&curve.domain());
            let encoded = private.to_pkcs8().unwrap();
            let decoded = EcPrivateKey::from_pkcs8(&encoded).unwrap();
            assert_eq!(decoded.scalar_bytes(), private.scalar_bytes());
            assert_eq!(decoded.domain().named_curve(), Some(curve));
        }
    }

    #[test]
    fn test_sign_with_private_key() {
        let domain = NamedCurve::BrainpoolP256r1.domain();
        let private = EcPrivateKey::generate(&domain);
        let public = private.public_key().unwrap().with_oid(TA_ECDSA_SHA_256);
        let signature = private
            .sign(SignatureAlgorithm::ECDSA_SHA_256, b"message")
            .unwrap();
        public.verify(b"message", &signature).unwrap();
    }

    #[test]
    fn test_scalar_range_checked() {
        let domain = NamedCurve::BrainpoolP256r1.domain();
        assert!(EcPrivateKey::from_scalar_bytes(&domain, &[0u8; 32]).is_err());
        assert!(EcPrivateKey::from_scalar_bytes(&domain, &domain.order().to_bytes_be()).is_err());
        assert!(EcPrivateKey::from_scalar_bytes(&domain, &[0x01]).is_ok());
    }
}
