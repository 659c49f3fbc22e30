//! Prime field elliptic curves with explicit domain parameters
//!
//! CV certificates carry their curve as explicit parameters (`p`, `a`, `b`,
//! `G`, `n`, `h`), so arithmetic is done generically over those values rather
//! than through per-curve types. Points are handled in Jacobian coordinates
//! internally and converted to affine form at the API boundary.

use eac_asn1::Oid;
use hex_literal::hex;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::RngCore;

use crate::{
    constants::{BRAINPOOL_P256R1, BRAINPOOL_P384R1, BRAINPOOL_P512R1},
    error::{Error, Result},
};

/// Leading byte of an uncompressed point encoding
const UNCOMPRESSED_POINT: u8 = 0x04;

/// An affine point on a curve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinePoint {
    /// x coordinate
    pub x: BigUint,
    /// y coordinate
    pub y: BigUint,
}

/// Point in Jacobian coordinates, `z == 0` is the point at infinity
#[derive(Debug, Clone)]
struct JacobianPoint {
    x: BigUint,
    y: BigUint,
    z: BigUint,
}

impl JacobianPoint {
    fn infinity() -> Self {
        Self {
            x: BigUint::one(),
            y: BigUint::one(),
            z: BigUint::zero(),
        }
    }

    fn from_affine(point: &AffinePoint) -> Self {
        Self {
            x: point.x.clone(),
            y: point.y.clone(),
            z: BigUint::one(),
        }
    }

    fn is_infinity(&self) -> bool {
        self.z.is_zero()
    }
}

/// Curves registered with an object identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedCurve {
    /// brainpoolP256r1 (RFC 5639)
    BrainpoolP256r1,
    /// brainpoolP384r1 (RFC 5639)
    BrainpoolP384r1,
    /// brainpoolP512r1 (RFC 5639)
    BrainpoolP512r1,
}

impl NamedCurve {
    /// All registered curves
    pub const ALL: [Self; 3] = [
        Self::BrainpoolP256r1,
        Self::BrainpoolP384r1,
        Self::BrainpoolP512r1,
    ];

    /// Object identifier of the curve
    pub const fn oid(self) -> Oid {
        match self {
            Self::BrainpoolP256r1 => BRAINPOOL_P256R1,
            Self::BrainpoolP384r1 => BRAINPOOL_P384R1,
            Self::BrainpoolP512r1 => BRAINPOOL_P512R1,
        }
    }

    /// Look up a curve by object identifier
    pub fn from_oid(oid: &Oid) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.oid() == *oid)
    }

    /// Domain parameters of the curve
    pub fn domain(self) -> EcDomainParameters {
        match self {
            Self::BrainpoolP256r1 => EcDomainParameters::from_be_bytes(
                &hex!("A9FB57DBA1EEA9BC3E660A909D838D726E3BF623D52620282013481D1F6E5377"),
                &hex!("7D5A0975FC2C3057EEF67530417AFFE7FB8055C126DC5C6CE94A4B44F330B5D9"),
                &hex!("26DC5C6CE94A4B44F330B5D9BBD77CBF958416295CF7E1CE6BCCDC18FF8C07B6"),
                &hex!("8BD2AEB9CB7E57CB2C4B482FFC81B7AFB9DE27E1E3BD23C23A4453BD9ACE3262"),
                &hex!("547EF835C3DAC4FD97F8461A14611DC9C27745132DED8E545C1D54C72F046997"),
                &hex!("A9FB57DBA1EEA9BC3E660A909D838D718C397AA3B561A6F7901E0E82974856A7"),
            ),
            Self::BrainpoolP384r1 => EcDomainParameters::from_be_bytes(
                &hex!(
                    "8CB91E82A3386D280F5D6F7E50E641DF152F7109ED5456B412B1DA197FB71123"
                    "ACD3A729901D1A71874700133107EC53"
                ),
                &hex!(
                    "7BC382C63D8C150C3C72080ACE05AFA0C2BEA28E4FB22787139165EFBA91F90F"
                    "8AA5814A503AD4EB04A8C7DD22CE2826"
                ),
                &hex!(
                    "04A8C7DD22CE28268B39B55416F0447C2FB77DE107DCD2A62E880EA53EEB62D5"
                    "7CB4390295DBC9943AB78696FA504C11"
                ),
                &hex!(
                    "1D1C64F068CF45FFA2A63A81B7C13F6B8847A3E77EF14FE3DB7FCAFE0CBD10E8"
                    "E826E03436D646AAEF87B2E247D4AF1E"
                ),
                &hex!(
                    "8ABE1D7520F9C2A45CB1EB8E95CFD55262B70B29FEEC5864E19C054FF9912928"
                    "0E4646217791811142820341263C5315"
                ),
                &hex!(
                    "8CB91E82A3386D280F5D6F7E50E641DF152F7109ED5456B31F166E6CAC0425A7"
                    "CF3AB6AF6B7FC3103B883202E9046565"
                ),
            ),
            Self::BrainpoolP512r1 => EcDomainParameters::from_be_bytes(
                &hex!(
                    "AADD9DB8DBE9C48B3FD4E6AE33C9FC07CB308DB3B3C9D20ED6639CCA70330871"
                    "7D4D9B009BC66842AECDA12AE6A380E62881FF2F2D82C68528AA6056583A48F3"
                ),
                &hex!(
                    "7830A3318B603B89E2327145AC234CC594CBDD8D3DF91610A83441CAEA9863BC"
                    "2DED5D5AA8253AA10A2EF1C98B9AC8B57F1117A72BF2C7B9E7C1AC4D77FC94CA"
                ),
                &hex!(
                    "3DF91610A83441CAEA9863BC2DED5D5AA8253AA10A2EF1C98B9AC8B57F1117A7"
                    "2BF2C7B9E7C1AC4D77FC94CADC083E67984050B75EBAE5DD2809BD638016F723"
                ),
                &hex!(
                    "81AEE4BDD82ED9645A21322E9C4C6A9385ED9F70B5D916C1B43B62EEF4D0098E"
                    "FF3B1F78E2D0D48D50D1687B93B97D5F7C6D5047406A5E688B352209BCB9F822"
                ),
                &hex!(
                    "7DDE385D566332ECC0EABFA9CF7822FDF209F70024A57B1AA000C55B881F8111"
                    "B2DCDE494A5F485E5BCA4BD88A2763AED1CA2B2FA8F0540678CD1E0F3AD80892"
                ),
                &hex!(
                    "AADD9DB8DBE9C48B3FD4E6AE33C9FC07CB308DB3B3C9D20ED6639CCA70330870"
                    "553E5C414CA92619418661197FAC10471DB1D381085DDADDB58796829CA90069"
                ),
            ),
        }
    }
}

/// Short Weierstrass curve `y^2 = x^3 + ax + b` over `GF(p)` with base point `G` of order `n`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcDomainParameters {
    p: BigUint,
    a: BigUint,
    b: BigUint,
    generator: AffinePoint,
    order: BigUint,
    cofactor: BigUint,
}

impl EcDomainParameters {
    /// Create domain parameters from their components
    ///
    /// # Errors
    ///
    /// Rejects a modulus that is even or not greater than 3, coefficients or
    /// generator coordinates outside `[0, p)`, a singular curve, an order
    /// below 2 or one that does not annihilate the generator, and a zero
    /// cofactor.
    pub fn new(
        p: BigUint,
        a: BigUint,
        b: BigUint,
        generator: AffinePoint,
        order: BigUint,
        cofactor: BigUint,
    ) -> Result<Self> {
        if p <= BigUint::from(3u32) || !p.bit(0) {
            return Err(Error::InvalidCertificate("prime modulus must be odd and greater than 3"));
        }
        if a >= p || b >= p {
            return Err(Error::InvalidCertificate("curve coefficient not reduced modulo p"));
        }
        if order < BigUint::from(2u32) {
            return Err(Error::InvalidCertificate("base point order below 2"));
        }
        if cofactor.is_zero() {
            return Err(Error::InvalidCertificate("cofactor is zero"));
        }

        let domain = Self {
            p,
            a,
            b,
            generator,
            order,
            cofactor,
        };
        // 4a^3 + 27b^2 != 0 (mod p)
        let discriminant = (&domain.a * &domain.a * &domain.a * 4u32 + &domain.b * &domain.b * 27u32) % &domain.p;
        if discriminant.is_zero() {
            return Err(Error::InvalidCertificate("singular curve"));
        }
        if !domain.contains(&domain.generator) {
            return Err(Error::InvalidPoint);
        }
        if domain.mul_generator(&domain.order).is_some() {
            return Err(Error::InvalidCertificate("order does not match the base point"));
        }
        Ok(domain)
    }

    /// Registered curves only, their parameters are known to be valid
    fn from_be_bytes(p: &[u8], a: &[u8], b: &[u8], gx: &[u8], gy: &[u8], n: &[u8]) -> Self {
        Self {
            p: BigUint::from_bytes_be(p),
            a: BigUint::from_bytes_be(a),
            b: BigUint::from_bytes_be(b),
            generator: AffinePoint {
                x: BigUint::from_bytes_be(gx),
                y: BigUint::from_bytes_be(gy),
            },
            order: BigUint::from_bytes_be(n),
            cofactor: BigUint::one(),
        }
    }

    /// Prime modulus
    pub const fn p(&self) -> &BigUint {
        &self.p
    }

    /// First coefficient
    pub const fn a(&self) -> &BigUint {
        &self.a
    }

    /// Second coefficient
    pub const fn b(&self) -> &BigUint {
        &self.b
    }

    /// Base point
    pub const fn generator(&self) -> &AffinePoint {
        &self.generator
    }

    /// Order of the base point
    pub const fn order(&self) -> &BigUint {
        &self.order
    }

    /// Cofactor
    pub const fn cofactor(&self) -> &BigUint {
        &self.cofactor
    }

    /// Byte length of field elements
    pub fn field_len(&self) -> usize {
        byte_len(&self.p)
    }

    /// Byte length of scalars
    pub fn order_len(&self) -> usize {
        byte_len(&self.order)
    }

    /// The registered curve these parameters describe, if any
    pub fn named_curve(&self) -> Option<NamedCurve> {
        NamedCurve::ALL.into_iter().find(|c| {
            let named = c.domain();
            named.p == self.p && named.a == self.a && named.b == self.b && named.generator == self.generator
        })
    }

    /// Whether `point` satisfies the curve equation
    pub fn contains(&self, point: &AffinePoint) -> bool {
        if point.x >= self.p || point.y >= self.p {
            return false;
        }
        let lhs = (&point.y * &point.y) % &self.p;
        let rhs = (&point.x * &point.x * &point.x + &self.a * &point.x + &self.b) % &self.p;
        lhs == rhs
    }

    /// Uncompressed encoding `04 || X || Y`
    pub fn encode_point(&self, point: &AffinePoint) -> Vec<u8> {
        let len = self.field_len();
        let mut out = Vec::with_capacity(1 + 2 * len);
        out.push(UNCOMPRESSED_POINT);
        out.extend_from_slice(&to_fixed_be(&point.x, len));
        out.extend_from_slice(&to_fixed_be(&point.y, len));
        out
    }

    /// Decode an uncompressed point and check that it lies on the curve
    pub fn decode_point(&self, bytes: &[u8]) -> Result<AffinePoint> {
        let len = self.field_len();
        if bytes.len() != 1 + 2 * len || bytes[0] != UNCOMPRESSED_POINT {
            return Err(Error::InvalidPoint);
        }
        let point = AffinePoint {
            x: BigUint::from_bytes_be(&bytes[1..=len]),
            y: BigUint::from_bytes_be(&bytes[1 + len..]),
        };
        if !self.contains(&point) {
            return Err(Error::InvalidPoint);
        }
        Ok(point)
    }

    /// Uniformly distributed scalar in `[1, n - 1]`
    pub fn random_scalar(&self, rng: &mut impl RngCore) -> BigUint {
        // 64 extra bits keep the modular bias negligible
        let mut bytes = vec![0u8; self.order_len() + 8];
        rng.fill_bytes(&mut bytes);
        let range = &self.order - 1u32;
        BigUint::from_bytes_be(&bytes) % range + 1u32
    }

    /// `k * G`
    pub fn mul_generator(&self, k: &BigUint) -> Option<AffinePoint> {
        self.mul(&self.generator, k)
    }

    /// `k * P`, `None` for the point at infinity
    pub fn mul(&self, point: &AffinePoint, k: &BigUint) -> Option<AffinePoint> {
        let result = self.mul_jacobian(&JacobianPoint::from_affine(point), k);
        self.to_affine(&result)
    }

    /// `k1 * P1 + k2 * P2`, `None` for the point at infinity
    pub fn mul_add(
        &self,
        k1: &BigUint,
        p1: &AffinePoint,
        k2: &BigUint,
        p2: &AffinePoint,
    ) -> Option<AffinePoint> {
        let first = self.mul_jacobian(&JacobianPoint::from_affine(p1), k1);
        let second = self.mul_jacobian(&JacobianPoint::from_affine(p2), k2);
        self.to_affine(&self.add(&first, &second))
    }

    /// Montgomery ladder, one add and one double per bit of `max(n, k)`
    fn mul_jacobian(&self, point: &JacobianPoint, k: &BigUint) -> JacobianPoint {
        let bits = self.order.bits().max(k.bits());
        let mut r0 = JacobianPoint::infinity();
        let mut r1 = point.clone();
        for i in (0..bits).rev() {
            if k.bit(i) {
                r0 = self.add(&r0, &r1);
                r1 = self.double(&r1);
            } else {
                r1 = self.add(&r0, &r1);
                r0 = self.double(&r0);
            }
        }
        r0
    }

    fn to_affine(&self, point: &JacobianPoint) -> Option<AffinePoint> {
        if point.is_infinity() {
            return None;
        }
        let z_inv = self.inv_p(&point.z);
        let z_inv2 = self.mul_p(&z_inv, &z_inv);
        let z_inv3 = self.mul_p(&z_inv2, &z_inv);
        Some(AffinePoint {
            x: self.mul_p(&point.x, &z_inv2),
            y: self.mul_p(&point.y, &z_inv3),
        })
    }

    fn double(&self, point: &JacobianPoint) -> JacobianPoint {
        if point.is_infinity() || point.y.is_zero() {
            return JacobianPoint::infinity();
        }
        let y2 = self.mul_p(&point.y, &point.y);
        let s = (&point.x * &y2 * 4u32) % &self.p;
        let z2 = self.mul_p(&point.z, &point.z);
        let z4 = self.mul_p(&z2, &z2);
        let m = (&point.x * &point.x * 3u32 + &self.a * z4) % &self.p;
        let x3 = self.sub_p(&self.mul_p(&m, &m), &((&s * 2u32) % &self.p));
        let y4 = self.mul_p(&y2, &y2);
        let y3 = self.sub_p(&self.mul_p(&m, &self.sub_p(&s, &x3)), &((y4 * 8u32) % &self.p));
        let z3 = (&point.y * &point.z * 2u32) % &self.p;
        JacobianPoint { x: x3, y: y3, z: z3 }
    }

    fn add(&self, p1: &JacobianPoint, p2: &JacobianPoint) -> JacobianPoint {
        if p1.is_infinity() {
            return p2.clone();
        }
        if p2.is_infinity() {
            return p1.clone();
        }
        let z1z1 = self.mul_p(&p1.z, &p1.z);
        let z2z2 = self.mul_p(&p2.z, &p2.z);
        let u1 = self.mul_p(&p1.x, &z2z2);
        let u2 = self.mul_p(&p2.x, &z1z1);
        let s1 = self.mul_p(&p1.y, &self.mul_p(&z2z2, &p2.z));
        let s2 = self.mul_p(&p2.y, &self.mul_p(&z1z1, &p1.z));

        if u1 == u2 {
            return if s1 == s2 {
                self.double(p1)
            } else {
                JacobianPoint::infinity()
            };
        }

        let h = self.sub_p(&u2, &u1);
        let r = self.sub_p(&s2, &s1);
        let h2 = self.mul_p(&h, &h);
        let h3 = self.mul_p(&h2, &h);
        let u1h2 = self.mul_p(&u1, &h2);
        let x3 = self.sub_p(&self.sub_p(&self.mul_p(&r, &r), &h3), &((&u1h2 * 2u32) % &self.p));
        let y3 = self.sub_p(&self.mul_p(&r, &self.sub_p(&u1h2, &x3)), &self.mul_p(&s1, &h3));
        let z3 = self.mul_p(&h, &self.mul_p(&p1.z, &p2.z));
        JacobianPoint { x: x3, y: y3, z: z3 }
    }

    fn mul_p(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.p
    }

    fn sub_p(&self, a: &BigUint, b: &BigUint) -> BigUint {
        ((a + &self.p) - (b % &self.p)) % &self.p
    }

    fn inv_p(&self, a: &BigUint) -> BigUint {
        // p is prime, so a^(p-2) is the inverse
        a.modpow(&(&self.p - 2u32), &self.p)
    }
}

/// Byte length of the big-endian encoding of `value`
pub(crate) fn byte_len(value: &BigUint) -> usize {
    value.bits().div_ceil(8) as usize
}

/// Big-endian encoding left-padded with zeros to `len` bytes
pub(crate) fn to_fixed_be(value: &BigUint, len: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    if bytes.len() >= len {
        return bytes[bytes.len() - len..].to_vec();
    }
    let mut out = vec![0u8; len - bytes.len()];
    out.extend_from_slice(&bytes);
    out
}
