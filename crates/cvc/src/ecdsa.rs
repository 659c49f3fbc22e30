//! TA-ECDSA signatures in plain `r || s` format

use eac_asn1::Oid;
use num_bigint::BigUint;
use num_traits::Zero;
use rfc6979::HmacDrbg;
use sha1::Sha1;
use sha2::{
    Digest, Sha224, Sha256, Sha384, Sha512,
    digest::{FixedOutputReset, core_api::BlockSizeUser},
};
use tracing::trace;
use zeroize::Zeroizing;

use crate::{
    constants::{TA_ECDSA_SHA_1, TA_ECDSA_SHA_224, TA_ECDSA_SHA_256, TA_ECDSA_SHA_384, TA_ECDSA_SHA_512},
    ec::{AffinePoint, EcDomainParameters, to_fixed_be},
    error::{Error, Result},
};

/// Nonce candidates drawn before giving up on a degenerate curve
const MAX_NONCE_ATTEMPTS: usize = 64;

/// Message digest used by a signature algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-1
    Sha1,
    /// SHA-224
    Sha224,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl HashAlgorithm {
    /// Hash `data`
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha224 => Sha224::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// Signature algorithms usable for CV certificates
///
/// Only the TA-ECDSA family is supported. Every other identifier is
/// rejected by [`SignatureAlgorithm::from_oid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// ECDSA over the hash of the message, signature as `r || s`
    TaEcdsa(HashAlgorithm),
}

impl SignatureAlgorithm {
    /// id-TA-ECDSA-SHA-256
    pub const ECDSA_SHA_256: Self = Self::TaEcdsa(HashAlgorithm::Sha256);

    const REGISTERED: [(Oid, HashAlgorithm); 5] = [
        (TA_ECDSA_SHA_1, HashAlgorithm::Sha1),
        (TA_ECDSA_SHA_224, HashAlgorithm::Sha224),
        (TA_ECDSA_SHA_256, HashAlgorithm::Sha256),
        (TA_ECDSA_SHA_384, HashAlgorithm::Sha384),
        (TA_ECDSA_SHA_512, HashAlgorithm::Sha512),
    ];

    /// Resolve the algorithm named by `oid`
    pub fn from_oid(oid: &Oid) -> Result<Self> {
        let hash = Self::REGISTERED
            .iter()
            .find(|(registered, _)| registered == oid)
            .map(|(_, hash)| *hash)
            .ok_or(Error::UnsupportedAlgorithm(*oid))?;
        Ok(Self::TaEcdsa(hash))
    }

    /// Object identifier of the algorithm
    pub const fn oid(self) -> Oid {
        match self {
            Self::TaEcdsa(HashAlgorithm::Sha1) => TA_ECDSA_SHA_1,
            Self::TaEcdsa(HashAlgorithm::Sha224) => TA_ECDSA_SHA_224,
            Self::TaEcdsa(HashAlgorithm::Sha256) => TA_ECDSA_SHA_256,
            Self::TaEcdsa(HashAlgorithm::Sha384) => TA_ECDSA_SHA_384,
            Self::TaEcdsa(HashAlgorithm::Sha512) => TA_ECDSA_SHA_512,
        }
    }

    /// Message digest of the algorithm
    pub const fn hash(self) -> HashAlgorithm {
        match self {
            Self::TaEcdsa(hash) => hash,
        }
    }

    /// Sign `message` with the private scalar `d`
    ///
    /// The nonce is derived deterministically from `d` and the message hash
    /// (RFC 6979), using the algorithm's own digest for the HMAC-DRBG.
    ///
    /// # Returns
    ///
    /// `r || s`, each half left-padded to the byte length of the curve order.
    pub fn sign(self, domain: &EcDomainParameters, d: &BigUint, message: &[u8]) -> Result<Vec<u8>> {
        if d.is_zero() || d >= domain.order() {
            return Err(Error::InvalidPrivateKey("scalar out of range"));
        }
        match self.hash() {
            HashAlgorithm::Sha1 => self.sign_with::<Sha1>(domain, d, message),
            HashAlgorithm::Sha224 => self.sign_with::<Sha224>(domain, d, message),
            HashAlgorithm::Sha256 => self.sign_with::<Sha256>(domain, d, message),
            HashAlgorithm::Sha384 => self.sign_with::<Sha384>(domain, d, message),
            HashAlgorithm::Sha512 => self.sign_with::<Sha512>(domain, d, message),
        }
    }

    fn sign_with<D>(self, domain: &EcDomainParameters, d: &BigUint, message: &[u8]) -> Result<Vec<u8>>
    where
        D: Digest + BlockSizeUser + FixedOutputReset,
    {
        let n = domain.order();
        let len = domain.order_len();
        let e = self.message_scalar(domain, message);

        // int2octets(d) and bits2octets(H(m))
        let x = Zeroizing::new(to_fixed_be(d, len));
        let h = to_fixed_be(&(&e % n), len);
        let mut drbg = HmacDrbg::<D>::new(x.as_slice(), &h, &[]);
        let excess_bits = len as u64 * 8 - n.bits();
        let mut candidate = Zeroizing::new(vec![0u8; len]);

        for _ in 0..MAX_NONCE_ATTEMPTS {
            drbg.fill_bytes(candidate.as_mut_slice());
            let k = BigUint::from_bytes_be(&candidate) >> excess_bits;
            if k.is_zero() || &k >= n {
                continue;
            }
            let Some(point) = domain.mul_generator(&k) else {
                continue;
            };
            let r = &point.x % n;
            if r.is_zero() {
                continue;
            }
            let s = (inv_mod(&k, n) * ((&e + &r * d) % n)) % n;
            if s.is_zero() {
                continue;
            }

            let mut signature = to_fixed_be(&r, len);
            signature.extend_from_slice(&to_fixed_be(&s, len));
            trace!(algorithm = ?self, len = signature.len(), "created signature");
            return Ok(signature);
        }
        Err(Error::NoUsableNonce)
    }

    /// Verify a plain `r || s` signature over `message`
    pub fn verify(
        self,
        domain: &EcDomainParameters,
        public: &AffinePoint,
        message: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        let len = domain.order_len();
        if signature.len() != 2 * len {
            return Err(Error::InvalidSignature);
        }
        let n = domain.order();
        let r = BigUint::from_bytes_be(&signature[..len]);
        let s = BigUint::from_bytes_be(&signature[len..]);
        if r.is_zero() || s.is_zero() || &r >= n || &s >= n {
            return Err(Error::InvalidSignature);
        }
        if !domain.contains(public) {
            return Err(Error::InvalidPoint);
        }

        let e = self.message_scalar(domain, message);
        let w = inv_mod(&s, n);
        let u1 = (&e * &w) % n;
        let u2 = (&r * &w) % n;
        let point = domain
            .mul_add(&u1, domain.generator(), &u2, public)
            .ok_or(Error::InvalidSignature)?;

        if &point.x % n == r {
            Ok(())
        } else {
            Err(Error::InvalidSignature)
        }
    }

    /// Leftmost `bits(n)` bits of the message digest as an integer
    fn message_scalar(self, domain: &EcDomainParameters, message: &[u8]) -> BigUint {
        let digest = self.hash().digest(message);
        let digest_bits = digest.len() as u64 * 8;
        let order_bits = domain.order().bits();
        let e = BigUint::from_bytes_be(&digest);
        if digest_bits > order_bits {
            e >> (digest_bits - order_bits)
        } else {
            e
        }
    }
}

/// Inverse modulo the prime `n`
fn inv_mod(value: &BigUint, n: &BigUint) -> BigUint {
    value.modpow(&(n - 2u32), n)
}
