//! Key storage and signing behind an HSM-like interface
//!
//! Private keys of certificate holders usually live in a hardware security
//! module and are only ever addressed by alias. [`KeyService`] is the narrow
//! interface the request pipeline needs from such a module;
//! [`SoftwareKeyService`] keeps keys in memory for tests, tooling and for
//! keys handed in as raw bytes.

use std::collections::HashMap;

use eac_asn1::Oid;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    ec::EcDomainParameters,
    ecdsa::SignatureAlgorithm,
    key::{EcPrivateKey, EcPublicKey},
};

/// Error type for key service operations
#[derive(Debug, Error)]
pub enum KeyServiceError {
    /// The service does not implement the operation
    #[error("operation not supported by key service: {0}")]
    Unsupported(&'static str),

    /// Nothing is stored under the alias
    #[error("no key stored under alias {0}")]
    KeyNotFound(String),

    /// A key exists and overwriting was not requested
    #[error("key already stored under alias {0}")]
    KeyExists(String),

    /// Key generation or signing failed
    #[error("cryptographic failure: {0}")]
    Crypto(#[source] Box<crate::Error>),
}

impl From<crate::Error> for KeyServiceError {
    fn from(err: crate::Error) -> Self {
        Self::Crypto(Box::new(err))
    }
}

/// Key families a service can generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    /// Elliptic curve keys over explicit prime field domain parameters
    Ec,
}

/// Parameters for generating a key pair under an alias
#[derive(Debug, Clone)]
pub struct KeyGenerationRequest<'a> {
    /// Key family
    pub algorithm: KeyAlgorithm,
    /// Curve of the new key
    pub domain: &'a EcDomainParameters,
    /// Alias to store the key under, the new holder reference
    pub alias: &'a str,
    /// Alias of the issuing key, if the service tracks key hierarchies
    pub issuer_alias: Option<&'a str>,
    /// Replace an existing key under the same alias
    pub overwrite: bool,
    /// Validity of the key in months
    pub lifespan_months: u32,
}

/// Result of a key generation
#[derive(Debug, Clone)]
pub struct GeneratedKeyPair {
    /// Public half
    pub public: EcPublicKey,
    /// Private half, `None` when it never leaves the service
    pub private: Option<EcPrivateKey>,
}

/// HSM-like key store and signer
///
/// Implementations serialise access per alias. Operations a backend does not
/// offer report [`KeyServiceError::Unsupported`], which callers can tell
/// apart from a key simply being absent.
pub trait KeyService {
    /// Sign `data` with the key stored under `alias` using the algorithm `oid`
    fn sign(&self, alias: &str, oid: &Oid, data: &[u8]) -> Result<Vec<u8>, KeyServiceError>;

    /// Generate and store a key pair
    fn generate_key_pair(
        &self,
        request: &KeyGenerationRequest<'_>,
    ) -> Result<GeneratedKeyPair, KeyServiceError>;

    /// Whether a key is stored under `alias`
    fn contains_key(&self, alias: &str) -> Result<bool, KeyServiceError>;

    /// Public key stored under `alias`
    fn public_key(&self, alias: &str) -> Result<EcPublicKey, KeyServiceError>;

    /// Store an existing private key under `alias`
    fn import_private_key(
        &self,
        alias: &str,
        key: EcPrivateKey,
        overwrite: bool,
    ) -> Result<(), KeyServiceError> {
        let _ = (alias, key, overwrite);
        Err(KeyServiceError::Unsupported("import_private_key"))
    }

    /// Delete the key under `alias`, returning whether one was stored
    fn delete_key(&self, alias: &str) -> Result<bool, KeyServiceError> {
        let _ = alias;
        Err(KeyServiceError::Unsupported("delete_key"))
    }
}

#[derive(Debug)]
struct StoredKey {
    private: EcPrivateKey,
    public: EcPublicKey,
    issuer_alias: Option<String>,
    lifespan_months: Option<u32>,
}

/// In-memory key service
#[derive(Debug, Default)]
pub struct SoftwareKeyService {
    keys: Mutex<HashMap<String, StoredKey>>,
}

impl SoftwareKeyService {
    /// Create an empty service
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    /// Whether no key is stored
    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }

    /// Lifespan requested when the key under `alias` was generated
    pub fn lifespan_months(&self, alias: &str) -> Option<u32> {
        self.keys.lock().get(alias).and_then(|k| k.lifespan_months)
    }

    /// Alias of the issuing key recorded at generation
    pub fn issuer_alias(&self, alias: &str) -> Option<String> {
        self.keys.lock().get(alias).and_then(|k| k.issuer_alias.clone())
    }

    fn store(
        &self,
        alias: &str,
        key: StoredKey,
        overwrite: bool,
    ) -> Result<(), KeyServiceError> {
        let mut keys = self.keys.lock();
        if !overwrite && keys.contains_key(alias) {
            return Err(KeyServiceError::KeyExists(alias.to_string()));
        }
        keys.insert(alias.to_string(), key);
        Ok(())
    }
}

impl KeyService for SoftwareKeyService {
    fn sign(&self, alias: &str, oid: &Oid, data: &[u8]) -> Result<Vec<u8>, KeyServiceError> {
        let algorithm = SignatureAlgorithm::from_oid(oid)?;
        let keys = self.keys.lock();
        let key = keys
            .get(alias)
            .ok_or_else(|| KeyServiceError::KeyNotFound(alias.to_string()))?;
        trace!(alias, %oid, len = data.len(), "signing");
        Ok(key.private.sign(algorithm, data)?)
    }

    fn generate_key_pair(
        &self,
        request: &KeyGenerationRequest<'_>,
    ) -> Result<GeneratedKeyPair, KeyServiceError> {
        let KeyAlgorithm::Ec = request.algorithm;
        let private = EcPrivateKey::generate(request.domain);
        let public = private.public_key()?;
        self.store(
            request.alias,
            StoredKey {
                private: private.clone(),
                public: public.clone(),
                issuer_alias: request.issuer_alias.map(str::to_string),
                lifespan_months: Some(request.lifespan_months),
            },
            request.overwrite,
        )?;
        debug!(
            alias = request.alias,
            overwrite = request.overwrite,
            lifespan_months = request.lifespan_months,
            "generated key pair"
        );
        Ok(GeneratedKeyPair {
            public,
            private: Some(private),
        })
    }

    fn contains_key(&self, alias: &str) -> Result<bool, KeyServiceError> {
        Ok(self.keys.lock().contains_key(alias))
    }

    fn public_key(&self, alias: &str) -> Result<EcPublicKey, KeyServiceError> {
        self.keys
            .lock()
            .get(alias)
            .map(|k| k.public.clone())
            .ok_or_else(|| KeyServiceError::KeyNotFound(alias.to_string()))
    }

    fn import_private_key(
        &self,
        alias: &str,
        key: EcPrivateKey,
        overwrite: bool,
    ) -> Result<(), KeyServiceError> {
        let public = key.public_key()?;
        self.store(
            alias,
            StoredKey {
                private: key,
                public,
                issuer_alias: None,
                lifespan_months: None,
            },
            overwrite,
        )?;
        debug!(alias, "imported private key");
        Ok(())
    }

    fn delete_key(&self, alias: &str) -> Result<bool, KeyServiceError> {
        Ok(self.keys.lock().remove(alias).is_some())
    }
}
