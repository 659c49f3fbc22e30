//! Key-pair provisioning for new certificate holder references

use std::fmt;

use tracing::debug;

use crate::{
    certificate::CvCertificate,
    ecdsa::SignatureAlgorithm,
    error::{Error, Result},
    key::{EcPrivateKey, OidPublicKey},
    key_service::{KeyAlgorithm, KeyGenerationRequest, KeyService, KeyServiceError},
};

/// Validity in months of keys generated for a request
pub const LIFESPAN_MONTHS: u32 = 2;

/// Whether provisioning reuses a stored key or generates a new one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyDisposition {
    /// Always generate, replacing any stored key
    Replace,
    /// Use the stored key, failing if there is none
    UsePresent,
    /// Use the stored key if there is one, generate otherwise
    GenerateIfNotPresent,
}

/// A provisioned key pair
#[derive(Debug, Clone)]
pub struct CvcKeyPair {
    /// Public key tagged with the root certificate's algorithm
    pub public: OidPublicKey,
    /// Private key, `None` when it stays inside the key service
    pub private: Option<EcPrivateKey>,
}

/// Resolves or generates the key pair for a holder reference
pub struct CvcKeyPairBuilder<'a> {
    service: &'a dyn KeyService,
    issuer_alias: Option<&'a str>,
}

impl fmt::Debug for CvcKeyPairBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CvcKeyPairBuilder")
            .field("issuer_alias", &self.issuer_alias)
            .finish_non_exhaustive()
    }
}

impl<'a> CvcKeyPairBuilder<'a> {
    /// Create a builder over `service`
    pub const fn new(service: &'a dyn KeyService) -> Self {
        Self {
            service,
            issuer_alias: None,
        }
    }

    /// Record the issuing key's alias with generated keys
    pub fn issuer_alias(mut self, alias: &'a str) -> Self {
        self.issuer_alias = Some(alias);
        self
    }

    /// Provision the key for `alias` on the curve of `root`
    ///
    /// # Arguments
    ///
    /// * `root` - certificate carrying the algorithm and domain parameters
    /// * `alias` - the new certificate holder reference
    /// * `disposition` - reuse policy
    ///
    /// # Returns
    ///
    /// The public key tagged with the root's algorithm identifier, and the
    /// private key if the service hands it out.
    pub fn key_pair(
        &self,
        root: &CvCertificate,
        alias: &str,
        disposition: KeyDisposition,
    ) -> Result<CvcKeyPair> {
        SignatureAlgorithm::from_oid(&root.public_key_oid()?)?;

        match disposition {
            KeyDisposition::UsePresent => self.present(root, alias),
            KeyDisposition::Replace => self.generate(root, alias, true),
            KeyDisposition::GenerateIfNotPresent => match self.service.contains_key(alias) {
                Ok(true) => match self.present(root, alias) {
                    Err(Error::KeyService(KeyServiceError::Unsupported(_))) => {
                        self.generate(root, alias, true)
                    }
                    other => other,
                },
                Ok(false) => self.generate(root, alias, false),
                Err(KeyServiceError::Unsupported(op)) => {
                    debug!(alias, op, "existence check unsupported, generating");
                    self.generate(root, alias, true)
                }
                Err(err) => Err(err.into()),
            },
        }
    }

    fn present(&self, root: &CvCertificate, alias: &str) -> Result<CvcKeyPair> {
        let public = self.service.public_key(alias)?;
        debug!(alias, "using present key");
        Ok(CvcKeyPair {
            public: public.with_oid(root.public_key_oid()?),
            private: None,
        })
    }

    fn generate(&self, root: &CvCertificate, alias: &str, overwrite: bool) -> Result<CvcKeyPair> {
        let domain = root.domain_parameters()?;
        let generated = self.service.generate_key_pair(&KeyGenerationRequest {
            algorithm: KeyAlgorithm::Ec,
            domain: &domain,
            alias,
            issuer_alias: self.issuer_alias,
            overwrite,
            lifespan_months: LIFESPAN_MONTHS,
        })?;
        debug!(alias, overwrite, "generated key pair");
        Ok(CvcKeyPair {
            public: generated.public.with_oid(root.public_key_oid()?),
            private: generated.private,
        })
    }
}
