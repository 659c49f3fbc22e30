//! Certificate requests
//!
//! A request is a CV certificate body signed with the new key (the inner
//! signature), optionally wrapped in an authentication element that carries
//! an outer CA reference and a signature with a key the issuer already
//! trusts. First requests of a holder have no trusted key yet and are sent
//! as the bare `7F21`.
//!
//! Bare requests are held wrapped in `67` so that every
//! [`CertificateRequestPath`] resolves against either shape. The wrapper is
//! dropped again on [`CertificateRequest::encode`].

use eac_asn1::{Asn1, Oid};
use tracing::{debug, trace};

use crate::{
    certificate::reference_string,
    constants::*,
    ecdsa::SignatureAlgorithm,
    error::{Error, Result},
    key::OidPublicKey,
    key_service::KeyService,
    path::{CertificateRequestPath, request},
};

/// Top level layout of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestShape {
    /// `67 { 7F21, 42, 5F37 }`
    Authentication,
    /// A plain `7F21`
    Bare,
}

/// Signing progress of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SigningState {
    /// No inner signature yet
    Unsigned,
    /// The body is signed with the new key
    InnerSigned,
    /// The authentication wrapper is signed as well
    OuterSigned,
}

/// A certificate request under construction or as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    node: Asn1,
    shape: RequestShape,
}

impl CertificateRequest {
    /// Parse a request from DER bytes
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        Self::from_asn1(Asn1::parse(bytes)?)
    }

    /// Wrap a parsed `67` or `7F21` element
    pub fn from_asn1(node: Asn1) -> Result<Self> {
        let (node, shape) = match node.tag() {
            TAG_AUTHENTICATION => (node, RequestShape::Authentication),
            TAG_CV_CERTIFICATE => (
                Asn1::constructed(TAG_AUTHENTICATION, vec![node]),
                RequestShape::Bare,
            ),
            tag => return Err(Error::NotARequest(tag)),
        };
        if node.child(request::CV_CERTIFICATE_BODY.as_path()).is_none() {
            return Err(Error::MissingElement(request::CV_CERTIFICATE_BODY.as_path().name()));
        }
        Ok(Self { node, shape })
    }

    /// Top level layout
    pub const fn shape(&self) -> RequestShape {
        self.shape
    }

    /// Signing progress, derived from the signatures present
    pub fn state(&self) -> SigningState {
        if self.request_part(&request::OUTER_SIGNATURE).is_some() {
            SigningState::OuterSigned
        } else if self.request_part(&request::SIGNATURE).is_some() {
            SigningState::InnerSigned
        } else {
            SigningState::Unsigned
        }
    }

    /// DER encoding in the request's own shape
    pub fn encode(&self) -> Vec<u8> {
        match self.shape {
            RequestShape::Authentication => self.node.encode(),
            RequestShape::Bare => self.certificate().encode(),
        }
    }

    /// The request as a tree in the authentication shape
    pub const fn as_asn1(&self) -> &Asn1 {
        &self.node
    }

    /// The inner `7F21` subtree
    pub fn certificate(&self) -> &Asn1 {
        // presence is checked on construction and the subtree is never removed
        self.node
            .find(TAG_CV_CERTIFICATE)
            .unwrap_or(&self.node)
    }

    /// Drop the authentication wrapper
    pub fn into_bare(self) -> Self {
        let certificate = self.certificate().clone();
        Self {
            node: Asn1::constructed(TAG_AUTHENTICATION, vec![certificate]),
            shape: RequestShape::Bare,
        }
    }

    /// Element at `path`
    pub fn request_part(&self, path: &CertificateRequestPath) -> Option<&Asn1> {
        self.node.child(path.as_path())
    }

    fn required(&self, path: &CertificateRequestPath) -> Result<&Asn1> {
        self.request_part(path)
            .ok_or(Error::MissingElement(path.as_path().name()))
    }

    /// Replace the value of the element at `path`
    pub fn set_request_part_value(&mut self, path: &CertificateRequestPath, value: &[u8]) -> Result<()> {
        Ok(self.node.set_value_at(path.as_path(), value)?)
    }

    /// Replace the element at `path`, returning the old one
    pub fn replace_request_part(&mut self, path: &CertificateRequestPath, new: Asn1) -> Result<Asn1> {
        Ok(self.node.replace_child(path.as_path(), new)?)
    }

    /// Remove the element at `path`, if present
    pub fn remove_request_part(&mut self, path: &CertificateRequestPath) -> Result<Option<Asn1>> {
        Ok(self.node.remove_child(path.as_path())?)
    }

    /// Append `child` to the element at `parent`
    pub fn add_request_part(&mut self, parent: &CertificateRequestPath, child: Asn1) -> Result<()> {
        Ok(self.node.add_child(parent.as_path(), child)?)
    }

    /// Public key of the request
    pub fn public_key(&self) -> Result<OidPublicKey> {
        OidPublicKey::from_asn1(self.required(&request::PUBLIC_KEY)?, None)
    }

    /// Certificate holder reference
    pub fn holder_reference(&self) -> Result<String> {
        Ok(reference_string(&self.required(&request::HOLDER_REFERENCE)?.value()))
    }

    /// Certification authority reference inside the body, if any
    pub fn authority_reference(&self) -> Option<String> {
        self.request_part(&request::CA_REFERENCE)
            .map(|n| reference_string(&n.value()))
    }

    /// Outer certification authority reference, if any
    pub fn outer_authority_reference(&self) -> Option<String> {
        self.request_part(&request::OUTER_CA_REFERENCE)
            .map(|n| reference_string(&n.value()))
    }

    /// Set the outer CA reference, discarding a stale outer signature
    pub fn set_outer_authority_reference(&mut self, car: &str) -> Result<()> {
        self.require_authentication()?;
        self.remove_request_part(&request::OUTER_SIGNATURE)?;
        let node = Asn1::primitive(TAG_CA_REFERENCE, car.as_bytes());
        if self.request_part(&request::OUTER_CA_REFERENCE).is_some() {
            self.replace_request_part(&request::OUTER_CA_REFERENCE, node)?;
        } else {
            self.add_request_part(&request::AUTHENTICATION, node)?;
        }
        Ok(())
    }

    const fn require_authentication(&self) -> Result<()> {
        match self.shape {
            RequestShape::Authentication => Ok(()),
            RequestShape::Bare => Err(Error::NotAuthentication),
        }
    }

    /// Write `public_key` into the body and sign the body
    ///
    /// # Arguments
    ///
    /// * `public_key` - the new key, its identifier selects the algorithm
    /// * `alias` - alias of the matching private key in `service`
    /// * `service` - key service holding the private key
    ///
    /// The request is left untouched if any step fails.
    pub fn sign_inner_body(
        &mut self,
        public_key: &OidPublicKey,
        alias: &str,
        service: &dyn KeyService,
    ) -> Result<()> {
        let algorithm = public_key
            .algorithm()
            .map_err(|_| Error::UnsupportedKeyType("public key is not a TA-ECDSA key"))?;

        let mut staged = self.clone();
        let key_node = public_key.to_asn1(true);
        if staged.request_part(&request::PUBLIC_KEY).is_some() {
            staged.replace_request_part(&request::PUBLIC_KEY, key_node)?;
        } else {
            staged.add_request_part(&request::CV_CERTIFICATE_BODY, key_node)?;
        }

        let body = staged.required(&request::CV_CERTIFICATE_BODY)?.encode();
        let signature = service
            .sign(alias, &algorithm.oid(), &body)
            .map_err(Error::SigningFailed)?;
        trace!(alias, signature = %hex::encode(&signature), "inner signature");

        let signature = Asn1::primitive(TAG_SIGNATURE, signature);
        if staged.request_part(&request::SIGNATURE).is_some() {
            staged.replace_request_part(&request::SIGNATURE, signature)?;
        } else {
            staged.add_request_part(&request::CV_CERTIFICATE, signature)?;
        }
        *self = staged;
        debug!(alias, "signed request body");
        Ok(())
    }

    /// Check the inner signature against the request's own public key
    ///
    /// Keys with an unregistered identifier are checked as ECDSA with
    /// SHA-256.
    pub fn verify_inner_signature(&self) -> Result<()> {
        let key_node = self.required(&request::PUBLIC_KEY)?;
        let key = OidPublicKey::from_asn1(key_node, None)?;
        let algorithm = key
            .algorithm()
            .unwrap_or(SignatureAlgorithm::ECDSA_SHA_256);
        let body = self.required(&request::CV_CERTIFICATE_BODY)?.encode();
        let signature = self.required(&request::SIGNATURE)?.value();
        algorithm.verify(key.key().domain(), key.key().point(), &body, &signature)
    }

    /// Sign the authentication wrapper
    ///
    /// Signs the concatenated encodings of all top level elements, which
    /// must already include the outer CA reference.
    pub fn sign_outer(&mut self, alias: Option<&str>, oid: &Oid, service: &dyn KeyService) -> Result<()> {
        self.require_authentication()?;
        let alias = alias.ok_or(Error::MissingSigner)?;
        if self.request_part(&request::OUTER_CA_REFERENCE).is_none() {
            return Err(Error::MissingOuterAuthorityReference);
        }

        let mut staged = self.clone();
        staged.remove_request_part(&request::OUTER_SIGNATURE)?;
        let data = staged.outer_signed_data();
        let signature = service
            .sign(alias, oid, &data)
            .map_err(Error::SigningFailed)?;
        staged.add_request_part(
            &request::AUTHENTICATION,
            Asn1::primitive(TAG_SIGNATURE, signature),
        )?;
        *self = staged;
        debug!(alias, %oid, "signed authentication wrapper");
        Ok(())
    }

    /// Check the outer signature with the key named by the outer CA reference
    pub fn verify_outer_signature(&self, key: &OidPublicKey) -> Result<()> {
        self.require_authentication()?;
        let signature = self.required(&request::OUTER_SIGNATURE)?.value().into_owned();
        let mut unsigned = self.clone();
        unsigned.remove_request_part(&request::OUTER_SIGNATURE)?;
        key.verify(&unsigned.outer_signed_data(), &signature)
    }

    fn outer_signed_data(&self) -> Vec<u8> {
        let mut data = Vec::new();
        for child in self.node.children() {
            child.encode_into(&mut data);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use eac_asn1::Tag;

    use super::*;
    use crate::{
        certificate::CvCertificate,
        constants::{TA_ECDSA_SHA_256, TA_ECDSA_SHA_384, TA_ECDSA_SHA_512},
        ec::NamedCurve,
        key::EcPrivateKey,
        key_service::{KeyServiceError, SoftwareKeyService},
        test_support,
    };

    fn unsigned_request(root: &CvCertificate) -> CertificateRequest {
        let mut request = CertificateRequest::from_asn1(Asn1::constructed(
            TAG_AUTHENTICATION,
            vec![root.as_asn1().clone()],
        ))
        .unwrap();
        request.remove_request_part(&request::SIGNATURE).unwrap();
        request
    }

    fn new_key(service: &SoftwareKeyService, curve: NamedCurve, oid: Oid) -> OidPublicKey {
        let key = EcPrivateKey::generate(&curve.domain());
        let public = key.public_key().unwrap().with_oid(oid);
        service.import_private_key("DETESTeID00002", key, true).unwrap();
        public
    }

    #[test]
    fn test_inner_signature_on_all_curve_sizes() {
        for (curve, oid) in [
            (NamedCurve::BrainpoolP256r1, TA_ECDSA_SHA_256),
            (NamedCurve::BrainpoolP384r1, TA_ECDSA_SHA_384),
            (NamedCurve::BrainpoolP512r1, TA_ECDSA_SHA_512),
        ] {
            let (root, _) = test_support::root_certificate(curve, oid);
            let service = SoftwareKeyService::new();
            let public = new_key(&service, curve, oid);

            let mut request = unsigned_request(&root);
            assert_eq!(request.state(), SigningState::Unsigned);
            request.sign_inner_body(&public, "DETESTeID00002", &service).unwrap();
            assert_eq!(request.state(), SigningState::InnerSigned);
            assert_eq!(request.public_key().unwrap(), public);
            request.verify_inner_signature().unwrap();

            let reparsed = CertificateRequest::from_der(&request.encode()).unwrap();
            reparsed.verify_inner_signature().unwrap();
        }
    }

    #[test]
    fn test_altered_body_fails_verification() {
        let (root, _) = test_support::root_certificate(NamedCurve::BrainpoolP256r1, TA_ECDSA_SHA_256);
        let service = SoftwareKeyService::new();
        let public = new_key(&service, NamedCurve::BrainpoolP256r1, TA_ECDSA_SHA_256);

        let mut request = unsigned_request(&root);
        request.sign_inner_body(&public, "DETESTeID00002", &service).unwrap();
        request
            .set_request_part_value(&request::HOLDER_REFERENCE, b"DETESTeID00003")
            .unwrap();
        assert!(matches!(request.verify_inner_signature(), Err(Error::InvalidSignature)));
    }

    #[test]
    fn test_failed_signing_leaves_request_untouched() {
        let (root, _) = test_support::root_certificate(NamedCurve::BrainpoolP256r1, TA_ECDSA_SHA_256);
        let service = SoftwareKeyService::new();
        let public = EcPrivateKey::generate(&NamedCurve::BrainpoolP256r1.domain())
            .public_key()
            .unwrap()
            .with_oid(TA_ECDSA_SHA_256);

        let mut request = unsigned_request(&root);
        let before = request.clone();
        assert!(matches!(
            request.sign_inner_body(&public, "unknown", &service),
            Err(Error::SigningFailed(KeyServiceError::KeyNotFound(_)))
        ));
        assert_eq!(request, before);

        let not_ta = public.key().clone().with_oid(EC_PUBLIC_KEY);
        assert!(matches!(
            request.sign_inner_body(&not_ta, "unknown", &service),
            Err(Error::UnsupportedKeyType(_))
        ));
        assert_eq!(request, before);
    }

    #[test]
    fn test_outer_signature() {
        let (root, _) = test_support::root_certificate(NamedCurve::BrainpoolP256r1, TA_ECDSA_SHA_256);
        let service = SoftwareKeyService::new();
        let public = new_key(&service, NamedCurve::BrainpoolP256r1, TA_ECDSA_SHA_256);
        let outer = EcPrivateKey::generate(&NamedCurve::BrainpoolP256r1.domain());
        let outer_public = outer.public_key().unwrap().with_oid(TA_ECDSA_SHA_256);
        service.import_private_key("DETESTeID00001", outer, false).unwrap();

        let mut request = unsigned_request(&root);
        request.sign_inner_body(&public, "DETESTeID00002", &service).unwrap();
        assert!(matches!(
            request.sign_outer(Some("DETESTeID00001"), &TA_ECDSA_SHA_256, &service),
            Err(Error::MissingOuterAuthorityReference)
        ));
        assert!(matches!(
            request.sign_outer(None, &TA_ECDSA_SHA_256, &service),
            Err(Error::MissingSigner)
        ));

        request.set_outer_authority_reference("DETESTeID00001").unwrap();
        request
            .sign_outer(Some("DETESTeID00001"), &TA_ECDSA_SHA_256, &service)
            .unwrap();
        assert_eq!(request.state(), SigningState::OuterSigned);
        assert_eq!(request.outer_authority_reference().as_deref(), Some("DETESTeID00001"));

        let tags: Vec<_> = request.as_asn1().children().iter().map(Asn1::tag).collect();
        assert_eq!(tags, vec![TAG_CV_CERTIFICATE, TAG_CA_REFERENCE, TAG_SIGNATURE]);

        let reparsed = CertificateRequest::from_der(&request.encode()).unwrap();
        assert_eq!(reparsed.shape(), RequestShape::Authentication);
        reparsed.verify_outer_signature(&outer_public).unwrap();
        reparsed.verify_inner_signature().unwrap();
    }

    #[test]
    fn test_bare_request() {
        let (root, _) = test_support::root_certificate(NamedCurve::BrainpoolP256r1, TA_ECDSA_SHA_256);
        let request = CertificateRequest::from_der(&root.encode()).unwrap();

        assert_eq!(request.shape(), RequestShape::Bare);
        assert_eq!(request.encode(), root.encode());
        assert_eq!(request.holder_reference().unwrap(), test_support::TERMINAL_CHR);
        assert_eq!(request.outer_authority_reference(), None);
        assert_eq!(request.public_key().unwrap().oid(), &TA_ECDSA_SHA_256);
        request.verify_inner_signature().unwrap();

        let mut bare = request.clone();
        assert!(matches!(
            bare.set_outer_authority_reference("X"),
            Err(Error::NotAuthentication)
        ));
        assert_eq!(bare, request);
    }

    #[test]
    fn test_into_bare_drops_wrapper() {
        let (root, _) = test_support::root_certificate(NamedCurve::BrainpoolP256r1, TA_ECDSA_SHA_256);
        let mut request = unsigned_request(&root);
        request.set_outer_authority_reference("DETESTeID00001").unwrap();
        let bare = request.into_bare();
        assert_eq!(bare.shape(), RequestShape::Bare);
        assert_eq!(bare.outer_authority_reference(), None);
        assert_eq!(Asn1::parse(&bare.encode()).unwrap().tag(), TAG_CV_CERTIFICATE);
    }

    #[test]
    fn test_rejects_other_tags() {
        assert!(matches!(
            CertificateRequest::from_der(&[0x30, 0x00]),
            Err(Error::NotARequest(tag)) if tag == Tag::SEQUENCE
        ));
        assert!(matches!(
            CertificateRequest::from_der(&[0x67, 0x00]),
            Err(Error::MissingElement(_))
        ));
    }
}
