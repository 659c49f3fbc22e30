//! Error types for certificate and request handling

use eac_asn1::{DecodeError, Oid, StructureError, Tag};
use thiserror::Error;

use crate::{generator::Stage, key_service::KeyServiceError};

/// Result type for CVC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for CVC operations
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or unexpected TLV input
    #[error(transparent)]
    Asn1(#[from] eac_asn1::Error),

    /// A required element is absent
    #[error("missing element {0}")]
    MissingElement(&'static str),

    /// The top level tag is neither a request nor a bare certificate
    #[error("not a certificate request: top level tag {0}")]
    NotARequest(Tag),

    /// The certificate is malformed
    #[error("invalid certificate: {0}")]
    InvalidCertificate(&'static str),

    /// Signature algorithm outside the TA-ECDSA family
    #[error("unsupported signature algorithm {0}")]
    UnsupportedAlgorithm(Oid),

    /// The supplied public key does not carry an algorithm identifier
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(&'static str),

    /// Domain parameters do not match a curve with a known identifier
    #[error("curve has no registered object identifier")]
    UnknownCurve,

    /// A point is not on the curve or is badly encoded
    #[error("invalid curve point")]
    InvalidPoint,

    /// Malformed private key material
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(&'static str),

    /// The key service refused to produce a signature
    #[error("signing failed: {0}")]
    SigningFailed(#[source] KeyServiceError),

    /// Any other key service failure
    #[error(transparent)]
    KeyService(#[from] KeyServiceError),

    /// Every nonce candidate was unusable, the curve is degenerate
    #[error("no usable signature nonce")]
    NoUsableNonce,

    /// A signature did not verify
    #[error("signature verification failed")]
    InvalidSignature,

    /// Neither an alias nor raw key material was supplied for a signature
    #[error("no key alias or key material supplied")]
    MissingSigner,

    /// The outer signature needs an outer authority reference first
    #[error("outer authority reference not set")]
    MissingOuterAuthorityReference,

    /// Operation only valid on the authentication request shape
    #[error("operation requires an authentication request")]
    NotAuthentication,

    /// Holder reference too short to carry a sequence number
    #[error("invalid holder reference {0:?}")]
    InvalidHolderReference(String),

    /// Caller omitted required input
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    /// Failure while generating a request, tagged with the failing stage
    #[error("{stage}: {source}")]
    Stage {
        /// Generation stage that failed
        stage: Stage,
        /// Underlying error
        source: Box<Self>,
    },
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Self::Asn1(err.into())
    }
}

impl From<StructureError> for Error {
    fn from(err: StructureError) -> Self {
        Self::Asn1(err.into())
    }
}

impl Error {
    /// Tag this error with the generation stage it occurred in
    pub fn at_stage(self, stage: Stage) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The stage tag, if this error was raised while generating a request
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Extension trait for tagging results with a generation stage
pub trait ResultExt<T> {
    /// Tag the error, if any, with `stage`
    fn stage(self, stage: Stage) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn stage(self, stage: Stage) -> Result<T> {
        self.map_err(|e| e.into().at_stage(stage))
    }
}
