//! Card verifiable certificates and certificate requests (BSI TR-03110)
//!
//! The main entry point is [`CvcRequestGenerator`], which derives a signed
//! [`CertificateRequest`] for a terminal from a root certificate template
//! and, on renewal, the terminal's current certificate. Private keys are
//! addressed through a [`KeyService`] so they can stay inside an HSM.
//!
//! Signatures use the TA-ECDSA algorithms over explicit prime curve domain
//! parameters as carried in the certificates themselves.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod certificate;
pub mod chat;
pub mod constants;
pub mod description;
pub mod ec;
pub mod ecdsa;
pub mod error;
pub mod generator;
pub mod key;
pub mod key_service;
pub mod keypair;
pub mod path;
pub mod request;

#[cfg(test)]
mod test_support;

pub use certificate::{CvCertificate, CvcDate};
pub use chat::Chat;
pub use description::{CertificateDescription, TermsOfUsage};
pub use ec::{EcDomainParameters, NamedCurve};
pub use ecdsa::{HashAlgorithm, SignatureAlgorithm};
pub use error::{Error, Result, ResultExt};
pub use generator::{
    AdditionalCvcRequestInput, CvcRequestData, CvcRequestGenerator, RequestParameters, Stage,
};
pub use key::{EcPrivateKey, EcPublicKey, OidPublicKey};
pub use key_service::{KeyService, KeyServiceError, SoftwareKeyService};
pub use keypair::{CvcKeyPair, CvcKeyPairBuilder, KeyDisposition};
pub use request::{CertificateRequest, RequestShape, SigningState};
