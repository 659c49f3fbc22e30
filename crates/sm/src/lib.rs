//! AES secure messaging for batches of smartcard APDUs
//!
//! Commands to an eID card are protected with the session keys agreed
//! during PACE or chip authentication (BSI TR-03110, ISO/IEC 7816-4
//! secure messaging). Every protected command and every protected response
//! advances a send sequence counter, from which the encryption IV and the
//! MAC input are derived.
//!
//! [`AesSecureMessaging`] protects one APDU at a time.
//! [`AesBatchSecureMessaging`] protects a whole [`CardCommunication`] batch
//! that is sent to the card before any response is seen, keeping the
//! counter aligned with the card across the batch.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod apdu;
pub mod batch;
pub mod communication;
mod crypto;
pub mod error;
pub mod secure_messaging;
pub mod ssc;

#[cfg(test)]
mod test_card;

pub use apdu::{Command, Response};
pub use batch::{AesBatchSecureMessaging, BatchSecureMessaging};
pub use communication::{CardCommunication, Phase};
pub use error::{Error, Result};
pub use secure_messaging::{AesSecureMessaging, SessionKeys};
pub use ssc::{SendSequenceCounter, SscIv};
