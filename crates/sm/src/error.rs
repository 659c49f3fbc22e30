//! Error types for secure messaging

use thiserror::Error;

/// Result type for secure messaging operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for secure messaging operations
#[derive(Debug, Error)]
pub enum Error {
    /// AES keys must be 16, 24 or 32 bytes
    #[error("invalid AES key length {0}")]
    InvalidKeyLength(usize),

    /// Encryption and MAC keys differ in strength
    #[error("encryption and MAC keys differ in length")]
    KeyLengthMismatch,

    /// A checksum failed earlier and the keys were discarded
    #[error("session keys invalidated")]
    KeysInvalidated,

    /// Command APDU with a malformed length encoding
    #[error("invalid command length: {0}")]
    InvalidCommandLength(usize),

    /// Response APDU shorter than the status word
    #[error("invalid response length: {0}")]
    InvalidResponseLength(usize),

    /// Command data does not fit an extended length APDU
    #[error("command data too long: {0} bytes")]
    DataTooLong(usize),

    /// Response carries no secure messaging data objects
    #[error("response is not encrypted")]
    NotEncrypted,

    /// Malformed data objects in a protected APDU
    #[error("malformed secure messaging data: {0}")]
    Tlv(#[from] eac_asn1::DecodeError),

    /// A data object occurs more than once
    #[error("duplicate data object {0:02X}")]
    DuplicateDataObject(u32),

    /// A data object that secure messaging does not define
    #[error("unrecognized data object {0:02X}")]
    UnexpectedDataObject(u32),

    /// The response carries no checksum
    #[error("no checksum received from card")]
    MissingChecksum,

    /// The checksum does not match
    #[error("checksum not verified")]
    ChecksumMismatch,

    /// Decrypted data is not ISO/IEC 7816-4 padded
    #[error("invalid padding")]
    Padding,

    /// A batch needs at least one command
    #[error("empty command batch")]
    EmptyBatch,

    /// Responses were deciphered without enciphered commands
    #[error("responses missing")]
    MissingResponses,

    /// A batch never returns from the post phase
    #[error("change from post to prepare phase not permitted")]
    IllegalPhaseTransition,
}
