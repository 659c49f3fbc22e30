//! AES secure messaging for single APDUs
//!
//! A protected command carries its data encrypted in a cryptogram object
//! (`87` for even and `85` for odd instructions), the expected length in a
//! `97` object and a truncated AES-CMAC in an `8E` object. Responses carry
//! `87`/`85`, a processing status `99` and `8E`.

use std::fmt;

use bytes::{BufMut, BytesMut};
use eac_asn1::{Asn1, Tag};
use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

use crate::{
    Error, Result,
    apdu::{Command, EXTENDED_MAX_LC, EXTENDED_MAX_LE, SHORT_MAX_LE, Response},
    crypto,
    ssc::{SendSequenceCounter, SscIv},
};

/// Cryptogram with padding indicator, used for even instructions
const TAG_CRYPTOGRAM: Tag = Tag::new(0x87);
/// Cryptogram without padding indicator, used for odd instructions
const TAG_CRYPTOGRAM_ODD: Tag = Tag::new(0x85);
/// Expected response length
const TAG_NE: Tag = Tag::new(0x97);
/// Processing status of the protected response
const TAG_PROCESSING_STATUS: Tag = Tag::new(0x99);
/// Cryptographic checksum
const TAG_CHECKSUM: Tag = Tag::new(0x8E);

/// Padding indicator for ISO/IEC 7816-4 padding
const PADDING_INDICATOR_ISO: u8 = 0x01;

/// Secure messaging indication bits of the class byte
const CLA_SM: u8 = 0x0C;

/// Session keys for encryption and authentication
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKeys {
    enc: Zeroizing<Vec<u8>>,
    mac: Zeroizing<Vec<u8>>,
}

impl SessionKeys {
    /// Create session keys, both keys must be AES keys of the same length
    pub fn new(enc: impl Into<Vec<u8>>, mac: impl Into<Vec<u8>>) -> Result<Self> {
        let enc = Zeroizing::new(enc.into());
        let mac = Zeroizing::new(mac.into());
        crypto::check_key(&enc)?;
        crypto::check_key(&mac)?;
        if enc.len() != mac.len() {
            return Err(Error::KeyLengthMismatch);
        }
        Ok(Self { enc, mac })
    }

    /// Encryption key
    pub fn enc(&self) -> &[u8] {
        &self.enc
    }

    /// MAC key
    pub fn mac(&self) -> &[u8] {
        &self.mac
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field("bits", &(self.enc.len() * 8))
            .finish_non_exhaustive()
    }
}

/// Secure messaging with AES session keys
///
/// The send sequence counter is incremented before each command is
/// enciphered and before each response is deciphered. A response with a
/// missing or wrong checksum discards the session keys, after which every
/// operation fails with [`Error::KeysInvalidated`].
#[derive(Debug, Clone)]
pub struct AesSecureMessaging {
    keys: Option<SessionKeys>,
    ssc: SscIv,
}

impl AesSecureMessaging {
    /// Create secure messaging from session keys and the current counter
    pub const fn new(keys: SessionKeys, ssc: SendSequenceCounter) -> Self {
        Self {
            keys: Some(keys),
            ssc: SscIv::new(ssc),
        }
    }

    /// Send sequence counter
    pub const fn ssc(&self) -> &SscIv {
        &self.ssc
    }

    pub(crate) fn ssc_mut(&mut self) -> &mut SscIv {
        &mut self.ssc
    }

    /// Whether the session keys are still usable
    pub const fn is_valid(&self) -> bool {
        self.keys.is_some()
    }

    fn invalidate(&mut self) {
        if self.keys.take().is_some() {
            warn!("Discarding secure messaging session keys");
        }
    }

    /// Protect a command
    pub fn encipher_command(&mut self, command: &Command) -> Result<Command> {
        let keys = self.keys.as_ref().ok_or(Error::KeysInvalidated)?;
        self.ssc.increase();
        let ssc = self.ssc.bytes();
        trace!(command = %command, ssc = %self.ssc.ssc(), "Enciphering command");

        let extended = command.is_extended();
        let header = [
            command.cla | CLA_SM,
            command.ins,
            command.p1,
            command.p2,
        ];
        let padded_header = crypto::pad(&header);

        let cryptogram_do = if command.nc() == 0 {
            None
        } else {
            let iv = crypto::encrypt_block(keys.enc(), ssc)?;
            let cryptogram = crypto::encrypt(keys.enc(), &iv, command.data())?;
            let object = if command.ins % 2 == 0 {
                let mut value = Vec::with_capacity(cryptogram.len() + 1);
                value.push(PADDING_INDICATOR_ISO);
                value.extend_from_slice(&cryptogram);
                Asn1::primitive(TAG_CRYPTOGRAM, value)
            } else {
                Asn1::primitive(TAG_CRYPTOGRAM_ODD, cryptogram)
            };
            Some(object.encode())
        };

        let ne_do = expected_length(command.ne(), extended)
            .map(|le| Asn1::primitive(TAG_NE, le).encode());

        let mut mac_data = padded_header;
        mac_data.extend(cryptogram_do.iter().chain(ne_do.iter()).flatten());
        if cryptogram_do.is_some() || ne_do.is_some() {
            mac_data = crypto::pad(&mac_data);
        }
        let mac = crypto::mac(keys.mac(), ssc, &mac_data)?;
        let mac_do = Asn1::primitive(TAG_CHECKSUM, mac.to_vec()).encode();

        let mut data = BytesMut::new();
        if let Some(object) = &cryptogram_do {
            data.put_slice(object);
        }
        if let Some(object) = &ne_do {
            data.put_slice(object);
        }
        data.put_slice(&mac_do);
        if data.len() > EXTENDED_MAX_LC {
            return Err(Error::DataTooLong(data.len()));
        }

        let le = if ne_do.as_ref().is_some_and(|object| object.len() == 4)
            || data.len() >= SHORT_MAX_LE as usize
        {
            EXTENDED_MAX_LE
        } else {
            SHORT_MAX_LE
        };

        let protected = Command::new(header[0], header[1], header[2], header[3])
            .with_data(data.freeze())
            .with_le(le);
        trace!(command = %protected, "Command enciphered");
        Ok(protected)
    }

    /// Verify and decrypt a protected response
    ///
    /// The result holds the decrypted data followed by the processing status
    /// of the `99` object, or by the outer status word if there is none.
    pub fn decipher_response(&mut self, response: &Response) -> Result<Response> {
        if self.keys.is_none() {
            return Err(Error::KeysInvalidated);
        }
        self.ssc.increase();
        trace!(response = %hex::encode_upper(response.to_bytes()), ssc = %self.ssc.ssc(), "Deciphering response");

        if response.data().is_empty() {
            warn!(sw = %format!("{:04X}", response.sw()), "Response carries no secure messaging data");
            return Err(Error::NotEncrypted);
        }

        let mut cryptogram: Option<Asn1> = None;
        let mut status: Option<Asn1> = None;
        let mut checksum: Option<Asn1> = None;
        let mut mac_data = Vec::new();

        for object in Asn1::parse_all(response.data())? {
            let slot = match object.tag() {
                TAG_CRYPTOGRAM | TAG_CRYPTOGRAM_ODD => &mut cryptogram,
                TAG_PROCESSING_STATUS => &mut status,
                TAG_CHECKSUM => &mut checksum,
                tag => {
                    warn!(object = %hex::encode_upper(object.encode()), "Unrecognized data object in response");
                    return Err(Error::UnexpectedDataObject(tag.value()));
                }
            };
            if slot.is_some() {
                return Err(Error::DuplicateDataObject(object.tag().value()));
            }
            if object.tag() != TAG_CHECKSUM {
                object.encode_into(&mut mac_data);
            }
            *slot = Some(object);
        }

        self.check_mac(checksum.as_ref(), &mac_data)?;
        let keys = self.keys.as_ref().ok_or(Error::KeysInvalidated)?;

        let mut plain = match &cryptogram {
            Some(object) => {
                let value = object.value();
                let encrypted = if object.tag() == TAG_CRYPTOGRAM {
                    value.get(1..).unwrap_or_default()
                } else {
                    &value[..]
                };
                if encrypted.is_empty() {
                    Vec::new()
                } else {
                    let iv = crypto::encrypt_block(keys.enc(), self.ssc.bytes())?;
                    crypto::decrypt(keys.enc(), &iv, encrypted)?
                }
            }
            None => Vec::new(),
        };

        match &status {
            Some(object) => plain.extend_from_slice(&object.value()),
            None => plain.extend_from_slice(&response.sw().to_be_bytes()),
        }
        let deciphered = Response::from_bytes(&plain)?;
        debug!(
            len = deciphered.data().len(),
            sw = %format!("{:04X}", deciphered.sw()),
            "Response deciphered"
        );
        Ok(deciphered)
    }

    fn check_mac(&mut self, checksum: Option<&Asn1>, mac_data: &[u8]) -> Result<()> {
        let keys = self.keys.as_ref().ok_or(Error::KeysInvalidated)?;
        let outcome = match checksum.map(Asn1::value) {
            Some(received) if !received.is_empty() => {
                let padded = crypto::pad(mac_data);
                crypto::verify_mac(keys.mac(), self.ssc.bytes(), &padded, &received)
            }
            _ => Err(Error::MissingChecksum),
        };
        if let Err(err) = outcome {
            warn!(ssc = %self.ssc.ssc(), "Response checksum not verified: {err}");
            self.invalidate();
            return Err(err);
        }
        Ok(())
    }
}

/// Value of the `97` object for an expected length Ne
fn expected_length(ne: u32, extended: bool) -> Option<Vec<u8>> {
    match ne {
        0 => None,
        SHORT_MAX_LE if !extended => Some(vec![0x00]),
        EXTENDED_MAX_LE => Some(vec![0x00, 0x00]),
        ne if extended => Some((ne as u16).to_be_bytes().to_vec()),
        ne => Some(vec![ne as u8]),
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::{crypto::MAC_LEN, test_card::TestCard};

    const ENC: [u8; 16] = hex!("F5F0E35C0D7161EE6724EE513A0D9A7F");
    const MAC: [u8; 16] = hex!("FE251C7858B356B24514B3BD5F4297D1");

    fn keys() -> SessionKeys {
        SessionKeys::new(ENC, MAC).unwrap()
    }

    fn pair(ssc: u128) -> (AesSecureMessaging, TestCard) {
        let ssc = SendSequenceCounter::from_u128(ssc);
        (AesSecureMessaging::new(keys(), ssc), TestCard::new(keys(), ssc))
    }

    #[test]
    fn test_session_keys() {
        assert!(SessionKeys::new([0; 32], [0; 32]).is_ok());
        assert!(matches!(SessionKeys::new([0; 16], [0; 32]), Err(Error::KeyLengthMismatch)));
        assert!(matches!(SessionKeys::new([0; 8], [0; 8]), Err(Error::InvalidKeyLength(8))));
        assert_eq!(format!("{:?}", keys()), "SessionKeys { bits: 128, .. }");
    }

    #[test]
    fn test_expected_length_encoding() {
        assert_eq!(expected_length(0, false), None);
        assert_eq!(expected_length(256, false), Some(vec![0x00]));
        assert_eq!(expected_length(0x20, false), Some(vec![0x20]));
        assert_eq!(expected_length(65536, true), Some(vec![0x00, 0x00]));
        assert_eq!(expected_length(256, true), Some(vec![0x01, 0x00]));
        assert_eq!(expected_length(0x0FFF, true), Some(vec![0x0F, 0xFF]));
    }

    #[test]
    fn test_encipher_command_layout() {
        let (mut sm, mut card) = pair(0);
        let select = Command::new(0x00, 0xA4, 0x02, 0x0C).with_data(hex!("011C").to_vec());
        let protected = sm.encipher_command(&select).unwrap();

        assert_eq!(protected.header(), hex!("0CA4020C"));
        assert_eq!(protected.le, Some(256));
        let data = protected.data();
        // 87 11 01 || one block, then 8E 08 || mac
        assert_eq!(&data[..3], &hex!("871101"));
        assert_eq!(&data[19..21], &hex!("8E08"));
        assert_eq!(data.len(), 29);
        assert_eq!(sm.ssc().ssc().value(), 1);

        let plain = card.receive(&protected).unwrap();
        assert_eq!(plain, select);
    }

    #[test]
    fn test_odd_instruction_and_expected_length() {
        let (mut sm, mut card) = pair(7);
        let read = Command::new(0x00, 0xB1, 0x01, 0x1C)
            .with_data(hex!("54020000").to_vec())
            .with_le(256);
        let protected = sm.encipher_command(&read).unwrap();
        let data = protected.data();
        assert_eq!(&data[..2], &hex!("8510"));
        assert_eq!(&data[18..21], &hex!("970100"));
        assert_eq!(card.receive(&protected).unwrap(), read);

        let extended = Command::new(0x00, 0xB0, 0x00, 0x00).with_le(EXTENDED_MAX_LE);
        let protected = sm.encipher_command(&extended).unwrap();
        assert_eq!(&protected.data()[..4], &hex!("97020000"));
        assert_eq!(protected.le, Some(EXTENDED_MAX_LE));
        assert!(protected.is_extended());
    }

    #[test]
    fn test_header_only_command() {
        let (mut sm, mut card) = pair(0x1234);
        let command = Command::new(0x00, 0x22, 0x81, 0xA4);
        let protected = sm.encipher_command(&command).unwrap();
        assert_eq!(protected.data().len(), 2 + MAC_LEN);
        assert_eq!(card.receive(&protected).unwrap(), command);
    }

    #[test]
    fn test_decipher_response() {
        let (mut sm, mut card) = pair(41);
        let command = Command::new(0x00, 0xB0, 0x9D, 0x00).with_le(256);
        let protected = sm.encipher_command(&command).unwrap();
        card.receive(&protected).unwrap();

        let response = card.respond(&hex!("30820102030405"), 0x9000);
        let plain = sm.decipher_response(&response).unwrap();
        assert_eq!(plain.data().as_ref(), hex!("30820102030405"));
        assert_eq!(plain.sw(), 0x9000);
        assert_eq!(sm.ssc().ssc().value(), 43);
    }

    #[test]
    fn test_status_only_response() {
        let (mut sm, mut card) = pair(0);
        card.receive(&sm.encipher_command(&Command::new(0x00, 0x22, 0x81, 0xB6)).unwrap())
            .unwrap();
        let response = card.respond(&[], 0x6A80);
        let plain = sm.decipher_response(&response).unwrap();
        assert!(plain.data().is_empty());
        assert_eq!(plain.sw(), 0x6A80);
    }

    #[test]
    fn test_unprotected_response() {
        let (mut sm, _) = pair(0);
        let response = Response::new(Vec::new(), 0x6982);
        assert!(matches!(sm.decipher_response(&response), Err(Error::NotEncrypted)));
        assert_eq!(sm.ssc().ssc().value(), 1);
        assert!(sm.is_valid());
    }

    #[test]
    fn test_wrong_checksum_invalidates_keys() {
        let (mut sm, mut card) = pair(0);
        card.receive(&sm.encipher_command(&Command::new(0x00, 0x22, 0x81, 0xB6)).unwrap())
            .unwrap();
        let response = card.respond(&[0x01], 0x9000);
        let mut tampered = response.data().to_vec();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;

        let result = sm.decipher_response(&Response::new(tampered, 0x9000));
        assert!(matches!(result, Err(Error::ChecksumMismatch)));
        assert!(!sm.is_valid());
        assert!(matches!(
            sm.encipher_command(&Command::new(0x00, 0xA4, 0x00, 0x00)),
            Err(Error::KeysInvalidated)
        ));
    }

    #[test]
    fn test_missing_checksum_invalidates_keys() {
        let (mut sm, _) = pair(0);
        let response = Response::new(hex!("990290008E00").to_vec(), 0x9000);
        assert!(matches!(sm.decipher_response(&response), Err(Error::MissingChecksum)));
        assert!(!sm.is_valid());
    }

    #[test]
    fn test_malformed_response_objects() {
        let (mut sm, _) = pair(0);
        let duplicate = Response::new(hex!("9902900099029000").to_vec(), 0x9000);
        assert!(matches!(
            sm.decipher_response(&duplicate),
            Err(Error::DuplicateDataObject(0x99))
        ));

        let unexpected = Response::new(hex!("5301FF").to_vec(), 0x9000);
        assert!(matches!(
            sm.decipher_response(&unexpected),
            Err(Error::UnexpectedDataObject(0x53))
        ));
        assert!(sm.is_valid());
    }
}
