//! Secure messaging for whole batches of APDUs
//!
//! All commands of a batch are enciphered before the first one reaches the
//! card. The card advances its counter once per command and once per
//! response, so the host skips one counter value between consecutive
//! commands and, once the batch is enciphered, rewinds to the value the
//! first command used. Deciphering the responses then follows the card's
//! sequence.

use tracing::{debug, warn};

use crate::{
    AesSecureMessaging, CardCommunication, Command, Error, Phase, Response, SendSequenceCounter,
    SessionKeys,
    ssc::SscIv,
};

/// Protects the commands of a [`CardCommunication`] and unprotects its responses
///
/// Failures are recorded on the batch rather than returned. Both directions
/// leave the batch in [`Phase::Post`] and finished.
pub trait BatchSecureMessaging {
    /// Encipher every plaintext command of the batch
    fn to_card(&mut self, communication: &mut CardCommunication);

    /// Decipher every response of the batch
    fn from_card(&mut self, communication: &mut CardCommunication);
}

/// Batch secure messaging with AES session keys
#[derive(Debug, Clone)]
pub struct AesBatchSecureMessaging {
    inner: AesSecureMessaging,
}

impl AesBatchSecureMessaging {
    /// Create batch secure messaging from session keys and the current counter
    pub const fn new(keys: SessionKeys, ssc: SendSequenceCounter) -> Self {
        Self {
            inner: AesSecureMessaging::new(keys, ssc),
        }
    }

    /// Send sequence counter
    pub const fn ssc(&self) -> &SscIv {
        self.inner.ssc()
    }

    /// Single APDU secure messaging sharing this counter
    pub fn secure_messaging(&mut self) -> &mut AesSecureMessaging {
        &mut self.inner
    }

    fn encipher_all(&mut self, commands: &[Command]) -> Result<Vec<Command>, Error> {
        let last = commands.len().saturating_sub(1);
        let mut encrypted = Vec::with_capacity(commands.len());
        for (i, command) in commands.iter().enumerate() {
            encrypted.push(self.inner.encipher_command(command)?);
            let ssc = self.inner.ssc_mut();
            if i == 0 {
                ssc.mark();
            }
            if i == last {
                ssc.reset();
            } else {
                ssc.increase();
            }
        }
        Ok(encrypted)
    }

    fn decipher_all(&mut self, responses: &[bytes::Bytes]) -> Result<Vec<Response>, Error> {
        let last = responses.len().saturating_sub(1);
        let mut plain = Vec::with_capacity(responses.len());
        for (i, raw) in responses.iter().enumerate() {
            let response = Response::from_bytes(raw)?;
            plain.push(self.inner.decipher_response(&response)?);
            if i != last {
                self.inner.ssc_mut().increase();
            }
        }
        Ok(plain)
    }

    fn finish(communication: &mut CardCommunication) {
        if let Err(err) = communication.set_phase(Phase::Post) {
            warn!("Finishing batch failed: {err}");
            if communication.error().is_none() {
                communication.set_error(err);
            }
        }
        communication.set_finished(true);
    }
}

impl BatchSecureMessaging for AesBatchSecureMessaging {
    fn to_card(&mut self, communication: &mut CardCommunication) {
        let result = communication
            .commands()
            .and_then(|commands| self.encipher_all(&commands));
        match result {
            Ok(encrypted) => {
                debug!(
                    count = encrypted.len(),
                    ssc = %self.ssc().ssc(),
                    "Batch enciphered"
                );
                communication.set_encrypted_commands(encrypted);
            }
            Err(err) => {
                warn!("Enciphering batch failed: {err}");
                communication.set_error(err);
            }
        }
        Self::finish(communication);
    }

    fn from_card(&mut self, communication: &mut CardCommunication) {
        let result = match communication.responses() {
            Some(responses) => self.decipher_all(responses),
            None => Err(Error::MissingResponses),
        };
        match result {
            Ok(plain) => {
                debug!(
                    count = plain.len(),
                    ssc = %self.ssc().ssc(),
                    "Batch deciphered"
                );
                communication.set_plaintext_responses(plain);
            }
            Err(err) => {
                warn!("Deciphering batch failed: {err}");
                communication.set_error(err);
            }
        }
        Self::finish(communication);
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::test_card::TestCard;

    fn keys() -> SessionKeys {
        SessionKeys::new(
            hex!("2F7F46ADCC9E7E521B45D192FAFA9126D2C64D6E6F1C7A32"),
            hex!("805A1D27D45A5116F73C54469462B7D8A58C2F4F15AA0E65"),
        )
        .unwrap()
    }

    fn batch() -> Vec<Command> {
        vec![
            Command::new(0x00, 0xA4, 0x02, 0x0C).with_data(hex!("0101").to_vec()),
            Command::new(0x00, 0xB0, 0x00, 0x00).with_le(256),
            Command::new(0x00, 0xB1, 0x00, 0x00)
                .with_data(hex!("54020100").to_vec())
                .with_le(crate::apdu::EXTENDED_MAX_LE),
        ]
    }

    #[test]
    fn test_batch_round_trip() {
        let start = SendSequenceCounter::from_u128(0x2A);
        let mut sm = AesBatchSecureMessaging::new(keys(), start);
        let mut card = TestCard::new(keys(), start);
        let commands = batch();
        let mut communication = CardCommunication::new(&commands).unwrap();

        sm.to_card(&mut communication);
        assert!(communication.error().is_none());
        assert_eq!(communication.phase(), Phase::Post);
        assert!(communication.is_finished());
        // rewound to the counter of the first command
        assert_eq!(sm.ssc().ssc().value(), 0x2B);
        assert!(sm.ssc().marked().is_none());

        let mut raw = Vec::new();
        for (i, protected) in communication.encrypted_commands().unwrap().iter().enumerate() {
            assert_eq!(card.receive(protected).unwrap(), commands[i]);
            assert_eq!(card.ssc().value(), 0x2B + 2 * i as u128);
            raw.push(card.respond(&[i as u8; 3], 0x9000).to_bytes());
        }

        communication.set_responses(raw).unwrap();
        sm.from_card(&mut communication);
        assert!(communication.error().is_none());
        assert_eq!(sm.ssc().ssc().value(), 0x2A + 2 * 3);

        let plain = communication.plaintext_responses().unwrap();
        assert_eq!(plain.len(), 3);
        assert_eq!(plain[2].data().as_ref(), &[2, 2, 2]);
        assert_eq!(communication.response().unwrap().data().as_ref(), &[0, 0, 0]);
    }

    #[test]
    fn test_single_command_batch() {
        let start = SendSequenceCounter::new();
        let mut sm = AesBatchSecureMessaging::new(keys(), start);
        let mut card = TestCard::new(keys(), start);
        let command = Command::new(0x00, 0x84, 0x00, 0x00).with_le(8);
        let mut communication = CardCommunication::new(&[command.clone()]).unwrap();

        sm.to_card(&mut communication);
        assert_eq!(sm.ssc().ssc().value(), 1);
        let protected = &communication.encrypted_commands().unwrap()[0];
        assert_eq!(card.receive(protected).unwrap(), command);

        let challenge = hex!("0102030405060708");
        communication
            .set_response(card.respond(&challenge, 0x9000).to_bytes())
            .unwrap();
        sm.from_card(&mut communication);
        assert_eq!(communication.response().unwrap().data().as_ref(), challenge);
        assert_eq!(sm.ssc().ssc().value(), 2);
    }

    #[test]
    fn test_failure_is_recorded() {
        let start = SendSequenceCounter::from_u128(10);
        let mut sm = AesBatchSecureMessaging::new(keys(), start);
        let mut card = TestCard::new(keys(), start);
        let mut communication = CardCommunication::new(&batch()).unwrap();
        sm.to_card(&mut communication);

        let mut raw = Vec::new();
        for protected in communication.encrypted_commands().unwrap() {
            card.receive(protected).unwrap();
            raw.push(card.respond(&[0xAA], 0x9000).to_bytes().to_vec());
        }
        // break the checksum of the second response
        let len = raw[1].len();
        raw[1][len - 3] ^= 0xFF;
        communication.set_responses(raw).unwrap();

        sm.from_card(&mut communication);
        assert!(matches!(communication.error(), Some(Error::ChecksumMismatch)));
        assert!(communication.plaintext_responses().is_none());
        assert!(communication.is_finished());
        assert!(!sm.secure_messaging().is_valid());
    }

    #[test]
    fn test_invalidated_keys_abort_batch() {
        let mut sm = AesBatchSecureMessaging::new(keys(), SendSequenceCounter::new());
        let bad = Response::new(hex!("99029000").to_vec(), 0x9000);
        assert!(sm.secure_messaging().decipher_response(&bad).is_err());

        let mut communication = CardCommunication::new(&batch()).unwrap();
        sm.to_card(&mut communication);
        assert!(matches!(communication.error(), Some(Error::KeysInvalidated)));
        assert!(communication.encrypted_commands().is_none());
        assert_eq!(communication.phase(), Phase::Post);
        assert!(communication.is_finished());
    }

    #[test]
    fn test_batch_already_in_post_phase() {
        let mut sm = AesBatchSecureMessaging::new(keys(), SendSequenceCounter::new());
        let mut communication = CardCommunication::new(&batch()).unwrap();
        communication.set_phase(Phase::Post).unwrap();
        communication.set_finished(false);

        sm.to_card(&mut communication);
        assert!(communication.error().is_none());
        assert_eq!(communication.phase(), Phase::Post);
        assert!(communication.is_finished());
        assert_eq!(communication.encrypted_commands().unwrap().len(), 3);

        // a later failure keeps the batch in Post and records only that failure
        communication.set_finished(false);
        sm.from_card(&mut communication);
        assert!(matches!(communication.error(), Some(Error::MissingResponses)));
        assert_eq!(communication.phase(), Phase::Post);
        assert!(communication.is_finished());
    }

    #[test]
    fn test_missing_responses() {
        let mut sm = AesBatchSecureMessaging::new(keys(), SendSequenceCounter::new());
        let mut communication = CardCommunication::new(&batch()).unwrap();
        sm.from_card(&mut communication);
        assert!(matches!(communication.error(), Some(Error::MissingResponses)));
    }
}
