//! A batch of APDUs exchanged with a card in one round trip

use std::fmt;

use bytes::Bytes;

use crate::{Command, Error, Response, Result};

/// Length of a command header
const HEADER_LEN: usize = 4;
/// Length of a status word
const SW_LEN: usize = 2;

/// Processing phase of a [`CardCommunication`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Commands are being assembled
    #[default]
    Prepare,
    /// Secure messaging has processed the batch
    Post,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prepare => f.write_str("PREPARE"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// Commands and responses of one batch together with its processing state
///
/// Failures of batch secure messaging are recorded here instead of being
/// returned, see [`CardCommunication::error`].
#[derive(Debug, Default)]
pub struct CardCommunication {
    commands: Vec<Bytes>,
    encrypted_commands: Option<Vec<Command>>,
    responses: Option<Vec<Bytes>>,
    plaintext_responses: Option<Vec<Response>>,
    error: Option<Error>,
    phase: Phase,
    finished: bool,
}

impl CardCommunication {
    /// Create a batch from plaintext commands
    pub fn new(commands: &[Command]) -> Result<Self> {
        let mut communication = Self::default();
        communication.set_commands(commands)?;
        Ok(communication)
    }

    /// Create a batch from raw command APDUs
    pub fn from_raw<I, B>(commands: I) -> Result<Self>
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let mut communication = Self::default();
        communication.set_raw_commands(commands)?;
        Ok(communication)
    }

    /// Replace the plaintext commands
    pub fn set_commands(&mut self, commands: &[Command]) -> Result<()> {
        let raw = commands
            .iter()
            .map(Command::to_bytes)
            .collect::<Result<Vec<_>>>()?;
        self.set_raw_commands(raw)
    }

    /// Replace the plaintext commands with raw command APDUs
    ///
    /// The batch must not be empty and every command needs a full header.
    pub fn set_raw_commands<I, B>(&mut self, commands: I) -> Result<()>
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let commands: Vec<Bytes> = commands.into_iter().map(Into::into).collect();
        if commands.is_empty() {
            return Err(Error::EmptyBatch);
        }
        if let Some(short) = commands.iter().find(|c| c.len() < HEADER_LEN) {
            return Err(Error::InvalidCommandLength(short.len()));
        }
        self.commands = commands;
        Ok(())
    }

    /// Raw plaintext commands
    pub fn raw_commands(&self) -> &[Bytes] {
        &self.commands
    }

    /// Parsed plaintext commands
    pub fn commands(&self) -> Result<Vec<Command>> {
        self.commands.iter().map(|c| Command::from_bytes(c)).collect()
    }

    /// Protected commands, set once the whole batch was enciphered
    pub fn encrypted_commands(&self) -> Option<&[Command]> {
        self.encrypted_commands.as_deref()
    }

    pub(crate) fn set_encrypted_commands(&mut self, commands: Vec<Command>) {
        self.encrypted_commands = Some(commands);
    }

    /// Raw responses received from the card
    pub fn responses(&self) -> Option<&[Bytes]> {
        self.responses.as_deref()
    }

    /// Store the raw responses received from the card, each at least a status word
    pub fn set_responses<I, B>(&mut self, responses: I) -> Result<()>
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let responses: Vec<Bytes> = responses.into_iter().map(Into::into).collect();
        if let Some(short) = responses.iter().find(|r| r.len() < SW_LEN) {
            return Err(Error::InvalidResponseLength(short.len()));
        }
        self.responses = Some(responses);
        Ok(())
    }

    /// Store a single raw response
    pub fn set_response(&mut self, response: impl Into<Bytes>) -> Result<()> {
        let response: Bytes = response.into();
        self.set_responses([response])
    }

    /// Deciphered responses, set once every response was deciphered
    pub fn plaintext_responses(&self) -> Option<&[Response]> {
        self.plaintext_responses.as_deref()
    }

    pub(crate) fn set_plaintext_responses(&mut self, responses: Vec<Response>) {
        self.plaintext_responses = Some(responses);
    }

    /// First deciphered response
    pub fn response(&self) -> Option<&Response> {
        self.plaintext_responses.as_ref()?.first()
    }

    /// Failure recorded while processing the batch
    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub(crate) fn set_error(&mut self, error: Error) {
        self.error = Some(error);
    }

    /// Take the recorded failure, leaving none
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    /// Current phase
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to `phase`, which may not go back from [`Phase::Post`] to [`Phase::Prepare`]
    pub fn set_phase(&mut self, phase: Phase) -> Result<()> {
        if self.phase == Phase::Post && phase == Phase::Prepare {
            return Err(Error::IllegalPhaseTransition);
        }
        self.phase = phase;
        Ok(())
    }

    /// Whether the current phase is complete
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Mark the current phase complete or pending
    pub fn set_finished(&mut self, finished: bool) {
        self.finished = finished;
    }
}

impl fmt::Display for CardCommunication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} batch of {} command(s), finished: {}",
            self.phase,
            self.commands.len(),
            self.finished
        )?;
        if let Some(responses) = &self.responses {
            write!(f, ", {} response(s)", responses.len())?;
        }
        if let Some(error) = &self.error {
            write!(f, ", failed: {error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_command_validation() {
        assert!(matches!(CardCommunication::new(&[]), Err(Error::EmptyBatch)));
        assert!(matches!(
            CardCommunication::from_raw([hex!("00A404").to_vec()]),
            Err(Error::InvalidCommandLength(3))
        ));

        let communication =
            CardCommunication::from_raw([hex!("00A4040C").to_vec(), hex!("00B0000000").to_vec()])
                .unwrap();
        assert_eq!(communication.raw_commands().len(), 2);
        let commands = communication.commands().unwrap();
        assert_eq!(commands[1].le, Some(256));
        assert_eq!(communication.phase(), Phase::Prepare);
        assert!(!communication.is_finished());
        assert!(communication.response().is_none());
    }

    #[test]
    fn test_response_validation() {
        let mut communication =
            CardCommunication::new(&[Command::new(0x00, 0x84, 0x00, 0x00).with_le(8)]).unwrap();
        assert!(matches!(
            communication.set_responses([hex!("9000").to_vec(), hex!("90").to_vec()]),
            Err(Error::InvalidResponseLength(1))
        ));
        assert!(communication.responses().is_none());
        communication.set_response(hex!("6A82").to_vec()).unwrap();
        assert_eq!(communication.responses().unwrap().len(), 1);
    }

    #[test]
    fn test_phase_never_returns_to_prepare() {
        let mut communication =
            CardCommunication::new(&[Command::new(0x00, 0x84, 0x00, 0x00)]).unwrap();
        communication.set_phase(Phase::Prepare).unwrap();
        communication.set_phase(Phase::Post).unwrap();
        communication.set_phase(Phase::Post).unwrap();
        assert!(matches!(
            communication.set_phase(Phase::Prepare),
            Err(Error::IllegalPhaseTransition)
        ));
        assert_eq!(communication.phase(), Phase::Post);
    }

    #[test]
    fn test_first_response() {
        let mut communication =
            CardCommunication::new(&[Command::new(0x00, 0x84, 0x00, 0x00)]).unwrap();
        communication.set_plaintext_responses(vec![
            Response::new(hex!("0102").to_vec(), 0x9000),
            Response::new(Vec::new(), 0x6282),
        ]);
        assert_eq!(communication.response().unwrap().sw(), 0x9000);
        communication.set_error(Error::MissingChecksum);
        assert!(communication.to_string().contains("failed: no checksum received from card"));
        assert!(communication.take_error().is_some());
        assert!(communication.error().is_none());
    }
}
