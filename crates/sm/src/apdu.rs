//! Command and response APDUs
//!
//! Short and extended length encodings according to ISO/IEC 7816-4. The
//! expected response length is kept as Ne, so `Some(256)` encodes as a
//! short `00` and `Some(65536)` as an extended `0000`.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// Largest Nc of a short APDU
pub const SHORT_MAX_LC: usize = 255;
/// Largest Ne of a short APDU
pub const SHORT_MAX_LE: u32 = 256;
/// Largest Nc of an extended APDU
pub const EXTENDED_MAX_LC: usize = 65535;
/// Largest Ne of an extended APDU
pub const EXTENDED_MAX_LE: u32 = 65536;

/// A command APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data (optional)
    pub data: Option<Bytes>,
    /// Expected response length Ne (optional)
    pub le: Option<u32>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Set the data field
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the expected response length Ne
    pub const fn with_le(mut self, le: u32) -> Self {
        self.le = Some(le);
        self
    }

    /// Header bytes CLA, INS, P1, P2
    pub const fn header(&self) -> [u8; 4] {
        [self.cla, self.ins, self.p1, self.p2]
    }

    /// Command data, empty if absent
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or_default()
    }

    /// Length Nc of the command data
    pub fn nc(&self) -> usize {
        self.data().len()
    }

    /// Expected response length Ne, zero if absent
    pub fn ne(&self) -> u32 {
        self.le.unwrap_or(0)
    }

    /// Whether the command needs the extended length encoding
    pub fn is_extended(&self) -> bool {
        self.nc() > SHORT_MAX_LC || self.ne() > SHORT_MAX_LE
    }

    /// Convert to raw APDU bytes
    pub fn to_bytes(&self) -> Result<Bytes> {
        let nc = self.nc();
        if nc > EXTENDED_MAX_LC {
            return Err(Error::DataTooLong(nc));
        }
        let extended = self.is_extended();
        let mut buffer = BytesMut::with_capacity(4 + 3 + nc + 2);

        // Header: CLA, INS, P1, P2
        buffer.put_slice(&self.header());

        if nc > 0 {
            if extended {
                buffer.put_u8(0x00);
                buffer.put_u16(nc as u16);
            } else {
                buffer.put_u8(nc as u8);
            }
            buffer.put_slice(self.data());
        }

        if let Some(le) = self.le {
            if extended {
                // extended Le without Lc starts with a zero byte
                if nc == 0 {
                    buffer.put_u8(0x00);
                }
                buffer.put_u16(if le >= EXTENDED_MAX_LE { 0 } else { le as u16 });
            } else {
                buffer.put_u8(if le >= SHORT_MAX_LE { 0 } else { le as u8 });
            }
        }

        Ok(buffer.freeze())
    }

    /// Parse a command from raw bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let [cla, ins, p1, p2, body @ ..] = data else {
            return Err(Error::InvalidCommandLength(data.len()));
        };
        let mut command = Self::new(*cla, *ins, *p1, *p2);
        let short_le = |b: u8| if b == 0 { SHORT_MAX_LE } else { u32::from(b) };
        let extended_le = |hi: u8, lo: u8| match u16::from_be_bytes([hi, lo]) {
            0 => EXTENDED_MAX_LE,
            le => u32::from(le),
        };

        match body {
            [] => {}
            [le] => command.le = Some(short_le(*le)),
            [0x00, hi, lo] => command.le = Some(extended_le(*hi, *lo)),
            [0x00, hi, lo, rest @ ..] => {
                let lc = usize::from(u16::from_be_bytes([*hi, *lo]));
                match rest.len() {
                    n if n == lc && lc > 0 => {}
                    n if n == lc + 2 && lc > 0 => {
                        command.le = Some(extended_le(rest[lc], rest[lc + 1]));
                    }
                    _ => return Err(Error::InvalidCommandLength(data.len())),
                }
                command.data = Some(Bytes::copy_from_slice(&rest[..lc]));
            }
            [lc, rest @ ..] if *lc != 0 => {
                let lc = usize::from(*lc);
                match rest.len() {
                    n if n == lc => {}
                    n if n == lc + 1 => command.le = Some(short_le(rest[lc])),
                    _ => return Err(Error::InvalidCommandLength(data.len())),
                }
                command.data = Some(Bytes::copy_from_slice(&rest[..lc]));
            }
            _ => return Err(Error::InvalidCommandLength(data.len())),
        }

        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.header()))?;
        if let Some(data) = &self.data {
            write!(f, " [{}] {}", data.len(), hex::encode_upper(data))?;
        }
        if let Some(le) = self.le {
            write!(f, " Ne={le}")?;
        }
        Ok(())
    }
}

/// A response APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    data: Bytes,
    sw: u16,
}

impl Response {
    /// Create a response from data and status word
    pub fn new(data: impl Into<Bytes>, sw: u16) -> Self {
        Self {
            data: data.into(),
            sw,
        }
    }

    /// Parse a response, the last two bytes being the status word
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let [data @ .., sw1, sw2] = bytes else {
            return Err(Error::InvalidResponseLength(bytes.len()));
        };
        Ok(Self {
            data: Bytes::copy_from_slice(data),
            sw: u16::from_be_bytes([*sw1, *sw2]),
        })
    }

    /// Response data without the status word
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Status word
    pub const fn sw(&self) -> u16 {
        self.sw
    }

    /// Whether the status word is `9000`
    pub const fn is_success(&self) -> bool {
        self.sw == 0x9000
    }

    /// Convert to raw bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.data.len() + 2);
        buffer.put_slice(&self.data);
        buffer.put_u16(self.sw);
        buffer.freeze()
    }
}
