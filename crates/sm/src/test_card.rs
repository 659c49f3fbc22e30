//! Card side of secure messaging for tests

use eac_asn1::{Asn1, Tag};

use crate::{
    Command, Error, Response, Result, SendSequenceCounter, SessionKeys,
    apdu::{EXTENDED_MAX_LE, SHORT_MAX_LE},
    crypto,
};

/// Answers protected commands with the same keys and counter as the terminal
pub(crate) struct TestCard {
    keys: SessionKeys,
    ssc: SendSequenceCounter,
}

impl TestCard {
    pub(crate) const fn new(keys: SessionKeys, ssc: SendSequenceCounter) -> Self {
        Self { keys, ssc }
    }

    pub(crate) const fn ssc(&self) -> &SendSequenceCounter {
        &self.ssc
    }

    /// Verify and decrypt a protected command
    pub(crate) fn receive(&mut self, command: &Command) -> Result<Command> {
        self.ssc.increment();
        let mut mac_input = crypto::pad(&command.header());
        let mut plain = Command::new(command.cla & !0x0C, command.ins, command.p1, command.p2);
        let mut checksum = None;
        let mut protected_objects = false;

        for object in Asn1::parse_all(command.data())? {
            let value = object.value();
            match object.tag().value() {
                0x87 | 0x85 => {
                    let encrypted = if object.tag() == Tag::new(0x87) { &value[1..] } else { &value[..] };
                    let iv = crypto::encrypt_block(self.keys.enc(), self.ssc.bytes())?;
                    plain.data = Some(crypto::decrypt(self.keys.enc(), &iv, encrypted)?.into());
                }
                0x97 => {
                    plain.le = Some(match value.as_ref() {
                        [0x00] => SHORT_MAX_LE,
                        [0x00, 0x00] => EXTENDED_MAX_LE,
                        [le] => u32::from(*le),
                        [hi, lo] => u32::from(u16::from_be_bytes([*hi, *lo])),
                        _ => return Err(Error::InvalidCommandLength(value.len())),
                    });
                }
                0x8E => {
                    checksum = Some(value.into_owned());
                    continue;
                }
                tag => return Err(Error::UnexpectedDataObject(tag)),
            }
            protected_objects = true;
            object.encode_into(&mut mac_input);
        }

        if protected_objects {
            mac_input = crypto::pad(&mac_input);
        }
        let checksum = checksum.ok_or(Error::MissingChecksum)?;
        crypto::verify_mac(self.keys.mac(), self.ssc.bytes(), &mac_input, &checksum)?;
        Ok(plain)
    }

    /// Protect a response with data and status word
    pub(crate) fn respond(&mut self, data: &[u8], sw: u16) -> Response {
        self.ssc.increment();
        let mut objects = Vec::new();
        if !data.is_empty() {
            let iv = crypto::encrypt_block(self.keys.enc(), self.ssc.bytes()).unwrap();
            let mut value = vec![0x01];
            value.extend(crypto::encrypt(self.keys.enc(), &iv, data).unwrap());
            Asn1::primitive(Tag::new(0x87), value).encode_into(&mut objects);
        }
        Asn1::primitive(Tag::new(0x99), sw.to_be_bytes().to_vec()).encode_into(&mut objects);
        let mac = crypto::mac(self.keys.mac(), self.ssc.bytes(), &crypto::pad(&objects)).unwrap();
        Asn1::primitive(Tag::new(0x8E), mac.to_vec()).encode_into(&mut objects);
        Response::new(objects, sw)
    }
}
