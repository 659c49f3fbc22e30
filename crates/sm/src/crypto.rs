//! AES primitives for secure messaging
//!
//! Keys are passed as slices and dispatched on their length to AES-128,
//! AES-192 or AES-256.

use cipher::{
    BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit,
    block_padding::Iso7816, generic_array::GenericArray,
};
use cmac::{Cmac, Mac};

use crate::{Error, Result};

/// AES block size, also the length of the SSC
pub(crate) const BLOCK_SIZE: usize = 16;

/// Length of the truncated CMAC in `8E`
pub(crate) const MAC_LEN: usize = 8;

macro_rules! with_aes {
    ($key:expr, $cipher:ident => $body:expr) => {
        match $key.len() {
            16 => {
                type $cipher = aes::Aes128;
                $body
            }
            24 => {
                type $cipher = aes::Aes192;
                $body
            }
            32 => {
                type $cipher = aes::Aes256;
                $body
            }
            len => Err(Error::InvalidKeyLength(len)),
        }
    };
}

/// Check that `key` is a valid AES key
pub(crate) fn check_key(key: &[u8]) -> Result<()> {
    with_aes!(key, C => C::new_from_slice(key).map(|_| ()).map_err(|_| Error::InvalidKeyLength(key.len())))
}

/// Append `80 00 ..` up to the next block boundary, always adding at least one byte
pub(crate) fn pad(data: &[u8]) -> Vec<u8> {
    let mut padded = Vec::with_capacity(data.len() + BLOCK_SIZE);
    padded.extend_from_slice(data);
    padded.push(0x80);
    padded.resize(padded.len().next_multiple_of(BLOCK_SIZE), 0x00);
    padded
}

/// Encrypt a single block, used to derive the IV from the SSC
pub(crate) fn encrypt_block(key: &[u8], block: &[u8; BLOCK_SIZE]) -> Result<[u8; BLOCK_SIZE]> {
    with_aes!(key, C => {
        let cipher = C::new_from_slice(key).map_err(|_| Error::InvalidKeyLength(key.len()))?;
        let mut out = GenericArray::clone_from_slice(block);
        cipher.encrypt_block(&mut out);
        Ok(out.into())
    })
}

/// Pad and encrypt `data` in CBC mode
pub(crate) fn encrypt(key: &[u8], iv: &[u8; BLOCK_SIZE], data: &[u8]) -> Result<Vec<u8>> {
    with_aes!(key, C => {
        let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv)
            .map_err(|_| Error::InvalidKeyLength(key.len()))?;
        Ok(encryptor.encrypt_padded_vec_mut::<Iso7816>(data))
    })
}

/// Decrypt `data` in CBC mode and strip the padding
pub(crate) fn decrypt(key: &[u8], iv: &[u8; BLOCK_SIZE], data: &[u8]) -> Result<Vec<u8>> {
    with_aes!(key, C => {
        let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
            .map_err(|_| Error::InvalidKeyLength(key.len()))?;
        decryptor
            .decrypt_padded_vec_mut::<Iso7816>(data)
            .map_err(|_| Error::Padding)
    })
}

/// AES-CMAC over `ssc || data`, truncated to [`MAC_LEN`] bytes
pub(crate) fn mac(key: &[u8], ssc: &[u8; BLOCK_SIZE], data: &[u8]) -> Result<[u8; MAC_LEN]> {
    with_aes!(key, C => {
        let mut mac = <Cmac<C> as Mac>::new_from_slice(key)
            .map_err(|_| Error::InvalidKeyLength(key.len()))?;
        mac.update(ssc);
        mac.update(data);
        let full = mac.finalize().into_bytes();
        let mut out = [0u8; MAC_LEN];
        out.copy_from_slice(&full[..MAC_LEN]);
        Ok(out)
    })
}

/// Check a received checksum against AES-CMAC over `ssc || data`
pub(crate) fn verify_mac(
    key: &[u8],
    ssc: &[u8; BLOCK_SIZE],
    data: &[u8],
    received: &[u8],
) -> Result<()> {
    if received.len() != MAC_LEN {
        return Err(Error::ChecksumMismatch);
    }
    with_aes!(key, C => {
        let mut mac = <Cmac<C> as Mac>::new_from_slice(key)
            .map_err(|_| Error::InvalidKeyLength(key.len()))?;
        mac.update(ssc);
        mac.update(data);
        mac.verify_truncated_left(received)
            .map_err(|_| Error::ChecksumMismatch)
    })
}
