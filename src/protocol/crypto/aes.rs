//! AES-128-CBC session cipher for RAOP audio payloads
//!
//! Every packet is processed independently: the chaining state is reset to
//! the negotiated IV at the start of each packet, only whole 16-byte
//! blocks are transformed, and trailing bytes that do not fill a block
//! pass through unchanged. Decrypting packet N therefore never depends on
//! packet N-1's final cipher state.

use aes::Aes128;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use zeroize::ZeroizeOnDrop;

use super::lengths;

/// Per-session AES-128-CBC cipher
///
/// Holds the negotiated key and IV for the lifetime of the session; key
/// material is cleared when the session is dropped.
#[derive(ZeroizeOnDrop)]
pub struct SessionCipher {
    key: [u8; 16],
    iv: [u8; 16],
}

impl SessionCipher {
    /// Create a cipher from the negotiated 16-byte key and IV
    #[must_use]
    pub fn new(key: [u8; 16], iv: [u8; 16]) -> Self {
        Self { key, iv }
    }

    /// Decrypt one audio packet payload.
    ///
    /// CBC chaining starts from the session IV regardless of any previous
    /// packet. Trailing bytes beyond the last whole block are copied
    /// through as-is, per the RAOP framing.
    #[must_use]
    pub fn decrypt_packet(&self, payload: &[u8]) -> Vec<u8> {
        let full_len = (payload.len() / lengths::AES_BLOCK) * lengths::AES_BLOCK;

        let cipher = Aes128::new((&self.key).into());
        let mut output = Vec::with_capacity(payload.len());
        let mut prev_block = self.iv;

        for chunk in payload[..full_len].chunks(lengths::AES_BLOCK) {
            let mut block = [0u8; 16];
            block.copy_from_slice(chunk);

            let block_arr = aes::Block::from_mut_slice(&mut block);
            cipher.decrypt_block(block_arr);

            for (byte, prev) in block.iter_mut().zip(prev_block.iter()) {
                *byte ^= prev;
            }

            prev_block.copy_from_slice(chunk);
            output.extend_from_slice(&block);
        }

        output.extend_from_slice(&payload[full_len..]);
        output
    }

    /// Encrypt one audio packet payload.
    ///
    /// Exact inverse of [`decrypt_packet`](Self::decrypt_packet); used by
    /// loopback tests and mock senders.
    #[must_use]
    pub fn encrypt_packet(&self, payload: &[u8]) -> Vec<u8> {
        let full_len = (payload.len() / lengths::AES_BLOCK) * lengths::AES_BLOCK;

        let cipher = Aes128::new((&self.key).into());
        let mut output = Vec::with_capacity(payload.len());
        let mut prev_block = self.iv;

        for chunk in payload[..full_len].chunks(lengths::AES_BLOCK) {
            let mut block = [0u8; 16];
            for (i, byte) in block.iter_mut().enumerate() {
                *byte = chunk[i] ^ prev_block[i];
            }

            let block_arr = aes::Block::from_mut_slice(&mut block);
            cipher.encrypt_block(block_arr);

            prev_block = block;
            output.extend_from_slice(&block);
        }

        output.extend_from_slice(&payload[full_len..]);
        output
    }

    /// The session IV
    #[must_use]
    pub fn iv(&self) -> &[u8; 16] {
        &self.iv
    }
}
