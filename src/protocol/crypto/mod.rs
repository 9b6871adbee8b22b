//! RAOP cryptography: RSA key exchange and AES-128-CBC audio decryption

pub mod aes;
pub mod rsa;

pub use aes::SessionCipher;
pub use rsa::ReceiverRsaKey;

/// Key material lengths
pub mod lengths {
    /// AES-128 key length in bytes
    pub const AES_128_KEY: usize = 16;
    /// AES IV / block length in bytes
    pub const AES_BLOCK: usize = 16;
}

/// Errors from cryptographic operations
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Key or IV has the wrong length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// RSA decryption or padding check failed
    #[error("RSA decryption failed: {0}")]
    DecryptionFailed(String),

    /// Signing the challenge failed
    #[error("RSA signing failed: {0}")]
    SigningFailed(String),

    /// The private key could not be parsed
    #[error("invalid RSA private key")]
    InvalidPrivateKey,

    /// Random number generation failed
    #[error("RNG failure")]
    RngError,
}
