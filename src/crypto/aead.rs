use crate::error::Error;

/// Authentication tag length for AES-GCM record protection.
pub const GCM_TAG_LEN: usize = 16;

/// Authenticated Encryption with Associated Data.
///
/// Used for GCM record protection. The nonce is always 12 bytes: the
/// 4-byte implicit salt from the key block followed by the 8-byte explicit
/// nonce carried in the record.
pub trait Aead: Send {
    /// Encrypt in place.
    ///
    /// `buf[..payload_len]` contains the plaintext. The buffer must have
    /// room for the authentication tag (`buf.len() >= payload_len + GCM_TAG_LEN`).
    ///
    /// Returns the total length of ciphertext + tag.
    fn seal_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        buf: &mut [u8],
        payload_len: usize,
    ) -> Result<usize, Error>;

    /// Decrypt in place.
    ///
    /// `buf[..ciphertext_len]` contains ciphertext + authentication tag.
    ///
    /// Returns the plaintext length on success.
    fn open_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        buf: &mut [u8],
        ciphertext_len: usize,
    ) -> Result<usize, Error>;
}
