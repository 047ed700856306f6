use crate::error::Error;

/// AES block size.
pub const BLOCK_LEN: usize = 16;

/// Raw CBC-mode block cipher. TLS applies its own padding, so `buf` must
/// always be a whole number of blocks.
pub trait BlockCipher: Send {
    fn encrypt(&self, iv: &[u8; BLOCK_LEN], buf: &mut [u8]) -> Result<(), Error>;

    fn decrypt(&self, iv: &[u8; BLOCK_LEN], buf: &mut [u8]) -> Result<(), Error>;
}
