//! Big-endian, length-prefixed primitives shared by the handshake and
//! extension codecs (RFC 5246 section 4).
//!
//! Every read is bounds-checked; running off the end of the input, or a
//! length prefix that claims more bytes than remain, is a `decode_error`.

use alloc::vec::Vec;

use crate::error::Error;

/// Cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    off: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, off: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.off
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Fail with `decode_error` if any bytes are left over.
    pub fn finish(&self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::decode())
        }
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < n {
            return Err(Error::decode());
        }
        let out = &self.data[self.off..self.off + n];
        self.off += n;
        Ok(out)
    }

    /// Everything not yet consumed.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.off..];
        self.off = self.data.len();
        out
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, Error> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, Error> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u24(&mut self) -> Result<usize, Error> {
        let b = self.bytes(3)?;
        Ok(((b[0] as usize) << 16) | ((b[1] as usize) << 8) | b[2] as usize)
    }

    /// Opaque vector with a 1-byte length prefix.
    pub fn vec_u8(&mut self) -> Result<&'a [u8], Error> {
        let len = self.u8()? as usize;
        self.bytes(len)
    }

    /// Opaque vector with a 2-byte length prefix.
    pub fn vec_u16(&mut self) -> Result<&'a [u8], Error> {
        let len = self.u16()? as usize;
        self.bytes(len)
    }

    /// Opaque vector with a 3-byte length prefix.
    pub fn vec_u24(&mut self) -> Result<&'a [u8], Error> {
        let len = self.u24()?;
        self.bytes(len)
    }

    /// A 2-byte length prefixed list of `u16` values. An odd byte count is a
    /// `decode_error`.
    pub fn u16_list(&mut self) -> Result<Vec<u16>, Error> {
        let body = self.vec_u16()?;
        if body.len() % 2 != 0 {
            return Err(Error::decode());
        }
        Ok(body
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect())
    }
}

pub fn put_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

pub fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn put_u24(out: &mut Vec<u8>, v: usize) {
    out.extend_from_slice(&[(v >> 16) as u8, (v >> 8) as u8, v as u8]);
}

/// Append `data` behind a 1-byte length prefix.
pub fn put_vec_u8(out: &mut Vec<u8>, data: &[u8]) -> Result<(), Error> {
    let len = u8::try_from(data.len()).map_err(|_| Error::InvalidState)?;
    out.push(len);
    out.extend_from_slice(data);
    Ok(())
}

/// Append `data` behind a 2-byte length prefix.
pub fn put_vec_u16(out: &mut Vec<u8>, data: &[u8]) -> Result<(), Error> {
    let len = u16::try_from(data.len()).map_err(|_| Error::InvalidState)?;
    put_u16(out, len);
    out.extend_from_slice(data);
    Ok(())
}

/// Append `data` behind a 3-byte length prefix.
pub fn put_vec_u24(out: &mut Vec<u8>, data: &[u8]) -> Result<(), Error> {
    if data.len() >= 1 << 24 {
        return Err(Error::InvalidState);
    }
    put_u24(out, data.len());
    out.extend_from_slice(data);
    Ok(())
}

/// Reserve a length prefix of `width` bytes, run `f`, then patch the prefix
/// with the number of bytes `f` appended.
pub fn with_length_prefix<F>(out: &mut Vec<u8>, width: usize, f: F) -> Result<(), Error>
where
    F: FnOnce(&mut Vec<u8>) -> Result<(), Error>,
{
    let start = out.len();
    out.resize(start + width, 0);
    f(out)?;
    let len = out.len() - start - width;
    if width < core::mem::size_of::<usize>() && len >> (8 * width) != 0 {
        return Err(Error::InvalidState);
    }
    for i in 0..width {
        out[start + i] = (len >> (8 * (width - 1 - i))) as u8;
    }
    Ok(())
}
