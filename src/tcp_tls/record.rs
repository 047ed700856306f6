//! TLS 1.0-1.2 record layer codec and protection (RFC 5246 section 6.2).
//!
//! ```text
//! GCM:  header | explicit_nonce(8) | ciphertext | tag(16)
//!       nonce = salt(4) | explicit_nonce, explicit_nonce = seq
//!       aad   = seq(8) | type | version | plaintext length
//!
//! CBC:  header | [iv(16), TLS 1.1+] | E(plaintext | mac | padding)
//!       mac   = HMAC(seq(8) | type | version | length | plaintext)
//! ```
//!
//! Every failure to open a record is reported as the same `bad_record_mac`
//! whatever the cause (length, padding, MAC or tag).

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::Range;

use subtle::{ConditionallySelectable, ConstantTimeEq, ConstantTimeGreater};
use zeroize::Zeroizing;

use crate::crypto::{Aead, BlockCipher, CryptoProvider, HashAlgorithm, BLOCK_LEN, GCM_TAG_LEN};
use crate::error::Error;
use crate::tls::alert::AlertDescription;
use crate::tls::cipher_suite::CipherMode;
use crate::tls::key_schedule::DirectionKeys;
use crate::tls::ProtocolVersion;
use crate::transport::Rng;

/// TLS record content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContentType {
    ChangeCipherSpec = 20,
    Alert = 21,
    Handshake = 22,
    ApplicationData = 23,
}

impl ContentType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            20 => Some(Self::ChangeCipherSpec),
            21 => Some(Self::Alert),
            22 => Some(Self::Handshake),
            23 => Some(Self::ApplicationData),
            _ => None,
        }
    }
}

/// TLS record header size.
pub const RECORD_HEADER_LEN: usize = 5;

/// Largest plaintext fragment (2^14).
pub const MAX_FRAGMENT_LEN: usize = 16384;

/// Largest protected fragment accepted from the peer (2^14 + 2048).
pub const MAX_CIPHERTEXT_LEN: usize = MAX_FRAGMENT_LEN + 2048;

const GCM_EXPLICIT_NONCE_LEN: usize = 8;

/// TLS record header (5 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub content_type: ContentType,
    pub version: u16,
    pub length: u16,
}

impl RecordHeader {
    pub fn new(content_type: ContentType, version: u16, length: usize) -> Result<Self, Error> {
        let length = u16::try_from(length).map_err(|_| Error::InvalidState)?;
        Ok(Self {
            content_type,
            version,
            length,
        })
    }

    pub fn encode(&self) -> [u8; RECORD_HEADER_LEN] {
        let v = self.version.to_be_bytes();
        let l = self.length.to_be_bytes();
        [self.content_type as u8, v[0], v[1], l[0], l[1]]
    }

    /// Decode a header. Unknown content types are `unexpected_message`,
    /// fragments longer than any legal record are `record_overflow`.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        if data.len() < RECORD_HEADER_LEN {
            return Err(Error::BufferTooSmall {
                needed: RECORD_HEADER_LEN,
            });
        }
        let content_type = ContentType::from_byte(data[0])
            .ok_or(Error::Alert(AlertDescription::UnexpectedMessage))?;
        if data[1] != 0x03 {
            return Err(Error::Alert(AlertDescription::ProtocolVersion));
        }
        let version = u16::from_be_bytes([data[1], data[2]]);
        let length = u16::from_be_bytes([data[3], data[4]]);
        if length as usize > MAX_CIPHERTEXT_LEN {
            return Err(Error::Alert(AlertDescription::RecordOverflow));
        }
        Ok(Self {
            content_type,
            version,
            length,
        })
    }
}

/// Append an unprotected record.
pub fn encode_plaintext(
    content_type: ContentType,
    version: u16,
    payload: &[u8],
    out: &mut Vec<u8>,
) -> Result<(), Error> {
    if payload.len() > MAX_FRAGMENT_LEN {
        return Err(Error::InvalidState);
    }
    out.extend_from_slice(&RecordHeader::new(content_type, version, payload.len())?.encode());
    out.extend_from_slice(payload);
    Ok(())
}

/// `seq | type | version | length`, the MAC pseudo-header and GCM AAD.
fn pseudo_header(seq: u64, ct: ContentType, version: ProtocolVersion, len: usize) -> [u8; 13] {
    let mut h = [0u8; 13];
    h[..8].copy_from_slice(&seq.to_be_bytes());
    h[8] = ct as u8;
    h[9..11].copy_from_slice(&version.to_u16().to_be_bytes());
    h[11..13].copy_from_slice(&(len as u16).to_be_bytes());
    h
}

fn bad_record_mac() -> Error {
    Error::Alert(AlertDescription::BadRecordMac)
}

enum Protection {
    Gcm {
        aead: Box<dyn Aead>,
        salt: [u8; 4],
    },
    Cbc {
        cipher: Box<dyn BlockCipher>,
        mac: HashAlgorithm,
        mac_key: Zeroizing<Vec<u8>>,
        /// Next IV under TLS 1.0 (last ciphertext block of the previous
        /// record); unused from TLS 1.1 on.
        chained_iv: Zeroizing<[u8; BLOCK_LEN]>,
    },
}

/// Protection state for one direction of a connection.
pub struct RecordProtection {
    provider: Arc<dyn CryptoProvider>,
    rng: Arc<dyn Rng>,
    version: ProtocolVersion,
    protection: Protection,
    seq: u64,
}

impl RecordProtection {
    /// Take ownership of one direction's keys. Sequence number starts at 0.
    pub fn new(
        provider: Arc<dyn CryptoProvider>,
        rng: Arc<dyn Rng>,
        keys: DirectionKeys,
    ) -> Result<Self, Error> {
        let params = keys.suite.params();
        let protection = match params.mode {
            CipherMode::Gcm => {
                let aead = provider.aead(params.cipher, &keys.enc_key)?;
                let salt = keys.iv.as_slice().try_into().map_err(|_| Error::InvalidState)?;
                Protection::Gcm { aead, salt }
            }
            CipherMode::Cbc => {
                let cipher = provider.cbc(params.cipher, &keys.enc_key)?;
                let mac = params.mac.ok_or(Error::InvalidState)?;
                let iv: [u8; BLOCK_LEN] =
                    keys.iv.as_slice().try_into().map_err(|_| Error::InvalidState)?;
                Protection::Cbc {
                    cipher,
                    mac,
                    mac_key: Zeroizing::new(keys.mac_key.clone()),
                    chained_iv: Zeroizing::new(iv),
                }
            }
        };
        Ok(Self {
            provider,
            rng,
            version: keys.version,
            protection,
            seq: 0,
        })
    }

    /// Records processed so far in this direction.
    pub fn sequence_number(&self) -> u64 {
        self.seq
    }

    fn next_seq(&mut self) -> Result<u64, Error> {
        let seq = self.seq;
        self.seq = seq.checked_add(1).ok_or(Error::InvalidState)?;
        Ok(seq)
    }

    /// Protect `payload` and append the complete record to `out`.
    pub fn seal(
        &mut self,
        content_type: ContentType,
        payload: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<(), Error> {
        if payload.len() > MAX_FRAGMENT_LEN {
            return Err(Error::InvalidState);
        }
        let seq = self.next_seq()?;
        let version = self.version;
        let pseudo = pseudo_header(seq, content_type, version, payload.len());

        match &mut self.protection {
            Protection::Gcm { aead, salt } => {
                let explicit = seq.to_be_bytes();
                let mut nonce = [0u8; 12];
                nonce[..4].copy_from_slice(salt);
                nonce[4..].copy_from_slice(&explicit);

                let len = GCM_EXPLICIT_NONCE_LEN + payload.len() + GCM_TAG_LEN;
                out.extend_from_slice(
                    &RecordHeader::new(content_type, version.to_u16(), len)?.encode(),
                );
                out.extend_from_slice(&explicit);
                let body = out.len();
                out.extend_from_slice(payload);
                out.resize(body + payload.len() + GCM_TAG_LEN, 0);
                aead.seal_in_place(&nonce, &pseudo, &mut out[body..], payload.len())?;
            }
            Protection::Cbc {
                cipher,
                mac,
                mac_key,
                chained_iv,
            } => {
                let mut tag = [0u8; 64];
                let mac_len = self
                    .provider
                    .hmac(*mac, &mac_key[..], &[&pseudo, payload], &mut tag)?;

                let unpadded = payload.len() + mac_len + 1;
                let pad = (BLOCK_LEN - unpadded % BLOCK_LEN) % BLOCK_LEN;
                let encrypted_len = unpadded + pad;
                let explicit_iv = version.has_explicit_iv();
                let len = encrypted_len + if explicit_iv { BLOCK_LEN } else { 0 };

                let iv = if explicit_iv {
                    let mut iv = [0u8; BLOCK_LEN];
                    self.rng.fill(&mut iv);
                    iv
                } else {
                    **chained_iv
                };

                out.extend_from_slice(
                    &RecordHeader::new(content_type, version.to_u16(), len)?.encode(),
                );
                if explicit_iv {
                    out.extend_from_slice(&iv);
                }
                let body = out.len();
                out.extend_from_slice(payload);
                out.extend_from_slice(&tag[..mac_len]);
                out.resize(body + encrypted_len, pad as u8);
                cipher.encrypt(&iv, &mut out[body..])?;

                if !explicit_iv {
                    chained_iv.copy_from_slice(&out[out.len() - BLOCK_LEN..]);
                }
            }
        }
        log::trace!("sealed {:?} record seq={} ({} bytes)", content_type, seq, payload.len());
        Ok(())
    }

    /// Decrypt and authenticate `fragment` (the record body) in place.
    /// Returns where the plaintext sits inside `fragment`.
    pub fn open(
        &mut self,
        content_type: ContentType,
        fragment: &mut [u8],
    ) -> Result<Range<usize>, Error> {
        let seq = self.next_seq()?;
        let version = self.version;

        let range = match &mut self.protection {
            Protection::Gcm { aead, salt } => {
                if fragment.len() < GCM_EXPLICIT_NONCE_LEN + GCM_TAG_LEN {
                    return Err(bad_record_mac());
                }
                let mut nonce = [0u8; 12];
                nonce[..4].copy_from_slice(salt);
                nonce[4..].copy_from_slice(&fragment[..GCM_EXPLICIT_NONCE_LEN]);
                let plain_len = fragment.len() - GCM_EXPLICIT_NONCE_LEN - GCM_TAG_LEN;
                let aad = pseudo_header(seq, content_type, version, plain_len);
                let body = &mut fragment[GCM_EXPLICIT_NONCE_LEN..];
                let body_len = body.len();
                let n = aead
                    .open_in_place(&nonce, &aad, body, body_len)
                    .map_err(|_| bad_record_mac())?;
                GCM_EXPLICIT_NONCE_LEN..GCM_EXPLICIT_NONCE_LEN + n
            }
            Protection::Cbc {
                cipher,
                mac,
                mac_key,
                chained_iv,
            } => {
                let mac_len = mac.output_len();
                let iv_len = if version.has_explicit_iv() { BLOCK_LEN } else { 0 };
                let min_encrypted = (mac_len + 1).div_ceil(BLOCK_LEN) * BLOCK_LEN;
                let encrypted_len = fragment.len().saturating_sub(iv_len);
                if fragment.len() < iv_len + min_encrypted || encrypted_len % BLOCK_LEN != 0 {
                    return Err(bad_record_mac());
                }

                let iv: [u8; BLOCK_LEN] = if iv_len > 0 {
                    fragment[..BLOCK_LEN].try_into().map_err(|_| bad_record_mac())?
                } else {
                    let iv = **chained_iv;
                    chained_iv.copy_from_slice(&fragment[fragment.len() - BLOCK_LEN..]);
                    iv
                };
                let data = &mut fragment[iv_len..];
                cipher.decrypt(&iv, data).map_err(|_| bad_record_mac())?;

                let content_len =
                    check_cbc_record(&*self.provider, *mac, &mac_key[..], seq, content_type, version, data)?;
                iv_len..iv_len + content_len
            }
        };
        if range.len() > MAX_FRAGMENT_LEN {
            return Err(Error::Alert(AlertDescription::RecordOverflow));
        }
        log::trace!("opened {:?} record seq={} ({} bytes)", content_type, seq, range.len());
        Ok(range)
    }
}

/// Filler hashed after the record MAC so every record of a given length
/// costs the same number of compression blocks.
const MAC_FILLER: [u8; 512] = [0; 512];

/// Compression-function calls a hash makes over `n` message bytes,
/// counting its final padding block.
fn hash_blocks(hash: HashAlgorithm, n: usize) -> usize {
    let length_field = if hash.block_len() == 128 { 16 } else { 8 };
    (n + 1 + length_field).div_ceil(hash.block_len())
}

/// Validate padding and MAC of a decrypted CBC record without branching
/// on which check failed. Returns the content length.
///
/// The work done depends only on `data.len()`: the padding scan always
/// covers 256 bytes, the received MAC is read from every candidate
/// offset, and a second HMAC over filler tops the hashing up to the
/// cost of a record with one byte of padding.
fn check_cbc_record(
    provider: &dyn CryptoProvider,
    mac: HashAlgorithm,
    mac_key: &[u8],
    seq: u64,
    content_type: ContentType,
    version: ProtocolVersion,
    data: &[u8],
) -> Result<usize, Error> {
    let mac_len = mac.output_len();
    let len = data.len();
    let pad = data[len - 1];

    // Room for content, MAC and padding.
    let fits = !((pad as u64 + 1 + mac_len as u64).ct_gt(&(len as u64)));
    let mut good = fits;

    // Every padding byte must equal the padding length.
    let scan = len.min(256);
    for i in 0..scan {
        let byte = data[len - 1 - i];
        let in_padding = !(i as u64).ct_gt(&(pad as u64));
        good &= !in_padding | byte.ct_eq(&pad);
    }

    // With bad padding, check the MAC as if there were none.
    let pad_len = u64::conditional_select(&1, &(pad as u64 + 1), good) as usize;
    let content_len = len - mac_len - pad_len;
    let max_content_len = len - mac_len - 1;

    let mut received = [0u8; 64];
    for pos in max_content_len.saturating_sub(255)..=max_content_len {
        let here = (pos as u64).ct_eq(&(content_len as u64));
        for (k, r) in received[..mac_len].iter_mut().enumerate() {
            r.conditional_assign(&data[pos + k], here);
        }
    }

    let pseudo = pseudo_header(seq, content_type, version, content_len);
    let mut expected = [0u8; 64];
    provider.hmac(mac, mac_key, &[&pseudo, &data[..content_len]], &mut expected)?;

    let missing = hash_blocks(mac, pseudo.len() + max_content_len)
        - hash_blocks(mac, pseudo.len() + content_len);
    let filler_len = (missing * mac.block_len()).min(MAC_FILLER.len());
    let mut filler_tag = [0u8; 64];
    provider.hmac(mac, mac_key, &[&MAC_FILLER[..filler_len]], &mut filler_tag)?;

    let mac_ok = expected[..mac_len].ct_eq(&received[..mac_len]);
    if bool::from(good & mac_ok) {
        Ok(content_len)
    } else {
        Err(bad_record_mac())
    }
}
