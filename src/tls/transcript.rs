//! Running transcript hash for the TLS 1.0-1.2 handshake.
//!
//! The PRF hash is not known until ServerHello arrives, so every candidate
//! hash runs in parallel: MD5 and SHA-1 for TLS 1.0/1.1 Finished, SHA-256
//! and SHA-384 for TLS 1.2. Intermediate hashes are obtained by cloning the
//! state. The raw messages are also kept until a CertificateVerify could
//! still need to sign them.

use alloc::vec::Vec;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384};

use crate::crypto::HashAlgorithm;
use crate::tls::ProtocolVersion;

/// Largest digest the transcript produces (SHA-384, or MD5 ‖ SHA-1).
pub const MAX_TRANSCRIPT_HASH_LEN: usize = 48;

pub type TranscriptDigest = heapless::Vec<u8, MAX_TRANSCRIPT_HASH_LEN>;

/// Running hashes over TLS handshake messages.
#[derive(Clone)]
pub struct TranscriptHash {
    md5: Md5,
    sha1: Sha1,
    sha256: Sha256,
    sha384: Sha384,
    messages: Option<Vec<u8>>,
}

impl Default for TranscriptHash {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptHash {
    /// Create a new empty transcript hash.
    pub fn new() -> Self {
        Self {
            md5: Md5::new(),
            sha1: Sha1::new(),
            sha256: Sha256::new(),
            sha384: Sha384::new(),
            messages: Some(Vec::new()),
        }
    }

    /// Feed handshake message bytes (header included) into the transcript.
    pub fn update(&mut self, message: &[u8]) {
        self.md5.update(message);
        self.sha1.update(message);
        self.sha256.update(message);
        self.sha384.update(message);
        if let Some(messages) = self.messages.as_mut() {
            messages.extend_from_slice(message);
        }
    }

    /// Get the current hash under `hash` without consuming the state.
    ///
    /// SHA-512 is never a transcript hash; asking for it yields SHA-384.
    pub fn current_hash(&self, hash: HashAlgorithm) -> TranscriptDigest {
        let mut out = TranscriptDigest::new();
        // Every digest fits in MAX_TRANSCRIPT_HASH_LEN.
        let _ = match hash {
            HashAlgorithm::Md5 => out.extend_from_slice(&self.md5.clone().finalize()),
            HashAlgorithm::Sha1 => out.extend_from_slice(&self.sha1.clone().finalize()),
            HashAlgorithm::Sha256 => out.extend_from_slice(&self.sha256.clone().finalize()),
            HashAlgorithm::Sha384 | HashAlgorithm::Sha512 => {
                out.extend_from_slice(&self.sha384.clone().finalize())
            }
        };
        out
    }

    /// The hash the Finished computation uses: MD5 ‖ SHA-1 before TLS 1.2,
    /// the suite's PRF hash from TLS 1.2 on.
    pub fn finished_hash(&self, version: ProtocolVersion, prf_hash: HashAlgorithm) -> TranscriptDigest {
        if version >= ProtocolVersion::Tls12 {
            return self.current_hash(prf_hash);
        }
        let mut out = self.current_hash(HashAlgorithm::Md5);
        let _ = out.extend_from_slice(&self.current_hash(HashAlgorithm::Sha1));
        out
    }

    /// All handshake messages so far, if still retained.
    pub fn messages(&self) -> Option<&[u8]> {
        self.messages.as_deref()
    }

    /// Stop retaining raw messages once no CertificateVerify can follow.
    pub fn discard_messages(&mut self) {
        self.messages = None;
    }
}
