//! Cryptographic capability consumed by the handshake and record layer.
//!
//! TLS 1.0-1.2 needs bulk ciphers (AES-GCM, AES-CBC), HMAC for the PRF and
//! CBC record MACs, RSA encryption for the RSA key exchange, signature
//! verification for ServerKeyExchange, signing for an optional client
//! CertificateVerify, and ephemeral ECDH. The [`CryptoProvider`] trait bundles
//! these together, allowing pluggable implementations (software via
//! RustCrypto, or hardware-accelerated).

mod aead;
mod block;

#[cfg(feature = "rustcrypto")]
pub mod rustcrypto;

pub use aead::{Aead, GCM_TAG_LEN};
pub use block::{BlockCipher, BLOCK_LEN};

use alloc::boxed::Box;
use alloc::vec::Vec;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::Error;
use crate::transport::Rng;
use crate::x509::SubjectPublicKeyInfo;

/// Hash functions used by the PRF, record MACs and signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub const fn output_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// HMAC block size in bytes.
    pub const fn block_len(self) -> usize {
        match self {
            Self::Md5 | Self::Sha1 | Self::Sha256 => 64,
            Self::Sha384 | Self::Sha512 => 128,
        }
    }
}

/// AES key sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkCipher {
    Aes128,
    Aes256,
}

impl BulkCipher {
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes256 => 32,
        }
    }
}

/// Named groups usable for ECDHE (RFC 8422 section 5.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum NamedCurve {
    Secp256r1 = 0x0017,
    Secp384r1 = 0x0018,
    X25519 = 0x001d,
}

impl NamedCurve {
    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            0x0017 => Some(Self::Secp256r1),
            0x0018 => Some(Self::Secp384r1),
            0x001d => Some(Self::X25519),
            _ => None,
        }
    }

    pub fn to_u16(self) -> u16 {
        self as u16
    }
}

/// Family of a certificate or signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    Rsa,
    Ecdsa,
    Ed25519,
}

/// Signature schemes (TLS 1.2 `SignatureAndHashAlgorithm` code points),
/// plus the MD5 ‖ SHA-1 RSA construction TLS 1.0/1.1 use implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureScheme {
    RsaPkcs1Sha1,
    RsaPkcs1Sha256,
    RsaPkcs1Sha384,
    RsaPkcs1Sha512,
    RsaPssRsaeSha256,
    RsaPssRsaeSha384,
    EcdsaSha1,
    EcdsaSecp256r1Sha256,
    EcdsaSecp384r1Sha384,
    Ed25519,
    /// TLS 1.0/1.1 RSA: PKCS#1 v1.5 over MD5 ‖ SHA-1 without a DigestInfo.
    LegacyRsaMd5Sha1,
}

impl SignatureScheme {
    /// Schemes advertised in `signature_algorithms`, in preference order.
    pub const DEFAULT: &'static [SignatureScheme] = &[
        Self::EcdsaSecp256r1Sha256,
        Self::EcdsaSecp384r1Sha384,
        Self::Ed25519,
        Self::RsaPssRsaeSha256,
        Self::RsaPssRsaeSha384,
        Self::RsaPkcs1Sha256,
        Self::RsaPkcs1Sha384,
        Self::RsaPkcs1Sha512,
        Self::RsaPkcs1Sha1,
        Self::EcdsaSha1,
    ];

    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            0x0201 => Some(Self::RsaPkcs1Sha1),
            0x0401 => Some(Self::RsaPkcs1Sha256),
            0x0501 => Some(Self::RsaPkcs1Sha384),
            0x0601 => Some(Self::RsaPkcs1Sha512),
            0x0804 => Some(Self::RsaPssRsaeSha256),
            0x0805 => Some(Self::RsaPssRsaeSha384),
            0x0203 => Some(Self::EcdsaSha1),
            0x0403 => Some(Self::EcdsaSecp256r1Sha256),
            0x0503 => Some(Self::EcdsaSecp384r1Sha384),
            0x0807 => Some(Self::Ed25519),
            _ => None,
        }
    }

    /// Wire code. `None` for the legacy construction, which has none.
    pub fn to_u16(self) -> Option<u16> {
        Some(match self {
            Self::RsaPkcs1Sha1 => 0x0201,
            Self::RsaPkcs1Sha256 => 0x0401,
            Self::RsaPkcs1Sha384 => 0x0501,
            Self::RsaPkcs1Sha512 => 0x0601,
            Self::RsaPssRsaeSha256 => 0x0804,
            Self::RsaPssRsaeSha384 => 0x0805,
            Self::EcdsaSha1 => 0x0203,
            Self::EcdsaSecp256r1Sha256 => 0x0403,
            Self::EcdsaSecp384r1Sha384 => 0x0503,
            Self::Ed25519 => 0x0807,
            Self::LegacyRsaMd5Sha1 => return None,
        })
    }

    pub fn algorithm(self) -> SignatureAlgorithm {
        match self {
            Self::RsaPkcs1Sha1
            | Self::RsaPkcs1Sha256
            | Self::RsaPkcs1Sha384
            | Self::RsaPkcs1Sha512
            | Self::RsaPssRsaeSha256
            | Self::RsaPssRsaeSha384
            | Self::LegacyRsaMd5Sha1 => SignatureAlgorithm::Rsa,
            Self::EcdsaSha1 | Self::EcdsaSecp256r1Sha256 | Self::EcdsaSecp384r1Sha384 => {
                SignatureAlgorithm::Ecdsa
            }
            Self::Ed25519 => SignatureAlgorithm::Ed25519,
        }
    }

    /// Digest applied to the message before signing. `None` for Ed25519
    /// (signs the message itself) and the legacy MD5 ‖ SHA-1 pair.
    pub fn hash(self) -> Option<HashAlgorithm> {
        match self {
            Self::RsaPkcs1Sha1 | Self::EcdsaSha1 => Some(HashAlgorithm::Sha1),
            Self::RsaPkcs1Sha256 | Self::RsaPssRsaeSha256 | Self::EcdsaSecp256r1Sha256 => {
                Some(HashAlgorithm::Sha256)
            }
            Self::RsaPkcs1Sha384 | Self::RsaPssRsaeSha384 | Self::EcdsaSecp384r1Sha384 => {
                Some(HashAlgorithm::Sha384)
            }
            Self::RsaPkcs1Sha512 => Some(HashAlgorithm::Sha512),
            Self::Ed25519 | Self::LegacyRsaMd5Sha1 => None,
        }
    }
}

/// A private key used to sign CertificateVerify.
///
/// RSA keys are PKCS#8 DER. ECDSA keys are the raw scalar (32 bytes for
/// P-256, 48 for P-384) and Ed25519 keys the raw 32-byte seed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    #[zeroize(skip)]
    algorithm: SignatureAlgorithm,
    bytes: Vec<u8>,
}

impl PrivateKey {
    pub fn rsa_pkcs8_der(der: &[u8]) -> Self {
        Self {
            algorithm: SignatureAlgorithm::Rsa,
            bytes: der.to_vec(),
        }
    }

    pub fn ecdsa_p256(scalar: &[u8; 32]) -> Self {
        Self {
            algorithm: SignatureAlgorithm::Ecdsa,
            bytes: scalar.to_vec(),
        }
    }

    pub fn ecdsa_p384(scalar: &[u8; 48]) -> Self {
        Self {
            algorithm: SignatureAlgorithm::Ecdsa,
            bytes: scalar.to_vec(),
        }
    }

    pub fn ed25519(seed: &[u8; 32]) -> Self {
        Self {
            algorithm: SignatureAlgorithm::Ed25519,
            bytes: seed.to_vec(),
        }
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl core::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// An ephemeral ECDH key pair on one named curve.
pub trait KeyExchange: Send {
    fn curve(&self) -> NamedCurve;

    /// Our public point in the encoding sent on the wire.
    fn public_key(&self) -> &[u8];

    /// Consume the private half and compute the shared secret with the
    /// peer's public point. An invalid point is `illegal_parameter`.
    fn complete(self: Box<Self>, peer_public: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error>;
}

/// Bundle of cryptographic primitives needed by TLS 1.0-1.2.
///
/// Implementations return [`Error::Crypto`] for internal failures; the
/// callers decide which alert that maps to.
pub trait CryptoProvider: Send + Sync {
    /// Create an AES-GCM instance from a key.
    fn aead(&self, cipher: BulkCipher, key: &[u8]) -> Result<Box<dyn Aead>, Error>;

    /// Create a raw AES-CBC instance (no padding) from a key.
    fn cbc(&self, cipher: BulkCipher, key: &[u8]) -> Result<Box<dyn BlockCipher>, Error>;

    /// HMAC over the concatenation of `data`. Writes the full tag into
    /// `out` and returns its length.
    fn hmac(
        &self,
        hash: HashAlgorithm,
        key: &[u8],
        data: &[&[u8]],
        out: &mut [u8],
    ) -> Result<usize, Error>;

    /// RSAES-PKCS1-v1_5 encryption to the given RSA public key.
    fn rsa_encrypt(
        &self,
        spki: &SubjectPublicKeyInfo<'_>,
        rng: &dyn Rng,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, Error>;

    /// Verify `signature` over `message` with the key in `spki`.
    fn verify(
        &self,
        scheme: SignatureScheme,
        spki: &SubjectPublicKeyInfo<'_>,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), Error>;

    /// Sign `message` with `key`.
    fn sign(
        &self,
        scheme: SignatureScheme,
        key: &PrivateKey,
        rng: &dyn Rng,
        message: &[u8],
    ) -> Result<Vec<u8>, Error>;

    /// Generate an ephemeral key pair on `curve`.
    fn key_exchange(&self, curve: NamedCurve, rng: &dyn Rng)
        -> Result<Box<dyn KeyExchange>, Error>;
}
