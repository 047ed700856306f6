//! Cipher Suite Registry: the fixed catalog of suites this client offers,
//! in preference order.

use crate::crypto::{BulkCipher, HashAlgorithm, SignatureAlgorithm};
use crate::tls::ProtocolVersion;

/// How the pre-master secret is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyExchangeAlgorithm {
    /// Pre-master secret encrypted to the server's RSA key.
    Rsa,
    /// Ephemeral elliptic-curve Diffie-Hellman, signed by the server.
    Ecdhe,
}

/// Record protection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherMode {
    /// MAC-then-encrypt with HMAC and AES-CBC.
    Cbc,
    /// AES-GCM AEAD.
    Gcm,
}

/// Supported cipher suites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherSuite {
    EcdheEcdsaWithAes128GcmSha256,
    EcdheRsaWithAes128GcmSha256,
    EcdheEcdsaWithAes256GcmSha384,
    EcdheRsaWithAes256GcmSha384,
    EcdheEcdsaWithAes128CbcSha256,
    EcdheRsaWithAes128CbcSha256,
    EcdheEcdsaWithAes256CbcSha384,
    EcdheRsaWithAes256CbcSha384,
    EcdheEcdsaWithAes128CbcSha,
    EcdheRsaWithAes128CbcSha,
    EcdheEcdsaWithAes256CbcSha,
    EcdheRsaWithAes256CbcSha,
    RsaWithAes128GcmSha256,
    RsaWithAes256GcmSha384,
    RsaWithAes128CbcSha256,
    RsaWithAes256CbcSha256,
    RsaWithAes128CbcSha,
    RsaWithAes256CbcSha,
}

/// Everything the handshake and record layer need to know about a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteParams {
    pub suite: CipherSuite,
    pub code: u16,
    pub name: &'static str,
    pub key_exchange: KeyExchangeAlgorithm,
    /// Certificate key type the server must present.
    pub signature: SignatureAlgorithm,
    pub cipher: BulkCipher,
    pub mode: CipherMode,
    /// Record MAC for CBC suites; `None` for AEAD suites.
    pub mac: Option<HashAlgorithm>,
    /// PRF hash under TLS 1.2.
    pub prf_hash: HashAlgorithm,
    /// Oldest protocol version the suite may be negotiated under.
    pub min_version: ProtocolVersion,
}

impl SuiteParams {
    pub const fn key_len(&self) -> usize {
        self.cipher.key_len()
    }

    pub const fn mac_key_len(&self) -> usize {
        match self.mac {
            Some(h) => h.output_len(),
            None => 0,
        }
    }

    /// Implicit IV bytes taken from the key block: the 4-byte GCM salt, or
    /// the 16-byte initial CBC IV (only used under TLS 1.0).
    pub const fn fixed_iv_len(&self) -> usize {
        match self.mode {
            CipherMode::Gcm => 4,
            CipherMode::Cbc => 16,
        }
    }

    /// Total key block length: two MAC keys, two encryption keys, two IVs.
    pub const fn key_block_len(&self) -> usize {
        2 * (self.mac_key_len() + self.key_len() + self.fixed_iv_len())
    }
}

use BulkCipher::{Aes128, Aes256};
use CipherMode::{Cbc, Gcm};
use HashAlgorithm::{Sha1, Sha256, Sha384};
use KeyExchangeAlgorithm::{Ecdhe, Rsa as RsaKx};
use ProtocolVersion::{Tls10, Tls12};
use SignatureAlgorithm::{Ecdsa, Rsa};

const fn entry(
    suite: CipherSuite,
    code: u16,
    name: &'static str,
    key_exchange: KeyExchangeAlgorithm,
    signature: SignatureAlgorithm,
    cipher: BulkCipher,
    mode: CipherMode,
    mac: Option<HashAlgorithm>,
    prf_hash: HashAlgorithm,
    min_version: ProtocolVersion,
) -> SuiteParams {
    SuiteParams {
        suite,
        code,
        name,
        key_exchange,
        signature,
        cipher,
        mode,
        mac,
        prf_hash,
        min_version,
    }
}

/// The registry, in client preference order.
static SUITES: [SuiteParams; 18] = [
    entry(
        CipherSuite::EcdheEcdsaWithAes128GcmSha256,
        0xc02b,
        "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
        Ecdhe,
        Ecdsa,
        Aes128,
        Gcm,
        None,
        Sha256,
        Tls12,
    ),
    entry(
        CipherSuite::EcdheRsaWithAes128GcmSha256,
        0xc02f,
        "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
        Ecdhe,
        Rsa,
        Aes128,
        Gcm,
        None,
        Sha256,
        Tls12,
    ),
    entry(
        CipherSuite::EcdheEcdsaWithAes256GcmSha384,
        0xc02c,
        "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
        Ecdhe,
        Ecdsa,
        Aes256,
        Gcm,
        None,
        Sha384,
        Tls12,
    ),
    entry(
        CipherSuite::EcdheRsaWithAes256GcmSha384,
        0xc030,
        "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
        Ecdhe,
        Rsa,
        Aes256,
        Gcm,
        None,
        Sha384,
        Tls12,
    ),
    entry(
        CipherSuite::EcdheEcdsaWithAes128CbcSha256,
        0xc023,
        "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256",
        Ecdhe,
        Ecdsa,
        Aes128,
        Cbc,
        Some(Sha256),
        Sha256,
        Tls12,
    ),
    entry(
        CipherSuite::EcdheRsaWithAes128CbcSha256,
        0xc027,
        "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256",
        Ecdhe,
        Rsa,
        Aes128,
        Cbc,
        Some(Sha256),
        Sha256,
        Tls12,
    ),
    entry(
        CipherSuite::EcdheEcdsaWithAes256CbcSha384,
        0xc024,
        "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA384",
        Ecdhe,
        Ecdsa,
        Aes256,
        Cbc,
        Some(Sha384),
        Sha384,
        Tls12,
    ),
    entry(
        CipherSuite::EcdheRsaWithAes256CbcSha384,
        0xc028,
        "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384",
        Ecdhe,
        Rsa,
        Aes256,
        Cbc,
        Some(Sha384),
        Sha384,
        Tls12,
    ),
    entry(
        CipherSuite::EcdheEcdsaWithAes128CbcSha,
        0xc009,
        "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA",
        Ecdhe,
        Ecdsa,
        Aes128,
        Cbc,
        Some(Sha1),
        Sha256,
        Tls10,
    ),
    entry(
        CipherSuite::EcdheRsaWithAes128CbcSha,
        0xc013,
        "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
        Ecdhe,
        Rsa,
        Aes128,
        Cbc,
        Some(Sha1),
        Sha256,
        Tls10,
    ),
    entry(
        CipherSuite::EcdheEcdsaWithAes256CbcSha,
        0xc00a,
        "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA",
        Ecdhe,
        Ecdsa,
        Aes256,
        Cbc,
        Some(Sha1),
        Sha256,
        Tls10,
    ),
    entry(
        CipherSuite::EcdheRsaWithAes256CbcSha,
        0xc014,
        "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
        Ecdhe,
        Rsa,
        Aes256,
        Cbc,
        Some(Sha1),
        Sha256,
        Tls10,
    ),
    entry(
        CipherSuite::RsaWithAes128GcmSha256,
        0x009c,
        "TLS_RSA_WITH_AES_128_GCM_SHA256",
        RsaKx,
        Rsa,
        Aes128,
        Gcm,
        None,
        Sha256,
        Tls12,
    ),
    entry(
        CipherSuite::RsaWithAes256GcmSha384,
        0x009d,
        "TLS_RSA_WITH_AES_256_GCM_SHA384",
        RsaKx,
        Rsa,
        Aes256,
        Gcm,
        None,
        Sha384,
        Tls12,
    ),
    entry(
        CipherSuite::RsaWithAes128CbcSha256,
        0x003c,
        "TLS_RSA_WITH_AES_128_CBC_SHA256",
        RsaKx,
        Rsa,
        Aes128,
        Cbc,
        Some(Sha256),
        Sha256,
        Tls12,
    ),
    entry(
        CipherSuite::RsaWithAes256CbcSha256,
        0x003d,
        "TLS_RSA_WITH_AES_256_CBC_SHA256",
        RsaKx,
        Rsa,
        Aes256,
        Cbc,
        Some(Sha256),
        Sha256,
        Tls12,
    ),
    entry(
        CipherSuite::RsaWithAes128CbcSha,
        0x002f,
        "TLS_RSA_WITH_AES_128_CBC_SHA",
        RsaKx,
        Rsa,
        Aes128,
        Cbc,
        Some(Sha1),
        Sha256,
        Tls10,
    ),
    entry(
        CipherSuite::RsaWithAes256CbcSha,
        0x0035,
        "TLS_RSA_WITH_AES_256_CBC_SHA",
        RsaKx,
        Rsa,
        Aes256,
        Cbc,
        Some(Sha1),
        Sha256,
        Tls10,
    ),
];

/// Every supported suite, in client preference order.
pub fn supported_suites() -> impl Iterator<Item = CipherSuite> + Clone {
    SUITES.iter().map(|p| p.suite)
}

/// Look up a suite by its wire code.
pub fn by_code(code: u16) -> Option<CipherSuite> {
    SUITES.iter().find(|p| p.code == code).map(|p| p.suite)
}

impl CipherSuite {
    pub fn params(self) -> &'static SuiteParams {
        // The table holds exactly one entry per variant, in declaration order.
        &SUITES[self as usize]
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        by_code(code)
    }

    pub fn to_u16(self) -> u16 {
        self.params().code
    }

    pub fn name(self) -> &'static str {
        self.params().name
    }

    /// Whether the suite may be used under `version`.
    pub fn usable_with(self, version: ProtocolVersion) -> bool {
        version >= self.params().min_version
    }
}

impl core::fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
