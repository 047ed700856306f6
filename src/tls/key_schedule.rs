//! TLS 1.0-1.2 key schedule (RFC 5246 sections 6.3, 7.4.9, 8.1).
//!
//! ```text
//! master_secret = PRF(pre_master_secret, "master secret",
//!                     ClientHello.random + ServerHello.random)[0..47]
//! key_block     = PRF(master_secret, "key expansion",
//!                     ServerHello.random + ClientHello.random)
//! verify_data   = PRF(master_secret, finished_label,
//!                     Hash(handshake_messages))[0..11]
//! ```
//!
//! The key block is partitioned as client MAC key, server MAC key, client
//! key, server key, client IV, server IV. AEAD suites have no MAC keys and a
//! 4-byte implicit IV (the GCM salt).

use alloc::vec::Vec;

use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::CryptoProvider;
use crate::error::Error;
use crate::tls::cipher_suite::CipherSuite;
use crate::tls::prf::prf;
use crate::tls::ProtocolVersion;

pub const MASTER_SECRET_LEN: usize = 48;
pub const VERIFY_DATA_LEN: usize = 12;

/// Which side's Finished message is being computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishedLabel {
    Client,
    Server,
}

impl FinishedLabel {
    fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Client => b"client finished",
            Self::Server => b"server finished",
        }
    }
}

/// The 48-byte master secret. Zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterSecret([u8; MASTER_SECRET_LEN]);

impl MasterSecret {
    /// Derive the master secret, consuming the pre-master secret.
    pub fn derive(
        provider: &dyn CryptoProvider,
        version: ProtocolVersion,
        suite: CipherSuite,
        pre_master_secret: Zeroizing<Vec<u8>>,
        client_random: &[u8; 32],
        server_random: &[u8; 32],
    ) -> Result<Self, Error> {
        let mut out = [0u8; MASTER_SECRET_LEN];
        prf(
            provider,
            version,
            suite.params().prf_hash,
            &pre_master_secret,
            b"master secret",
            &[client_random, server_random],
            &mut out,
        )?;
        drop(pre_master_secret);
        Ok(Self(out))
    }

    pub fn from_bytes(bytes: [u8; MASTER_SECRET_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; MASTER_SECRET_LEN] {
        &self.0
    }

    /// Expand the key block for `suite`.
    pub fn key_block(
        &self,
        provider: &dyn CryptoProvider,
        version: ProtocolVersion,
        suite: CipherSuite,
        client_random: &[u8; 32],
        server_random: &[u8; 32],
    ) -> Result<KeyBlock, Error> {
        let params = suite.params();
        let mut block = Zeroizing::new(alloc::vec![0u8; params.key_block_len()]);
        prf(
            provider,
            version,
            params.prf_hash,
            &self.0,
            b"key expansion",
            &[server_random, client_random],
            &mut block,
        )?;

        let mac = params.mac_key_len();
        let key = params.key_len();
        let iv = params.fixed_iv_len();
        let mut rest: &[u8] = &block;
        let mut take = |n: usize| {
            let (head, tail) = rest.split_at(n);
            rest = tail;
            head.to_vec()
        };
        let client_mac = take(mac);
        let server_mac = take(mac);
        let client_key = take(key);
        let server_key = take(key);
        let client_iv = take(iv);
        let server_iv = take(iv);

        Ok(KeyBlock {
            client: DirectionKeys {
                suite,
                version,
                mac_key: client_mac,
                enc_key: client_key,
                iv: client_iv,
            },
            server: DirectionKeys {
                suite,
                version,
                mac_key: server_mac,
                enc_key: server_key,
                iv: server_iv,
            },
        })
    }

    /// Compute Finished verify-data over `transcript_hash`.
    pub fn verify_data(
        &self,
        provider: &dyn CryptoProvider,
        version: ProtocolVersion,
        suite: CipherSuite,
        label: FinishedLabel,
        transcript_hash: &[u8],
    ) -> Result<[u8; VERIFY_DATA_LEN], Error> {
        let mut out = [0u8; VERIFY_DATA_LEN];
        prf(
            provider,
            version,
            suite.params().prf_hash,
            &self.0,
            label.as_bytes(),
            &[transcript_hash],
            &mut out,
        )?;
        Ok(out)
    }
}

/// Traffic keys for one direction, handed to the record layer.
///
/// Equality is only available through [`ConstantTimeEq`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DirectionKeys {
    #[zeroize(skip)]
    pub suite: CipherSuite,
    #[zeroize(skip)]
    pub version: ProtocolVersion,
    pub mac_key: Vec<u8>,
    pub enc_key: Vec<u8>,
    /// GCM salt or initial CBC IV.
    pub iv: Vec<u8>,
}

impl core::fmt::Debug for DirectionKeys {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DirectionKeys")
            .field("suite", &self.suite)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl ConstantTimeEq for DirectionKeys {
    fn ct_eq(&self, other: &Self) -> Choice {
        let same_params = self.suite == other.suite && self.version == other.version;
        Choice::from(same_params as u8)
            & self.mac_key[..].ct_eq(&other.mac_key[..])
            & self.enc_key[..].ct_eq(&other.enc_key[..])
            & self.iv[..].ct_eq(&other.iv[..])
    }
}

/// Both directions' traffic keys.
#[derive(Debug, Clone)]
pub struct KeyBlock {
    pub client: DirectionKeys,
    pub server: DirectionKeys,
}

#[cfg(all(test, feature = "rustcrypto"))]
mod tests {
    use super::*;
    use crate::crypto::rustcrypto::RustCryptoProvider;
    use crate::tls::prf::prf;

    const CR: [u8; 32] = [0x01; 32];
    const SR: [u8; 32] = [0x02; 32];

    fn master(version: ProtocolVersion, suite: CipherSuite) -> MasterSecret {
        MasterSecret::derive(
            &RustCryptoProvider,
            version,
            suite,
            Zeroizing::new(alloc::vec![0x03; 48]),
            &CR,
            &SR,
        )
        .unwrap()
    }

    #[test]
    fn master_secret_uses_client_random_first() {
        let ms = master(ProtocolVersion::Tls12, CipherSuite::EcdheRsaWithAes128GcmSha256);
        let mut expected = [0u8; 48];
        prf(
            &RustCryptoProvider,
            ProtocolVersion::Tls12,
            crate::crypto::HashAlgorithm::Sha256,
            &[0x03; 48],
            b"master secret",
            &[&CR, &SR],
            &mut expected,
        )
        .unwrap();
        assert_eq!(ms.as_bytes(), &expected);
    }

    #[test]
    fn key_block_partition_gcm() {
        let suite = CipherSuite::EcdheRsaWithAes256GcmSha384;
        let ms = master(ProtocolVersion::Tls12, suite);
        let kb = ms
            .key_block(&RustCryptoProvider, ProtocolVersion::Tls12, suite, &CR, &SR)
            .unwrap();

        let mut raw = [0u8; 72];
        prf(
            &RustCryptoProvider,
            ProtocolVersion::Tls12,
            crate::crypto::HashAlgorithm::Sha384,
            ms.as_bytes(),
            b"key expansion",
            &[&SR, &CR],
            &mut raw,
        )
        .unwrap();
        assert!(kb.client.mac_key.is_empty());
        assert_eq!(kb.client.enc_key, raw[0..32]);
        assert_eq!(kb.server.enc_key, raw[32..64]);
        assert_eq!(kb.client.iv, raw[64..68]);
        assert_eq!(kb.server.iv, raw[68..72]);
    }

    #[test]
    fn key_block_partition_cbc() {
        let suite = CipherSuite::RsaWithAes128CbcSha;
        let ms = master(ProtocolVersion::Tls10, suite);
        let kb = ms
            .key_block(&RustCryptoProvider, ProtocolVersion::Tls10, suite, &CR, &SR)
            .unwrap();
        assert_eq!(kb.client.mac_key.len(), 20);
        assert_eq!(kb.server.mac_key.len(), 20);
        assert_eq!(kb.client.enc_key.len(), 16);
        assert_eq!(kb.client.iv.len(), 16);
        assert!(!bool::from(kb.client.mac_key[..].ct_eq(&kb.server.mac_key[..])));
    }

    #[test]
    fn direction_keys_compare_in_constant_time() {
        let suite = CipherSuite::RsaWithAes128CbcSha256;
        let ms = master(ProtocolVersion::Tls12, suite);
        let kb = ms
            .key_block(&RustCryptoProvider, ProtocolVersion::Tls12, suite, &CR, &SR)
            .unwrap();
        assert!(bool::from(kb.client.ct_eq(&kb.client.clone())));
        assert!(!bool::from(kb.client.ct_eq(&kb.server)));

        let mut other_version = kb.client.clone();
        other_version.version = ProtocolVersion::Tls11;
        assert!(!bool::from(kb.client.ct_eq(&other_version)));
        let mut short_iv = kb.client.clone();
        short_iv.iv.pop();
        assert!(!bool::from(kb.client.ct_eq(&short_iv)));
    }

    #[test]
    fn verify_data_depends_on_label_and_transcript() {
        let suite = CipherSuite::EcdheRsaWithAes128GcmSha256;
        let ms = master(ProtocolVersion::Tls12, suite);
        let v = ProtocolVersion::Tls12;
        let client = ms
            .verify_data(&RustCryptoProvider, v, suite, FinishedLabel::Client, &[0xaa; 32])
            .unwrap();
        let server = ms
            .verify_data(&RustCryptoProvider, v, suite, FinishedLabel::Server, &[0xaa; 32])
            .unwrap();
        let other = ms
            .verify_data(&RustCryptoProvider, v, suite, FinishedLabel::Client, &[0xab; 32])
            .unwrap();
        assert_ne!(client, server);
        assert_ne!(client, other);
    }

    #[test]
    fn keys_debug_hides_material() {
        let suite = CipherSuite::RsaWithAes128GcmSha256;
        let ms = master(ProtocolVersion::Tls12, suite);
        let kb = ms
            .key_block(&RustCryptoProvider, ProtocolVersion::Tls12, suite, &CR, &SR)
            .unwrap();
        let shown = std::format!("{:?}", kb.client);
        assert!(shown.contains("RsaWithAes128GcmSha256"));
        assert!(!shown.contains("enc_key"));
    }
}
