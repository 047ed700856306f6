//! Client configuration.
//!
//! A [`TlsConfig`] is built once, then shared read-only (behind an `Arc`)
//! by every handshake started from it.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::crypto::{CryptoProvider, NamedCurve, PrivateKey, SignatureScheme};
use crate::error::Error;
use crate::tls::cipher_suite::{supported_suites, CipherSuite};
use crate::tls::ProtocolVersion;
use crate::transport::Rng;
use crate::trust::TrustValidator;

/// Curves offered by default, in preference order.
pub const DEFAULT_CURVES: &[NamedCurve] = &[
    NamedCurve::X25519,
    NamedCurve::Secp256r1,
    NamedCurve::Secp384r1,
];

/// A certificate chain (DER, leaf first) and the key for its leaf.
#[derive(Debug, Clone)]
pub struct CertifiedKey {
    pub chain: Vec<Vec<u8>>,
    pub key: PrivateKey,
}

/// Receives session secrets in NSS key log format, for decrypting captures.
pub trait KeyLog: Send + Sync {
    /// `label` is `CLIENT_RANDOM` for TLS 1.0-1.2 master secrets.
    fn log(&self, label: &str, client_random: &[u8], secret: &[u8]);
}

/// Immutable client configuration.
pub struct TlsConfig {
    pub(crate) rng: Arc<dyn Rng>,
    pub(crate) provider: Arc<dyn CryptoProvider>,
    pub(crate) trust: Arc<dyn TrustValidator>,
    pub(crate) certificates: Vec<CertifiedKey>,
    pub(crate) cipher_suites: Vec<CipherSuite>,
    pub(crate) server_name: Option<String>,
    pub(crate) min_version: ProtocolVersion,
    pub(crate) max_version: ProtocolVersion,
    pub(crate) curves: Vec<NamedCurve>,
    pub(crate) signature_schemes: Vec<SignatureScheme>,
    pub(crate) key_log: Option<Arc<dyn KeyLog>>,
}

impl TlsConfig {
    /// Start building a configuration around a trust validator.
    pub fn builder(trust: Arc<dyn TrustValidator>) -> TlsConfigBuilder {
        TlsConfigBuilder::new(trust)
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    pub fn min_version(&self) -> ProtocolVersion {
        self.min_version
    }

    pub fn max_version(&self) -> ProtocolVersion {
        self.max_version
    }

    /// Suites that will go into the ClientHello: the configured ones usable
    /// at the maximum version, in configured order.
    pub fn offered_suites(&self) -> impl Iterator<Item = CipherSuite> + '_ {
        let max = self.max_version;
        self.cipher_suites
            .iter()
            .copied()
            .filter(move |s| s.usable_with(max))
    }

    pub fn curves(&self) -> &[NamedCurve] {
        &self.curves
    }

    pub fn signature_schemes(&self) -> &[SignatureScheme] {
        &self.signature_schemes
    }

    pub fn certificates(&self) -> &[CertifiedKey] {
        &self.certificates
    }

    pub fn provider(&self) -> &dyn CryptoProvider {
        &*self.provider
    }
}

impl core::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("server_name", &self.server_name)
            .field("versions", &(self.min_version..=self.max_version))
            .field("cipher_suites", &self.cipher_suites)
            .field("curves", &self.curves)
            .field("certificates", &self.certificates.len())
            .field("key_log", &self.key_log.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`TlsConfig`].
pub struct TlsConfigBuilder {
    rng: Option<Arc<dyn Rng>>,
    provider: Option<Arc<dyn CryptoProvider>>,
    trust: Arc<dyn TrustValidator>,
    certificates: Vec<CertifiedKey>,
    cipher_suites: Vec<CipherSuite>,
    server_name: Option<String>,
    min_version: ProtocolVersion,
    max_version: ProtocolVersion,
    curves: Vec<NamedCurve>,
    signature_schemes: Vec<SignatureScheme>,
    key_log: Option<Arc<dyn KeyLog>>,
}

impl TlsConfigBuilder {
    fn new(trust: Arc<dyn TrustValidator>) -> Self {
        #[cfg(feature = "std")]
        let rng: Option<Arc<dyn Rng>> = Some(Arc::new(crate::transport::OsRng));
        #[cfg(not(feature = "std"))]
        let rng: Option<Arc<dyn Rng>> = None;

        #[cfg(feature = "rustcrypto")]
        let provider: Option<Arc<dyn CryptoProvider>> =
            Some(Arc::new(crate::crypto::rustcrypto::RustCryptoProvider));
        #[cfg(not(feature = "rustcrypto"))]
        let provider: Option<Arc<dyn CryptoProvider>> = None;

        Self {
            rng,
            provider,
            trust,
            certificates: Vec::new(),
            cipher_suites: supported_suites().collect(),
            server_name: None,
            min_version: ProtocolVersion::Tls12,
            max_version: ProtocolVersion::Tls12,
            curves: DEFAULT_CURVES.to_vec(),
            signature_schemes: SignatureScheme::DEFAULT.to_vec(),
            key_log: None,
        }
    }

    /// Host name sent in SNI and passed to the trust validator.
    pub fn server_name(mut self, name: &str) -> Self {
        self.server_name = Some(String::from(name));
        self
    }

    /// Acceptable suites in preference order.
    pub fn cipher_suites(mut self, suites: &[CipherSuite]) -> Self {
        self.cipher_suites = suites.to_vec();
        self
    }

    /// Range of protocol versions to negotiate.
    pub fn versions(mut self, min: ProtocolVersion, max: ProtocolVersion) -> Self {
        self.min_version = min;
        self.max_version = max;
        self
    }

    pub fn curves(mut self, curves: &[NamedCurve]) -> Self {
        self.curves = curves.to_vec();
        self
    }

    /// Schemes advertised in `signature_algorithms` and accepted from the
    /// server.
    pub fn signature_schemes(mut self, schemes: &[SignatureScheme]) -> Self {
        self.signature_schemes = schemes.to_vec();
        self
    }

    /// Add a chain and key presented if the server asks for a client
    /// certificate. The first one matching the request wins.
    pub fn client_certificate(mut self, chain: Vec<Vec<u8>>, key: PrivateKey) -> Self {
        self.certificates.push(CertifiedKey { chain, key });
        self
    }

    pub fn rng(mut self, rng: Arc<dyn Rng>) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn crypto_provider(mut self, provider: Arc<dyn CryptoProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn key_log(mut self, key_log: Arc<dyn KeyLog>) -> Self {
        self.key_log = Some(key_log);
        self
    }

    pub fn build(self) -> Result<TlsConfig, Error> {
        let rng = self.rng.ok_or(Error::InvalidConfig)?;
        let provider = self.provider.ok_or(Error::InvalidConfig)?;
        if self.min_version > self.max_version {
            return Err(Error::InvalidConfig);
        }
        let max = self.max_version;
        if !self.cipher_suites.iter().any(|s| s.usable_with(max)) {
            return Err(Error::InvalidConfig);
        }
        let ecdhe = self
            .cipher_suites
            .iter()
            .any(|s| s.params().key_exchange == crate::tls::cipher_suite::KeyExchangeAlgorithm::Ecdhe);
        if ecdhe && self.curves.is_empty() {
            return Err(Error::InvalidConfig);
        }
        if max >= ProtocolVersion::Tls12
            && !self.signature_schemes.iter().any(|s| s.to_u16().is_some())
        {
            return Err(Error::InvalidConfig);
        }
        if self.certificates.iter().any(|c| c.chain.is_empty()) {
            return Err(Error::InvalidConfig);
        }
        if let Some(name) = &self.server_name {
            if name.is_empty() || name.len() > u16::MAX as usize - 5 {
                return Err(Error::InvalidConfig);
            }
        }

        log::debug!(
            "tls config: versions {:?}..={:?}, {} suite(s), sni {:?}",
            self.min_version,
            self.max_version,
            self.cipher_suites.len(),
            self.server_name
        );

        Ok(TlsConfig {
            rng,
            provider,
            trust: self.trust,
            certificates: self.certificates,
            cipher_suites: self.cipher_suites,
            server_name: self.server_name,
            min_version: self.min_version,
            max_version: self.max_version,
            curves: self.curves,
            signature_schemes: self.signature_schemes,
            key_log: self.key_log,
        })
    }
}
