//! Certificate chain trust evaluation.
//!
//! Chain building, path validation and revocation are policy decisions that
//! live outside the handshake. The handshake hands the server's chain to a
//! [`TrustValidator`] and maps a rejection onto the matching fatal alert.

use alloc::vec::Vec;

use crate::tls::alert::AlertDescription;

/// Why a validator rejected a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustError {
    /// A certificate is outside its validity period.
    Expired,
    /// The chain does not lead to a trusted root.
    UnknownCa,
    /// A certificate is corrupt, has a bad signature, or does not name the
    /// server.
    BadCertificate,
    /// A certificate has been revoked.
    Revoked,
    /// A certificate uses a type or algorithm the validator cannot process.
    Unsupported,
    /// Any other reason.
    Unknown,
}

impl TrustError {
    /// The fatal alert sent to the server for this rejection.
    pub fn alert(self) -> AlertDescription {
        match self {
            Self::Expired => AlertDescription::CertificateExpired,
            Self::UnknownCa => AlertDescription::UnknownCa,
            Self::BadCertificate => AlertDescription::BadCertificate,
            Self::Revoked => AlertDescription::CertificateRevoked,
            Self::Unsupported => AlertDescription::UnsupportedCertificate,
            Self::Unknown => AlertDescription::CertificateUnknown,
        }
    }
}

impl core::fmt::Display for TrustError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Expired => write!(f, "certificate expired"),
            Self::UnknownCa => write!(f, "unknown certificate authority"),
            Self::BadCertificate => write!(f, "bad certificate"),
            Self::Revoked => write!(f, "certificate revoked"),
            Self::Unsupported => write!(f, "unsupported certificate"),
            Self::Unknown => write!(f, "certificate rejected"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TrustError {}

/// Accept or reject the server's certificate chain.
///
/// `chain` is DER, leaf first, exactly as received. `server_name` is the
/// configured SNI host, if any.
pub trait TrustValidator: Send + Sync {
    fn validate(&self, chain: &[Vec<u8>], server_name: Option<&str>) -> Result<(), TrustError>;
}

/// Accepts a chain only if its leaf is byte-identical to one of a fixed set
/// of certificates.
#[derive(Debug, Clone, Default)]
pub struct PinnedCertificates {
    pinned: Vec<Vec<u8>>,
}

impl PinnedCertificates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin one DER certificate.
    pub fn with(mut self, der: &[u8]) -> Self {
        self.pinned.push(der.to_vec());
        self
    }
}

impl TrustValidator for PinnedCertificates {
    fn validate(&self, chain: &[Vec<u8>], _server_name: Option<&str>) -> Result<(), TrustError> {
        let leaf = chain.first().ok_or(TrustError::BadCertificate)?;
        if self.pinned.iter().any(|p| p == leaf) {
            Ok(())
        } else {
            Err(TrustError::UnknownCa)
        }
    }
}

/// Accepts every chain. Only for tests and closed networks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVerification;

impl TrustValidator for NoVerification {
    fn validate(&self, chain: &[Vec<u8>], server_name: Option<&str>) -> Result<(), TrustError> {
        log::warn!(
            "accepting {} certificate(s) for {:?} without verification",
            chain.len(),
            server_name
        );
        Ok(())
    }
}
