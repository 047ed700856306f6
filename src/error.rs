use crate::tls::alert::AlertDescription;

/// Broad classification of an [`Error`], used by callers that only care
/// about who is at fault and whether a retry on a fresh connection makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-order input, unsupported version or parameter.
    ProtocolViolation,
    /// Signature, MAC, AEAD tag or decryption failure.
    CryptographicFailure,
    /// The trust validator rejected the peer's certificate chain.
    TrustFailure,
    /// The underlying transport failed or closed early.
    TransportFailure,
    /// The peer aborted the connection with an alert.
    PeerAlert,
    /// Misuse of the API or invalid local configuration.
    Local,
}

/// Top-level crate error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A fatal condition detected locally. The alert is sent to the peer
    /// before the connection is torn down.
    Alert(AlertDescription),
    /// The peer sent a fatal alert (or any alert during the handshake).
    PeerAlert(AlertDescription),
    /// Cryptographic operation failed.
    Crypto,
    /// The transport returned an I/O error.
    Transport,
    /// The transport reached end-of-stream before the TLS session closed.
    UnexpectedEof,
    /// Caller-provided buffer too small.
    BufferTooSmall { needed: usize },
    /// Connection is closed.
    Closed,
    /// Would block: no data available yet.
    WouldBlock,
    /// Invalid state for the requested operation.
    InvalidState,
    /// The configuration could not be built.
    InvalidConfig,
}

impl Error {
    /// Shorthand for the most common decode failure.
    pub(crate) const fn decode() -> Self {
        Error::Alert(AlertDescription::DecodeError)
    }

    /// The fatal alert that must be sent to the peer for this error, if any.
    pub fn alert(&self) -> Option<AlertDescription> {
        match self {
            Error::Alert(desc) => Some(*desc),
            Error::Crypto => Some(AlertDescription::InternalError),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        use AlertDescription as A;
        match self {
            Error::Alert(A::BadRecordMac | A::DecryptionFailed | A::DecryptError) => {
                ErrorKind::CryptographicFailure
            }
            Error::Alert(
                A::BadCertificate
                | A::UnsupportedCertificate
                | A::CertificateRevoked
                | A::CertificateExpired
                | A::CertificateUnknown
                | A::UnknownCa,
            ) => ErrorKind::TrustFailure,
            Error::Alert(_) => ErrorKind::ProtocolViolation,
            Error::PeerAlert(_) => ErrorKind::PeerAlert,
            Error::Crypto => ErrorKind::CryptographicFailure,
            Error::Transport | Error::UnexpectedEof => ErrorKind::TransportFailure,
            Error::BufferTooSmall { .. }
            | Error::Closed
            | Error::WouldBlock
            | Error::InvalidState
            | Error::InvalidConfig => ErrorKind::Local,
        }
    }
}

impl From<AlertDescription> for Error {
    fn from(desc: AlertDescription) -> Self {
        Error::Alert(desc)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Alert(desc) => write!(f, "TLS error: {desc:?}"),
            Error::PeerAlert(desc) => write!(f, "peer sent alert: {desc:?}"),
            Error::Crypto => write!(f, "cryptographic error"),
            Error::Transport => write!(f, "transport error"),
            Error::UnexpectedEof => write!(f, "unexpected end of stream"),
            Error::BufferTooSmall { needed } => {
                write!(f, "buffer too small, need {needed} bytes")
            }
            Error::Closed => write!(f, "connection closed"),
            Error::WouldBlock => write!(f, "would block"),
            Error::InvalidState => write!(f, "invalid state"),
            Error::InvalidConfig => write!(f, "invalid configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
