#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

#[cfg(any(test, feature = "std"))]
extern crate std;

extern crate alloc;

pub mod config;
pub mod crypto;
pub mod error;
pub mod oid;
pub mod tcp_tls;
pub mod tls;
pub mod transport;
pub mod trust;
pub mod x509;

pub use config::{CertifiedKey, KeyLog, TlsConfig, TlsConfigBuilder};
pub use crypto::{CryptoProvider, NamedCurve, PrivateKey, SignatureScheme};
pub use error::{Error, ErrorKind};
pub use tcp_tls::{TlsClient, TlsConnection, TlsEvent};
pub use tls::{Alert, AlertDescription, CipherSuite, HandshakeState, ProtocolVersion};
pub use transport::{Rng, Transport};
pub use trust::{NoVerification, PinnedCertificates, TrustError, TrustValidator};

#[cfg(feature = "tokio")]
pub use transport::TokioTransport;
