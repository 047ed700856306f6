//! TLS 1.0-1.2 handshake machinery: message codec, cipher suite registry,
//! key schedule and the client handshake state machine.
//!
//! Nothing here performs I/O. The handshake engine consumes complete
//! handshake messages and queues outbound messages plus key material; the
//! record layer in [`crate::tcp_tls`] frames and protects them.

pub mod alert;
pub mod cipher_suite;
pub mod codec;
pub mod extensions;
pub mod handshake;
pub mod key_schedule;
pub mod messages;
pub mod prf;
pub mod transcript;

pub use alert::{Alert, AlertDescription, AlertLevel};
pub use cipher_suite::CipherSuite;
pub use handshake::{ClientHandshake, HandshakeState};

/// Protocol versions this crate can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum ProtocolVersion {
    Tls10 = 0x0301,
    Tls11 = 0x0302,
    Tls12 = 0x0303,
}

impl ProtocolVersion {
    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            0x0301 => Some(Self::Tls10),
            0x0302 => Some(Self::Tls11),
            0x0303 => Some(Self::Tls12),
            _ => None,
        }
    }

    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// TLS 1.1 and later carry an explicit per-record IV for CBC suites.
    pub fn has_explicit_iv(self) -> bool {
        self >= Self::Tls11
    }
}
