//! TLS over a byte stream: record framing and protection, the sans-IO
//! connection, and the async client that drives it over a [`Transport`].
//!
//! [`Transport`]: crate::transport::Transport

pub mod client;
pub mod connection;
pub mod record;

pub use client::TlsClient;
pub use connection::{TlsConnection, TlsEvent};
