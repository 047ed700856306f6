//! Async TLS client over any [`Transport`].

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::TlsConfig;
use crate::error::Error;
use crate::tls::cipher_suite::CipherSuite;
use crate::tls::ProtocolVersion;
use crate::transport::Transport;

use super::connection::TlsConnection;
use super::record::{MAX_CIPHERTEXT_LEN, RECORD_HEADER_LEN};

/// Transport read size: one maximal record.
const READ_CHUNK: usize = RECORD_HEADER_LEN + MAX_CIPHERTEXT_LEN;

/// TLS client: a plaintext duplex stream over an encrypted transport.
///
/// Reads and writes take `&mut self`, so one task drives both directions.
/// Dropping the client (or a pending [`TlsClient::connect`] future) drops
/// the transport and zeroizes every secret.
pub struct TlsClient<T: Transport> {
    transport: T,
    conn: TlsConnection,
    scratch: Vec<u8>,
}

impl<T: Transport> TlsClient<T> {
    /// Run the handshake over `transport`.
    ///
    /// On failure the fatal alert (if any) is written before returning and
    /// the transport is dropped.
    pub async fn connect(transport: T, config: Arc<TlsConfig>) -> Result<Self, Error> {
        let conn = TlsConnection::new_client(config)?;
        let mut client = Self {
            transport,
            conn,
            scratch: alloc::vec![0; READ_CHUNK],
        };
        client.flush().await?;
        while !client.conn.is_active() {
            if let Some(err) = client.conn.error() {
                return Err(err);
            }
            if client.conn.is_closed() {
                return Err(Error::Closed);
            }
            client.read_more().await?;
            client.flush().await?;
        }
        Ok(client)
    }

    /// Read plaintext. Returns `Ok(0)` after the server's close_notify.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.conn.recv_app_data(buf) {
                Err(Error::WouldBlock) => {}
                other => return other,
            }
            self.read_more().await?;
            self.flush().await?;
        }
    }

    /// Encrypt and write all of `data`.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        let result = self.conn.send_app_data(data);
        self.flush().await?;
        result.map(|_| ())
    }

    /// Send close_notify and shut down the transport's write half.
    pub async fn close(&mut self) -> Result<(), Error> {
        self.conn.close()?;
        self.flush().await?;
        self.transport.close().await.map_err(transport_error)
    }

    pub fn connection(&self) -> &TlsConnection {
        &self.conn
    }

    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        self.conn.handshake().version()
    }

    pub fn cipher_suite(&self) -> Option<CipherSuite> {
        self.conn.handshake().cipher_suite()
    }

    /// The server's certificate chain, leaf first.
    pub fn peer_certificates(&self) -> &[Vec<u8>] {
        self.conn.handshake().peer_certificates()
    }

    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Give back the transport without closing the TLS session.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Write everything the connection has queued.
    async fn flush(&mut self) -> Result<(), Error> {
        let Self {
            transport,
            conn,
            scratch,
        } = self;
        while let Some(chunk) = conn.poll_output(scratch) {
            transport.write(chunk).await.map_err(transport_error)?;
        }
        Ok(())
    }

    /// One transport read fed into the connection. A protocol failure
    /// still flushes the queued fatal alert before reporting.
    async fn read_more(&mut self) -> Result<(), Error> {
        let n = self
            .transport
            .read(&mut self.scratch)
            .await
            .map_err(transport_error)?;
        let fed = if n == 0 {
            self.conn.feed_eof()
        } else {
            let Self { conn, scratch, .. } = self;
            conn.feed_data(&scratch[..n])
        };
        while let Some(event) = self.conn.poll_event() {
            log::trace!("tls event {:?}", event);
        }
        if let Err(err) = fed {
            let _ = self.flush().await;
            return Err(err);
        }
        Ok(())
    }
}

fn transport_error<E: core::fmt::Debug>(err: E) -> Error {
    log::warn!("transport error: {:?}", err);
    Error::Transport
}

impl<T: Transport> Transport for TlsClient<T> {
    type Error = Error;

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        TlsClient::read(self, buf).await
    }

    async fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        TlsClient::write(self, buf).await
    }

    async fn close(&mut self) -> Result<(), Error> {
        TlsClient::close(self).await
    }
}
