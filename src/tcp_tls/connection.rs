//! TLS 1.0-1.2 client connection state machine over a byte stream.
//!
//! Follows the milli `feed_data()` → `poll_output()` → `poll_event()`
//! pattern: the caller moves bytes between the transport and the
//! connection, the connection never touches I/O itself.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::TlsConfig;
use crate::error::Error;
use crate::tls::alert::{Alert, AlertDescription, AlertLevel};
use crate::tls::handshake::{ClientHandshake, HandshakeOutput};
use crate::tls::messages::{
    read_handshake_header, HandshakeType, HANDSHAKE_HEADER_LEN, MAX_HANDSHAKE_MESSAGE_LEN,
};
use crate::tls::ProtocolVersion;

use super::record::{
    encode_plaintext, ContentType, RecordHeader, RecordProtection, MAX_FRAGMENT_LEN,
    RECORD_HEADER_LEN,
};

/// Events produced by TlsConnection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsEvent {
    /// TLS handshake is complete; application data can now flow.
    HandshakeComplete,
    /// Application data is available (call `recv_app_data`).
    AppData,
    /// Peer sent a close_notify alert.
    PeerClosed,
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    /// Handshake in progress.
    Handshake,
    /// Handshake complete, application data flowing.
    Active,
    /// Aborted; the stored error is replayed on every call.
    Failed,
}

/// Record version used before the server has chosen one.
const INITIAL_RECORD_VERSION: u16 = 0x0301;

/// Client-side TLS connection.
pub struct TlsConnection {
    config: Arc<TlsConfig>,
    handshake: ClientHandshake,
    state: ConnState,

    recv_buf: Vec<u8>,
    handshake_buf: Vec<u8>,
    app_recv_buf: VecDeque<u8>,
    send_buf: Vec<u8>,
    send_offset: usize,

    read_protection: Option<RecordProtection>,
    write_protection: Option<RecordProtection>,
    write_version: u16,

    close_sent: bool,
    peer_closed: bool,
    error: Option<Error>,

    events: heapless::Deque<TlsEvent, 8>,
}

impl TlsConnection {
    /// Create a client connection and queue its ClientHello.
    pub fn new_client(config: Arc<TlsConfig>) -> Result<Self, Error> {
        let mut conn = Self {
            handshake: ClientHandshake::new(Arc::clone(&config)),
            config,
            state: ConnState::Handshake,
            recv_buf: Vec::new(),
            handshake_buf: Vec::new(),
            app_recv_buf: VecDeque::new(),
            send_buf: Vec::new(),
            send_offset: 0,
            read_protection: None,
            write_protection: None,
            write_version: INITIAL_RECORD_VERSION,
            close_sent: false,
            peer_closed: false,
            error: None,
            events: heapless::Deque::new(),
        };
        conn.handshake.start()?;
        conn.flush_handshake_output()?;
        Ok(conn)
    }

    /// Feed raw bytes received from the transport.
    pub fn feed_data(&mut self, data: &[u8]) -> Result<(), Error> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.peer_closed {
            return Ok(());
        }
        self.recv_buf.extend_from_slice(data);
        let result = self.process_recv();
        self.check(result)
    }

    /// The transport reached end-of-stream.
    ///
    /// Fine after the peer's close_notify; anything else is a truncation.
    pub fn feed_eof(&mut self) -> Result<(), Error> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.peer_closed {
            return Ok(());
        }
        log::debug!("transport closed without close_notify in {:?}", self.state);
        self.check(Err(Error::UnexpectedEof))
    }

    /// Pull the next chunk of outgoing transport data.
    pub fn poll_output<'a>(&mut self, buf: &'a mut [u8]) -> Option<&'a [u8]> {
        if self.send_offset >= self.send_buf.len() {
            return None;
        }

        let avail = self.send_buf.len() - self.send_offset;
        let n = avail.min(buf.len());
        buf[..n].copy_from_slice(&self.send_buf[self.send_offset..self.send_offset + n]);
        self.send_offset += n;

        if self.send_offset >= self.send_buf.len() {
            self.send_buf.clear();
            self.send_offset = 0;
        }

        Some(&buf[..n])
    }

    /// Whether `poll_output` has anything to return.
    pub fn has_pending_output(&self) -> bool {
        self.send_offset < self.send_buf.len()
    }

    /// Poll for the next TLS event.
    pub fn poll_event(&mut self) -> Option<TlsEvent> {
        self.events.pop_front()
    }

    /// Read decrypted application data. `Ok(0)` once the peer has closed
    /// and everything it sent has been read.
    pub fn recv_app_data(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if self.app_recv_buf.is_empty() {
            if let Some(err) = self.error {
                return Err(err);
            }
            if self.peer_closed {
                return Ok(0);
            }
            return Err(Error::WouldBlock);
        }
        let n = self.app_recv_buf.len().min(buf.len());
        for (dst, src) in buf.iter_mut().zip(self.app_recv_buf.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    /// Encrypt application data into outgoing records.
    pub fn send_app_data(&mut self, data: &[u8]) -> Result<usize, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.close_sent {
            return Err(Error::Closed);
        }
        if self.state != ConnState::Active {
            return Err(Error::InvalidState);
        }
        let result = self.send_record(ContentType::ApplicationData, data);
        self.check(result)?;
        Ok(data.len())
    }

    /// Initiate a graceful close (send close_notify). Cancels a handshake
    /// in progress.
    pub fn close(&mut self) -> Result<(), Error> {
        if self.close_sent || self.error.is_some() {
            return Ok(());
        }
        if self.state == ConnState::Handshake {
            self.handshake.abort();
        }
        self.close_sent = true;
        let result = self.send_alert(Alert::close_notify());
        self.check(result)
    }

    /// Whether the handshake is complete and the connection not closed.
    pub fn is_active(&self) -> bool {
        self.state == ConnState::Active && !self.close_sent && !self.peer_closed
    }

    pub fn is_handshaking(&self) -> bool {
        self.state == ConnState::Handshake && !self.close_sent
    }

    /// Whether either side has closed or the connection failed.
    pub fn is_closed(&self) -> bool {
        self.close_sent || self.peer_closed || self.state == ConnState::Failed
    }

    pub fn error(&self) -> Option<Error> {
        self.error
    }

    /// Negotiated parameters and peer certificates.
    pub fn handshake(&self) -> &ClientHandshake {
        &self.handshake
    }

    pub fn config(&self) -> &Arc<TlsConfig> {
        &self.config
    }

    // ------------------------------------------------------------------
    // Internal: failure handling
    // ------------------------------------------------------------------

    /// Abort on the first error: queue the matching fatal alert, drop all
    /// keys and remember the error.
    fn check<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(err) = &result {
            if self.error.is_none() {
                self.fail(*err);
            }
        }
        result
    }

    fn fail(&mut self, err: Error) {
        log::debug!("connection failed in {:?}: {}", self.state, err);
        self.error = Some(err);
        self.handshake.abort();
        if let Some(desc) = err.alert() {
            if !self.close_sent {
                let _ = self.send_alert(Alert::fatal(desc));
            }
        }
        self.read_protection = None;
        self.write_protection = None;
        self.recv_buf.clear();
        self.handshake_buf.clear();
        self.state = ConnState::Failed;
    }

    // ------------------------------------------------------------------
    // Internal: outbound records
    // ------------------------------------------------------------------

    fn send_record(&mut self, content_type: ContentType, payload: &[u8]) -> Result<(), Error> {
        for chunk in payload.chunks(MAX_FRAGMENT_LEN) {
            match self.write_protection.as_mut() {
                Some(protection) => protection.seal(content_type, chunk, &mut self.send_buf)?,
                None => encode_plaintext(content_type, self.write_version, chunk, &mut self.send_buf)?,
            }
        }
        Ok(())
    }

    fn send_alert(&mut self, alert: Alert) -> Result<(), Error> {
        log::debug!("sending alert {:?}", alert);
        self.send_record(ContentType::Alert, &alert.encode())
    }

    fn flush_handshake_output(&mut self) -> Result<(), Error> {
        while let Some(output) = self.handshake.poll_output() {
            match output {
                HandshakeOutput::Message(msg) => self.send_record(ContentType::Handshake, &msg)?,
                HandshakeOutput::ChangeCipherSpec(keys) => {
                    self.send_record(ContentType::ChangeCipherSpec, &[1])?;
                    self.write_protection = Some(RecordProtection::new(
                        Arc::clone(&self.config.provider),
                        Arc::clone(&self.config.rng),
                        keys,
                    )?);
                    log::debug!("write protection installed");
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internal: inbound records
    // ------------------------------------------------------------------

    fn process_recv(&mut self) -> Result<(), Error> {
        loop {
            if self.recv_buf.len() < RECORD_HEADER_LEN {
                return Ok(());
            }
            let hdr = RecordHeader::decode(&self.recv_buf[..RECORD_HEADER_LEN])?;
            let total = RECORD_HEADER_LEN + hdr.length as usize;
            if self.recv_buf.len() < total {
                return Ok(());
            }

            let mut record: Vec<u8> = self.recv_buf.drain(..total).collect();
            let fragment = &mut record[RECORD_HEADER_LEN..];
            let range = match self.read_protection.as_mut() {
                Some(protection) => protection.open(hdr.content_type, fragment)?,
                None => {
                    if fragment.len() > MAX_FRAGMENT_LEN {
                        return Err(Error::Alert(AlertDescription::RecordOverflow));
                    }
                    0..fragment.len()
                }
            };
            log::trace!("received {:?} record ({} bytes)", hdr.content_type, range.len());
            self.handle_record(hdr.content_type, &fragment[range])?;

            if self.peer_closed {
                self.recv_buf.clear();
                return Ok(());
            }
        }
    }

    fn handle_record(&mut self, content_type: ContentType, payload: &[u8]) -> Result<(), Error> {
        match content_type {
            ContentType::Handshake => self.handle_handshake_fragment(payload),
            ContentType::ChangeCipherSpec => self.handle_change_cipher_spec(payload),
            ContentType::Alert => match (Alert::decode(payload), payload) {
                (Ok(alert), _) => self.handle_alert(alert),
                (Err(_), &[level, desc])
                    if level == AlertLevel::Warning.to_u8() && self.state == ConnState::Active =>
                {
                    log::warn!("ignoring unknown warning alert {}", desc);
                    Ok(())
                }
                (Err(err), _) => Err(err),
            },
            ContentType::ApplicationData => {
                if self.state != ConnState::Active {
                    return Err(Error::Alert(AlertDescription::UnexpectedMessage));
                }
                if !payload.is_empty() {
                    self.app_recv_buf.extend(payload.iter().copied());
                    self.push_event(TlsEvent::AppData);
                }
                Ok(())
            }
        }
    }

    fn handle_change_cipher_spec(&mut self, payload: &[u8]) -> Result<(), Error> {
        if payload != [1] {
            return Err(Error::decode());
        }
        // CCS must sit on a handshake message boundary.
        if !self.handshake_buf.is_empty() || self.read_protection.is_some() {
            return Err(Error::Alert(AlertDescription::UnexpectedMessage));
        }
        let keys = self.handshake.handle_change_cipher_spec()?;
        self.read_protection = Some(RecordProtection::new(
            Arc::clone(&self.config.provider),
            Arc::clone(&self.config.rng),
            keys,
        )?);
        log::debug!("read protection installed");
        Ok(())
    }

    fn handle_handshake_fragment(&mut self, payload: &[u8]) -> Result<(), Error> {
        if payload.is_empty() {
            return Err(Error::Alert(AlertDescription::UnexpectedMessage));
        }
        self.handshake_buf.extend_from_slice(payload);

        while self.handshake_buf.len() >= HANDSHAKE_HEADER_LEN {
            let (_, len) = read_handshake_header(&self.handshake_buf)?;
            if len > MAX_HANDSHAKE_MESSAGE_LEN {
                return Err(Error::decode());
            }
            let total = HANDSHAKE_HEADER_LEN + len;
            if self.handshake_buf.len() < total {
                break;
            }
            let msg: Vec<u8> = self.handshake_buf.drain(..total).collect();
            self.handle_handshake_message(&msg)?;
        }
        Ok(())
    }

    fn handle_handshake_message(&mut self, msg: &[u8]) -> Result<(), Error> {
        if self.state == ConnState::Active {
            // Only HelloRequest may follow the handshake, and we decline it.
            if msg == [HandshakeType::HelloRequest.to_u8(), 0, 0, 0] {
                log::debug!("declining renegotiation");
                return self.send_alert(Alert::warning(AlertDescription::NoRenegotiation));
            }
            return Err(Error::Alert(AlertDescription::UnexpectedMessage));
        }

        self.handshake.handle_message(msg)?;
        if let Some(version) = self.handshake.version() {
            self.write_version = version.to_u16();
        }
        self.flush_handshake_output()?;

        if self.handshake.is_established() {
            self.state = ConnState::Active;
            log::debug!(
                "handshake complete: {:?} {:?}",
                self.handshake.version().unwrap_or(ProtocolVersion::Tls12),
                self.handshake.cipher_suite()
            );
            self.push_event(TlsEvent::HandshakeComplete);
        }
        Ok(())
    }

    /// Queue an event. Back-to-back AppData events collapse into one, so
    /// the queue never holds more than HandshakeComplete, AppData and
    /// PeerClosed at once.
    fn push_event(&mut self, event: TlsEvent) {
        if event == TlsEvent::AppData && self.events.back() == Some(&TlsEvent::AppData) {
            return;
        }
        if let Err(event) = self.events.push_back(event) {
            log::error!("event queue full, dropped {:?}", event);
        }
    }

    fn handle_alert(&mut self, alert: Alert) -> Result<(), Error> {
        log::debug!("received alert {:?}", alert);
        if self.state != ConnState::Active {
            return Err(Error::PeerAlert(alert.description));
        }
        if alert.description == AlertDescription::CloseNotify {
            self.peer_closed = true;
            self.push_event(TlsEvent::PeerClosed);
            if !self.close_sent {
                self.close_sent = true;
                self.send_alert(Alert::close_notify())?;
            }
            return Ok(());
        }
        if alert.is_fatal() {
            return Err(Error::PeerAlert(alert.description));
        }
        log::warn!("ignoring warning alert {:?}", alert.description);
        Ok(())
    }
}
