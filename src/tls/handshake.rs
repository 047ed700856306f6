//! TLS 1.0-1.2 client handshake state machine.
//!
//! ```text
//! Start -> ClientHelloSent -> ServerHelloReceived -> CertificateReceived
//!       -> [ServerKeyExchangeReceived] -> [CertificateRequestReceived]
//!       -> ServerDoneReceived -> ClientKeyExchangeSent -> ChangeCipherSpecSent
//!       -> FinishedSent -> ServerChangeCipherSpecReceived -> FinishedReceived
//!       -> Established
//! ```
//!
//! Any error moves the engine to `Aborted`, permanently. The engine is
//! sans-I/O: the connection feeds it complete handshake messages and
//! ChangeCipherSpec notifications and drains [`HandshakeOutput`]s.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::config::TlsConfig;
use crate::crypto::{NamedCurve, SignatureAlgorithm, SignatureScheme};
use crate::error::Error;
use crate::tls::alert::AlertDescription;
use crate::tls::cipher_suite::{CipherSuite, KeyExchangeAlgorithm};
use crate::tls::extensions::{Extension, POINT_FORMAT_UNCOMPRESSED};
use crate::tls::key_schedule::{DirectionKeys, FinishedLabel, MasterSecret, VERIFY_DATA_LEN};
use crate::tls::messages::{
    self, read_handshake_header, Certificate, CertificateRequest, CertificateVerify, ClientHello,
    ClientKeyExchange, DigitallySigned, EcdheServerKeyExchange, Finished, HandshakeType,
    ServerHello, CERT_TYPE_ECDSA_SIGN, CERT_TYPE_RSA_SIGN, HANDSHAKE_HEADER_LEN,
};
use crate::tls::transcript::TranscriptHash;
use crate::tls::ProtocolVersion;
use crate::x509::{self, PublicKeyKind};

/// Client handshake states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Nothing sent yet.
    Start,
    ClientHelloSent,
    ServerHelloReceived,
    CertificateReceived,
    ServerKeyExchangeReceived,
    CertificateRequestReceived,
    ServerDoneReceived,
    ClientKeyExchangeSent,
    ChangeCipherSpecSent,
    FinishedSent,
    ServerChangeCipherSpecReceived,
    FinishedReceived,
    Established,
    Aborted,
}

/// Work the connection must carry out on the engine's behalf, in order.
#[derive(Debug)]
pub enum HandshakeOutput {
    /// A complete handshake message to send in a Handshake record.
    Message(Vec<u8>),
    /// Send ChangeCipherSpec, then protect every later outbound record with
    /// these keys.
    ChangeCipherSpec(DirectionKeys),
}

/// The server's verified ephemeral ECDH parameters.
struct ServerKeyShare {
    curve: NamedCurve,
    public_key: Vec<u8>,
}

/// Client-side TLS 1.0-1.2 handshake engine.
///
/// Owns every handshake-scoped secret. The master secret lives only for the
/// duration of the client flight; the expected server Finished value and the
/// server's read keys are held until the server's CCS and Finished arrive.
pub struct ClientHandshake {
    config: Arc<TlsConfig>,
    state: HandshakeState,

    offered_suites: Vec<CipherSuite>,
    client_random: [u8; 32],
    server_random: [u8; 32],

    version: Option<ProtocolVersion>,
    suite: Option<CipherSuite>,

    transcript: TranscriptHash,
    peer_chain: Vec<Vec<u8>>,
    server_key_share: Option<ServerKeyShare>,
    certificate_request: Option<CertificateRequest>,

    pending_read_keys: Option<DirectionKeys>,
    expected_server_finished: Option<Zeroizing<[u8; VERIFY_DATA_LEN]>>,

    output: VecDeque<HandshakeOutput>,
}

impl ClientHandshake {
    pub fn new(config: Arc<TlsConfig>) -> Self {
        let offered_suites = config.offered_suites().collect();
        Self {
            config,
            state: HandshakeState::Start,
            offered_suites,
            client_random: [0; 32],
            server_random: [0; 32],
            version: None,
            suite: None,
            transcript: TranscriptHash::new(),
            peer_chain: Vec::new(),
            server_key_share: None,
            certificate_request: None,
            pending_read_keys: None,
            expected_server_finished: None,
            output: VecDeque::new(),
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn is_established(&self) -> bool {
        self.state == HandshakeState::Established
    }

    /// Negotiated version, once ServerHello has been accepted.
    pub fn version(&self) -> Option<ProtocolVersion> {
        self.version
    }

    /// Negotiated suite, once ServerHello has been accepted.
    pub fn cipher_suite(&self) -> Option<CipherSuite> {
        self.suite
    }

    /// The server's certificate chain, leaf first, once accepted.
    pub fn peer_certificates(&self) -> &[Vec<u8>] {
        &self.peer_chain
    }

    pub fn client_random(&self) -> &[u8; 32] {
        &self.client_random
    }

    /// Next piece of output, if any.
    pub fn poll_output(&mut self) -> Option<HandshakeOutput> {
        self.output.pop_front()
    }

    /// Queue the ClientHello.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.state != HandshakeState::Start {
            return Err(Error::InvalidState);
        }
        let result = self.send_client_hello();
        self.fail_on_error(result)
    }

    /// Process one complete handshake message (header included).
    pub fn handle_message(&mut self, msg: &[u8]) -> Result<(), Error> {
        if self.state == HandshakeState::Aborted {
            return Err(Error::InvalidState);
        }
        let result = self.dispatch(msg);
        self.fail_on_error(result)
    }

    /// The server's ChangeCipherSpec arrived. Returns the keys that protect
    /// every later inbound record.
    pub fn handle_change_cipher_spec(&mut self) -> Result<DirectionKeys, Error> {
        let result = match (self.state, self.pending_read_keys.take()) {
            (HandshakeState::FinishedSent, Some(keys)) => {
                self.set_state(HandshakeState::ServerChangeCipherSpecReceived);
                Ok(keys)
            }
            _ => Err(Error::Alert(AlertDescription::UnexpectedMessage)),
        };
        if result.is_err() {
            self.abort();
        }
        result
    }

    /// Move to `Aborted` and drop every secret.
    pub fn abort(&mut self) {
        if self.state != HandshakeState::Aborted {
            log::debug!("handshake aborted in {:?}", self.state);
        }
        self.state = HandshakeState::Aborted;
        self.discard_secrets();
        self.output.clear();
    }

    fn fail_on_error(&mut self, result: Result<(), Error>) -> Result<(), Error> {
        if result.is_err() {
            self.abort();
        }
        result
    }

    fn set_state(&mut self, next: HandshakeState) {
        log::debug!("handshake {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn discard_secrets(&mut self) {
        self.pending_read_keys = None;
        self.expected_server_finished = None;
        self.server_key_share = None;
        self.certificate_request = None;
        self.transcript.discard_messages();
    }

    fn negotiated(&self) -> Result<(ProtocolVersion, CipherSuite), Error> {
        match (self.version, self.suite) {
            (Some(v), Some(s)) => Ok((v, s)),
            _ => Err(Error::InvalidState),
        }
    }

    fn send(&mut self, msg: Vec<u8>) {
        self.transcript.update(&msg);
        self.output.push_back(HandshakeOutput::Message(msg));
    }

    // ------------------------------------------------------------------
    // ClientHello
    // ------------------------------------------------------------------

    fn send_client_hello(&mut self) -> Result<(), Error> {
        self.config.rng.fill(&mut self.client_random);

        let mut extensions = Vec::new();
        if let Some(name) = self.config.server_name() {
            extensions.push(Extension::ServerName(name.into()));
        }
        let offers_ecdhe = self
            .offered_suites
            .iter()
            .any(|s| s.params().key_exchange == KeyExchangeAlgorithm::Ecdhe);
        if offers_ecdhe {
            extensions.push(Extension::SupportedGroups(self.config.curves().to_vec()));
            extensions.push(Extension::EcPointFormats(alloc::vec![POINT_FORMAT_UNCOMPRESSED]));
        }
        if self.config.max_version() >= ProtocolVersion::Tls12 {
            extensions.push(Extension::SignatureAlgorithms(
                self.config.signature_schemes().to_vec(),
            ));
        }
        extensions.push(Extension::RenegotiationInfo(Vec::new()));

        let hello = ClientHello {
            version: self.config.max_version().to_u16(),
            random: self.client_random,
            session_id: Vec::new(),
            cipher_suites: self.offered_suites.iter().map(|s| s.to_u16()).collect(),
            compression_methods: alloc::vec![0],
            extensions,
        };
        self.send(hello.encode()?);
        log::debug!(
            "ClientHello: {:?}, {} suite(s)",
            self.config.max_version(),
            self.offered_suites.len()
        );
        self.set_state(HandshakeState::ClientHelloSent);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Inbound dispatch
    // ------------------------------------------------------------------

    fn dispatch(&mut self, msg: &[u8]) -> Result<(), Error> {
        let (typ, len) = read_handshake_header(msg)?;
        let body = msg.get(HANDSHAKE_HEADER_LEN..).ok_or(Error::decode())?;
        if body.len() != len {
            return Err(Error::decode());
        }
        let typ = HandshakeType::from_u8(typ)
            .ok_or(Error::Alert(AlertDescription::UnexpectedMessage))?;
        log::trace!("handshake message {:?} ({} bytes) in {:?}", typ, len, self.state);

        // HelloRequest is not part of the transcript and is meaningless
        // while a handshake is already underway.
        if typ == HandshakeType::HelloRequest {
            messages::decode_empty(body)?;
            log::debug!("ignoring HelloRequest during handshake");
            return Ok(());
        }

        self.transcript.update(msg);

        match typ {
            HandshakeType::ServerHello => self.handle_server_hello(body),
            HandshakeType::Certificate => self.handle_certificate(body),
            HandshakeType::ServerKeyExchange => self.handle_server_key_exchange(body),
            HandshakeType::CertificateRequest => self.handle_certificate_request(body),
            HandshakeType::ServerHelloDone => self.handle_server_hello_done(body),
            HandshakeType::Finished => self.handle_finished(body),
            _ => Err(Error::Alert(AlertDescription::UnexpectedMessage)),
        }
    }

    fn expect(&self, states: &[HandshakeState]) -> Result<(), Error> {
        if states.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::Alert(AlertDescription::UnexpectedMessage))
        }
    }

    fn handle_server_hello(&mut self, body: &[u8]) -> Result<(), Error> {
        self.expect(&[HandshakeState::ClientHelloSent])?;
        let hello = ServerHello::decode(body)?;

        let version = ProtocolVersion::from_u16(hello.version)
            .filter(|v| *v >= self.config.min_version() && *v <= self.config.max_version())
            .ok_or(Error::Alert(AlertDescription::ProtocolVersion))?;

        let suite = CipherSuite::from_u16(hello.cipher_suite)
            .filter(|s| self.offered_suites.contains(s))
            .ok_or(Error::Alert(AlertDescription::HandshakeFailure))?;
        if !suite.usable_with(version) {
            return Err(Error::Alert(AlertDescription::IllegalParameter));
        }
        if hello.compression_method != 0 {
            return Err(Error::Alert(AlertDescription::IllegalParameter));
        }

        for ext in &hello.extensions {
            match ext {
                Extension::ServerName(name) => {
                    if self.config.server_name().is_none() {
                        return Err(Error::Alert(AlertDescription::UnsupportedExtension));
                    }
                    if !name.is_empty() {
                        return Err(Error::Alert(AlertDescription::IllegalParameter));
                    }
                }
                Extension::EcPointFormats(formats) => {
                    if !formats.contains(&POINT_FORMAT_UNCOMPRESSED) {
                        return Err(Error::Alert(AlertDescription::IllegalParameter));
                    }
                }
                Extension::RenegotiationInfo(data) => {
                    if !data.is_empty() {
                        return Err(Error::Alert(AlertDescription::HandshakeFailure));
                    }
                }
                Extension::SupportedGroups(_) | Extension::SignatureAlgorithms(_) => {
                    return Err(Error::Alert(AlertDescription::UnsupportedExtension));
                }
                Extension::Unknown { typ, data } => {
                    log::debug!("ignoring ServerHello extension {:#06x} ({} bytes)", typ, data.len());
                }
            }
        }

        self.server_random = hello.random;
        self.version = Some(version);
        self.suite = Some(suite);
        log::debug!("negotiated {:?} with {}", version, suite);
        self.set_state(HandshakeState::ServerHelloReceived);
        Ok(())
    }

    fn handle_certificate(&mut self, body: &[u8]) -> Result<(), Error> {
        self.expect(&[HandshakeState::ServerHelloReceived])?;
        let (_, suite) = self.negotiated()?;
        let cert = Certificate::decode(body)?;
        let leaf = cert
            .chain
            .first()
            .ok_or(Error::Alert(AlertDescription::BadCertificate))?;

        let kind = x509::subject_public_key_info(leaf)?.kind()?;
        let acceptable = match (suite.params().signature, kind) {
            (SignatureAlgorithm::Rsa, PublicKeyKind::Rsa) => true,
            (SignatureAlgorithm::Ecdsa, PublicKeyKind::Ecdsa(_) | PublicKeyKind::Ed25519) => {
                suite.params().key_exchange == KeyExchangeAlgorithm::Ecdhe
            }
            _ => false,
        };
        if !acceptable {
            return Err(Error::Alert(AlertDescription::UnsupportedCertificate));
        }

        self.config
            .trust
            .validate(&cert.chain, self.config.server_name())
            .map_err(|e| {
                log::debug!("certificate chain rejected: {}", e);
                Error::Alert(e.alert())
            })?;

        log::debug!("server certificate chain accepted ({} cert(s))", cert.chain.len());
        self.peer_chain = cert.chain;
        self.set_state(HandshakeState::CertificateReceived);
        Ok(())
    }

    fn handle_server_key_exchange(&mut self, body: &[u8]) -> Result<(), Error> {
        self.expect(&[HandshakeState::CertificateReceived])?;
        let (version, suite) = self.negotiated()?;
        if suite.params().key_exchange != KeyExchangeAlgorithm::Ecdhe {
            return Err(Error::Alert(AlertDescription::UnexpectedMessage));
        }
        let ske = EcdheServerKeyExchange::decode(body, version)?;

        let curve = NamedCurve::from_u16(ske.curve)
            .filter(|c| self.config.curves().contains(c))
            .ok_or(Error::Alert(AlertDescription::IllegalParameter))?;

        let leaf = self.peer_chain.first().ok_or(Error::InvalidState)?;
        let spki = x509::subject_public_key_info(leaf)?;
        let key_kind = spki.kind()?;
        let scheme = self.server_signature_scheme(version, key_kind, ske.signed.scheme)?;

        let signed = ske.signed_message(&self.client_random, &self.server_random)?;
        self.config
            .provider()
            .verify(scheme, &spki, &signed, &ske.signed.signature)
            .map_err(|_| Error::Alert(AlertDescription::DecryptError))?;

        log::debug!("ServerKeyExchange verified: {:?} signed with {:?}", curve, scheme);
        self.server_key_share = Some(ServerKeyShare {
            curve,
            public_key: ske.public_key,
        });
        self.set_state(HandshakeState::ServerKeyExchangeReceived);
        Ok(())
    }

    /// Pick the scheme a server signature must have been made with.
    fn server_signature_scheme(
        &self,
        version: ProtocolVersion,
        key: PublicKeyKind,
        advertised: Option<u16>,
    ) -> Result<SignatureScheme, Error> {
        if version >= ProtocolVersion::Tls12 {
            let scheme = advertised
                .and_then(SignatureScheme::from_u16)
                .filter(|s| self.config.signature_schemes().contains(s))
                .filter(|s| s.algorithm() == key.algorithm())
                .ok_or(Error::Alert(AlertDescription::IllegalParameter))?;
            return Ok(scheme);
        }
        Ok(match key {
            PublicKeyKind::Rsa => SignatureScheme::LegacyRsaMd5Sha1,
            PublicKeyKind::Ecdsa(_) => SignatureScheme::EcdsaSha1,
            PublicKeyKind::Ed25519 => SignatureScheme::Ed25519,
        })
    }

    fn handle_certificate_request(&mut self, body: &[u8]) -> Result<(), Error> {
        let (version, suite) = self.negotiated()?;
        match suite.params().key_exchange {
            KeyExchangeAlgorithm::Rsa => self.expect(&[HandshakeState::CertificateReceived])?,
            KeyExchangeAlgorithm::Ecdhe => {
                self.expect(&[HandshakeState::ServerKeyExchangeReceived])?
            }
        }
        let req = CertificateRequest::decode(body, version)?;
        log::debug!("server requested a client certificate");
        self.certificate_request = Some(req);
        self.set_state(HandshakeState::CertificateRequestReceived);
        Ok(())
    }

    fn handle_server_hello_done(&mut self, body: &[u8]) -> Result<(), Error> {
        let (version, suite) = self.negotiated()?;
        match suite.params().key_exchange {
            KeyExchangeAlgorithm::Rsa => self.expect(&[
                HandshakeState::CertificateReceived,
                HandshakeState::CertificateRequestReceived,
            ])?,
            KeyExchangeAlgorithm::Ecdhe => self.expect(&[
                HandshakeState::ServerKeyExchangeReceived,
                HandshakeState::CertificateRequestReceived,
            ])?,
        }
        messages::decode_empty(body)?;
        self.set_state(HandshakeState::ServerDoneReceived);
        self.send_client_flight(version, suite)
    }

    // ------------------------------------------------------------------
    // Client flight
    // ------------------------------------------------------------------

    fn send_client_flight(
        &mut self,
        version: ProtocolVersion,
        suite: CipherSuite,
    ) -> Result<(), Error> {
        let config = Arc::clone(&self.config);
        let provider = config.provider();

        // Client certificate, if the server asked for one.
        let client_auth = match self.certificate_request.take() {
            Some(req) => {
                let chosen = self.select_client_certificate(&req, version);
                let chain = match chosen {
                    Some((idx, _)) => config.certificates()[idx].chain.clone(),
                    None => {
                        log::debug!("no suitable client certificate, sending none");
                        Vec::new()
                    }
                };
                self.send(Certificate { chain }.encode()?);
                chosen
            }
            None => None,
        };
        if client_auth.is_none() {
            self.transcript.discard_messages();
        }

        // ClientKeyExchange and the pre-master secret.
        let (cke, pre_master_secret) = match suite.params().key_exchange {
            KeyExchangeAlgorithm::Rsa => {
                let mut pms = Zeroizing::new(alloc::vec![0u8; 48]);
                config.rng.fill(&mut pms[2..]);
                pms[..2].copy_from_slice(&config.max_version().to_u16().to_be_bytes());
                let leaf = self.peer_chain.first().ok_or(Error::InvalidState)?;
                let spki = x509::subject_public_key_info(leaf)?;
                let encrypted = provider.rsa_encrypt(&spki, &*config.rng, &pms)?;
                (ClientKeyExchange::Rsa(encrypted), pms)
            }
            KeyExchangeAlgorithm::Ecdhe => {
                let share = self.server_key_share.take().ok_or(Error::InvalidState)?;
                let kx = provider.key_exchange(share.curve, &*config.rng)?;
                let public = kx.public_key().to_vec();
                let shared = kx.complete(&share.public_key)?;
                (ClientKeyExchange::Ecdhe(public), shared)
            }
        };
        self.send(cke.encode()?);
        self.set_state(HandshakeState::ClientKeyExchangeSent);

        let master = MasterSecret::derive(
            provider,
            version,
            suite,
            pre_master_secret,
            &self.client_random,
            &self.server_random,
        )?;
        if let Some(key_log) = &config.key_log {
            key_log.log("CLIENT_RANDOM", &self.client_random, master.as_bytes());
        }

        if let Some((idx, scheme)) = client_auth {
            let signed_data = self.transcript.messages().ok_or(Error::InvalidState)?;
            let key = &config.certificates()[idx].key;
            let signature = provider.sign(scheme, key, &*config.rng, signed_data)?;
            let verify = CertificateVerify {
                signed: DigitallySigned {
                    scheme: if version >= ProtocolVersion::Tls12 {
                        scheme.to_u16()
                    } else {
                        None
                    },
                    signature,
                },
            };
            self.send(verify.encode()?);
            self.transcript.discard_messages();
        }

        let keys = master.key_block(
            provider,
            version,
            suite,
            &self.client_random,
            &self.server_random,
        )?;
        self.output
            .push_back(HandshakeOutput::ChangeCipherSpec(keys.client.clone()));
        self.set_state(HandshakeState::ChangeCipherSpecSent);

        let prf_hash = suite.params().prf_hash;
        let verify_data = master.verify_data(
            provider,
            version,
            suite,
            FinishedLabel::Client,
            &self.transcript.finished_hash(version, prf_hash),
        )?;
        self.send(Finished { verify_data }.encode()?);

        // The server's Finished covers everything up to and including ours,
        // so it can be computed now and the master secret dropped.
        let expected = master.verify_data(
            provider,
            version,
            suite,
            FinishedLabel::Server,
            &self.transcript.finished_hash(version, prf_hash),
        )?;
        drop(master);
        self.expected_server_finished = Some(Zeroizing::new(expected));
        self.pending_read_keys = Some(keys.server.clone());
        self.set_state(HandshakeState::FinishedSent);
        Ok(())
    }

    /// First configured certificate whose key type the server accepts,
    /// with the scheme to sign CertificateVerify with.
    fn select_client_certificate(
        &self,
        req: &CertificateRequest,
        version: ProtocolVersion,
    ) -> Option<(usize, SignatureScheme)> {
        self.config
            .certificates()
            .iter()
            .enumerate()
            .find_map(|(idx, certified)| {
                let algorithm = certified.key.algorithm();
                let cert_type = match algorithm {
                    SignatureAlgorithm::Rsa => CERT_TYPE_RSA_SIGN,
                    SignatureAlgorithm::Ecdsa | SignatureAlgorithm::Ed25519 => {
                        CERT_TYPE_ECDSA_SIGN
                    }
                };
                if !req.certificate_types.contains(&cert_type) {
                    return None;
                }
                let scheme = if version >= ProtocolVersion::Tls12 {
                    self.config.signature_schemes().iter().copied().find(|s| {
                        s.algorithm() == algorithm
                            && s.to_u16()
                                .map_or(false, |code| req.signature_schemes.contains(&code))
                    })?
                } else {
                    match algorithm {
                        SignatureAlgorithm::Rsa => SignatureScheme::LegacyRsaMd5Sha1,
                        SignatureAlgorithm::Ecdsa => SignatureScheme::EcdsaSha1,
                        SignatureAlgorithm::Ed25519 => return None,
                    }
                };
                Some((idx, scheme))
            })
    }

    // ------------------------------------------------------------------
    // Server Finished
    // ------------------------------------------------------------------

    fn handle_finished(&mut self, body: &[u8]) -> Result<(), Error> {
        self.expect(&[HandshakeState::ServerChangeCipherSpecReceived])?;
        let finished = Finished::decode(body)?;
        let expected = self
            .expected_server_finished
            .take()
            .ok_or(Error::InvalidState)?;
        if !bool::from(finished.verify_data[..].ct_eq(&expected[..])) {
            return Err(Error::Alert(AlertDescription::DecryptError));
        }
        self.set_state(HandshakeState::FinishedReceived);
        self.discard_secrets();
        self.set_state(HandshakeState::Established);
        Ok(())
    }
}

impl core::fmt::Debug for ClientHandshake {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClientHandshake")
            .field("state", &self.state)
            .field("version", &self.version)
            .field("suite", &self.suite)
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, feature = "std", feature = "rustcrypto"))]
mod tests {
    use super::*;
    use crate::trust::NoVerification;
    use alloc::string::String;

    fn config() -> Arc<TlsConfig> {
        Arc::new(
            TlsConfig::builder(Arc::new(NoVerification))
                .server_name("example.com")
                .build()
                .unwrap(),
        )
    }

    fn started() -> ClientHandshake {
        let mut hs = ClientHandshake::new(config());
        hs.start().unwrap();
        hs
    }

    fn client_hello(hs: &mut ClientHandshake) -> ClientHello {
        match hs.poll_output() {
            Some(HandshakeOutput::Message(msg)) => {
                assert_eq!(msg[0], HandshakeType::ClientHello.to_u8());
                ClientHello::decode(&msg[HANDSHAKE_HEADER_LEN..]).unwrap()
            }
            other => panic!("expected ClientHello, got {:?}", other),
        }
    }

    fn server_hello(version: u16, suite: u16, extensions: Vec<Extension>) -> Vec<u8> {
        ServerHello {
            version,
            random: [0x22; 32],
            session_id: Vec::new(),
            cipher_suite: suite,
            compression_method: 0,
            extensions,
        }
        .encode()
        .unwrap()
    }

    #[test]
    fn client_hello_contents() {
        let mut hs = started();
        assert_eq!(hs.state(), HandshakeState::ClientHelloSent);
        let hello = client_hello(&mut hs);
        assert_eq!(hello.version, 0x0303);
        assert_eq!(&hello.random, hs.client_random());
        assert_eq!(hello.cipher_suites[0], 0xc02b);
        assert_eq!(hello.compression_methods, [0]);
        assert!(hello
            .extensions
            .contains(&Extension::ServerName(String::from("example.com"))));
        assert!(hello.extensions.contains(&Extension::RenegotiationInfo(Vec::new())));
        assert!(hello
            .extensions
            .iter()
            .any(|e| matches!(e, Extension::SupportedGroups(g) if g[0] == NamedCurve::X25519)));
        assert!(hs.poll_output().is_none());
    }

    #[test]
    fn start_twice_is_invalid() {
        let mut hs = started();
        assert_eq!(hs.start(), Err(Error::InvalidState));
    }

    #[test]
    fn server_hello_accepted() {
        let mut hs = started();
        let msg = server_hello(
            0x0303,
            0xc02f,
            alloc::vec![
                Extension::RenegotiationInfo(Vec::new()),
                Extension::EcPointFormats(alloc::vec![0, 1]),
                Extension::ServerName(String::new()),
                Extension::Unknown { typ: 0x0017, data: Vec::new() },
            ],
        );
        hs.handle_message(&msg).unwrap();
        assert_eq!(hs.state(), HandshakeState::ServerHelloReceived);
        assert_eq!(hs.version(), Some(ProtocolVersion::Tls12));
        assert_eq!(hs.cipher_suite(), Some(CipherSuite::EcdheRsaWithAes128GcmSha256));
    }

    #[test]
    fn suite_not_offered_is_handshake_failure() {
        let mut hs = started();
        let msg = server_hello(0x0303, 0x0005, Vec::new());
        assert_eq!(
            hs.handle_message(&msg),
            Err(Error::Alert(AlertDescription::HandshakeFailure))
        );
        assert_eq!(hs.state(), HandshakeState::Aborted);
        assert!(hs.poll_output().is_none());
    }

    #[test]
    fn version_outside_range_is_protocol_version() {
        for version in [0x0301, 0x0304, 0x0300] {
            let mut hs = started();
            let msg = server_hello(version, 0xc02f, Vec::new());
            assert_eq!(
                hs.handle_message(&msg),
                Err(Error::Alert(AlertDescription::ProtocolVersion))
            );
        }
    }

    #[test]
    fn renegotiation_info_must_be_empty() {
        let mut hs = started();
        let msg = server_hello(
            0x0303,
            0xc02f,
            alloc::vec![Extension::RenegotiationInfo(alloc::vec![1, 2])],
        );
        assert_eq!(
            hs.handle_message(&msg),
            Err(Error::Alert(AlertDescription::HandshakeFailure))
        );
    }

    #[test]
    fn compression_is_illegal() {
        let mut hs = started();
        let mut msg = server_hello(0x0303, 0xc02f, Vec::new());
        let last = msg.len() - 1;
        msg[last] = 1;
        assert_eq!(
            hs.handle_message(&msg),
            Err(Error::Alert(AlertDescription::IllegalParameter))
        );
    }

    #[test]
    fn point_formats_without_uncompressed() {
        let mut hs = started();
        let msg = server_hello(0x0303, 0xc02f, alloc::vec![Extension::EcPointFormats(alloc::vec![1])]);
        assert_eq!(
            hs.handle_message(&msg),
            Err(Error::Alert(AlertDescription::IllegalParameter))
        );
    }

    #[test]
    fn out_of_order_message_is_unexpected() {
        let mut hs = started();
        let done = messages::encode_empty(HandshakeType::ServerHelloDone);
        assert_eq!(
            hs.handle_message(&done),
            Err(Error::Alert(AlertDescription::UnexpectedMessage))
        );
        assert_eq!(hs.state(), HandshakeState::Aborted);
        assert_eq!(hs.handle_message(&done), Err(Error::InvalidState));
    }

    #[test]
    fn change_cipher_spec_too_early() {
        let mut hs = started();
        assert!(matches!(
            hs.handle_change_cipher_spec(),
            Err(Error::Alert(AlertDescription::UnexpectedMessage))
        ));
        assert_eq!(hs.state(), HandshakeState::Aborted);
    }

    #[test]
    fn hello_request_ignored_during_handshake() {
        let mut hs = started();
        hs.handle_message(&messages::encode_empty(HandshakeType::HelloRequest))
            .unwrap();
        assert_eq!(hs.state(), HandshakeState::ClientHelloSent);
    }

    #[test]
    fn header_length_mismatch_is_decode_error() {
        let mut hs = started();
        let mut msg = server_hello(0x0303, 0xc02f, Vec::new());
        msg.push(0);
        assert_eq!(hs.handle_message(&msg), Err(Error::decode()));
    }
}
