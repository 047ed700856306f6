//! In-process TLS 1.0-1.2 server for exercising the client.
//!
//! Built from the crate's own codec, key schedule and record layer plus the
//! `rsa`/`p256` crates for the server's long-term keys. Only the happy path
//! is implemented; knobs in [`ServerOptions`] inject the misbehaviour the
//! tests need.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, OnceLock};

use milli_tls::crypto::rustcrypto::RustCryptoProvider;
use milli_tls::crypto::{CryptoProvider, KeyExchange, NamedCurve, PrivateKey, SignatureScheme};
use milli_tls::tcp_tls::record::{
    encode_plaintext, ContentType, RecordHeader, RecordProtection, RECORD_HEADER_LEN,
};
use milli_tls::tls::cipher_suite::{CipherSuite, KeyExchangeAlgorithm};
use milli_tls::tls::extensions::{Extension, POINT_FORMAT_UNCOMPRESSED};
use milli_tls::tls::key_schedule::{DirectionKeys, FinishedLabel, MasterSecret};
use milli_tls::tls::messages::{
    self, read_handshake_header, Certificate, CertificateRequest, CertificateVerify, ClientHello,
    ClientKeyExchange, DigitallySigned, EcdheServerKeyExchange, Finished, HandshakeType,
    ServerHello, CERT_TYPE_ECDSA_SIGN, CERT_TYPE_RSA_SIGN, HANDSHAKE_HEADER_LEN,
};
use milli_tls::tls::transcript::TranscriptHash;
use milli_tls::transport::OsRng;
use milli_tls::x509;
use milli_tls::{
    Alert, Error, KeyLog, NoVerification, ProtocolVersion, Rng, TlsConfig, TlsConfigBuilder,
    TlsConnection, TrustValidator,
};
use zeroize::Zeroizing;

// ----------------------------------------------------------------------
// Keys and certificates
// ----------------------------------------------------------------------

/// A long-term key and a minimal self-describing certificate for it.
pub struct Identity {
    pub cert: Vec<u8>,
    pub key: PrivateKey,
    rsa: Option<rsa::RsaPrivateKey>,
}

fn der(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else if len <= 0xff {
        out.extend_from_slice(&[0x81, len as u8]);
    } else {
        out.extend_from_slice(&[0x82, (len >> 8) as u8, len as u8]);
    }
    out.extend_from_slice(content);
    out
}

fn seq(parts: &[&[u8]]) -> Vec<u8> {
    der(0x30, &parts.concat())
}

/// Certificate ::= SEQUENCE { tbs, sigAlg, signature } with empty names.
/// Nothing but the SubjectPublicKeyInfo is meaningful.
pub fn certificate(spki: &[u8], serial: u8) -> Vec<u8> {
    let version = der(0xa0, &der(0x02, &[2]));
    let serial = der(0x02, &[serial]);
    let empty = seq(&[]);
    let tbs = seq(&[&version, &serial, &empty, &empty, &empty, &empty, spki]);
    seq(&[&tbs, &empty, &der(0x03, &[0])])
}

pub fn rsa_identity() -> &'static Identity {
    static RSA: OnceLock<Identity> = OnceLock::new();
    RSA.get_or_init(|| {
        use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey};
        let key = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let spki = key.to_public_key().to_public_key_der().unwrap();
        let pkcs8 = key.to_pkcs8_der().unwrap();
        Identity {
            cert: certificate(spki.as_bytes(), 1),
            key: PrivateKey::rsa_pkcs8_der(pkcs8.as_bytes()),
            rsa: Some(key),
        }
    })
}

fn p256_spki(scalar: &[u8; 32]) -> Vec<u8> {
    use p256::elliptic_curve::sec1::ToEncodedPoint;
    const ID_EC_PUBLIC_KEY: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];
    const SECP256R1: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];
    let secret = p256::SecretKey::from_slice(scalar).unwrap();
    let point = secret.public_key().to_encoded_point(false);
    let mut bits = vec![0u8];
    bits.extend_from_slice(point.as_bytes());
    seq(&[
        &seq(&[&der(0x06, ID_EC_PUBLIC_KEY), &der(0x06, SECP256R1)]),
        &der(0x03, &bits),
    ])
}

fn ecdsa_identity_from(scalar: [u8; 32], serial: u8) -> Identity {
    Identity {
        cert: certificate(&p256_spki(&scalar), serial),
        key: PrivateKey::ecdsa_p256(&scalar),
        rsa: None,
    }
}

pub fn ecdsa_identity() -> &'static Identity {
    static ECDSA: OnceLock<Identity> = OnceLock::new();
    ECDSA.get_or_init(|| ecdsa_identity_from([0x17; 32], 2))
}

/// A second ECDSA identity, used as a client certificate.
pub fn client_identity() -> &'static Identity {
    static CLIENT: OnceLock<Identity> = OnceLock::new();
    CLIENT.get_or_init(|| ecdsa_identity_from([0x29; 32], 3))
}

// ----------------------------------------------------------------------
// Client configuration helpers
// ----------------------------------------------------------------------

pub fn client_builder() -> TlsConfigBuilder {
    TlsConfig::builder(Arc::new(NoVerification)).server_name("test.local")
}

pub fn client_config() -> Arc<TlsConfig> {
    Arc::new(client_builder().build().unwrap())
}

/// Trust validator that always answers with one verdict.
pub struct FixedVerdict(pub Result<(), milli_tls::TrustError>);

impl TrustValidator for FixedVerdict {
    fn validate(
        &self,
        _chain: &[Vec<u8>],
        _server_name: Option<&str>,
    ) -> Result<(), milli_tls::TrustError> {
        self.0
    }
}

/// Records every secret the client logs.
#[derive(Default)]
pub struct CapturedKeys(pub Mutex<Vec<(String, Vec<u8>, Vec<u8>)>>);

impl KeyLog for CapturedKeys {
    fn log(&self, label: &str, client_random: &[u8], secret: &[u8]) {
        self.0
            .lock()
            .unwrap()
            .push((label.to_string(), client_random.to_vec(), secret.to_vec()));
    }
}

// ----------------------------------------------------------------------
// Server
// ----------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKey {
    Rsa,
    Ecdsa,
}

#[derive(Clone)]
pub struct ServerOptions {
    pub version: ProtocolVersion,
    /// Pick this suite whether or not the client offered it.
    pub suite: Option<CipherSuite>,
    pub key: ServerKey,
    pub request_client_cert: bool,
    /// Flip a bit in the server's Finished.
    pub corrupt_finished: bool,
    /// Appended to the ServerHello extensions.
    pub extra_extensions: Vec<Extension>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            version: ProtocolVersion::Tls12,
            suite: None,
            key: ServerKey::Rsa,
            request_client_cert: false,
            corrupt_finished: false,
            extra_extensions: Vec::new(),
        }
    }
}

impl ServerOptions {
    pub fn for_suite(suite: CipherSuite, version: ProtocolVersion) -> Self {
        let key = match suite.params().signature {
            milli_tls::crypto::SignatureAlgorithm::Rsa => ServerKey::Rsa,
            _ => ServerKey::Ecdsa,
        };
        Self {
            version,
            suite: Some(suite),
            key,
            ..Self::default()
        }
    }
}

pub struct FakeServer {
    opts: ServerOptions,
    provider: Arc<dyn CryptoProvider>,
    rng: Arc<dyn Rng>,
    identity: &'static Identity,

    recv: Vec<u8>,
    handshake_buf: Vec<u8>,
    out: Vec<u8>,
    read: Option<RecordProtection>,
    write: Option<RecordProtection>,
    pending_read: Option<DirectionKeys>,
    pending_write: Option<DirectionKeys>,

    transcript: TranscriptHash,
    suite: Option<CipherSuite>,
    client_random: [u8; 32],
    server_random: [u8; 32],
    kx: Option<Box<dyn KeyExchange>>,
    master: Option<MasterSecret>,
    client_chain: Vec<Vec<u8>>,

    pub client_hello: Option<ClientHello>,
    /// Handshake message types received from the client, in order.
    pub received_messages: Vec<HandshakeType>,
    pub client_finished_ok: bool,
    pub client_cert_verified: bool,
    pub established: bool,
    pub app_data: Vec<u8>,
    pub alerts: Vec<Alert>,
    pub master_secret: Option<[u8; 48]>,
}

impl FakeServer {
    pub fn new(opts: ServerOptions) -> Self {
        let identity = match opts.key {
            ServerKey::Rsa => rsa_identity(),
            ServerKey::Ecdsa => ecdsa_identity(),
        };
        Self {
            opts,
            provider: Arc::new(RustCryptoProvider),
            rng: Arc::new(OsRng),
            identity,
            recv: Vec::new(),
            handshake_buf: Vec::new(),
            out: Vec::new(),
            read: None,
            write: None,
            pending_read: None,
            pending_write: None,
            transcript: TranscriptHash::new(),
            suite: None,
            client_random: [0; 32],
            server_random: [0; 32],
            kx: None,
            master: None,
            client_chain: Vec::new(),
            client_hello: None,
            received_messages: Vec::new(),
            client_finished_ok: false,
            client_cert_verified: false,
            established: false,
            app_data: Vec::new(),
            alerts: Vec::new(),
            master_secret: None,
        }
    }

    pub fn certificate(&self) -> &[u8] {
        &self.identity.cert
    }

    pub fn suite(&self) -> Option<CipherSuite> {
        self.suite
    }

    /// Bytes the server has written since the last call.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out)
    }

    pub fn last_alert(&self) -> Option<Alert> {
        self.alerts.last().copied()
    }

    fn record_version(&self) -> u16 {
        self.opts.version.to_u16()
    }

    pub fn send_record(&mut self, ct: ContentType, payload: &[u8]) {
        for chunk in payload.chunks(16384) {
            match self.write.as_mut() {
                Some(protection) => protection.seal(ct, chunk, &mut self.out).unwrap(),
                None => encode_plaintext(ct, self.record_version(), chunk, &mut self.out).unwrap(),
            }
        }
    }

    pub fn send_app_data(&mut self, data: &[u8]) {
        self.send_record(ContentType::ApplicationData, data);
    }

    pub fn send_alert(&mut self, alert: Alert) {
        self.send_record(ContentType::Alert, &alert.encode());
    }

    pub fn send_close_notify(&mut self) {
        self.send_alert(Alert::close_notify());
    }

    pub fn send_hello_request(&mut self) {
        let msg = messages::encode_empty(HandshakeType::HelloRequest);
        self.send_record(ContentType::Handshake, &msg);
    }

    /// Raw bytes, unframed.
    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
    }

    fn send_handshake(&mut self, msg: Vec<u8>) {
        self.transcript.update(&msg);
        self.send_record(ContentType::Handshake, &msg);
    }

    /// Consume client bytes.
    pub fn feed(&mut self, data: &[u8]) {
        self.recv.extend_from_slice(data);
        loop {
            if self.recv.len() < RECORD_HEADER_LEN {
                return;
            }
            let header = RecordHeader::decode(&self.recv).unwrap();
            let total = RECORD_HEADER_LEN + header.length as usize;
            if self.recv.len() < total {
                return;
            }
            let mut fragment: Vec<u8> = self.recv.drain(..total).skip(RECORD_HEADER_LEN).collect();
            let payload = match self.read.as_mut() {
                Some(protection) => {
                    let range = protection.open(header.content_type, &mut fragment).unwrap();
                    fragment[range].to_vec()
                }
                None => fragment,
            };
            self.on_record(header.content_type, payload);
        }
    }

    fn on_record(&mut self, ct: ContentType, payload: Vec<u8>) {
        match ct {
            ContentType::Handshake => {
                self.handshake_buf.extend_from_slice(&payload);
                while let Ok((_, len)) = read_handshake_header(&self.handshake_buf) {
                    let total = HANDSHAKE_HEADER_LEN + len;
                    if self.handshake_buf.len() < total {
                        break;
                    }
                    let msg: Vec<u8> = self.handshake_buf.drain(..total).collect();
                    self.on_handshake(&msg);
                }
            }
            ContentType::ChangeCipherSpec => {
                assert_eq!(payload, [1]);
                let keys = self.pending_read.take().expect("client CCS before keys");
                self.read = Some(
                    RecordProtection::new(self.provider.clone(), self.rng.clone(), keys).unwrap(),
                );
            }
            ContentType::Alert => self.alerts.push(Alert::decode(&payload).unwrap()),
            ContentType::ApplicationData => self.app_data.extend_from_slice(&payload),
        }
    }

    fn on_handshake(&mut self, msg: &[u8]) {
        let typ = HandshakeType::from_u8(msg[0]).unwrap();
        let body = &msg[HANDSHAKE_HEADER_LEN..];
        self.received_messages.push(typ);
        match typ {
            HandshakeType::ClientHello => {
                self.transcript.update(msg);
                self.on_client_hello(ClientHello::decode(body).unwrap());
            }
            HandshakeType::Certificate => {
                self.transcript.update(msg);
                self.client_chain = Certificate::decode(body).unwrap().chain;
            }
            HandshakeType::ClientKeyExchange => {
                self.transcript.update(msg);
                self.on_client_key_exchange(body);
            }
            HandshakeType::CertificateVerify => {
                let signed = self.transcript.messages().unwrap().to_vec();
                self.transcript.update(msg);
                self.on_certificate_verify(body, &signed);
            }
            HandshakeType::Finished => {
                self.on_client_finished(body);
                self.transcript.update(msg);
                self.send_server_finished();
            }
            other => panic!("unexpected client message {:?}", other),
        }
    }

    fn choose_suite(&self, hello: &ClientHello) -> CipherSuite {
        if let Some(suite) = self.opts.suite {
            return suite;
        }
        let wanted = match self.opts.key {
            ServerKey::Rsa => milli_tls::crypto::SignatureAlgorithm::Rsa,
            ServerKey::Ecdsa => milli_tls::crypto::SignatureAlgorithm::Ecdsa,
        };
        hello
            .cipher_suites
            .iter()
            .filter_map(|code| CipherSuite::from_u16(*code))
            .find(|s| s.usable_with(self.opts.version) && s.params().signature == wanted)
            .expect("no common suite")
    }

    fn on_client_hello(&mut self, hello: ClientHello) {
        let version = self.opts.version;
        let suite = self.choose_suite(&hello);
        self.suite = Some(suite);
        self.client_random = hello.random;
        self.rng.fill(&mut self.server_random);

        let mut extensions = vec![Extension::RenegotiationInfo(Vec::new())];
        let mut client_curves = Vec::new();
        for ext in &hello.extensions {
            match ext {
                Extension::ServerName(_) => extensions.push(Extension::ServerName(String::new())),
                Extension::SupportedGroups(curves) => client_curves = curves.clone(),
                _ => {}
            }
        }
        let ecdhe = suite.params().key_exchange == KeyExchangeAlgorithm::Ecdhe;
        if ecdhe {
            extensions.push(Extension::EcPointFormats(vec![POINT_FORMAT_UNCOMPRESSED]));
        }
        extensions.extend(self.opts.extra_extensions.iter().cloned());

        let server_hello = ServerHello {
            version: version.to_u16(),
            random: self.server_random,
            session_id: vec![0xaa; 32],
            cipher_suite: suite.to_u16(),
            compression_method: 0,
            extensions,
        };
        self.client_hello = Some(hello);
        self.send_handshake(server_hello.encode().unwrap());

        let chain = vec![self.identity.cert.clone()];
        self.send_handshake(Certificate { chain }.encode().unwrap());

        if ecdhe {
            let curve = client_curves.first().copied().unwrap_or(NamedCurve::Secp256r1);
            let kx = self.provider.key_exchange(curve, &*self.rng).unwrap();
            let mut ske = EcdheServerKeyExchange {
                curve: curve.to_u16(),
                public_key: kx.public_key().to_vec(),
                signed: DigitallySigned {
                    scheme: None,
                    signature: Vec::new(),
                },
            };
            let scheme = self.signing_scheme();
            let signed = ske
                .signed_message(&self.client_random, &self.server_random)
                .unwrap();
            ske.signed.scheme = scheme.to_u16().filter(|_| version >= ProtocolVersion::Tls12);
            ske.signed.signature = self
                .provider
                .sign(scheme, &self.identity.key, &*self.rng, &signed)
                .unwrap();
            self.kx = Some(kx);
            self.send_handshake(ske.encode().unwrap());
        }

        if self.opts.request_client_cert {
            let signature_schemes = if version >= ProtocolVersion::Tls12 {
                vec![0x0403, 0x0401]
            } else {
                Vec::new()
            };
            let req = CertificateRequest {
                certificate_types: vec![CERT_TYPE_RSA_SIGN, CERT_TYPE_ECDSA_SIGN],
                signature_schemes,
                authorities: Vec::new(),
            };
            self.send_handshake(req.encode(version).unwrap());
        }

        self.send_handshake(messages::encode_empty(HandshakeType::ServerHelloDone));
    }

    fn signing_scheme(&self) -> SignatureScheme {
        let tls12 = self.opts.version >= ProtocolVersion::Tls12;
        match (self.opts.key, tls12) {
            (ServerKey::Rsa, true) => SignatureScheme::RsaPkcs1Sha256,
            (ServerKey::Rsa, false) => SignatureScheme::LegacyRsaMd5Sha1,
            (ServerKey::Ecdsa, true) => SignatureScheme::EcdsaSecp256r1Sha256,
            (ServerKey::Ecdsa, false) => SignatureScheme::EcdsaSha1,
        }
    }

    fn on_client_key_exchange(&mut self, body: &[u8]) {
        let suite = self.suite.unwrap();
        let version = self.opts.version;
        let ecdhe = suite.params().key_exchange == KeyExchangeAlgorithm::Ecdhe;
        let pre_master_secret = match ClientKeyExchange::decode(body, ecdhe).unwrap() {
            ClientKeyExchange::Rsa(ct) => {
                let key = self.identity.rsa.as_ref().unwrap();
                let pms = key.decrypt(rsa::Pkcs1v15Encrypt, &ct).unwrap();
                assert_eq!(pms.len(), 48);
                Zeroizing::new(pms)
            }
            ClientKeyExchange::Ecdhe(point) => self.kx.take().unwrap().complete(&point).unwrap(),
        };
        let master = MasterSecret::derive(
            &*self.provider,
            version,
            suite,
            pre_master_secret,
            &self.client_random,
            &self.server_random,
        )
        .unwrap();
        let keys = master
            .key_block(
                &*self.provider,
                version,
                suite,
                &self.client_random,
                &self.server_random,
            )
            .unwrap();
        self.master_secret = Some(*master.as_bytes());
        self.pending_read = Some(keys.client.clone());
        self.pending_write = Some(keys.server.clone());
        self.master = Some(master);
    }

    fn on_certificate_verify(&mut self, body: &[u8], signed: &[u8]) {
        let version = self.opts.version;
        let verify = CertificateVerify::decode(body, version).unwrap();
        let leaf = self.client_chain.first().expect("CertificateVerify without certificate");
        let spki = x509::subject_public_key_info(leaf).unwrap();
        let scheme = match verify.signed.scheme {
            Some(code) => SignatureScheme::from_u16(code).unwrap(),
            None => match spki.kind().unwrap().algorithm() {
                milli_tls::crypto::SignatureAlgorithm::Rsa => SignatureScheme::LegacyRsaMd5Sha1,
                _ => SignatureScheme::EcdsaSha1,
            },
        };
        self.client_cert_verified = self
            .provider
            .verify(scheme, &spki, signed, &verify.signed.signature)
            .is_ok();
    }

    fn on_client_finished(&mut self, body: &[u8]) {
        let suite = self.suite.unwrap();
        let version = self.opts.version;
        let finished = Finished::decode(body).unwrap();
        let expected = self
            .master
            .as_ref()
            .unwrap()
            .verify_data(
                &*self.provider,
                version,
                suite,
                FinishedLabel::Client,
                &self.transcript.finished_hash(version, suite.params().prf_hash),
            )
            .unwrap();
        self.client_finished_ok = finished.verify_data == expected;
    }

    fn send_server_finished(&mut self) {
        let suite = self.suite.unwrap();
        let version = self.opts.version;
        let mut verify_data = self
            .master
            .as_ref()
            .unwrap()
            .verify_data(
                &*self.provider,
                version,
                suite,
                FinishedLabel::Server,
                &self.transcript.finished_hash(version, suite.params().prf_hash),
            )
            .unwrap();
        if self.opts.corrupt_finished {
            verify_data[0] ^= 0x01;
        }

        self.send_record(ContentType::ChangeCipherSpec, &[1]);
        let keys = self.pending_write.take().unwrap();
        self.write =
            Some(RecordProtection::new(self.provider.clone(), self.rng.clone(), keys).unwrap());
        self.send_handshake(Finished { verify_data }.encode().unwrap());
        self.established = true;
    }
}

// ----------------------------------------------------------------------
// Driving both sides in memory
// ----------------------------------------------------------------------

/// Shuttle bytes between client and server until neither has anything to
/// say. A client failure is returned after its alert reaches the server.
pub fn pump(client: &mut TlsConnection, server: &mut FakeServer) -> Result<(), Error> {
    let mut buf = vec![0u8; 32 * 1024];
    loop {
        let mut progressed = false;
        while let Some(chunk) = client.poll_output(&mut buf) {
            server.feed(chunk);
            progressed = true;
        }
        let out = server.take_output();
        if !out.is_empty() {
            progressed = true;
            if let Err(err) = client.feed_data(&out) {
                while let Some(chunk) = client.poll_output(&mut buf) {
                    server.feed(chunk);
                }
                return Err(err);
            }
        }
        if !progressed {
            return Ok(());
        }
    }
}

/// A client connection and server that have completed the handshake.
pub fn established(
    config: Arc<TlsConfig>,
    opts: ServerOptions,
) -> (TlsConnection, FakeServer) {
    let mut client = TlsConnection::new_client(config).unwrap();
    let mut server = FakeServer::new(opts);
    pump(&mut client, &mut server).unwrap();
    assert!(client.is_active());
    assert!(server.established);
    (client, server)
}
