//! TLS 1.0-1.2 handshake message encoding and decoding.
//!
//! Handshake message format:
//!   HandshakeType (1 byte)
//!   Length (3 bytes, big-endian)
//!   Body (Length bytes)
//!
//! Every `encode` returns the complete message, header included, which is
//! exactly what goes into the transcript. Every `decode` takes the body only.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::Error;
use crate::tls::alert::AlertDescription;
use crate::tls::codec::{
    put_u16, put_u8, put_vec_u16, put_vec_u24, put_vec_u8, with_length_prefix, Reader,
};
use crate::tls::extensions::{decode_extensions, encode_extensions, Extension};
use crate::tls::key_schedule::VERIFY_DATA_LEN;
use crate::tls::ProtocolVersion;

pub const HANDSHAKE_HEADER_LEN: usize = 4;

/// Largest handshake message we are willing to reassemble.
pub const MAX_HANDSHAKE_MESSAGE_LEN: usize = 256 * 1024;

/// `ECCurveType.named_curve` (RFC 8422 section 5.4).
const CURVE_TYPE_NAMED: u8 = 3;

/// TLS handshake message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandshakeType {
    HelloRequest = 0,
    ClientHello = 1,
    ServerHello = 2,
    Certificate = 11,
    ServerKeyExchange = 12,
    CertificateRequest = 13,
    ServerHelloDone = 14,
    CertificateVerify = 15,
    ClientKeyExchange = 16,
    Finished = 20,
}

impl HandshakeType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::HelloRequest),
            1 => Some(Self::ClientHello),
            2 => Some(Self::ServerHello),
            11 => Some(Self::Certificate),
            12 => Some(Self::ServerKeyExchange),
            13 => Some(Self::CertificateRequest),
            14 => Some(Self::ServerHelloDone),
            15 => Some(Self::CertificateVerify),
            16 => Some(Self::ClientKeyExchange),
            20 => Some(Self::Finished),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Read the handshake header: returns (type_byte, body_length).
pub fn read_handshake_header(data: &[u8]) -> Result<(u8, usize), Error> {
    let mut r = Reader::new(data);
    let msg_type = r.u8()?;
    let length = r.u24()?;
    Ok((msg_type, length))
}

/// Build a complete handshake message around the body `f` writes.
fn handshake_message<F>(msg_type: HandshakeType, f: F) -> Result<Vec<u8>, Error>
where
    F: FnOnce(&mut Vec<u8>) -> Result<(), Error>,
{
    let mut out = vec![msg_type.to_u8()];
    with_length_prefix(&mut out, 3, f)?;
    Ok(out)
}

fn read_session_id<'a>(r: &mut Reader<'a>) -> Result<&'a [u8], Error> {
    let id = r.vec_u8()?;
    if id.len() > 32 {
        return Err(Error::decode());
    }
    Ok(id)
}

/// Extensions are optional on the wire: absent means none.
fn read_optional_extensions(r: &mut Reader<'_>) -> Result<Vec<Extension>, Error> {
    if r.is_empty() {
        return Ok(Vec::new());
    }
    let exts = decode_extensions(r.vec_u16()?)?;
    r.finish()?;
    Ok(exts)
}

/// ClientHello (RFC 5246 section 7.4.1.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    /// Highest version the client supports, as a raw code.
    pub version: u16,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suites: Vec<u16>,
    pub compression_methods: Vec<u8>,
    pub extensions: Vec<Extension>,
}

impl ClientHello {
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        handshake_message(HandshakeType::ClientHello, |out| {
            put_u16(out, self.version);
            out.extend_from_slice(&self.random);
            put_vec_u8(out, &self.session_id)?;
            with_length_prefix(out, 2, |out| {
                for suite in &self.cipher_suites {
                    put_u16(out, *suite);
                }
                Ok(())
            })?;
            put_vec_u8(out, &self.compression_methods)?;
            if !self.extensions.is_empty() {
                encode_extensions(&self.extensions, out)?;
            }
            Ok(())
        })
    }

    pub fn decode(body: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(body);
        let version = r.u16()?;
        let random = r.array::<32>()?;
        let session_id = read_session_id(&mut r)?.to_vec();
        let cipher_suites = r.u16_list()?;
        let compression_methods = r.vec_u8()?.to_vec();
        if cipher_suites.is_empty() || compression_methods.is_empty() {
            return Err(Error::decode());
        }
        let extensions = read_optional_extensions(&mut r)?;
        Ok(Self {
            version,
            random,
            session_id,
            cipher_suites,
            compression_methods,
            extensions,
        })
    }
}

/// ServerHello (RFC 5246 section 7.4.1.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    /// Version chosen by the server, as a raw code so that an unsupported
    /// choice surfaces as `protocol_version` rather than `decode_error`.
    pub version: u16,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suite: u16,
    pub compression_method: u8,
    pub extensions: Vec<Extension>,
}

impl ServerHello {
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        handshake_message(HandshakeType::ServerHello, |out| {
            put_u16(out, self.version);
            out.extend_from_slice(&self.random);
            put_vec_u8(out, &self.session_id)?;
            put_u16(out, self.cipher_suite);
            put_u8(out, self.compression_method);
            if !self.extensions.is_empty() {
                encode_extensions(&self.extensions, out)?;
            }
            Ok(())
        })
    }

    pub fn decode(body: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(body);
        let version = r.u16()?;
        let random = r.array::<32>()?;
        let session_id = read_session_id(&mut r)?.to_vec();
        let cipher_suite = r.u16()?;
        let compression_method = r.u8()?;
        let extensions = read_optional_extensions(&mut r)?;
        Ok(Self {
            version,
            random,
            session_id,
            cipher_suite,
            compression_method,
            extensions,
        })
    }
}

/// Certificate (RFC 5246 section 7.4.2): a list of DER certificates, leaf
/// first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Certificate {
    pub chain: Vec<Vec<u8>>,
}

impl Certificate {
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        handshake_message(HandshakeType::Certificate, |out| {
            with_length_prefix(out, 3, |out| {
                for cert in &self.chain {
                    put_vec_u24(out, cert)?;
                }
                Ok(())
            })
        })
    }

    pub fn decode(body: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(body);
        let mut list = Reader::new(r.vec_u24()?);
        r.finish()?;
        let mut chain = Vec::new();
        while !list.is_empty() {
            let cert = list.vec_u24()?;
            if cert.is_empty() {
                return Err(Error::decode());
            }
            chain.push(cert.to_vec());
        }
        Ok(Self { chain })
    }
}

/// A signature, preceded in TLS 1.2 by its SignatureAndHashAlgorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitallySigned {
    /// Raw scheme code; present exactly when the version is TLS 1.2.
    pub scheme: Option<u16>,
    pub signature: Vec<u8>,
}

impl DigitallySigned {
    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        if let Some(scheme) = self.scheme {
            put_u16(out, scheme);
        }
        put_vec_u16(out, &self.signature)
    }

    fn read(r: &mut Reader<'_>, version: ProtocolVersion) -> Result<Self, Error> {
        let scheme = if version >= ProtocolVersion::Tls12 {
            Some(r.u16()?)
        } else {
            None
        };
        let signature = r.vec_u16()?.to_vec();
        Ok(Self { scheme, signature })
    }
}

/// ServerKeyExchange for ECDHE suites (RFC 8422 section 5.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcdheServerKeyExchange {
    /// Raw named curve code.
    pub curve: u16,
    /// Server's ephemeral public point.
    pub public_key: Vec<u8>,
    pub signed: DigitallySigned,
}

impl EcdheServerKeyExchange {
    /// The `ServerECDHParams` bytes the signature covers, after the two
    /// hello randoms: curve_type ‖ named_curve ‖ point length ‖ point.
    pub fn params(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::with_capacity(4 + self.public_key.len());
        put_u8(&mut out, CURVE_TYPE_NAMED);
        put_u16(&mut out, self.curve);
        put_vec_u8(&mut out, &self.public_key)?;
        Ok(out)
    }

    /// client_random ‖ server_random ‖ params.
    pub fn signed_message(
        &self,
        client_random: &[u8; 32],
        server_random: &[u8; 32],
    ) -> Result<Vec<u8>, Error> {
        let mut out = Vec::with_capacity(64 + 4 + self.public_key.len());
        out.extend_from_slice(client_random);
        out.extend_from_slice(server_random);
        out.extend_from_slice(&self.params()?);
        Ok(out)
    }

    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        handshake_message(HandshakeType::ServerKeyExchange, |out| {
            out.extend_from_slice(&self.params()?);
            self.signed.encode_into(out)
        })
    }

    /// Explicit-curve parameters are refused with `handshake_failure`.
    pub fn decode(body: &[u8], version: ProtocolVersion) -> Result<Self, Error> {
        let mut r = Reader::new(body);
        if r.u8()? != CURVE_TYPE_NAMED {
            return Err(Error::Alert(AlertDescription::HandshakeFailure));
        }
        let curve = r.u16()?;
        let public_key = r.vec_u8()?.to_vec();
        if public_key.is_empty() {
            return Err(Error::decode());
        }
        let signed = DigitallySigned::read(&mut r, version)?;
        r.finish()?;
        Ok(Self {
            curve,
            public_key,
            signed,
        })
    }
}

/// `ClientCertificateType` codes (RFC 5246 section 7.4.4, RFC 8422).
pub const CERT_TYPE_RSA_SIGN: u8 = 1;
pub const CERT_TYPE_ECDSA_SIGN: u8 = 64;

/// CertificateRequest (RFC 5246 section 7.4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub certificate_types: Vec<u8>,
    /// Raw scheme codes; always empty before TLS 1.2.
    pub signature_schemes: Vec<u16>,
    /// DER distinguished names of acceptable authorities.
    pub authorities: Vec<Vec<u8>>,
}

impl CertificateRequest {
    pub fn encode(&self, version: ProtocolVersion) -> Result<Vec<u8>, Error> {
        handshake_message(HandshakeType::CertificateRequest, |out| {
            put_vec_u8(out, &self.certificate_types)?;
            if version >= ProtocolVersion::Tls12 {
                with_length_prefix(out, 2, |out| {
                    for s in &self.signature_schemes {
                        put_u16(out, *s);
                    }
                    Ok(())
                })?;
            }
            with_length_prefix(out, 2, |out| {
                for dn in &self.authorities {
                    put_vec_u16(out, dn)?;
                }
                Ok(())
            })
        })
    }

    pub fn decode(body: &[u8], version: ProtocolVersion) -> Result<Self, Error> {
        let mut r = Reader::new(body);
        let certificate_types = r.vec_u8()?.to_vec();
        if certificate_types.is_empty() {
            return Err(Error::decode());
        }
        let signature_schemes = if version >= ProtocolVersion::Tls12 {
            let s = r.u16_list()?;
            if s.is_empty() {
                return Err(Error::decode());
            }
            s
        } else {
            Vec::new()
        };
        let mut names = Reader::new(r.vec_u16()?);
        r.finish()?;
        let mut authorities = Vec::new();
        while !names.is_empty() {
            authorities.push(names.vec_u16()?.to_vec());
        }
        Ok(Self {
            certificate_types,
            signature_schemes,
            authorities,
        })
    }
}

/// ServerHelloDone and HelloRequest both have empty bodies.
pub fn encode_empty(msg_type: HandshakeType) -> Vec<u8> {
    vec![msg_type.to_u8(), 0, 0, 0]
}

/// Reject anything but an empty body.
pub fn decode_empty(body: &[u8]) -> Result<(), Error> {
    Reader::new(body).finish()
}

/// ClientKeyExchange (RFC 5246 section 7.4.7, RFC 8422 section 5.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientKeyExchange {
    /// RSA-encrypted pre-master secret, 2-byte length prefix.
    Rsa(Vec<u8>),
    /// Client's ephemeral public point, 1-byte length prefix.
    Ecdhe(Vec<u8>),
}

impl ClientKeyExchange {
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        handshake_message(HandshakeType::ClientKeyExchange, |out| match self {
            Self::Rsa(ct) => put_vec_u16(out, ct),
            Self::Ecdhe(point) => put_vec_u8(out, point),
        })
    }

    /// The wire format depends on the negotiated key exchange.
    pub fn decode(body: &[u8], ecdhe: bool) -> Result<Self, Error> {
        let mut r = Reader::new(body);
        let msg = if ecdhe {
            Self::Ecdhe(r.vec_u8()?.to_vec())
        } else {
            Self::Rsa(r.vec_u16()?.to_vec())
        };
        r.finish()?;
        Ok(msg)
    }
}

/// CertificateVerify (RFC 5246 section 7.4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateVerify {
    pub signed: DigitallySigned,
}

impl CertificateVerify {
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        handshake_message(HandshakeType::CertificateVerify, |out| {
            self.signed.encode_into(out)
        })
    }

    pub fn decode(body: &[u8], version: ProtocolVersion) -> Result<Self, Error> {
        let mut r = Reader::new(body);
        let signed = DigitallySigned::read(&mut r, version)?;
        r.finish()?;
        Ok(Self { signed })
    }
}

/// Finished (RFC 5246 section 7.4.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub verify_data: [u8; VERIFY_DATA_LEN],
}

impl Finished {
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        handshake_message(HandshakeType::Finished, |out| {
            out.extend_from_slice(&self.verify_data);
            Ok(())
        })
    }

    pub fn decode(body: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(body);
        let verify_data = r.array::<VERIFY_DATA_LEN>()?;
        r.finish()?;
        Ok(Self { verify_data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{NamedCurve, SignatureScheme};
    use alloc::string::String;

    /// Split an encoded message into (type, body), checking the header.
    fn split(msg: &[u8]) -> (u8, &[u8]) {
        let (typ, len) = read_handshake_header(msg).unwrap();
        assert_eq!(len + HANDSHAKE_HEADER_LEN, msg.len());
        (typ, &msg[HANDSHAKE_HEADER_LEN..])
    }

    fn client_hello() -> ClientHello {
        ClientHello {
            version: 0x0303,
            random: [0x42; 32],
            session_id: Vec::new(),
            cipher_suites: vec![0xc02b, 0xc02f, 0x002f],
            compression_methods: vec![0],
            extensions: vec![
                Extension::ServerName(String::from("example.com")),
                Extension::SupportedGroups(vec![NamedCurve::X25519, NamedCurve::Secp256r1]),
                Extension::EcPointFormats(vec![0]),
                Extension::SignatureAlgorithms(vec![SignatureScheme::RsaPkcs1Sha256]),
                Extension::RenegotiationInfo(Vec::new()),
            ],
        }
    }

    #[test]
    fn handshake_type_roundtrip() {
        for v in 0..=255u8 {
            if let Some(t) = HandshakeType::from_u8(v) {
                assert_eq!(t.to_u8(), v);
            }
        }
        assert_eq!(HandshakeType::from_u8(8), None);
        assert_eq!(HandshakeType::from_u8(99), None);
    }

    #[test]
    fn encode_parse_client_hello() {
        let hello = client_hello();
        let msg = hello.encode().unwrap();
        let (typ, body) = split(&msg);
        assert_eq!(typ, HandshakeType::ClientHello.to_u8());

        // version, random, empty session id, 3 suites
        assert_eq!(&body[..2], &[0x03, 0x03]);
        assert_eq!(&body[2..34], &[0x42; 32]);
        assert_eq!(body[34], 0);
        assert_eq!(&body[35..43], &[0x00, 0x06, 0xc0, 0x2b, 0xc0, 0x2f, 0x00, 0x2f]);
        assert_eq!(&body[43..45], &[1, 0]);

        assert_eq!(ClientHello::decode(body).unwrap(), hello);
    }

    #[test]
    fn client_hello_without_extensions() {
        let mut hello = client_hello();
        hello.extensions.clear();
        let msg = hello.encode().unwrap();
        let (_, body) = split(&msg);
        assert_eq!(body.len(), 2 + 32 + 1 + 8 + 2);
        assert_eq!(ClientHello::decode(body).unwrap(), hello);
    }

    #[test]
    fn client_hello_with_session_id() {
        let mut hello = client_hello();
        hello.session_id = vec![7; 32];
        let msg = hello.encode().unwrap();
        assert_eq!(ClientHello::decode(split(&msg).1).unwrap(), hello);
    }

    #[test]
    fn encode_parse_server_hello() {
        let hello = ServerHello {
            version: 0x0303,
            random: [0x11; 32],
            session_id: vec![1, 2, 3],
            cipher_suite: 0xc030,
            compression_method: 0,
            extensions: vec![
                Extension::RenegotiationInfo(Vec::new()),
                Extension::EcPointFormats(vec![0]),
            ],
        };
        let msg = hello.encode().unwrap();
        let (typ, body) = split(&msg);
        assert_eq!(typ, 2);
        assert_eq!(ServerHello::decode(body).unwrap(), hello);
    }

    #[test]
    fn parse_server_hello_truncated() {
        let hello = ServerHello {
            version: 0x0303,
            random: [0; 32],
            session_id: Vec::new(),
            cipher_suite: 0x002f,
            compression_method: 0,
            extensions: Vec::new(),
        };
        let msg = hello.encode().unwrap();
        let body = split(&msg).1;
        for cut in 0..body.len() {
            assert_eq!(ServerHello::decode(&body[..cut]), Err(Error::decode()));
        }
    }

    #[test]
    fn session_id_too_long() {
        let mut body = vec![3, 3];
        body.extend_from_slice(&[0; 32]);
        body.push(33);
        body.extend_from_slice(&[0; 33]);
        body.extend_from_slice(&[0x00, 0x2f, 0]);
        assert_eq!(ServerHello::decode(&body), Err(Error::decode()));
    }

    #[test]
    fn encode_parse_certificate_roundtrip() {
        for n in [0usize, 1, 3] {
            let cert = Certificate {
                chain: (0..n).map(|i| vec![i as u8 + 1; 100 + i]).collect(),
            };
            let msg = cert.encode().unwrap();
            let (typ, body) = split(&msg);
            assert_eq!(typ, 11);
            assert_eq!(Certificate::decode(body).unwrap(), cert);
        }
    }

    #[test]
    fn certificate_inner_length_mismatch() {
        // Outer list says 5 bytes, inner entry claims 4 but only 2 follow.
        let body = [0, 0, 5, 0, 0, 4, 0xaa, 0xbb];
        assert_eq!(Certificate::decode(&body), Err(Error::decode()));
        // Trailing data after the list.
        let body = [0, 0, 0, 0xff];
        assert_eq!(Certificate::decode(&body), Err(Error::decode()));
    }

    #[test]
    fn server_key_exchange_roundtrip_both_versions() {
        let ske = EcdheServerKeyExchange {
            curve: NamedCurve::X25519.to_u16(),
            public_key: vec![9; 32],
            signed: DigitallySigned {
                scheme: Some(0x0403),
                signature: vec![0x30; 70],
            },
        };
        let msg = ske.encode().unwrap();
        let (typ, body) = split(&msg);
        assert_eq!(typ, 12);
        assert_eq!(&body[..4], &[3, 0x00, 0x1d, 32]);
        assert_eq!(
            EcdheServerKeyExchange::decode(body, ProtocolVersion::Tls12).unwrap(),
            ske
        );

        let legacy = EcdheServerKeyExchange {
            signed: DigitallySigned {
                scheme: None,
                signature: vec![1; 128],
            },
            ..ske
        };
        let msg = legacy.encode().unwrap();
        assert_eq!(
            EcdheServerKeyExchange::decode(split(&msg).1, ProtocolVersion::Tls11).unwrap(),
            legacy
        );
    }

    #[test]
    fn server_key_exchange_signed_message_layout() {
        let ske = EcdheServerKeyExchange {
            curve: 0x0017,
            public_key: vec![4, 5, 6],
            signed: DigitallySigned {
                scheme: None,
                signature: Vec::new(),
            },
        };
        let m = ske.signed_message(&[1; 32], &[2; 32]).unwrap();
        assert_eq!(&m[..32], &[1; 32]);
        assert_eq!(&m[32..64], &[2; 32]);
        assert_eq!(&m[64..], &[3, 0x00, 0x17, 3, 4, 5, 6]);
    }

    #[test]
    fn explicit_curves_rejected() {
        let body = [1, 0, 0];
        assert_eq!(
            EcdheServerKeyExchange::decode(&body, ProtocolVersion::Tls12),
            Err(Error::Alert(AlertDescription::HandshakeFailure))
        );
    }

    #[test]
    fn certificate_request_roundtrip() {
        let req = CertificateRequest {
            certificate_types: vec![CERT_TYPE_RSA_SIGN, CERT_TYPE_ECDSA_SIGN],
            signature_schemes: vec![0x0401, 0x0403],
            authorities: vec![vec![0x30, 0x00], vec![0x30, 0x03, 1, 2, 3]],
        };
        let msg = req.encode(ProtocolVersion::Tls12).unwrap();
        let (typ, body) = split(&msg);
        assert_eq!(typ, 13);
        assert_eq!(
            CertificateRequest::decode(body, ProtocolVersion::Tls12).unwrap(),
            req
        );

        let legacy = CertificateRequest {
            signature_schemes: Vec::new(),
            ..req
        };
        let msg = legacy.encode(ProtocolVersion::Tls10).unwrap();
        assert_eq!(
            CertificateRequest::decode(split(&msg).1, ProtocolVersion::Tls10).unwrap(),
            legacy
        );
    }

    #[test]
    fn server_hello_done_must_be_empty() {
        let msg = encode_empty(HandshakeType::ServerHelloDone);
        assert_eq!(msg, [14, 0, 0, 0]);
        assert!(decode_empty(split(&msg).1).is_ok());
        assert_eq!(decode_empty(&[0]), Err(Error::decode()));
    }

    #[test]
    fn client_key_exchange_formats() {
        let rsa = ClientKeyExchange::Rsa(vec![0xab; 128]);
        let msg = rsa.encode().unwrap();
        let body = split(&msg).1;
        assert_eq!(&body[..2], &[0, 128]);
        assert_eq!(ClientKeyExchange::decode(body, false).unwrap(), rsa);

        let ec = ClientKeyExchange::Ecdhe(vec![4; 65]);
        let msg = ec.encode().unwrap();
        let body = split(&msg).1;
        assert_eq!(body[0], 65);
        assert_eq!(ClientKeyExchange::decode(body, true).unwrap(), ec);
    }

    #[test]
    fn certificate_verify_roundtrip() {
        let cv = CertificateVerify {
            signed: DigitallySigned {
                scheme: Some(0x0804),
                signature: vec![7; 256],
            },
        };
        let msg = cv.encode().unwrap();
        assert_eq!(
            CertificateVerify::decode(split(&msg).1, ProtocolVersion::Tls12).unwrap(),
            cv
        );
    }

    #[test]
    fn encode_parse_finished() {
        let fin = Finished {
            verify_data: [0x5a; 12],
        };
        let msg = fin.encode().unwrap();
        assert_eq!(msg.len(), 16);
        let (typ, body) = split(&msg);
        assert_eq!(typ, 20);
        assert_eq!(Finished::decode(body).unwrap(), fin);
    }

    #[test]
    fn parse_finished_wrong_length() {
        assert_eq!(Finished::decode(&[0; 11]), Err(Error::decode()));
        assert_eq!(Finished::decode(&[0; 13]), Err(Error::decode()));
    }

    #[test]
    fn read_handshake_header_truncated() {
        assert_eq!(read_handshake_header(&[1, 0, 0]), Err(Error::decode()));
        assert_eq!(read_handshake_header(&[2, 0, 1, 0]).unwrap(), (2, 256));
    }
}
