#![no_main]

use libfuzzer_sys::fuzz_target;
use milli_tls::tls::alert::Alert;
use milli_tls::tls::extensions::decode_extensions;
use milli_tls::tls::messages::{self, HandshakeType, HANDSHAKE_HEADER_LEN};
use milli_tls::tls::ProtocolVersion;
use milli_tls::x509;

fuzz_target!(|data: &[u8]| {
    // Parsers must reject, never panic.
    if let Ok((msg_type, body_len)) = messages::read_handshake_header(data) {
        if let Some(body) = data.get(HANDSHAKE_HEADER_LEN..HANDSHAKE_HEADER_LEN + body_len) {
            for version in [ProtocolVersion::Tls10, ProtocolVersion::Tls12] {
                match HandshakeType::from_u8(msg_type) {
                    Some(HandshakeType::ClientHello) => {
                        let _ = messages::ClientHello::decode(body);
                    }
                    Some(HandshakeType::ServerHello) => {
                        let _ = messages::ServerHello::decode(body);
                    }
                    Some(HandshakeType::Certificate) => {
                        if let Ok(cert) = messages::Certificate::decode(body) {
                            for der in &cert.chain {
                                let _ = x509::subject_public_key_info(der).map(|s| s.kind());
                            }
                        }
                    }
                    Some(HandshakeType::ServerKeyExchange) => {
                        let _ = messages::EcdheServerKeyExchange::decode(body, version);
                    }
                    Some(HandshakeType::CertificateRequest) => {
                        let _ = messages::CertificateRequest::decode(body, version);
                    }
                    Some(HandshakeType::CertificateVerify) => {
                        let _ = messages::CertificateVerify::decode(body, version);
                    }
                    Some(HandshakeType::ClientKeyExchange) => {
                        let _ = messages::ClientKeyExchange::decode(body, true);
                        let _ = messages::ClientKeyExchange::decode(body, false);
                    }
                    Some(HandshakeType::Finished) => {
                        let _ = messages::Finished::decode(body);
                    }
                    _ => {
                        let _ = messages::decode_empty(body);
                    }
                }
            }
        }
    }

    let _ = decode_extensions(data);
    let _ = Alert::decode(data);
    let _ = x509::subject_public_key_info(data);
});
