//! Hello extension encoding and decoding.
//!
//! Extension format: type (2 bytes) + length (2 bytes) + data. The extension
//! block itself is preceded by a 2-byte total length.
//!
//! Known types get typed decoders; anything else is preserved as opaque
//! bytes so a caller can log and skip it.

use alloc::string::String;
use alloc::vec::Vec;

use crate::crypto::{NamedCurve, SignatureScheme};
use crate::error::Error;
use crate::tls::codec::{put_u16, put_u8, put_vec_u16, put_vec_u8, with_length_prefix, Reader};

// Extension type codes
pub const EXT_SERVER_NAME: u16 = 0x0000;
pub const EXT_SUPPORTED_GROUPS: u16 = 0x000a;
pub const EXT_EC_POINT_FORMATS: u16 = 0x000b;
pub const EXT_SIGNATURE_ALGORITHMS: u16 = 0x000d;
pub const EXT_RENEGOTIATION_INFO: u16 = 0xff01;

const SNI_HOST_NAME: u8 = 0;

/// ECPointFormat `uncompressed`, the only one we speak.
pub const POINT_FORMAT_UNCOMPRESSED: u8 = 0;

/// A single hello extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extension {
    /// `server_name` (RFC 6066). Empty in a ServerHello acknowledgement.
    ServerName(String),
    /// `supported_groups` / `elliptic_curves` (RFC 8422). Unknown groups are
    /// dropped on decode.
    SupportedGroups(Vec<NamedCurve>),
    /// `ec_point_formats` (RFC 8422).
    EcPointFormats(Vec<u8>),
    /// `signature_algorithms` (RFC 5246). Unknown schemes are dropped on
    /// decode.
    SignatureAlgorithms(Vec<SignatureScheme>),
    /// `renegotiation_info` (RFC 5746).
    RenegotiationInfo(Vec<u8>),
    /// Anything else, kept verbatim.
    Unknown { typ: u16, data: Vec<u8> },
}

impl Extension {
    pub fn ext_type(&self) -> u16 {
        match self {
            Self::ServerName(_) => EXT_SERVER_NAME,
            Self::SupportedGroups(_) => EXT_SUPPORTED_GROUPS,
            Self::EcPointFormats(_) => EXT_EC_POINT_FORMATS,
            Self::SignatureAlgorithms(_) => EXT_SIGNATURE_ALGORITHMS,
            Self::RenegotiationInfo(_) => EXT_RENEGOTIATION_INFO,
            Self::Unknown { typ, .. } => *typ,
        }
    }

    /// Append type, length and body.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        put_u16(out, self.ext_type());
        with_length_prefix(out, 2, |out| self.encode_body(out))
    }

    fn encode_body(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        match self {
            Self::ServerName(name) if name.is_empty() => Ok(()),
            Self::ServerName(name) => with_length_prefix(out, 2, |out| {
                put_u8(out, SNI_HOST_NAME);
                put_vec_u16(out, name.as_bytes())
            }),
            Self::SupportedGroups(groups) => with_length_prefix(out, 2, |out| {
                for g in groups {
                    put_u16(out, g.to_u16());
                }
                Ok(())
            }),
            Self::EcPointFormats(formats) => put_vec_u8(out, formats),
            Self::SignatureAlgorithms(schemes) => with_length_prefix(out, 2, |out| {
                for code in schemes.iter().filter_map(|s| s.to_u16()) {
                    put_u16(out, code);
                }
                Ok(())
            }),
            Self::RenegotiationInfo(data) => put_vec_u8(out, data),
            Self::Unknown { data, .. } => {
                out.extend_from_slice(data);
                Ok(())
            }
        }
    }

    /// Decode one extension body. Malformed lists are `decode_error`.
    pub fn decode(typ: u16, data: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(data);
        let ext = match typ {
            EXT_SERVER_NAME => {
                if data.is_empty() {
                    return Ok(Self::ServerName(String::new()));
                }
                let mut list = Reader::new(r.vec_u16()?);
                let mut host = None;
                while !list.is_empty() {
                    let name_type = list.u8()?;
                    let name = list.vec_u16()?;
                    if name_type == SNI_HOST_NAME && host.is_none() {
                        let name = core::str::from_utf8(name).map_err(|_| Error::decode())?;
                        host = Some(String::from(name));
                    }
                }
                Self::ServerName(host.ok_or(Error::decode())?)
            }
            EXT_SUPPORTED_GROUPS => {
                let codes = r.u16_list()?;
                if codes.is_empty() {
                    return Err(Error::decode());
                }
                Self::SupportedGroups(codes.into_iter().filter_map(NamedCurve::from_u16).collect())
            }
            EXT_EC_POINT_FORMATS => {
                let formats = r.vec_u8()?;
                if formats.is_empty() {
                    return Err(Error::decode());
                }
                Self::EcPointFormats(formats.to_vec())
            }
            EXT_SIGNATURE_ALGORITHMS => {
                let codes = r.u16_list()?;
                if codes.is_empty() {
                    return Err(Error::decode());
                }
                Self::SignatureAlgorithms(
                    codes.into_iter().filter_map(SignatureScheme::from_u16).collect(),
                )
            }
            EXT_RENEGOTIATION_INFO => Self::RenegotiationInfo(r.vec_u8()?.to_vec()),
            _ => Self::Unknown {
                typ,
                data: r.rest().to_vec(),
            },
        };
        r.finish()?;
        Ok(ext)
    }
}

/// Append a complete extension block (2-byte total length first). An empty
/// list still writes the zero length.
pub fn encode_extensions(exts: &[Extension], out: &mut Vec<u8>) -> Result<(), Error> {
    with_length_prefix(out, 2, |out| {
        for ext in exts {
            ext.encode(out)?;
        }
        Ok(())
    })
}

/// Decode the contents of an extension block (after its 2-byte total
/// length). Repeated extension types are a `decode_error`.
pub fn decode_extensions(data: &[u8]) -> Result<Vec<Extension>, Error> {
    let mut r = Reader::new(data);
    let mut exts: Vec<Extension> = Vec::new();
    while !r.is_empty() {
        let typ = r.u16()?;
        let body = r.vec_u16()?;
        if exts.iter().any(|e| e.ext_type() == typ) {
            return Err(Error::decode());
        }
        exts.push(Extension::decode(typ, body)?);
    }
    Ok(exts)
}
