//! Just enough DER to find the public key in an X.509 certificate.
//!
//! Chain trust is the job of a [`crate::trust::TrustValidator`]; the
//! handshake only needs the leaf's SubjectPublicKeyInfo to verify the
//! ServerKeyExchange signature or to encrypt the RSA pre-master secret.

use crate::crypto::{NamedCurve, SignatureAlgorithm};
use crate::error::Error;
use crate::oid::Oid;
use crate::tls::alert::AlertDescription;

const TAG_INTEGER: u8 = 0x02;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_OID: u8 = 0x06;
const TAG_SEQUENCE: u8 = 0x30;
const TAG_VERSION: u8 = 0xa0;

/// The parts of a SubjectPublicKeyInfo the handshake cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectPublicKeyInfo<'a> {
    /// The complete SPKI, tag and length included.
    pub der: &'a [u8],
    pub algorithm: Oid,
    /// Named-curve parameter for EC keys.
    pub parameters: Option<Oid>,
    /// Contents of the subjectPublicKey BIT STRING, unused-bits octet removed.
    pub public_key: &'a [u8],
}

/// What kind of key a certificate carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicKeyKind {
    Rsa,
    Ecdsa(NamedCurve),
    Ed25519,
}

impl PublicKeyKind {
    pub fn algorithm(self) -> SignatureAlgorithm {
        match self {
            Self::Rsa => SignatureAlgorithm::Rsa,
            Self::Ecdsa(_) => SignatureAlgorithm::Ecdsa,
            Self::Ed25519 => SignatureAlgorithm::Ed25519,
        }
    }
}

impl<'a> SubjectPublicKeyInfo<'a> {
    /// Parse a standalone SubjectPublicKeyInfo.
    pub fn from_der(der: &'a [u8]) -> Result<Self, Error> {
        let (spki, rest) = read_tlv(der, TAG_SEQUENCE)?;
        if !rest.is_empty() {
            return Err(bad_certificate());
        }
        let (alg_id, after_alg) = read_tlv(spki.content, TAG_SEQUENCE)?;
        let (alg, alg_rest) = read_tlv(alg_id.content, TAG_OID)?;
        let algorithm = Oid::from_der(alg.content).ok_or_else(bad_certificate)?;
        let parameters = match read_tlv(alg_rest, TAG_OID) {
            Ok((param, _)) => Some(Oid::from_der(param.content).ok_or_else(bad_certificate)?),
            Err(_) => None,
        };
        let (bits, _) = read_tlv(after_alg, TAG_BIT_STRING)?;
        let public_key = match bits.content.split_first() {
            Some((0, key)) => key,
            _ => return Err(bad_certificate()),
        };
        Ok(Self {
            der: spki.whole,
            algorithm,
            parameters,
            public_key,
        })
    }

    /// Classify the key. Anything we cannot use is `unsupported_certificate`.
    pub fn kind(&self) -> Result<PublicKeyKind, Error> {
        let unsupported = Error::Alert(AlertDescription::UnsupportedCertificate);
        match self.algorithm.name() {
            Some("rsaEncryption") => Ok(PublicKeyKind::Rsa),
            Some("Ed25519") => Ok(PublicKeyKind::Ed25519),
            Some("id-ecPublicKey") => {
                let curve = match self.parameters.as_ref().and_then(Oid::name) {
                    Some("secp256r1") => NamedCurve::Secp256r1,
                    Some("secp384r1") => NamedCurve::Secp384r1,
                    _ => return Err(unsupported),
                };
                Ok(PublicKeyKind::Ecdsa(curve))
            }
            _ => Err(unsupported),
        }
    }
}

/// Locate the SubjectPublicKeyInfo inside a DER certificate.
///
/// Certificate ::= SEQUENCE { tbsCertificate, signatureAlgorithm, signature }
/// TBSCertificate ::= SEQUENCE { [0] version OPTIONAL, serialNumber,
///     signature, issuer, validity, subject, subjectPublicKeyInfo, ... }
pub fn subject_public_key_info(cert_der: &[u8]) -> Result<SubjectPublicKeyInfo<'_>, Error> {
    let (cert, _) = read_tlv(cert_der, TAG_SEQUENCE)?;
    let (tbs, _) = read_tlv(cert.content, TAG_SEQUENCE)?;
    let mut rest = tbs.content;
    if rest.first() == Some(&TAG_VERSION) {
        rest = read_tlv(rest, TAG_VERSION)?.1;
    }
    rest = read_tlv(rest, TAG_INTEGER)?.1;
    // signature, issuer, validity, subject
    for _ in 0..4 {
        rest = read_tlv(rest, TAG_SEQUENCE)?.1;
    }
    let (spki, _) = read_tlv(rest, TAG_SEQUENCE)?;
    SubjectPublicKeyInfo::from_der(spki.whole)
}

struct Tlv<'a> {
    whole: &'a [u8],
    content: &'a [u8],
}

fn bad_certificate() -> Error {
    Error::Alert(AlertDescription::BadCertificate)
}

/// Read one definite-length TLV with the expected tag. Returns it and the
/// bytes that follow.
fn read_tlv(data: &[u8], tag: u8) -> Result<(Tlv<'_>, &[u8]), Error> {
    if data.len() < 2 || data[0] != tag {
        return Err(bad_certificate());
    }
    let first = data[1];
    let (len, header) = if first & 0x80 == 0 {
        (first as usize, 2)
    } else {
        let n = (first & 0x7f) as usize;
        if n == 0 || n > 4 || data.len() < 2 + n {
            return Err(bad_certificate());
        }
        let len = data[2..2 + n]
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | *b as usize);
        (len, 2 + n)
    };
    let end = header.checked_add(len).ok_or_else(bad_certificate)?;
    if data.len() < end {
        return Err(bad_certificate());
    }
    Ok((
        Tlv {
            whole: &data[..end],
            content: &data[header..end],
        },
        &data[end..],
    ))
}
