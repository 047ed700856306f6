//! ASN.1 object identifiers for the algorithms that appear in certificates.
//!
//! An [`Oid`] is a short list of arcs. The table below maps the names used in
//! RFC 3279, RFC 4055, RFC 5480, RFC 5758 and RFC 8410 to their identifiers
//! and back.

use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

/// Longest OID we keep. Algorithm identifiers are far shorter.
const MAX_ARCS: usize = 16;

/// An ASN.1 OBJECT IDENTIFIER.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Oid {
    arcs: heapless::Vec<u32, MAX_ARCS>,
}

/// (name, arcs) pairs of every identifier this crate knows by name.
static KNOWN_OIDS: &[(&str, &[u32])] = &[
    ("rsaEncryption", &[1, 2, 840, 113549, 1, 1, 1]),
    ("md5WithRSAEncryption", &[1, 2, 840, 113549, 1, 1, 4]),
    ("sha1WithRSAEncryption", &[1, 2, 840, 113549, 1, 1, 5]),
    ("rsassaPss", &[1, 2, 840, 113549, 1, 1, 10]),
    ("sha256WithRSAEncryption", &[1, 2, 840, 113549, 1, 1, 11]),
    ("sha384WithRSAEncryption", &[1, 2, 840, 113549, 1, 1, 12]),
    ("sha512WithRSAEncryption", &[1, 2, 840, 113549, 1, 1, 13]),
    ("id-ecPublicKey", &[1, 2, 840, 10045, 2, 1]),
    ("ecdsa-with-SHA1", &[1, 2, 840, 10045, 4, 1]),
    ("ecdsa-with-SHA256", &[1, 2, 840, 10045, 4, 3, 2]),
    ("ecdsa-with-SHA384", &[1, 2, 840, 10045, 4, 3, 3]),
    ("ecdsa-with-SHA512", &[1, 2, 840, 10045, 4, 3, 4]),
    ("secp256r1", &[1, 2, 840, 10045, 3, 1, 7]),
    ("secp384r1", &[1, 3, 132, 0, 34]),
    ("X25519", &[1, 3, 101, 110]),
    ("Ed25519", &[1, 3, 101, 112]),
    ("md5", &[1, 2, 840, 113549, 2, 5]),
    ("sha1", &[1, 3, 14, 3, 2, 26]),
    ("sha256", &[2, 16, 840, 1, 101, 3, 4, 2, 1]),
    ("sha384", &[2, 16, 840, 1, 101, 3, 4, 2, 2]),
    ("sha512", &[2, 16, 840, 1, 101, 3, 4, 2, 3]),
];

impl Oid {
    /// Build from arcs. The first arc must be 0, 1 or 2 and, below 2, the
    /// second must be under 40 so the DER form is well defined.
    pub fn from_arcs(arcs: &[u32]) -> Option<Self> {
        if arcs.len() < 2 || arcs[0] > 2 || (arcs[0] < 2 && arcs[1] >= 40) {
            return None;
        }
        if arcs[0] == 2 && arcs[1] > u32::MAX - 80 {
            return None;
        }
        Some(Self {
            arcs: heapless::Vec::from_slice(arcs).ok()?,
        })
    }

    /// Look up a well-known identifier by name, e.g. `"sha256WithRSAEncryption"`.
    pub fn by_name(name: &str) -> Option<Self> {
        KNOWN_OIDS
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, arcs)| Self::from_arcs(arcs))
    }

    /// The well-known name of this identifier, if it has one.
    pub fn name(&self) -> Option<&'static str> {
        KNOWN_OIDS
            .iter()
            .find(|(_, arcs)| *arcs == self.arcs.as_slice())
            .map(|(n, _)| *n)
    }

    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Whether this identifier equals the well-known one called `name`.
    pub fn is(&self, name: &str) -> bool {
        self.name() == Some(name)
    }

    /// Decode the contents octets of a DER OBJECT IDENTIFIER.
    pub fn from_der(content: &[u8]) -> Option<Self> {
        if content.is_empty() || content[content.len() - 1] & 0x80 != 0 {
            return None;
        }
        let mut arcs: heapless::Vec<u32, MAX_ARCS> = heapless::Vec::new();
        let mut value: u32 = 0;
        let mut first = true;
        let mut start_of_arc = true;
        for &b in content {
            // Minimal encoding: no leading 0x80 octet.
            if start_of_arc && b == 0x80 {
                return None;
            }
            if value > (u32::MAX >> 7) {
                return None;
            }
            value = (value << 7) | (b & 0x7f) as u32;
            start_of_arc = b & 0x80 == 0;
            if !start_of_arc {
                continue;
            }
            if first {
                let (a, b) = match value {
                    0..=39 => (0, value),
                    40..=79 => (1, value - 40),
                    _ => (2, value - 80),
                };
                arcs.push(a).ok()?;
                arcs.push(b).ok()?;
                first = false;
            } else {
                arcs.push(value).ok()?;
            }
            value = 0;
        }
        Some(Self { arcs })
    }

    /// Encode the contents octets of a DER OBJECT IDENTIFIER.
    pub fn to_der(&self) -> Vec<u8> {
        let mut out = Vec::new();
        push_base128(&mut out, self.arcs[0] * 40 + self.arcs[1]);
        for &arc in &self.arcs[2..] {
            push_base128(&mut out, arc);
        }
        out
    }
}

fn push_base128(out: &mut Vec<u8>, mut v: u32) {
    let mut tmp = [0u8; 5];
    let mut n = 0;
    loop {
        tmp[n] = (v & 0x7f) as u8;
        n += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let cont = if i == 0 { 0 } else { 0x80 };
        out.push(tmp[i] | cont);
    }
}

impl FromStr for Oid {
    type Err = crate::error::Error;

    /// Parse dotted notation, e.g. `"1.2.840.10045.4.3.2"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut arcs: heapless::Vec<u32, MAX_ARCS> = heapless::Vec::new();
        for part in s.split('.') {
            let arc = part
                .parse::<u32>()
                .map_err(|_| crate::error::Error::InvalidConfig)?;
            arcs.push(arc)
                .map_err(|_| crate::error::Error::InvalidConfig)?;
        }
        Self::from_arcs(&arcs).ok_or(crate::error::Error::InvalidConfig)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arc) in self.arcs.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{arc}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Oid({self} {name})"),
            None => write!(f, "Oid({self})"),
        }
    }
}
