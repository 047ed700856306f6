//! TLS 1.0-1.2 alerts (RFC 5246 section 7.2).

use crate::error::Error;

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertLevel {
    Warning = 1,
    Fatal = 2,
}

impl AlertLevel {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Warning),
            2 => Some(Self::Fatal),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// TLS alert description codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertDescription {
    CloseNotify = 0,
    UnexpectedMessage = 10,
    BadRecordMac = 20,
    DecryptionFailed = 21,
    RecordOverflow = 22,
    DecompressionFailure = 30,
    HandshakeFailure = 40,
    NoCertificate = 41,
    BadCertificate = 42,
    UnsupportedCertificate = 43,
    CertificateRevoked = 44,
    CertificateExpired = 45,
    CertificateUnknown = 46,
    IllegalParameter = 47,
    UnknownCa = 48,
    AccessDenied = 49,
    DecodeError = 50,
    DecryptError = 51,
    ExportRestriction = 60,
    ProtocolVersion = 70,
    InsufficientSecurity = 71,
    InternalError = 80,
    InappropriateFallback = 86,
    UserCanceled = 90,
    NoRenegotiation = 100,
    UnsupportedExtension = 110,
    UnrecognizedName = 112,
}

impl AlertDescription {
    /// Convert from a raw u8 byte.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::CloseNotify),
            10 => Some(Self::UnexpectedMessage),
            20 => Some(Self::BadRecordMac),
            21 => Some(Self::DecryptionFailed),
            22 => Some(Self::RecordOverflow),
            30 => Some(Self::DecompressionFailure),
            40 => Some(Self::HandshakeFailure),
            41 => Some(Self::NoCertificate),
            42 => Some(Self::BadCertificate),
            43 => Some(Self::UnsupportedCertificate),
            44 => Some(Self::CertificateRevoked),
            45 => Some(Self::CertificateExpired),
            46 => Some(Self::CertificateUnknown),
            47 => Some(Self::IllegalParameter),
            48 => Some(Self::UnknownCa),
            49 => Some(Self::AccessDenied),
            50 => Some(Self::DecodeError),
            51 => Some(Self::DecryptError),
            60 => Some(Self::ExportRestriction),
            70 => Some(Self::ProtocolVersion),
            71 => Some(Self::InsufficientSecurity),
            80 => Some(Self::InternalError),
            86 => Some(Self::InappropriateFallback),
            90 => Some(Self::UserCanceled),
            100 => Some(Self::NoRenegotiation),
            110 => Some(Self::UnsupportedExtension),
            112 => Some(Self::UnrecognizedName),
            _ => None,
        }
    }

    /// Convert to raw u8 byte.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// A single alert message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub description: AlertDescription,
}

impl Alert {
    pub const fn fatal(description: AlertDescription) -> Self {
        Self {
            level: AlertLevel::Fatal,
            description,
        }
    }

    pub const fn warning(description: AlertDescription) -> Self {
        Self {
            level: AlertLevel::Warning,
            description,
        }
    }

    pub const fn close_notify() -> Self {
        Self::warning(AlertDescription::CloseNotify)
    }

    pub fn is_fatal(&self) -> bool {
        self.level == AlertLevel::Fatal
    }

    pub fn encode(&self) -> [u8; 2] {
        [self.level.to_u8(), self.description.to_u8()]
    }

    /// Decode an alert record payload. Anything other than exactly two bytes
    /// with a known level and description is a `decode_error`.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        let [level, desc] = data else {
            return Err(Error::decode());
        };
        let level = AlertLevel::from_u8(*level).ok_or(Error::decode())?;
        let description = AlertDescription::from_u8(*desc).ok_or(Error::decode())?;
        Ok(Self { level, description })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_alert_codes() {
        for code in 0..=255u8 {
            if let Some(desc) = AlertDescription::from_u8(code) {
                assert_eq!(desc.to_u8(), code);
            }
        }
        let known = (0..=255u8)
            .filter(|c| AlertDescription::from_u8(*c).is_some())
            .count();
        assert_eq!(known, 27);
    }

    #[test]
    fn unknown_alert_code() {
        assert_eq!(AlertDescription::from_u8(255), None);
        assert_eq!(AlertDescription::from_u8(1), None);
        assert_eq!(AlertDescription::from_u8(120), None);
    }

    #[test]
    fn encode_decode_alert() {
        let alert = Alert::fatal(AlertDescription::BadRecordMac);
        assert_eq!(alert.encode(), [2, 20]);
        assert_eq!(Alert::decode(&[2, 20]).unwrap(), alert);
        assert_eq!(Alert::decode(&[1, 0]).unwrap(), Alert::close_notify());
        assert!(!Alert::close_notify().is_fatal());
    }

    #[test]
    fn decode_rejects_malformed() {
        let err = Err(Error::Alert(AlertDescription::DecodeError));
        assert_eq!(Alert::decode(&[2]), err);
        assert_eq!(Alert::decode(&[2, 20, 0]), err);
        assert_eq!(Alert::decode(&[3, 20]), err);
        assert_eq!(Alert::decode(&[2, 99]), err);
    }
}
