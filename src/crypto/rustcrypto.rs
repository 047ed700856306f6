//! RustCrypto-backed implementation of [`CryptoProvider`].

use alloc::boxed::Box;
use alloc::vec::Vec;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Digest;
use zeroize::Zeroizing;

use crate::crypto::{
    Aead as AeadTrait, BlockCipher, BulkCipher, CryptoProvider, HashAlgorithm, KeyExchange,
    NamedCurve, PrivateKey, SignatureAlgorithm, SignatureScheme, BLOCK_LEN, GCM_TAG_LEN,
};
use crate::error::Error;
use crate::tls::alert::AlertDescription;
use crate::transport::{Rng, RngCoreAdapter};
use crate::x509::{PublicKeyKind, SubjectPublicKeyInfo};

/// Software provider built on the RustCrypto crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoProvider;

// ---- AES-GCM AEAD ----

enum GcmCipher {
    Aes128(aes_gcm::Aes128Gcm),
    Aes256(aes_gcm::Aes256Gcm),
}

/// AES-128-GCM or AES-256-GCM.
pub struct AesGcmAead {
    cipher: GcmCipher,
}

impl AeadTrait for AesGcmAead {
    fn seal_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        buf: &mut [u8],
        payload_len: usize,
    ) -> Result<usize, Error> {
        use aes_gcm::aead::AeadInPlace;
        use aes_gcm::Nonce;

        if nonce.len() != 12 {
            return Err(Error::Crypto);
        }
        let total = payload_len + GCM_TAG_LEN;
        if buf.len() < total {
            return Err(Error::BufferTooSmall { needed: total });
        }

        let nonce = Nonce::from_slice(nonce);
        let payload = &mut buf[..payload_len];
        let tag = match &self.cipher {
            GcmCipher::Aes128(c) => c.encrypt_in_place_detached(nonce, aad, payload),
            GcmCipher::Aes256(c) => c.encrypt_in_place_detached(nonce, aad, payload),
        }
        .map_err(|_| Error::Crypto)?;
        buf[payload_len..total].copy_from_slice(&tag);
        Ok(total)
    }

    fn open_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        buf: &mut [u8],
        ciphertext_len: usize,
    ) -> Result<usize, Error> {
        use aes_gcm::aead::AeadInPlace;
        use aes_gcm::{Nonce, Tag};

        if nonce.len() != 12 || ciphertext_len < GCM_TAG_LEN || buf.len() < ciphertext_len {
            return Err(Error::Crypto);
        }
        let plaintext_len = ciphertext_len - GCM_TAG_LEN;
        let mut tag_bytes = [0u8; GCM_TAG_LEN];
        tag_bytes.copy_from_slice(&buf[plaintext_len..ciphertext_len]);
        let tag = Tag::from(tag_bytes);
        let nonce = Nonce::from_slice(nonce);
        let payload = &mut buf[..plaintext_len];
        match &self.cipher {
            GcmCipher::Aes128(c) => c.decrypt_in_place_detached(nonce, aad, payload, &tag),
            GcmCipher::Aes256(c) => c.decrypt_in_place_detached(nonce, aad, payload, &tag),
        }
        .map_err(|_| Error::Crypto)?;
        Ok(plaintext_len)
    }
}

// ---- AES-CBC ----

/// AES-CBC without padding. The key is kept so a fresh mode instance can be
/// keyed with each record's IV.
pub struct AesCbc {
    cipher: BulkCipher,
    key: Zeroizing<Vec<u8>>,
}

macro_rules! cbc_blocks {
    ($mode:ty, $op:ident, $key:expr, $iv:expr, $buf:expr) => {{
        let mut mode = <$mode>::new_from_slices($key, $iv).map_err(|_| Error::Crypto)?;
        for block in $buf.chunks_exact_mut(BLOCK_LEN) {
            mode.$op(GenericArray::from_mut_slice(block));
        }
    }};
}

impl BlockCipher for AesCbc {
    fn encrypt(&self, iv: &[u8; BLOCK_LEN], buf: &mut [u8]) -> Result<(), Error> {
        if buf.len() % BLOCK_LEN != 0 {
            return Err(Error::Crypto);
        }
        match self.cipher {
            BulkCipher::Aes128 => {
                cbc_blocks!(cbc::Encryptor<aes::Aes128>, encrypt_block_mut, &self.key, iv, buf)
            }
            BulkCipher::Aes256 => {
                cbc_blocks!(cbc::Encryptor<aes::Aes256>, encrypt_block_mut, &self.key, iv, buf)
            }
        }
        Ok(())
    }

    fn decrypt(&self, iv: &[u8; BLOCK_LEN], buf: &mut [u8]) -> Result<(), Error> {
        if buf.len() % BLOCK_LEN != 0 {
            return Err(Error::Crypto);
        }
        match self.cipher {
            BulkCipher::Aes128 => {
                cbc_blocks!(cbc::Decryptor<aes::Aes128>, decrypt_block_mut, &self.key, iv, buf)
            }
            BulkCipher::Aes256 => {
                cbc_blocks!(cbc::Decryptor<aes::Aes256>, decrypt_block_mut, &self.key, iv, buf)
            }
        }
        Ok(())
    }
}

// ---- Hashing ----

fn hmac_into<M>(key: &[u8], data: &[&[u8]], out: &mut [u8]) -> Result<usize, Error>
where
    M: Mac + hmac::digest::KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|_| Error::Crypto)?;
    for part in data {
        Mac::update(&mut mac, part);
    }
    let tag = mac.finalize().into_bytes();
    if out.len() < tag.len() {
        return Err(Error::BufferTooSmall { needed: tag.len() });
    }
    out[..tag.len()].copy_from_slice(&tag);
    Ok(tag.len())
}

/// One-shot digest of `msg`.
pub(crate) fn digest(hash: HashAlgorithm, msg: &[u8]) -> heapless::Vec<u8, 64> {
    let mut out = heapless::Vec::new();
    // Every output fits in 64 bytes.
    let _ = match hash {
        HashAlgorithm::Md5 => out.extend_from_slice(&md5::Md5::digest(msg)),
        HashAlgorithm::Sha1 => out.extend_from_slice(&sha1::Sha1::digest(msg)),
        HashAlgorithm::Sha256 => out.extend_from_slice(&sha2::Sha256::digest(msg)),
        HashAlgorithm::Sha384 => out.extend_from_slice(&sha2::Sha384::digest(msg)),
        HashAlgorithm::Sha512 => out.extend_from_slice(&sha2::Sha512::digest(msg)),
    };
    out
}

/// MD5(msg) ‖ SHA-1(msg), the TLS 1.0/1.1 RSA signature input.
fn md5_sha1(msg: &[u8]) -> [u8; 36] {
    let mut out = [0u8; 36];
    out[..16].copy_from_slice(&md5::Md5::digest(msg));
    out[16..].copy_from_slice(&sha1::Sha1::digest(msg));
    out
}

/// Left-pad a digest shorter than the curve order so the ECDSA crates see
/// the same integer.
fn ecdsa_prehash(hashed: &[u8], field_len: usize) -> heapless::Vec<u8, 64> {
    let mut out = heapless::Vec::new();
    for _ in hashed.len()..field_len {
        let _ = out.push(0);
    }
    let _ = out.extend_from_slice(hashed);
    out
}

// ---- Signatures ----

fn rsa_public_key(spki: &SubjectPublicKeyInfo<'_>) -> Result<rsa::RsaPublicKey, Error> {
    use rsa::pkcs1::DecodeRsaPublicKey;
    rsa::RsaPublicKey::from_pkcs1_der(spki.public_key)
        .map_err(|_| Error::Alert(AlertDescription::BadCertificate))
}

fn verify_rsa(
    scheme: SignatureScheme,
    spki: &SubjectPublicKeyInfo<'_>,
    message: &[u8],
    signature: &[u8],
) -> Result<(), Error> {
    use rsa::{Pkcs1v15Sign, Pss};

    let key = rsa_public_key(spki)?;
    let result = match scheme {
        SignatureScheme::LegacyRsaMd5Sha1 => {
            key.verify(Pkcs1v15Sign::new_unprefixed(), &md5_sha1(message), signature)
        }
        SignatureScheme::RsaPkcs1Sha1 => key.verify(
            Pkcs1v15Sign::new::<sha1::Sha1>(),
            &sha1::Sha1::digest(message),
            signature,
        ),
        SignatureScheme::RsaPkcs1Sha256 => key.verify(
            Pkcs1v15Sign::new::<sha2::Sha256>(),
            &sha2::Sha256::digest(message),
            signature,
        ),
        SignatureScheme::RsaPkcs1Sha384 => key.verify(
            Pkcs1v15Sign::new::<sha2::Sha384>(),
            &sha2::Sha384::digest(message),
            signature,
        ),
        SignatureScheme::RsaPkcs1Sha512 => key.verify(
            Pkcs1v15Sign::new::<sha2::Sha512>(),
            &sha2::Sha512::digest(message),
            signature,
        ),
        SignatureScheme::RsaPssRsaeSha256 => key.verify(
            Pss::new::<sha2::Sha256>(),
            &sha2::Sha256::digest(message),
            signature,
        ),
        SignatureScheme::RsaPssRsaeSha384 => key.verify(
            Pss::new::<sha2::Sha384>(),
            &sha2::Sha384::digest(message),
            signature,
        ),
        _ => return Err(Error::Crypto),
    };
    result.map_err(|_| Error::Crypto)
}

fn sign_rsa(
    scheme: SignatureScheme,
    key: &PrivateKey,
    rng: &dyn Rng,
    message: &[u8],
) -> Result<Vec<u8>, Error> {
    use rsa::pkcs8::DecodePrivateKey;
    use rsa::{Pkcs1v15Sign, Pss};

    let key = rsa::RsaPrivateKey::from_pkcs8_der(key.as_bytes()).map_err(|_| Error::Crypto)?;
    let mut rng = RngCoreAdapter(rng);
    let result = match scheme {
        SignatureScheme::LegacyRsaMd5Sha1 => {
            key.sign_with_rng(&mut rng, Pkcs1v15Sign::new_unprefixed(), &md5_sha1(message))
        }
        SignatureScheme::RsaPkcs1Sha1 => key.sign_with_rng(
            &mut rng,
            Pkcs1v15Sign::new::<sha1::Sha1>(),
            &sha1::Sha1::digest(message),
        ),
        SignatureScheme::RsaPkcs1Sha256 => key.sign_with_rng(
            &mut rng,
            Pkcs1v15Sign::new::<sha2::Sha256>(),
            &sha2::Sha256::digest(message),
        ),
        SignatureScheme::RsaPkcs1Sha384 => key.sign_with_rng(
            &mut rng,
            Pkcs1v15Sign::new::<sha2::Sha384>(),
            &sha2::Sha384::digest(message),
        ),
        SignatureScheme::RsaPkcs1Sha512 => key.sign_with_rng(
            &mut rng,
            Pkcs1v15Sign::new::<sha2::Sha512>(),
            &sha2::Sha512::digest(message),
        ),
        SignatureScheme::RsaPssRsaeSha256 => key.sign_with_rng(
            &mut rng,
            Pss::new::<sha2::Sha256>(),
            &sha2::Sha256::digest(message),
        ),
        SignatureScheme::RsaPssRsaeSha384 => key.sign_with_rng(
            &mut rng,
            Pss::new::<sha2::Sha384>(),
            &sha2::Sha384::digest(message),
        ),
        _ => return Err(Error::Crypto),
    };
    result.map_err(|_| Error::Crypto)
}

fn verify_ecdsa(
    curve: NamedCurve,
    hash: HashAlgorithm,
    point: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), Error> {
    use p256::ecdsa::signature::hazmat::PrehashVerifier;

    let hashed = digest(hash, message);
    match curve {
        NamedCurve::Secp256r1 => {
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|_| Error::Alert(AlertDescription::BadCertificate))?;
            let sig = p256::ecdsa::Signature::from_der(signature).map_err(|_| Error::Crypto)?;
            key.verify_prehash(&ecdsa_prehash(&hashed, 32), &sig)
                .map_err(|_| Error::Crypto)
        }
        NamedCurve::Secp384r1 => {
            let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|_| Error::Alert(AlertDescription::BadCertificate))?;
            let sig = p384::ecdsa::Signature::from_der(signature).map_err(|_| Error::Crypto)?;
            key.verify_prehash(&ecdsa_prehash(&hashed, 48), &sig)
                .map_err(|_| Error::Crypto)
        }
        NamedCurve::X25519 => Err(Error::Crypto),
    }
}

/// DER ECDSA signature over an already hashed message. The curve follows
/// from the scalar length.
fn sign_ecdsa(scalar: &[u8], hashed: &[u8]) -> Result<Vec<u8>, Error> {
    use p256::ecdsa::signature::hazmat::PrehashSigner;

    match scalar.len() {
        32 => {
            let key = p256::ecdsa::SigningKey::from_slice(scalar).map_err(|_| Error::Crypto)?;
            let sig: p256::ecdsa::Signature = key
                .sign_prehash(&ecdsa_prehash(hashed, 32))
                .map_err(|_| Error::Crypto)?;
            Ok(sig.to_der().as_bytes().to_vec())
        }
        48 => {
            let key = p384::ecdsa::SigningKey::from_slice(scalar).map_err(|_| Error::Crypto)?;
            let sig: p384::ecdsa::Signature = key
                .sign_prehash(&ecdsa_prehash(hashed, 48))
                .map_err(|_| Error::Crypto)?;
            Ok(sig.to_der().as_bytes().to_vec())
        }
        _ => Err(Error::Crypto),
    }
}

fn verify_ed25519(point: &[u8], message: &[u8], signature: &[u8]) -> Result<(), Error> {
    let bytes: [u8; 32] = point
        .try_into()
        .map_err(|_| Error::Alert(AlertDescription::BadCertificate))?;
    let key = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
        .map_err(|_| Error::Alert(AlertDescription::BadCertificate))?;
    let sig = ed25519_dalek::Signature::from_slice(signature).map_err(|_| Error::Crypto)?;
    key.verify_strict(message, &sig).map_err(|_| Error::Crypto)
}

// ---- Key exchange ----

struct P256Exchange {
    secret: p256::ecdh::EphemeralSecret,
    public: Vec<u8>,
}

impl KeyExchange for P256Exchange {
    fn curve(&self) -> NamedCurve {
        NamedCurve::Secp256r1
    }

    fn public_key(&self) -> &[u8] {
        &self.public
    }

    fn complete(self: Box<Self>, peer_public: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        let peer = p256::PublicKey::from_sec1_bytes(peer_public)
            .map_err(|_| Error::Alert(AlertDescription::IllegalParameter))?;
        let shared = self.secret.diffie_hellman(&peer);
        Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
    }
}

struct P384Exchange {
    secret: p384::ecdh::EphemeralSecret,
    public: Vec<u8>,
}

impl KeyExchange for P384Exchange {
    fn curve(&self) -> NamedCurve {
        NamedCurve::Secp384r1
    }

    fn public_key(&self) -> &[u8] {
        &self.public
    }

    fn complete(self: Box<Self>, peer_public: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        let peer = p384::PublicKey::from_sec1_bytes(peer_public)
            .map_err(|_| Error::Alert(AlertDescription::IllegalParameter))?;
        let shared = self.secret.diffie_hellman(&peer);
        Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
    }
}

struct X25519Exchange {
    secret: x25519_dalek::EphemeralSecret,
    public: [u8; 32],
}

impl KeyExchange for X25519Exchange {
    fn curve(&self) -> NamedCurve {
        NamedCurve::X25519
    }

    fn public_key(&self) -> &[u8] {
        &self.public
    }

    fn complete(self: Box<Self>, peer_public: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        let peer: [u8; 32] = peer_public
            .try_into()
            .map_err(|_| Error::Alert(AlertDescription::IllegalParameter))?;
        let shared = self
            .secret
            .diffie_hellman(&x25519_dalek::PublicKey::from(peer));
        // Low-order peer points yield an all-zero secret.
        if !shared.was_contributory() {
            return Err(Error::Alert(AlertDescription::IllegalParameter));
        }
        Ok(Zeroizing::new(shared.as_bytes().to_vec()))
    }
}

// ---- Provider ----

impl CryptoProvider for RustCryptoProvider {
    fn aead(&self, cipher: BulkCipher, key: &[u8]) -> Result<Box<dyn AeadTrait>, Error> {
        use aes_gcm::KeyInit;
        if key.len() != cipher.key_len() {
            return Err(Error::Crypto);
        }
        let cipher = match cipher {
            BulkCipher::Aes128 => GcmCipher::Aes128(
                aes_gcm::Aes128Gcm::new_from_slice(key).map_err(|_| Error::Crypto)?,
            ),
            BulkCipher::Aes256 => GcmCipher::Aes256(
                aes_gcm::Aes256Gcm::new_from_slice(key).map_err(|_| Error::Crypto)?,
            ),
        };
        Ok(Box::new(AesGcmAead { cipher }))
    }

    fn cbc(&self, cipher: BulkCipher, key: &[u8]) -> Result<Box<dyn BlockCipher>, Error> {
        if key.len() != cipher.key_len() {
            return Err(Error::Crypto);
        }
        Ok(Box::new(AesCbc {
            cipher,
            key: Zeroizing::new(key.to_vec()),
        }))
    }

    fn hmac(
        &self,
        hash: HashAlgorithm,
        key: &[u8],
        data: &[&[u8]],
        out: &mut [u8],
    ) -> Result<usize, Error> {
        match hash {
            HashAlgorithm::Md5 => hmac_into::<Hmac<md5::Md5>>(key, data, out),
            HashAlgorithm::Sha1 => hmac_into::<Hmac<sha1::Sha1>>(key, data, out),
            HashAlgorithm::Sha256 => hmac_into::<Hmac<sha2::Sha256>>(key, data, out),
            HashAlgorithm::Sha384 => hmac_into::<Hmac<sha2::Sha384>>(key, data, out),
            HashAlgorithm::Sha512 => hmac_into::<Hmac<sha2::Sha512>>(key, data, out),
        }
    }

    fn rsa_encrypt(
        &self,
        spki: &SubjectPublicKeyInfo<'_>,
        rng: &dyn Rng,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let key = rsa_public_key(spki)?;
        key.encrypt(&mut RngCoreAdapter(rng), rsa::Pkcs1v15Encrypt, plaintext)
            .map_err(|_| Error::Crypto)
    }

    fn verify(
        &self,
        scheme: SignatureScheme,
        spki: &SubjectPublicKeyInfo<'_>,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), Error> {
        match (scheme.algorithm(), spki.kind()?) {
            (SignatureAlgorithm::Rsa, PublicKeyKind::Rsa) => {
                verify_rsa(scheme, spki, message, signature)
            }
            (SignatureAlgorithm::Ecdsa, PublicKeyKind::Ecdsa(curve)) => {
                let hash = scheme.hash().ok_or(Error::Crypto)?;
                verify_ecdsa(curve, hash, spki.public_key, message, signature)
            }
            (SignatureAlgorithm::Ed25519, PublicKeyKind::Ed25519) => {
                verify_ed25519(spki.public_key, message, signature)
            }
            _ => Err(Error::Crypto),
        }
    }

    fn sign(
        &self,
        scheme: SignatureScheme,
        key: &PrivateKey,
        rng: &dyn Rng,
        message: &[u8],
    ) -> Result<Vec<u8>, Error> {
        if scheme.algorithm() != key.algorithm() {
            return Err(Error::Crypto);
        }
        match key.algorithm() {
            SignatureAlgorithm::Rsa => sign_rsa(scheme, key, rng, message),
            SignatureAlgorithm::Ecdsa => {
                let hash = scheme.hash().ok_or(Error::Crypto)?;
                sign_ecdsa(key.as_bytes(), &digest(hash, message))
            }
            SignatureAlgorithm::Ed25519 => {
                use ed25519_dalek::Signer;
                let seed: [u8; 32] = key.as_bytes().try_into().map_err(|_| Error::Crypto)?;
                let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
                Ok(signing_key.sign(message).to_bytes().to_vec())
            }
        }
    }

    fn key_exchange(
        &self,
        curve: NamedCurve,
        rng: &dyn Rng,
    ) -> Result<Box<dyn KeyExchange>, Error> {
        let mut rng = RngCoreAdapter(rng);
        Ok(match curve {
            NamedCurve::Secp256r1 => {
                use p256::elliptic_curve::sec1::ToEncodedPoint;
                let secret = p256::ecdh::EphemeralSecret::random(&mut rng);
                let public = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
                Box::new(P256Exchange { secret, public })
            }
            NamedCurve::Secp384r1 => {
                use p384::elliptic_curve::sec1::ToEncodedPoint;
                let secret = p384::ecdh::EphemeralSecret::random(&mut rng);
                let public = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
                Box::new(P384Exchange { secret, public })
            }
            NamedCurve::X25519 => {
                let secret = x25519_dalek::EphemeralSecret::random_from_rng(rng);
                let public = x25519_dalek::PublicKey::from(&secret).to_bytes();
                Box::new(X25519Exchange { secret, public })
            }
        })
    }
}
