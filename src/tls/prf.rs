//! The TLS pseudorandom function (RFC 2246 section 5, RFC 5246 section 5).
//!
//! ```text
//! P_hash(secret, seed) = HMAC_hash(secret, A(1) + seed) +
//!                        HMAC_hash(secret, A(2) + seed) + ...
//! A(0) = seed, A(i) = HMAC_hash(secret, A(i-1))
//!
//! TLS 1.2:     PRF = P_<suite hash>(secret, label + seed)
//! TLS 1.0/1.1: PRF = P_MD5(S1, label + seed) XOR P_SHA-1(S2, label + seed)
//! ```
//!
//! S1 and S2 are the first and last halves of the secret, rounded up, so
//! they share the middle byte when its length is odd.

use alloc::vec;

use zeroize::Zeroizing;

use crate::crypto::{CryptoProvider, HashAlgorithm};
use crate::error::Error;
use crate::tls::ProtocolVersion;

/// Seeds are passed as up to three parts to avoid concatenating randoms.
const MAX_SEED_PARTS: usize = 3;

/// Fill `out` with `PRF(secret, label, seed[0] ‖ seed[1] ‖ ...)`.
pub fn prf(
    provider: &dyn CryptoProvider,
    version: ProtocolVersion,
    prf_hash: HashAlgorithm,
    secret: &[u8],
    label: &[u8],
    seed: &[&[u8]],
    out: &mut [u8],
) -> Result<(), Error> {
    if version >= ProtocolVersion::Tls12 {
        return p_hash(provider, prf_hash, secret, label, seed, out);
    }

    let half = secret.len().div_ceil(2);
    let s1 = &secret[..half];
    let s2 = &secret[secret.len() - half..];

    p_hash(provider, HashAlgorithm::Md5, s1, label, seed, out)?;
    let mut sha1_out = Zeroizing::new(vec![0u8; out.len()]);
    p_hash(provider, HashAlgorithm::Sha1, s2, label, seed, &mut sha1_out)?;
    for (o, s) in out.iter_mut().zip(sha1_out.iter()) {
        *o ^= s;
    }
    Ok(())
}

/// The `P_hash` data expansion function.
pub fn p_hash(
    provider: &dyn CryptoProvider,
    hash: HashAlgorithm,
    secret: &[u8],
    label: &[u8],
    seed: &[&[u8]],
    out: &mut [u8],
) -> Result<(), Error> {
    if seed.len() > MAX_SEED_PARTS {
        return Err(Error::InvalidState);
    }
    let n = hash.output_len();

    let mut label_seed: heapless::Vec<&[u8], { MAX_SEED_PARTS + 1 }> = heapless::Vec::new();
    let _ = label_seed.push(label);
    let _ = label_seed.extend_from_slice(seed);

    // A(1) = HMAC(secret, label ‖ seed)
    let mut a = Zeroizing::new([0u8; 64]);
    provider.hmac(hash, secret, &label_seed, &mut a[..])?;

    let mut block = Zeroizing::new([0u8; 64]);
    for chunk in out.chunks_mut(n) {
        // HMAC(secret, A(i) ‖ label ‖ seed)
        let mut input: heapless::Vec<&[u8], { MAX_SEED_PARTS + 2 }> = heapless::Vec::new();
        let _ = input.push(&a[..n]);
        let _ = input.extend_from_slice(&label_seed);
        provider.hmac(hash, secret, &input, &mut block[..])?;
        chunk.copy_from_slice(&block[..chunk.len()]);
        drop(input);

        // A(i+1) = HMAC(secret, A(i))
        let prev = Zeroizing::new(*a);
        provider.hmac(hash, secret, &[&prev[..n]], &mut a[..])?;
    }
    Ok(())
}
