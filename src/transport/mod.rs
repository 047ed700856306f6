//! Capabilities the TLS layer consumes from its environment: a byte-stream
//! transport and a source of secure randomness.

/// A reliable, ordered, bidirectional byte stream (TCP or anything shaped
/// like it).
///
/// Every method is a suspension point. [`crate::TlsClient`] implements this
/// trait too, so a TLS session can stand wherever the raw stream stood.
pub trait Transport {
    type Error: core::fmt::Debug;

    /// Read into `buf`. Returns bytes read; `0` means end-of-stream.
    fn read(
        &mut self,
        buf: &mut [u8],
    ) -> impl core::future::Future<Output = Result<usize, Self::Error>>;

    /// Write all of `buf`.
    fn write(&mut self, buf: &[u8]) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Flush and shut down the write half.
    fn close(&mut self) -> impl core::future::Future<Output = Result<(), Self::Error>>;
}

/// Random bytes for hello randoms, pre-master secrets, CBC IVs and
/// ephemeral keys.
///
/// Shared by every handshake started from one [`crate::TlsConfig`], so it
/// takes `&self`. On embedded targets implement it over a hardware TRNG
/// behind a critical section; elsewhere [`OsRng`] is the default.
pub trait Rng: Send + Sync {
    /// Fill `buf` with random bytes.
    fn fill(&self, buf: &mut [u8]);
}

/// The operating system's CSPRNG.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRng;

#[cfg(feature = "std")]
impl Rng for OsRng {
    fn fill(&self, buf: &mut [u8]) {
        use rand_core::RngCore;
        rand_core::OsRng.fill_bytes(buf);
    }
}

/// Adapts a [`Rng`] to the `rand_core` traits the RustCrypto crates expect.
pub(crate) struct RngCoreAdapter<'a>(pub &'a dyn Rng);

impl rand_core::RngCore for RngCoreAdapter<'_> {
    fn next_u32(&mut self) -> u32 {
        let mut b = [0u8; 4];
        self.0.fill(&mut b);
        u32::from_le_bytes(b)
    }

    fn next_u64(&mut self) -> u64 {
        let mut b = [0u8; 8];
        self.0.fill(&mut b);
        u64::from_le_bytes(b)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.0.fill(dest);
        Ok(())
    }
}

impl rand_core::CryptoRng for RngCoreAdapter<'_> {}

#[cfg(feature = "tokio")]
mod tokio_io {
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

    use super::Transport;

    /// [`Transport`] over any tokio stream, e.g. `tokio::net::TcpStream`.
    #[derive(Debug)]
    pub struct TokioTransport<S> {
        inner: S,
    }

    impl<S> TokioTransport<S> {
        pub fn new(inner: S) -> Self {
            Self { inner }
        }

        pub fn into_inner(self) -> S {
            self.inner
        }
    }

    impl<S: AsyncRead + AsyncWrite + Unpin> Transport for TokioTransport<S> {
        type Error = std::io::Error;

        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            self.inner.read(buf).await
        }

        async fn write(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
            self.inner.write_all(buf).await?;
            self.inner.flush().await
        }

        async fn close(&mut self) -> Result<(), Self::Error> {
            self.inner.shutdown().await
        }
    }
}

#[cfg(feature = "tokio")]
pub use tokio_io::TokioTransport;
