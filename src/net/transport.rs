//! Asynchronous TCP transport. One connection task drives all reads, so
//! at most one fill is ever outstanding; the ring buffer needs no locking.
//!
//! The write path buffers bytes and pushes them to the socket on an
//! explicit flush. That blocks the connection task until the OS accepts
//! the bytes, which is acceptable at this protocol's send volume but is a
//! scalability compromise, not a correctness guarantee.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

use crate::error::TransportError;
use crate::net::ring_buffer::RingBuffer;
use crate::protocol::MAX_PACKET_LENGTH;

/// The ring must be able to hold one maximum-size packet so the framing
/// loop can await a whole body.
const RING_CAPACITY: usize = 1 << 21;
const _: () = assert!(RING_CAPACITY >= MAX_PACKET_LENGTH);

pub struct Transport {
    stream: TcpStream,
    ring: RingBuffer,
    write_buffer: Vec<u8>,
}

impl Transport {
    pub async fn connect(address: &str, port: u16) -> Result<Self, TransportError> {
        let stream = TcpStream::connect((address, port)).await?;
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            stream,
            ring: RingBuffer::with_capacity(RING_CAPACITY),
            write_buffer: Vec::new(),
        }
    }

    /// Bytes currently buffered for reading.
    pub fn readable(&self) -> usize {
        self.ring.readable()
    }

    /// Pops one already-buffered byte. Callers must have awaited enough
    /// bytes first.
    pub fn pop_byte(&mut self) -> Result<u8, TransportError> {
        self.ring.pop_front().ok_or(TransportError::Eof)
    }

    /// Next byte, suspending until at least one is buffered.
    pub async fn next_byte(&mut self) -> Result<u8, TransportError> {
        while self.ring.readable() == 0 {
            self.fill().await?;
        }
        self.pop_byte()
    }

    /// Suspends until at least `n` bytes are buffered; used for
    /// whole-packet framing.
    pub async fn recv_until(&mut self, n: usize) -> Result<(), TransportError> {
        debug_assert!(n <= self.ring.capacity());
        while self.ring.readable() < n {
            self.fill().await?;
        }
        Ok(())
    }

    /// One socket read into the ring. EOF and IO errors terminate the
    /// pending await as a transport failure; swallowing them here would
    /// leave the receive loop suspended forever.
    async fn fill(&mut self) -> Result<(), TransportError> {
        let region = self.ring.write_region();
        debug_assert!(!region.is_empty());
        let n = self.stream.read(region).await?;
        if n == 0 {
            return Err(TransportError::Eof);
        }
        trace!(bytes = n, "socket fill");
        self.ring.commit(n);
        Ok(())
    }

    /// Appends bytes to the outgoing buffer without touching the socket.
    pub fn queue_bytes(&mut self, bytes: &[u8]) {
        self.write_buffer.extend_from_slice(bytes);
    }

    /// Writes the buffered bytes to the socket and clears the buffer.
    pub async fn flush(&mut self) -> Result<(), TransportError> {
        if self.write_buffer.is_empty() {
            return Ok(());
        }
        self.stream.write_all(&self.write_buffer).await?;
        trace!(bytes = self.write_buffer.len(), "socket flush");
        self.write_buffer.clear();
        Ok(())
    }
}
