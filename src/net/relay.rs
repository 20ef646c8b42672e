//! Byte relay between two open connections.
//!
//! # Responsibilities
//! - Copy one direction chunk by chunk until EOF or error
//! - Join two directions into a tunnel
//!
//! # Design Decisions
//! - One chunk in flight per direction, no transformation
//! - When a direction ends (EOF or error) its destination write half is shut
//!   down so the peer observes EOF; that is what eventually unblocks the
//!   opposite direction
//! - No retries, no timeouts

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Copies `reader` into `writer` until a zero-byte read, returning the
/// number of bytes relayed.
///
/// A read or write error ends the relay. Either way `writer` is shut down
/// before returning.
pub async fn relay<R, W>(reader: &mut R, writer: &mut W, chunk_size: usize) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let result = copy_chunks(reader, writer, chunk_size).await;
    let _ = writer.shutdown().await;
    result
}

async fn copy_chunks<R, W>(reader: &mut R, writer: &mut W, chunk_size: usize) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; chunk_size];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(total);
        }
        writer.write_all(&buf[..n]).await?;
        total += n as u64;
    }
}

/// Outcome of both directions of a tunnel.
#[derive(Debug)]
pub struct TunnelStats {
    pub client_to_origin: io::Result<u64>,
    pub origin_to_client: io::Result<u64>,
}

impl TunnelStats {
    /// Bytes moved in each direction, counting a failed direction as zero.
    pub fn bytes(&self) -> (u64, u64) {
        (
            *self.client_to_origin.as_ref().unwrap_or(&0),
            *self.origin_to_client.as_ref().unwrap_or(&0),
        )
    }
}

/// Runs client→origin and origin→client concurrently and returns once both
/// have finished.
pub async fn tunnel(client: &mut TcpStream, origin: &mut TcpStream, chunk_size: usize) -> TunnelStats {
    let (mut client_read, mut client_write) = client.split();
    let (mut origin_read, mut origin_write) = origin.split();

    let (client_to_origin, origin_to_client) = tokio::join!(
        relay(&mut client_read, &mut origin_write, chunk_size),
        relay(&mut origin_read, &mut client_write, chunk_size),
    );

    TunnelStats {
        client_to_origin,
        origin_to_client,
    }
}
