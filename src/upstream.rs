use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tracing::debug;

use crate::error::ProxyError;

/// Resolve `host:port` to a list of addresses and try each in order,
/// returning the first successful connect (§4.5). Fails with
/// `ProxyError::UpstreamUnavailable` if resolution fails or every
/// address is unreachable — this is the synthetic `1000` status at the
/// handler layer.
pub async fn dial(host: &str, port: u16) -> Result<TcpStream, ProxyError> {
    let addrs = lookup_host((host, port))
        .await
        .map_err(|_| ProxyError::UpstreamUnavailable)?;

    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                debug!(host, port, %addr, "dialed upstream");
                return Ok(stream);
            }
            Err(e) => {
                debug!(host, port, %addr, error = %e, "upstream candidate unreachable");
            }
        }
    }
    Err(ProxyError::UpstreamUnavailable)
}

/// `write_all` with peer-transport-fault classification: a broken pipe
/// or connection reset surfaces as `ProxyError::Transport`, which the
/// caller propagates with `?` to trigger fault recovery (§4.8). This is
/// the `rio_writen_p` equivalent.
pub async fn write_all_polite<W>(writer: &mut W, buf: &[u8]) -> Result<(), ProxyError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(buf)
        .await
        .map_err(ProxyError::from_write_error)
}

/// Fill `buf` completely or return a short count on EOF — the `readn`
/// half of the buffered block-oriented I/O layer (§4.5).
pub async fn readn<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize, ProxyError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
