use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::cache::ObjectCache;
use crate::error::ProxyError;
use crate::headers::HeaderSet;
use crate::parser::{parse_headers, parse_request_line, parse_uri, read_bounded_line};
use crate::upstream::{dial, readn, write_all_polite};
use crate::{MAXLINE, MAX_CACHE_SIZE, MAX_OBJECT_SIZE};

/// Drive one accepted connection through
/// `READ_REQ -> PARSE -> CACHE_LOOKUP -> {HIT_REPLY | MISS_FETCH} -> DONE`
/// (§4.6). A client disconnecting before sending anything is a silent
/// `DONE`, not an error. Any other error propagates to the worker
/// loop, which logs it; reportable errors (bad request, not
/// implemented, DNS failure) have already been written to the client
/// as a synthesized response before this returns.
pub async fn serve_client(stream: TcpStream, cache: &ObjectCache) -> Result<(), ProxyError> {
    let (read_half, mut client_write) = stream.into_split();
    let mut client_read = BufReader::new(read_half);

    let line = read_bounded_line(&mut client_read, MAXLINE).await?;
    if line.is_empty() {
        return Ok(());
    }

    match handle_request(&line, &mut client_read, &mut client_write, cache).await {
        Ok(()) => Ok(()),
        Err(err) if err.is_reportable() => {
            // Best-effort: if sending the error response itself hits a
            // transport fault, there is nothing further to do — the
            // connection is already dead.
            let _ = send_error_response(&mut client_write, &err).await;
            Ok(())
        }
        Err(err) => Err(err),
    }
}

async fn handle_request<R, W>(
    request_line: &str,
    client_read: &mut BufReader<R>,
    client_write: &mut W,
    cache: &ObjectCache,
) -> Result<(), ProxyError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (method, uri, version) = parse_request_line(request_line)?;

    if method != "GET" {
        return Err(ProxyError::NotImplemented(method));
    }
    if uri.is_empty() {
        return Err(ProxyError::BadRequest("Missing uri"));
    }
    if version != "HTTP/1.0" && version != "HTTP/1.1" {
        return Err(ProxyError::BadRequest("Version not match"));
    }
    let (host, port, path) = parse_uri(&uri)?;

    let mut headers = parse_headers(client_read).await?;
    headers.apply_canonical_set(&host)?;

    if cache.probe(&uri).await {
        if let Some(body) = cache.fetch(&uri).await {
            debug!(uri, "cache hit");
            write_all_polite(client_write, &body).await?;
            return Ok(());
        }
        // Raced with an eviction between probe and fetch (§9); fall
        // through to the origin exactly as a plain miss would.
    }
    debug!(uri, "cache miss");

    fetch_from_upstream(&host, port, &path, &headers, &uri, client_write, cache).await
}

#[allow(clippy::too_many_arguments)]
async fn fetch_from_upstream<W>(
    host: &str,
    port: u16,
    path: &str,
    headers: &HeaderSet,
    uri: &str,
    client_write: &mut W,
    cache: &ObjectCache,
) -> Result<(), ProxyError>
where
    W: AsyncWrite + Unpin,
{
    let mut upstream = dial(host, port).await?;

    write_all_polite(&mut upstream, format!("GET {path} HTTP/1.0\r\n").as_bytes()).await?;
    for (name, value) in headers.iter() {
        write_all_polite(&mut upstream, format!("{name}: {value}\r\n").as_bytes()).await?;
    }
    write_all_polite(&mut upstream, b"\r\n").await?;

    let mut block = [0u8; MAXLINE];
    let mut captured = BytesMut::with_capacity(MAX_OBJECT_SIZE.min(64 * 1024));
    let mut total_size = 0usize;

    loop {
        let n = readn(&mut upstream, &mut block).await?;
        if n == 0 {
            break;
        }
        total_size += n;
        if captured.len() + n <= MAX_OBJECT_SIZE {
            captured.extend_from_slice(&block[..n]);
        }
        write_all_polite(client_write, &block[..n]).await?;
    }
    drop(upstream);

    if total_size <= MAX_OBJECT_SIZE {
        let body = captured.freeze();
        let stored = if total_size + cache.total_size().await <= MAX_CACHE_SIZE {
            cache.insert(uri.to_string(), body).await
        } else {
            cache.evict_and_insert(uri.to_string(), body).await
        };
        if stored {
            info!(uri, total_size, "cached upstream response");
        }
    } else {
        debug!(uri, total_size, "response exceeds MAX_OBJECT_SIZE, not cached");
    }

    Ok(())
}

async fn send_error_response<W>(writer: &mut W, err: &ProxyError) -> Result<(), ProxyError>
where
    W: AsyncWrite + Unpin,
{
    let body = format!(
        "<html><title>Proxy Error</title><body bgcolor=\"ffffff\">\r\n\
         {} {}\r\n<p>{err}</p>\r\n<hr><em>httproxy</em>\r\n",
        err.status_code(),
        err.short_message(),
    );
    let status_line = format!("HTTP/1.0 {} {}\r\n", err.status_code(), err.short_message());

    write_all_polite(writer, status_line.as_bytes()).await?;
    write_all_polite(writer, b"Content-type: text/html\r\n").await?;
    write_all_polite(
        writer,
        format!("Content-length: {}\r\n\r\n", body.len()).as_bytes(),
    )
    .await?;
    write_all_polite(writer, body.as_bytes()).await?;
    warn!(status = err.status_code(), %err, "replied with error response");
    Ok(())
}
