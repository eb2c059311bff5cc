use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::ProxyError;
use crate::headers::HeaderSet;
use crate::MAXLINE;

/// Read one line (request line or header line), refusing to buffer more
/// than `MAXLINE` bytes into it — the `take` wrapper caps the read
/// itself rather than letting `read_line` grow `line` unboundedly
/// before any length check can fire (a peer sending bytes with no
/// `\n` would otherwise never hit a cap at all). `limit + 1` lets the
/// read run one byte past `limit` so an over-long line is detected
/// instead of silently truncated to exactly `limit` bytes. Mirrors the
/// fixed-size `MAXLINE` stack buffer `Rio_readlineb` reads into.
pub async fn read_bounded_line<R>(reader: &mut R, limit: usize) -> Result<String, ProxyError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = reader
        .take(limit as u64 + 1)
        .read_line(&mut line)
        .await
        .map_err(ProxyError::from)?;
    if n > 0 && line.len() > limit {
        return Err(ProxyError::BadRequest("line too long"));
    }
    Ok(line)
}

/// Split a request line into its three whitespace-separated fields.
/// Fewer than three tokens is malformed — the line is missing a
/// method, URI, or version.
pub fn parse_request_line(line: &str) -> Result<(String, String, String), ProxyError> {
    let mut parts = line.split_whitespace();
    let method = parts.next().ok_or(ProxyError::BadRequest("malformed request line"))?;
    let uri = parts.next().ok_or(ProxyError::BadRequest("malformed request line"))?;
    let version = parts.next().ok_or(ProxyError::BadRequest("malformed request line"))?;
    Ok((method.to_string(), uri.to_string(), version.to_string()))
}

/// Split an absolute `http://` URI into host, port, and path, the way
/// the original `parse_uri` walks the byte buffer: scheme is required
/// (case-insensitive), the host runs until the first of
/// `' '`, `':'`, `'/'`, CR, LF or NUL, an optional `:port` follows, and
/// the path defaults to `"/"` when absent.
pub fn parse_uri(uri: &str) -> Result<(String, u16, String), ProxyError> {
    const SCHEME: &str = "http://";
    if uri.len() < SCHEME.len() || !uri[..SCHEME.len()].eq_ignore_ascii_case(SCHEME) {
        return Err(ProxyError::BadRequest("malformed uri"));
    }
    let rest = &uri[SCHEME.len()..];
    let bytes = rest.as_bytes();

    let host_end = bytes
        .iter()
        .position(|&b| matches!(b, b' ' | b':' | b'/' | b'\r' | b'\n' | 0))
        .unwrap_or(bytes.len());
    let host = rest[..host_end].to_string();
    if host.is_empty() {
        return Err(ProxyError::BadRequest("malformed uri"));
    }

    let mut port: u16 = 80;
    let mut cursor = host_end;
    if bytes.get(cursor) == Some(&b':') {
        cursor += 1;
        let port_start = cursor;
        while bytes
            .get(cursor)
            .is_some_and(|b| b.is_ascii_digit())
        {
            cursor += 1;
        }
        if cursor > port_start {
            port = rest[port_start..cursor].parse().unwrap_or(80);
        }
    }

    let path = match rest[host_end..].find('/') {
        Some(slash_rel) => rest[host_end + slash_rel..]
            .split(|c| c == '\r' || c == '\n')
            .next()
            .unwrap_or("/")
            .to_string(),
        None => "/".to_string(),
    };

    Ok((host, port, path))
}

/// Read a header block from a buffered async reader until the blank
/// terminator line, populating a `HeaderSet`. Each non-terminator line
/// must contain a `:`; the value is the suffix trimmed of a single
/// leading space and the trailing `\r\n`/`\n`. A value shorter than 3
/// bytes after the colon, a line with no `:`, or EOF before any line is
/// read are all malformed (§4.3).
pub async fn parse_headers<R>(reader: &mut R) -> Result<HeaderSet, ProxyError>
where
    R: AsyncBufRead + Unpin,
{
    let mut set = HeaderSet::new();

    let mut line = read_bounded_line(reader, MAXLINE).await?;
    if line.is_empty() {
        return Err(ProxyError::BadRequest("Incomplete request"));
    }

    while line != "\r\n" && line != "\n" {
        let colon = line.find(':').ok_or(ProxyError::BadRequest("Bad header"))?;
        let (name, rest) = line.split_at(colon);
        let value_raw = &rest[1..]; // drop ':'
        if value_raw.len() < 3 {
            return Err(ProxyError::BadRequest("Bad header"));
        }
        let trimmed = value_raw.trim_end_matches(['\r', '\n']);
        let value = trimmed.strip_prefix(' ').unwrap_or(trimmed);

        if set.need_header(name) {
            set.append_header(name, value)?;
        }

        line = read_bounded_line(reader, MAXLINE).await?;
    }

    Ok(set)
}
