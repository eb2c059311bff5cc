use crate::error::ProxyError;
use crate::{MAXLINE, MAX_HEADER};

/// Header names the proxy always sets itself; a client-supplied value
/// under one of these names is dropped rather than forwarded (§4.4).
const SUPPRESSED: &[&str] = &[
    "User-Agent",
    "Accepts",
    "Accept-Encoding",
    "Connection",
    "Proxy-Connection",
];

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_ENCODING: &str = "gzip, deflate";

/// Ordered, bounded-capacity (name, value) pairs for one request.
/// Duplicates are not permitted — callers check `need_header` before
/// `append_header`, so `append_header` itself never deduplicates.
#[derive(Debug, Default, Clone)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == name)
    }

    /// Unconditional push at the tail. Returns an error if the set is
    /// already at `MAX_HEADER` capacity or the name/value would exceed
    /// `MAXLINE` once serialized.
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<(), ProxyError> {
        if self.entries.len() >= MAX_HEADER {
            return Err(ProxyError::BadRequest("too many headers"));
        }
        if name.len() + value.len() + 4 > MAXLINE {
            return Err(ProxyError::BadRequest("header line too long"));
        }
        self.entries.push((name.to_string(), value.to_string()));
        Ok(())
    }

    /// `true` unless `name` is a suppressed hop-by-hop/agent header or
    /// already present (case-sensitive compare, per §4.4).
    pub fn need_header(&self, name: &str) -> bool {
        if SUPPRESSED.iter().any(|s| *s == name) {
            return false;
        }
        !self.contains(name)
    }

    /// Append the proxy's canonical header block in the fixed order
    /// specified in §4.4, then synthesize `Host` if the client didn't
    /// supply one.
    pub fn apply_canonical_set(&mut self, host: &str) -> Result<(), ProxyError> {
        self.append_header("User-Agent", USER_AGENT)?;
        self.append_header("Accept", ACCEPT)?;
        self.append_header("Accept-Encoding", ACCEPT_ENCODING)?;
        self.append_header("Connection", "close")?;
        self.append_header("Proxy-Connection", "close")?;
        if self.need_header("Host") {
            self.append_header("Host", host)?;
        }
        Ok(())
    }
}
