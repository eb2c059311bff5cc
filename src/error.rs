use thiserror::Error;

/// Errors surfaced while serving a single proxy connection.
///
/// `BadRequest` and `NotImplemented` map to synthesized HTTP error
/// responses (§6 of the design doc). `UpstreamUnavailable` maps to the
/// non-standard `1000` status used for DNS/connect failure. `Transport`
/// is the structured stand-in for the original's signal-driven
/// non-local escape: it is returned by the write wrapper whenever the
/// peer reset the connection or closed its read side mid-relay, and
/// propagated with `?` straight back to the top of the handler.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Bad Request: {0}")]
    BadRequest(&'static str),

    #[error("Not Implemented: method {0} is not supported")]
    NotImplemented(String),

    #[error("DNS failed")]
    UpstreamUnavailable,

    #[error("peer transport fault: {0}")]
    Transport(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// HTTP status code to report to the client, per §6.
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::BadRequest(_) => 400,
            ProxyError::NotImplemented(_) => 501,
            ProxyError::UpstreamUnavailable => 1000,
            ProxyError::Transport(_) | ProxyError::Io(_) => 0,
        }
    }

    pub fn short_message(&self) -> &'static str {
        match self {
            ProxyError::BadRequest(_) => "Bad Request",
            ProxyError::NotImplemented(_) => "Not Implemented",
            ProxyError::UpstreamUnavailable => "DNS failed",
            ProxyError::Transport(_) | ProxyError::Io(_) => "Internal Error",
        }
    }

    /// Whether this error should ever reach the wire as a synthesized
    /// response. Transport/Io faults occur mid-relay, after a reply may
    /// already be partially sent, so they never get one (§7, class 3).
    pub fn is_reportable(&self) -> bool {
        !matches!(self, ProxyError::Transport(_) | ProxyError::Io(_))
    }

    /// Classify a raw I/O error from a write as a peer transport fault
    /// (broken pipe / connection reset) vs. anything else. Grounded on
    /// `rio_writen_p`'s `ECONNRESET` check and the original's SIGPIPE
    /// handler, both of which feed the same recovery anchor.
    pub fn from_write_error(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => ProxyError::Transport(err),
            _ => ProxyError::Io(err),
        }
    }
}
