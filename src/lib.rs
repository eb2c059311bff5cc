//! A concurrent HTTP/1.0 forward proxy with an in-memory, LRU-style
//! object cache (see `DESIGN.md` for the grounding of each module).

pub mod cache;
pub mod error;
pub mod handler;
pub mod headers;
pub mod parser;
pub mod pool;
pub mod queue;
pub mod upstream;

pub use cache::{CacheItem, ObjectCache};
pub use error::ProxyError;
pub use handler::serve_client;
pub use headers::HeaderSet;
pub use parser::{parse_headers, parse_request_line, parse_uri, read_bounded_line};
pub use pool::run_proxy;
pub use queue::ConnectionQueue;
pub use upstream::dial;

/// Total cache budget in bytes.
pub const MAX_CACHE_SIZE: usize = 1_049_000;
/// Largest single response the cache will admit.
pub const MAX_OBJECT_SIZE: usize = 102_400;
/// Fixed worker pool size.
pub const POOL_SIZE: usize = 4;
/// Bounded connection queue capacity.
pub const SBUFSIZE: usize = 16;
/// Longest line the parser will read (request line, a header, or a
/// relay block).
pub const MAXLINE: usize = 8192;
/// Upper bound on header count per request.
pub const MAX_HEADER: usize = 40;
