use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::task_local;
use tracing::{info, warn};

use crate::cache::ObjectCache;
use crate::handler::serve_client;
use crate::queue::ConnectionQueue;
use crate::{POOL_SIZE, SBUFSIZE};

task_local! {
    /// Replaces the original's `thread_control_index` linear scan
    /// (§4.7, §9): each worker sets this once, at spawn, and every
    /// later log line inside that worker's call tree can read it
    /// without a lookup table.
    static WORKER_ID: usize;
}

pub(crate) fn current_worker_id() -> Option<usize> {
    WORKER_ID.try_with(|id| *id).ok()
}

/// Bind `port`, start the fixed-size worker pool, and run the acceptor
/// loop forever (§4.7). The acceptor never touches the cache or parser
/// directly — it only moves accepted sockets into the bounded queue.
pub async fn run_proxy(port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    let cache = Arc::new(ObjectCache::new());
    let queue: Arc<ConnectionQueue<TcpStream>> = Arc::new(ConnectionQueue::new(SBUFSIZE));

    for id in 0..POOL_SIZE {
        let queue = queue.clone();
        let cache = cache.clone();
        tokio::spawn(WORKER_ID.scope(id, worker_loop(queue, cache)));
    }

    info!(port, pool_size = POOL_SIZE, queue_capacity = SBUFSIZE, "proxy listening");

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tracing::debug!(%addr, "accepted connection");
                queue.enqueue(stream).await;
            }
            Err(err) => {
                warn!(error = %err, "accept failed");
            }
        }
    }
}

async fn worker_loop(queue: Arc<ConnectionQueue<TcpStream>>, cache: Arc<ObjectCache>) {
    let id = current_worker_id();
    info!(worker_id = id, "worker up");
    loop {
        let stream = queue.dequeue().await;
        if let Err(err) = serve_client(stream, &cache).await {
            if err.is_reportable() {
                warn!(worker_id = id, error = %err, "request failed");
            } else {
                warn!(worker_id = id, error = %err, "peer transport fault, connection dropped");
            }
        }
    }
}
