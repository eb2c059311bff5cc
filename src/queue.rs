use std::collections::VecDeque;

use tokio::sync::{Mutex, Semaphore};

/// Fixed-capacity, thread/task-safe FIFO of accepted connections, built
/// on the classic two-semaphore-plus-mutex discipline (§4.1, §5): one
/// semaphore counts free slots, the other counts filled slots, and a
/// mutex guards the ring buffer itself. `enqueue` suspends while full,
/// `dequeue` suspends while empty; FIFO order holds across successful
/// pairs, and safe for one producer with many consumers (or many of
/// both).
pub struct ConnectionQueue<T> {
    free_slots: Semaphore,
    filled_slots: Semaphore,
    buf: Mutex<VecDeque<T>>,
}

impl<T> ConnectionQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            free_slots: Semaphore::new(capacity),
            filled_slots: Semaphore::new(0),
            buf: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Blocks while the queue is full; appends and wakes a blocked
    /// dequeuer.
    pub async fn enqueue(&self, item: T) {
        let permit = self
            .free_slots
            .acquire()
            .await
            .expect("connection queue semaphore never closes");
        permit.forget();
        {
            let mut buf = self.buf.lock().await;
            buf.push_back(item);
        }
        self.filled_slots.add_permits(1);
    }

    /// Blocks while the queue is empty; removes and returns the oldest
    /// entry.
    pub async fn dequeue(&self) -> T {
        let permit = self
            .filled_slots
            .acquire()
            .await
            .expect("connection queue semaphore never closes");
        permit.forget();
        let item = {
            let mut buf = self.buf.lock().await;
            buf.pop_front()
                .expect("filled_slots permit implies a non-empty buffer")
        };
        self.free_slots.add_permits(1);
        item
    }
}
