use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Outcome of [`BlockingWorkQueue::take_timeout`].
#[derive(Debug, PartialEq, Eq)]
pub enum Take<T> {
    Item(T),
    TimedOut,
    /// The queue is closed and has nothing left to hand out.
    Closed,
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Unbounded FIFO with a blocking `take`.
///
/// Closing the queue does not discard anything: consumers keep receiving
/// items until it is drained, after which `take` returns `None` instead of
/// blocking.
pub struct BlockingWorkQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
}

impl<T> BlockingWorkQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append to the tail and wake at most one waiting consumer.
    pub fn put(&self, item: T) {
        self.state.lock().items.push_back(item);
        self.available.notify_one();
    }

    /// Remove the head, blocking while the queue is empty and open.
    pub fn take(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    pub fn try_take(&self) -> Option<T> {
        self.state.lock().items.pop_front()
    }

    pub fn take_timeout(&self, timeout: Duration) -> Take<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Take::Item(item);
            }
            if state.closed {
                return Take::Closed;
            }
            if self.available.wait_until(&mut state, deadline).timed_out() {
                return match state.items.pop_front() {
                    Some(item) => Take::Item(item),
                    None => Take::TimedOut,
                };
            }
        }
    }

    /// Snapshot only; may be stale by the time the caller looks at it.
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Wake every blocked consumer. Remaining items are still handed out.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl<T> Default for BlockingWorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for BlockingWorkQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BlockingWorkQueue")
            .field("len", &state.items.len())
            .field("closed", &state.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let queue = BlockingWorkQueue::new();
        for i in 0..5 {
            queue.put(i);
        }

        let taken: Vec<i32> = (0..5).map(|_| queue.take().unwrap()).collect();
        assert_eq!(taken, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_take_blocks_until_put() {
        let queue = Arc::new(BlockingWorkQueue::new());
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.take())
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!consumer.is_finished());

        queue.put("wake");
        assert_eq!(consumer.join().unwrap(), Some("wake"));
    }

    #[test]
    fn test_close_drains_then_returns_none() {
        let queue = BlockingWorkQueue::new();
        queue.put(1);
        queue.close();
        queue.put(2);

        assert!(queue.is_closed());
        assert_eq!(queue.take(), Some(1));
        assert_eq!(queue.take(), Some(2));
        assert_eq!(queue.take(), None);
    }

    #[test]
    fn test_close_wakes_blocked_consumers() {
        let queue = Arc::new(BlockingWorkQueue::<u8>::new());
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || queue.take())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        queue.close();

        for consumer in consumers {
            assert_eq!(consumer.join().unwrap(), None);
        }
    }

    #[test]
    fn test_take_timeout() {
        let queue = BlockingWorkQueue::new();
        assert_eq!(queue.take_timeout(Duration::from_millis(10)), Take::TimedOut);

        queue.put(9);
        assert_eq!(queue.take_timeout(Duration::from_millis(10)), Take::Item(9));

        queue.close();
        assert_eq!(queue.take_timeout(Duration::from_secs(5)), Take::Closed);
    }

    #[test]
    fn test_try_take_never_blocks() {
        let queue = BlockingWorkQueue::<()>::new();
        assert_eq!(queue.try_take(), None);
        assert_eq!(queue.len(), 0);
    }
}
