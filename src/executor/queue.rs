//! Bounded result queue
//!
//! The only state shared across runner threads. Producers block on a
//! full queue; the single consumer polls with a timeout.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::variant::VariantRecord;

use super::errors::ExecutorError;

/// A queued record, or the terminal error of one runner
pub type QueueItem = Result<VariantRecord, ExecutorError>;

/// Outcome of one consumer poll
#[derive(Debug)]
pub enum Poll {
    Item(QueueItem),
    /// Nothing arrived within the timeout
    Empty,
}

/// Producer handle held by one runner
#[derive(Debug, Clone)]
pub struct QueueSender {
    tx: Sender<QueueItem>,
}

impl QueueSender {
    /// Blocks while the queue is full. Returns false once the consumer
    /// side is gone.
    pub fn push(&self, item: QueueItem) -> bool {
        self.tx.send(item).is_ok()
    }
}

/// Fixed-capacity FIFO owned by one query result
#[derive(Debug)]
pub struct ResultQueue {
    tx: Sender<QueueItem>,
    rx: Receiver<QueueItem>,
    capacity: usize,
}

impl ResultQueue {
    /// `capacity` of zero is raised to one; a rendezvous queue would
    /// deadlock a runner pushing while nobody polls.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, capacity }
    }

    pub fn sender(&self) -> QueueSender {
        QueueSender {
            tx: self.tx.clone(),
        }
    }

    pub fn poll(&self, timeout: Duration) -> Poll {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Poll::Item(item),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Poll::Empty,
        }
    }

    pub fn try_pop(&self) -> Option<QueueItem> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorError;
    use std::thread;

    #[test]
    fn test_fifo_and_len() {
        let queue = ResultQueue::new(4);
        let sender = queue.sender();
        assert!(sender.push(Err(ExecutorError::pool_failed("a"))));
        assert!(sender.push(Err(ExecutorError::pool_failed("b"))));
        assert_eq!(queue.len(), 2);

        match queue.poll(Duration::from_millis(10)) {
            Poll::Item(Err(e)) => assert_eq!(e.message(), "a"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(queue.try_pop().unwrap().unwrap_err().message(), "b");
        assert!(queue.is_empty());
        assert!(matches!(queue.poll(Duration::from_millis(5)), Poll::Empty));
    }

    #[test]
    fn test_push_blocks_until_drained() {
        let queue = ResultQueue::new(1);
        let sender = queue.sender();
        sender.push(Err(ExecutorError::pool_failed("first")));

        let handle = thread::spawn(move || sender.push(Err(ExecutorError::pool_failed("second"))));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.len(), 1);

        queue.try_pop();
        assert!(handle.join().unwrap());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_push_after_consumer_dropped() {
        let queue = ResultQueue::new(1);
        let sender = queue.sender();
        drop(queue);
        assert!(!sender.push(Err(ExecutorError::pool_failed("late"))));
    }

    #[test]
    fn test_zero_capacity_raised() {
        assert_eq!(ResultQueue::new(0).capacity(), 1);
    }
}
