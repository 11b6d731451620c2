//! Fixed-capacity ring of pending user requests.
//!
//! Enqueue never blocks and never fails: once the ring is full the oldest
//! unconsumed request is evicted to make room. Dequeue is FIFO.

use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;

use super::Request;

pub struct CommandQueue {
    ring: HeapRb<Request>,
}

impl CommandQueue {
    /// `capacity` must be non-zero; `Configuration::validate` guarantees it.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: HeapRb::new(capacity),
        }
    }

    /// Append a request, returning the entry evicted to make room, if any.
    pub fn enqueue(&mut self, request: Request) -> Option<Request> {
        let evicted = self.ring.push_overwrite(request);
        if let Some(old) = &evicted {
            log::debug!("command queue full, dropped {:?}", old.command);
        }
        evicted
    }

    /// Take the oldest pending request.
    pub fn dequeue(&mut self) -> Option<Request> {
        self.ring.try_pop()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    pub fn count(&self) -> usize {
        self.ring.occupied_len()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity().get()
    }

    /// Remove and return everything pending, oldest first.
    pub fn drain(&mut self) -> Vec<Request> {
        let mut pending = Vec::with_capacity(self.count());
        while let Some(request) = self.ring.try_pop() {
            pending.push(request);
        }
        pending
    }
}
