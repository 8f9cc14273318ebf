//! Bounded frame queue
//!
//! Datagrams captured from the virtual endpoint wait here until the splice
//! loop forwards them. Once the queue holds `limit` frames new datagrams
//! are dropped; queued ones are never evicted.

use crate::socks::TargetAddr;
use std::collections::VecDeque;

/// One captured datagram waiting to be forwarded
#[derive(Debug)]
pub struct Frame<B> {
    /// Address reported to the proxy for this datagram
    pub addr: TargetAddr,
    /// Owned payload buffer
    pub data: B,
}

/// Why a datagram was not queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dropped {
    /// The queue is at its limit
    Full,
    /// No memory for another frame
    OutOfMemory,
}

/// FIFO of captured frames with a hard size limit
#[derive(Debug)]
pub struct FrameQueue<B> {
    frames: VecDeque<Frame<B>>,
    limit: usize,
}

impl<B> FrameQueue<B> {
    /// Create an empty queue holding at most `limit` frames
    pub fn new(limit: usize) -> Self {
        FrameQueue {
            frames: VecDeque::new(),
            limit,
        }
    }

    /// Append a datagram at the tail
    ///
    /// On rejection the payload is released before returning.
    pub fn enqueue(&mut self, addr: TargetAddr, data: B) -> Result<usize, Dropped> {
        if self.frames.len() >= self.limit {
            return Err(Dropped::Full);
        }
        if self.frames.try_reserve(1).is_err() {
            return Err(Dropped::OutOfMemory);
        }

        self.frames.push_back(Frame { addr, data });
        Ok(self.frames.len())
    }

    /// Remove and return the oldest frame
    pub fn dequeue_front(&mut self) -> Option<Frame<B>> {
        self.frames.pop_front()
    }

    /// Release every queued frame, returning how many there were
    pub fn drain(&mut self) -> usize {
        let count = self.frames.len();
        self.frames.clear();
        count
    }

    /// Number of queued frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Maximum number of queued frames
    pub fn limit(&self) -> usize {
        self.limit
    }
}
