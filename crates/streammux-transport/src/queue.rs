//! Outbound frame queue
//!
//! Frames arrive from the router over an unbounded channel. While there is
//! no connection they are moved into a bounded buffer; when it is full the
//! oldest frame is dropped.

use std::collections::VecDeque;
use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Outcome of waiting on something while buffering outbound frames
pub(crate) enum Hold<T> {
    Ready(T),
    Shutdown,
    /// Every router handle is gone, nothing can be sent anymore
    SendersGone,
}

pub(crate) struct OutboundQueue {
    pub(crate) rx: mpsc::UnboundedReceiver<Vec<u8>>,
    pending: VecDeque<Vec<u8>>,
    capacity: usize,
    dropped: u64,
}

impl OutboundQueue {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<Vec<u8>>, capacity: usize) -> Self {
        Self {
            rx,
            pending: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Buffer a frame at the back, evicting the oldest when full
    pub(crate) fn push_back(&mut self, frame: Vec<u8>) {
        if self.pending.len() >= self.capacity {
            self.pending.pop_front();
            self.dropped += 1;
            warn!(
                capacity = self.capacity,
                dropped_total = self.dropped,
                "[Transport] Outbound queue full, dropped oldest frame"
            );
        }
        self.pending.push_back(frame);
    }

    /// Return a frame that failed to send to the front of the buffer
    pub(crate) fn push_front(&mut self, frame: Vec<u8>) {
        if self.pending.len() >= self.capacity {
            self.dropped += 1;
            warn!(
                capacity = self.capacity,
                "[Transport] Outbound queue full, dropped unsent frame"
            );
            return;
        }
        self.pending.push_front(frame);
    }

    pub(crate) fn pop_front(&mut self) -> Option<Vec<u8>> {
        self.pending.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Drive `future` to completion, buffering any frames sent meanwhile
    pub(crate) async fn hold_until<F: Future>(
        &mut self,
        future: F,
        shutdown: &CancellationToken,
    ) -> Hold<F::Output> {
        tokio::pin!(future);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Hold::Shutdown,
                output = &mut future => return Hold::Ready(output),
                frame = self.rx.recv() => match frame {
                    Some(frame) => self.push_back(frame),
                    None => return Hold::SendersGone,
                },
            }
        }
    }
}
