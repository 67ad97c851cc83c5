//! ---
//! sp_section: "04-telemetry-export"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Telemetry queue, worker, and scrape endpoint."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::Sample;

#[derive(Default)]
struct ChannelState {
    queue: VecDeque<Sample>,
    closed: bool,
}

#[derive(Default)]
struct Inner {
    state: Mutex<ChannelState>,
    available: Condvar,
}

/// FIFO handoff between the simulation caller and the telemetry worker.
///
/// One producer, one consumer. `push` never blocks; `pop` blocks until
/// a sample arrives or the channel is closed. After `close`, pending
/// samples are drained in order and `pop` then returns `None` forever.
/// Clones share the same underlying channel.
#[derive(Clone, Default)]
pub struct TelemetryChannel {
    inner: Arc<Inner>,
}

impl TelemetryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample and wake the consumer. Samples pushed after
    /// `close` are discarded; the producer initiates shutdown, so it
    /// has no business pushing afterwards.
    pub fn push(&self, sample: Sample) {
        let mut state = self.inner.state.lock();
        if state.closed {
            trace!(time = sample.time, "sample discarded after channel close");
            return;
        }
        state.queue.push_back(sample);
        self.inner.available.notify_one();
    }

    /// Block until a sample is available or the channel is closed and
    /// drained. `None` signals end-of-stream and is sticky.
    pub fn pop(&self) -> Option<Sample> {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(sample) = state.queue.pop_front() {
                return Some(sample);
            }
            if state.closed {
                return None;
            }
            self.inner.available.wait(&mut state);
        }
    }

    /// Mark the channel closed and wake every blocked consumer.
    /// Idempotent.
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        self.inner.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Number of samples waiting to be drained.
    pub fn len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn sample(time: f64) -> Sample {
        Sample {
            time,
            input: time * 2.0,
            output: time * 4.0,
            gain: 2.0,
        }
    }

    #[test]
    fn delivers_samples_in_fifo_order() {
        let channel = TelemetryChannel::new();
        for i in 0..5 {
            channel.push(sample(i as f64));
        }
        for i in 0..5 {
            assert_eq!(channel.pop().expect("sample").time, i as f64);
        }
    }

    #[test]
    fn close_drains_remaining_samples_before_end_of_stream() {
        let channel = TelemetryChannel::new();
        for i in 0..3 {
            channel.push(sample(i as f64));
        }
        channel.close();
        assert_eq!(channel.pop().expect("first").time, 0.0);
        assert_eq!(channel.pop().expect("second").time, 1.0);
        assert_eq!(channel.pop().expect("third").time, 2.0);
        assert_eq!(channel.pop(), None);
        // End-of-stream is sticky.
        assert_eq!(channel.pop(), None);
    }

    #[test]
    fn close_unblocks_a_waiting_consumer() {
        let channel = TelemetryChannel::new();
        let consumer = {
            let channel = channel.clone();
            thread::spawn(move || channel.pop())
        };
        // Give the consumer a moment to block in pop().
        thread::sleep(Duration::from_millis(50));
        channel.close();
        assert_eq!(consumer.join().expect("consumer exits"), None);
    }

    #[test]
    fn push_after_close_is_discarded() {
        let channel = TelemetryChannel::new();
        channel.close();
        channel.push(sample(1.0));
        assert!(channel.is_empty());
        assert_eq!(channel.pop(), None);
    }

    #[test]
    fn close_is_idempotent() {
        let channel = TelemetryChannel::new();
        channel.close();
        channel.close();
        assert!(channel.is_closed());
    }

    #[test]
    fn every_pushed_sample_is_observed_across_threads() {
        let channel = TelemetryChannel::new();
        let consumer = {
            let channel = channel.clone();
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Some(sample) = channel.pop() {
                    seen.push(sample.time);
                }
                seen
            })
        };
        for i in 0..100 {
            channel.push(sample(i as f64));
        }
        channel.close();
        let seen = consumer.join().expect("consumer exits");
        assert_eq!(seen.len(), 100);
        assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
