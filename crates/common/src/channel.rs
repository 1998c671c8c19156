//! Bounded report channel between a read pipeline and its readers
//!
//! The producer (one background thread per open device) never blocks: when
//! the queue is full the oldest report is evicted. Readers can wait forever,
//! wait until a deadline, or poll.
//!
//! ```text
//!   hid-read thread                 caller thread(s)
//!        │ push(report) ──> [ r1 r2 ... r30 ] ──> recv(wait)
//!        │ close()      ──> wakes every waiting reader
//! ```

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Maximum number of reports kept for an unread device
pub const MAX_QUEUED_REPORTS: usize = 30;

/// How long `recv` may wait for a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Block until a report arrives or the channel closes
    Forever,
    /// Return immediately
    NonBlocking,
    /// Block for at most this long
    Timeout(Duration),
}

impl Wait {
    /// Interpret a millisecond timeout: negative waits forever, zero polls
    pub fn from_millis(timeout_ms: i32) -> Self {
        match timeout_ms {
            t if t < 0 => Wait::Forever,
            0 => Wait::NonBlocking,
            t => Wait::Timeout(Duration::from_millis(t as u64)),
        }
    }
}

/// Outcome of a receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// The oldest queued report
    Report(Vec<u8>),
    /// Nothing arrived in time (or nothing queued, when polling)
    TimedOut,
    /// The producer is gone and the queue is empty
    Disconnected,
}

#[derive(Debug, Default)]
struct State {
    reports: VecDeque<Vec<u8>>,
    closed: bool,
    dropped: u64,
}

/// Drop-oldest report queue shared by a producer and any number of readers
#[derive(Debug)]
pub struct ReportChannel {
    state: Mutex<State>,
    available: Condvar,
    capacity: usize,
}

impl Default for ReportChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportChannel {
    /// Create a channel holding up to [`MAX_QUEUED_REPORTS`]
    pub fn new() -> Self {
        Self::with_capacity(MAX_QUEUED_REPORTS)
    }

    /// Create a channel with a custom capacity (at least 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(State {
                reports: VecDeque::with_capacity(capacity),
                ..State::default()
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Queue a report, evicting the oldest if full
    ///
    /// Returns false (and discards the report) once the channel is closed.
    pub fn push(&self, report: Vec<u8>) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }

        trace!("Queued {} byte report", report.len());
        state.reports.push_back(report);

        if state.reports.len() > self.capacity {
            state.reports.pop_front();
            state.dropped += 1;
            warn!(
                "Report queue full ({} reports), dropped oldest (total dropped: {})",
                self.capacity, state.dropped
            );
        }

        self.available.notify_one();
        true
    }

    /// Mark the producer as gone and wake every waiting reader
    ///
    /// Reports already queued can still be received.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.available.notify_all();
    }

    /// Receive the oldest report
    pub fn recv(&self, wait: Wait) -> Received {
        let deadline = match wait {
            Wait::Timeout(timeout) => Some(Instant::now() + timeout),
            _ => None,
        };

        let mut state = self.state.lock();
        loop {
            if let Some(report) = state.reports.pop_front() {
                return Received::Report(report);
            }
            if state.closed {
                return Received::Disconnected;
            }

            match (wait, deadline) {
                (Wait::NonBlocking, _) => return Received::TimedOut,
                (Wait::Forever, _) => self.available.wait(&mut state),
                (Wait::Timeout(_), Some(deadline)) => {
                    // Re-check the queue after every wake; only a passed
                    // deadline with nothing queued counts as a timeout.
                    if self.available.wait_until(&mut state, deadline).timed_out()
                        && state.reports.is_empty()
                        && !state.closed
                    {
                        return Received::TimedOut;
                    }
                }
                (Wait::Timeout(_), None) => return Received::TimedOut,
            }
        }
    }

    /// Number of queued reports
    pub fn len(&self) -> usize {
        self.state.lock().reports.len()
    }

    /// Whether no report is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the producer has closed the channel
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Reports evicted because the queue was full
    pub fn dropped(&self) -> u64 {
        self.state.lock().dropped
    }

    /// Maximum number of queued reports
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let channel = ReportChannel::new();
        channel.push(vec![1]);
        channel.push(vec![2]);

        assert_eq!(channel.recv(Wait::NonBlocking), Received::Report(vec![1]));
        assert_eq!(channel.recv(Wait::NonBlocking), Received::Report(vec![2]));
        assert_eq!(channel.recv(Wait::NonBlocking), Received::TimedOut);
    }

    #[test]
    fn test_drop_oldest_at_capacity() {
        let channel = ReportChannel::new();
        for i in 1..=31u8 {
            assert!(channel.push(vec![i]));
        }

        assert_eq!(channel.len(), MAX_QUEUED_REPORTS);
        assert_eq!(channel.dropped(), 1);

        for expected in 2..=31u8 {
            assert_eq!(
                channel.recv(Wait::NonBlocking),
                Received::Report(vec![expected])
            );
        }
        assert!(channel.is_empty());
    }

    #[test]
    fn test_non_blocking_returns_immediately() {
        let channel = ReportChannel::new();
        let start = Instant::now();
        assert_eq!(channel.recv(Wait::NonBlocking), Received::TimedOut);
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[test]
    fn test_timeout_expires() {
        let channel = ReportChannel::new();
        let start = Instant::now();
        assert_eq!(
            channel.recv(Wait::Timeout(Duration::from_millis(30))),
            Received::TimedOut
        );
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_forever_wakes_on_push() {
        let channel = Arc::new(ReportChannel::new());
        let producer = Arc::clone(&channel);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push(vec![0xaa, 0xbb]);
        });

        assert_eq!(
            channel.recv(Wait::Forever),
            Received::Report(vec![0xaa, 0xbb])
        );
        handle.join().unwrap();
    }

    #[test]
    fn test_close_wakes_waiters() {
        let channel = Arc::new(ReportChannel::new());
        let producer = Arc::clone(&channel);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.close();
        });

        let start = Instant::now();
        assert_eq!(channel.recv(Wait::Forever), Received::Disconnected);
        assert!(start.elapsed() < Duration::from_secs(1));
        handle.join().unwrap();
    }

    #[test]
    fn test_queued_reports_survive_close() {
        let channel = ReportChannel::new();
        channel.push(vec![7]);
        channel.close();

        assert!(!channel.push(vec![8]));
        assert_eq!(channel.recv(Wait::NonBlocking), Received::Report(vec![7]));
        assert_eq!(channel.recv(Wait::NonBlocking), Received::Disconnected);
    }

    #[test]
    fn test_wait_from_millis() {
        assert_eq!(Wait::from_millis(-1), Wait::Forever);
        assert_eq!(Wait::from_millis(-50), Wait::Forever);
        assert_eq!(Wait::from_millis(0), Wait::NonBlocking);
        assert_eq!(
            Wait::from_millis(250),
            Wait::Timeout(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_custom_capacity() {
        let channel = ReportChannel::with_capacity(0);
        assert_eq!(channel.capacity(), 1);
        channel.push(vec![1]);
        channel.push(vec![2]);
        assert_eq!(channel.dropped(), 1);
        assert_eq!(channel.recv(Wait::NonBlocking), Received::Report(vec![2]));
    }
}
