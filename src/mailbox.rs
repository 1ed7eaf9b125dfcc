//! Latest-value frame mailbox.
//!
//! A single-slot handoff between the detection thread (producer) and the
//! streaming threads (consumers):
//!
//! - `publish` overwrites the held frame, dropping any unread value. This is
//!   a latest-value mailbox, not a queue: no backpressure, no history.
//! - `try_consume` clones the held frame without clearing it; consuming
//!   twice without an intervening publish yields the same frame.
//! - `wait_newer` parks on a condition variable until a publish raises the
//!   sequence number. Always delivers the latest frame, never blocks past
//!   the timeout.
//!
//! The lock is held only for the slot read or write; encoding and filtering
//! happen outside it so the producer is never stalled by a slow consumer.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::frame::Frame;

#[derive(Default)]
struct Slot {
    frame: Option<Frame>,
    /// Publish count; starts at 0, first publish makes it 1.
    seq: u64,
}

/// Single-slot mailbox holding the most recently published frame.
#[derive(Default)]
pub struct FrameMailbox {
    slot: Mutex<Slot>,
    published: Condvar,
}

impl FrameMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        // A poisoned slot only means a publisher panicked mid-assignment;
        // the Option<Frame> inside is still coherent.
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Overwrite the held frame and wake waiting consumers.
    pub fn publish(&self, frame: Frame) {
        let mut slot = self.lock_slot();
        slot.frame = Some(frame);
        slot.seq += 1;
        drop(slot);
        self.published.notify_all();
    }

    /// Snapshot of the held frame, if any. Does not clear the slot.
    pub fn try_consume(&self) -> Option<Frame> {
        self.lock_slot().frame.clone()
    }

    /// Sequence number of the most recent publish (0 before the first).
    pub fn latest_seq(&self) -> u64 {
        self.lock_slot().seq
    }

    /// Block until a frame newer than `last_seq` is published, returning the
    /// frame and its sequence number, or `None` on timeout.
    pub fn wait_newer(&self, last_seq: u64, timeout: Duration) -> Option<(Frame, u64)> {
        let slot = self.lock_slot();
        let (slot, result) = match self
            .published
            .wait_timeout_while(slot, timeout, |s| s.seq <= last_seq)
        {
            Ok((guard, timed_out)) => {
                let hit = !timed_out.timed_out();
                (guard, hit)
            }
            Err(poisoned) => {
                let (guard, timed_out) = poisoned.into_inner();
                (guard, !timed_out.timed_out())
            }
        };
        if result {
            slot.frame.clone().map(|frame| (frame, slot.seq))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    fn frame(tone: u8) -> Frame {
        Frame::filled(8, 8, [tone, tone, tone])
    }

    #[test]
    fn empty_mailbox_yields_absent() {
        let mailbox = FrameMailbox::new();
        assert!(mailbox.try_consume().is_none());
        assert_eq!(mailbox.latest_seq(), 0);
    }

    #[test]
    fn consume_returns_what_was_published() {
        let mailbox = FrameMailbox::new();
        mailbox.publish(frame(7));
        assert_eq!(mailbox.try_consume(), Some(frame(7)));
    }

    #[test]
    fn repeated_consumption_yields_the_same_frame() {
        let mailbox = FrameMailbox::new();
        mailbox.publish(frame(7));
        let first = mailbox.try_consume();
        let second = mailbox.try_consume();
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[test]
    fn publish_overwrites_the_unread_value() {
        let mailbox = FrameMailbox::new();
        mailbox.publish(frame(1));
        mailbox.publish(frame(2));
        assert_eq!(mailbox.try_consume(), Some(frame(2)));
        assert_eq!(mailbox.latest_seq(), 2);
    }

    #[test]
    fn wait_newer_wakes_on_publish() {
        let mailbox = Arc::new(FrameMailbox::new());
        let publisher = mailbox.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            publisher.publish(frame(9));
        });

        let got = mailbox.wait_newer(0, Duration::from_secs(5));
        handle.join().unwrap();

        let (received, seq) = got.expect("publish should wake the waiter");
        assert_eq!(received, frame(9));
        assert_eq!(seq, 1);
    }

    #[test]
    fn wait_newer_times_out_without_a_publish() {
        let mailbox = FrameMailbox::new();
        let start = Instant::now();
        assert!(mailbox.wait_newer(0, Duration::from_millis(20)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn wait_newer_returns_immediately_for_an_older_seq() {
        let mailbox = FrameMailbox::new();
        mailbox.publish(frame(3));
        let got = mailbox.wait_newer(0, Duration::from_millis(1));
        assert_eq!(got, Some((frame(3), 1)));
    }
}
