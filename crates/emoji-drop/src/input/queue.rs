//! Ingestion queue between the realtime feed and the tick loop.
//!
//! The feed side holds a [`FeedSink`] and only ever appends; the engine holds
//! the [`IngestQueue`] and drains a bounded batch once per tick. The hand-off
//! is a fixed-capacity lock-free ring: when it is full, pushing displaces the
//! oldest pending event, so a burst keeps the most recent submissions instead
//! of replaying a backlog.
//!
//! Each subscription gets its own epoch. Only the sink whose epoch is live
//! may deliver, so a clone left behind by an earlier subscription stays dead
//! after the queue is attached again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::queue::{ArrayQueue, SegQueue};
use serde::{Deserialize, Serialize};

use crate::api::config::EngineConfig;
use crate::api::error::FeedError;
use crate::input::token::sanitize_token;

/// One accepted emoji submission, consumed exactly once by the throttle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiEvent {
    pub token: String,
    /// Arrival timestamp from the feed (milliseconds).
    pub timestamp: u64,
    /// Arrival sequence number, assigned on enqueue.
    pub seq: u64,
}

/// A raw record as delivered by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub emoji: String,
    pub timestamp: u64,
}

impl FeedRecord {
    pub fn new(emoji: impl Into<String>, timestamp: u64) -> Self {
        Self {
            emoji: emoji.into(),
            timestamp,
        }
    }
}

/// Why a record never reached the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Empty, too long, or containing control characters.
    Malformed,
    /// Stamped before the subscription started.
    BeforeSubscription,
}

/// Outcome of a successful `FeedSink::push`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Queued, and the oldest pending event was discarded to make room.
    QueuedWithTrim,
    Dropped(DropReason),
}

/// Non-fatal conditions reported by the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedNotice {
    Error(String),
    Disconnected(String),
}

const NO_EPOCH: u64 = 0;

#[derive(Debug)]
struct Shared {
    events: ArrayQueue<EmojiEvent>,
    notices: SegQueue<FeedNotice>,
    trimmed: AtomicU64,
    rejected: AtomicU64,
    next_seq: AtomicU64,
    /// Epoch of the subscription allowed to deliver; 0 when detached.
    live_epoch: AtomicU64,
    next_epoch: AtomicU64,
    max_token_chars: usize,
}

impl Shared {
    fn enqueue(&self, event: EmojiEvent) -> bool {
        if self.events.force_push(event).is_some() {
            self.trimmed.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

/// Consumer side of the ingestion queue, owned by the engine.
#[derive(Debug)]
pub struct IngestQueue {
    shared: Arc<Shared>,
}

impl IngestQueue {
    /// `bound` is the safety limit on pending events; beyond it the oldest are discarded.
    pub fn new(bound: usize, max_token_chars: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                events: ArrayQueue::new(bound.max(1)),
                notices: SegQueue::new(),
                trimmed: AtomicU64::new(0),
                rejected: AtomicU64::new(0),
                next_seq: AtomicU64::new(0),
                live_epoch: AtomicU64::new(NO_EPOCH),
                next_epoch: AtomicU64::new(NO_EPOCH + 1),
                max_token_chars,
            }),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.queue_bound, config.max_token_chars)
    }

    /// Append an already-validated event. Never blocks.
    /// Returns true if the oldest pending event was discarded to make room.
    pub fn enqueue(&self, event: EmojiEvent) -> bool {
        self.shared.enqueue(event)
    }

    /// Move up to `n` of the oldest events into `out`. Returns how many were moved.
    pub fn drain_up_to(&self, n: usize, out: &mut Vec<EmojiEvent>) -> usize {
        let mut taken = 0;
        while taken < n {
            match self.shared.events.pop() {
                Some(event) => {
                    out.push(event);
                    taken += 1;
                }
                None => break,
            }
        }
        taken
    }

    pub fn len(&self) -> usize {
        self.shared.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.events.is_empty()
    }

    pub fn bound(&self) -> usize {
        self.shared.events.capacity()
    }

    /// Open and activate a producer side in one step.
    /// Any sink from an earlier subscription stops delivering.
    pub fn sink(&self, subscribed_at: u64) -> FeedSink {
        let sink = self.open_sink(subscribed_at);
        self.activate(&sink);
        sink
    }

    /// Open a producer side without touching the live subscription.
    /// The sink refuses deliveries until passed to [`IngestQueue::activate`].
    /// Records stamped before `subscribed_at` are ignored.
    pub fn open_sink(&self, subscribed_at: u64) -> FeedSink {
        FeedSink {
            shared: Arc::clone(&self.shared),
            epoch: self.shared.next_epoch.fetch_add(1, Ordering::Relaxed),
            subscribed_at,
        }
    }

    /// Make `sink` the only one allowed to deliver.
    pub fn activate(&self, sink: &FeedSink) {
        self.shared.live_epoch.store(sink.epoch, Ordering::Release);
    }

    /// Refuse all further deliveries from every outstanding sink.
    pub fn detach(&self) {
        self.shared.live_epoch.store(NO_EPOCH, Ordering::Release);
    }

    pub fn is_attached(&self) -> bool {
        self.shared.live_epoch.load(Ordering::Acquire) != NO_EPOCH
    }

    /// Events discarded by the safety bound since the last call.
    pub fn take_trimmed(&self) -> u64 {
        self.shared.trimmed.swap(0, Ordering::Relaxed)
    }

    /// Malformed records dropped since the last call.
    pub fn take_rejected(&self) -> u64 {
        self.shared.rejected.swap(0, Ordering::Relaxed)
    }

    pub fn drain_notices(&self, out: &mut Vec<FeedNotice>) {
        while let Some(notice) = self.shared.notices.pop() {
            out.push(notice);
        }
    }

    /// Discard everything pending. Returns the number of events dropped.
    pub fn clear(&self) -> usize {
        let mut dropped = 0;
        while self.shared.events.pop().is_some() {
            dropped += 1;
        }
        while self.shared.notices.pop().is_some() {}
        dropped
    }
}

/// Producer side of the ingestion queue, handed to the feed.
/// Cheap to clone and safe to use from another thread.
#[derive(Debug, Clone)]
pub struct FeedSink {
    shared: Arc<Shared>,
    epoch: u64,
    subscribed_at: u64,
}

impl FeedSink {
    /// Validate and enqueue one record.
    ///
    /// Malformed or stale records are dropped without error; only a detached
    /// sink is an error, telling the feed to stop delivering.
    pub fn push(&self, record: FeedRecord) -> Result<Delivery, FeedError> {
        if !self.is_attached() {
            return Err(FeedError::Detached);
        }
        if record.timestamp < self.subscribed_at {
            return Ok(Delivery::Dropped(DropReason::BeforeSubscription));
        }
        let Some(token) = sanitize_token(&record.emoji, self.shared.max_token_chars) else {
            self.shared.rejected.fetch_add(1, Ordering::Relaxed);
            log::debug!("dropping malformed token {:?}", record.emoji);
            return Ok(Delivery::Dropped(DropReason::Malformed));
        };

        let event = EmojiEvent {
            token: token.to_string(),
            timestamp: record.timestamp,
            seq: self.shared.next_seq.fetch_add(1, Ordering::Relaxed),
        };
        if self.shared.enqueue(event) {
            Ok(Delivery::QueuedWithTrim)
        } else {
            Ok(Delivery::Queued)
        }
    }

    /// Surface a non-fatal feed error to the engine.
    pub fn report_error(&self, message: impl Into<String>) -> Result<(), FeedError> {
        self.notify(FeedNotice::Error(message.into()))
    }

    /// Surface a feed disconnect to the engine. Reconnecting is the feed's job.
    pub fn report_disconnect(&self, reason: impl Into<String>) -> Result<(), FeedError> {
        self.notify(FeedNotice::Disconnected(reason.into()))
    }

    fn notify(&self, notice: FeedNotice) -> Result<(), FeedError> {
        if !self.is_attached() {
            return Err(FeedError::Detached);
        }
        self.shared.notices.push(notice);
        Ok(())
    }

    /// End this sink's subscription. A newer subscription is left alone.
    pub fn close(&self) {
        let _ = self.shared.live_epoch.compare_exchange(
            self.epoch,
            NO_EPOCH,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn is_attached(&self) -> bool {
        self.shared.live_epoch.load(Ordering::Acquire) == self.epoch
    }

    pub fn subscribed_at(&self) -> u64 {
        self.subscribed_at
    }
}
