use crate::api::error::FeedError;
use crate::input::queue::{Delivery, FeedRecord, FeedSink};

/// A realtime source of emoji records, ordered by arrival timestamp.
///
/// The engine hands the feed a [`FeedSink`] on subscribe; the feed pushes
/// records into it from whatever context its transport runs on.
pub trait EmojiFeed {
    fn subscribe(&mut self, sink: FeedSink) -> Result<(), FeedError>;

    /// Stop delivering. After this returns no further records reach the engine.
    fn unsubscribe(&mut self);
}

/// Feed driven by the host: records are delivered by calling [`ManualFeed::deliver`].
/// Used by the browser bridge (the JS realtime listener calls in) and by tests.
#[derive(Debug, Default)]
pub struct ManualFeed {
    sink: Option<FeedSink>,
}

impl ManualFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self) -> bool {
        self.sink.as_ref().is_some_and(FeedSink::is_attached)
    }

    pub fn deliver(&mut self, record: FeedRecord) -> Result<Delivery, FeedError> {
        let sink = self.sink.as_ref().ok_or(FeedError::NotSubscribed)?;
        let result = sink.push(record);
        if result == Err(FeedError::Detached) {
            // The engine went away; forget the sink so we stop trying.
            self.sink = None;
        }
        result
    }

    /// Forward a transport error to the engine.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), FeedError> {
        let sink = self.sink.as_ref().ok_or(FeedError::NotSubscribed)?;
        sink.report_error(message)
    }

    /// Forward a transport disconnect to the engine.
    pub fn disconnect(&mut self, reason: impl Into<String>) -> Result<(), FeedError> {
        let sink = self.sink.as_ref().ok_or(FeedError::NotSubscribed)?;
        sink.report_disconnect(reason)
    }
}

impl EmojiFeed for ManualFeed {
    fn subscribe(&mut self, sink: FeedSink) -> Result<(), FeedError> {
        if self.is_subscribed() {
            return Err(FeedError::AlreadySubscribed);
        }
        self.sink = Some(sink);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::queue::IngestQueue;

    #[test]
    fn deliver_requires_subscription() {
        let mut feed = ManualFeed::new();
        assert_eq!(
            feed.deliver(FeedRecord::new("🐱", 1)),
            Err(FeedError::NotSubscribed)
        );
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let q = IngestQueue::new(8, 5);
        let mut feed = ManualFeed::new();
        feed.subscribe(q.sink(0)).unwrap();
        feed.deliver(FeedRecord::new("🐱", 1)).unwrap();
        feed.unsubscribe();
        assert!(!q.is_attached());
        assert_eq!(
            feed.deliver(FeedRecord::new("🐶", 2)),
            Err(FeedError::NotSubscribed)
        );
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn detached_engine_drops_the_sink() {
        let q = IngestQueue::new(8, 5);
        let mut feed = ManualFeed::new();
        feed.subscribe(q.sink(0)).unwrap();
        q.detach();
        assert_eq!(feed.deliver(FeedRecord::new("🐱", 1)), Err(FeedError::Detached));
        assert!(!feed.is_subscribed());
    }

    #[test]
    fn double_subscribe_rejected() {
        let q = IngestQueue::new(8, 5);
        let mut feed = ManualFeed::new();
        feed.subscribe(q.sink(0)).unwrap();
        assert_eq!(feed.subscribe(q.open_sink(0)), Err(FeedError::AlreadySubscribed));
        assert!(feed.is_subscribed());
    }
}
