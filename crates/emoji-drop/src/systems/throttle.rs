use crate::input::queue::{EmojiEvent, IngestQueue};

/// Caps how many queued events become particles per tick.
///
/// However deep the queue is, one tick instantiates at most `cap` particles;
/// the rest wait for later ticks (subject to the queue's own trimming).
#[derive(Debug)]
pub struct AdmissionThrottle {
    cap: usize,
    batch: Vec<EmojiEvent>,
    total_admitted: u64,
}

impl AdmissionThrottle {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            batch: Vec::with_capacity(cap),
            total_admitted: 0,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Drain up to `cap` events and hand each one to `spawn`, oldest first.
    /// Returns the number of events admitted.
    pub fn admit(&mut self, queue: &IngestQueue, mut spawn: impl FnMut(EmojiEvent)) -> usize {
        self.batch.clear();
        let admitted = queue.drain_up_to(self.cap, &mut self.batch);
        for event in self.batch.drain(..) {
            spawn(event);
        }
        self.total_admitted += admitted as u64;
        admitted
    }

    pub fn total_admitted(&self) -> u64 {
        self.total_admitted
    }
}
