//! Bounded, always tick-sorted event storage.

use heapless::Vec;

use crate::event::LoopEvent;

/// Fixed per-track event capacity.
pub const MAX_EVENTS: usize = 512;

/// Insert failed: the store is at capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreFull;

/// A bounded array of events kept sorted ascending by tick.
///
/// Insertion is stable: events with equal ticks stay in arrival order.
/// The playback engine relies on the ordering for its linear scan, so the
/// invariant holds at all times, not just between explicit sorts.
#[derive(Clone, Debug, Default)]
pub struct EventStore {
    events: Vec<LoopEvent, MAX_EVENTS>,
}

impl EventStore {
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.is_full()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn events(&self) -> &[LoopEvent] {
        &self.events
    }

    pub fn get(&self, index: usize) -> Option<&LoopEvent> {
        self.events.get(index)
    }

    /// Insert keeping tick order. Returns the insertion index.
    pub fn insert(&mut self, event: LoopEvent) -> Result<usize, StoreFull> {
        if self.events.is_full() {
            return Err(StoreFull);
        }
        // First index whose tick is greater — keeps equal ticks stable.
        let pos = self.events.partition_point(|e| e.tick <= event.tick);
        self.events.insert(pos, event).map_err(|_| StoreFull)?;
        Ok(pos)
    }

    /// Remove the event at `index`.
    pub fn remove(&mut self, index: usize) -> Option<LoopEvent> {
        if index < self.events.len() {
            Some(self.events.remove(index))
        } else {
            None
        }
    }

    /// Replace the event at `index`, restoring order. Returns the new index.
    pub fn replace(&mut self, index: usize, event: LoopEvent) -> Option<usize> {
        if index >= self.events.len() {
            return None;
        }
        self.events.remove(index);
        // Capacity cannot fail: we just removed one.
        match self.insert(event) {
            Ok(pos) => Some(pos),
            Err(StoreFull) => None,
        }
    }

    /// Reduce all ticks modulo `loop_len` and restore ordering.
    ///
    /// Used once the loop length is fixed after recording, when quantization
    /// may have pushed tail events past the end of the loop.
    pub fn rebase(&mut self, loop_len: u32) {
        if loop_len == 0 {
            return;
        }
        for e in self.events.iter_mut() {
            e.tick %= loop_len;
        }
        self.sort();
    }

    /// In-place stable insertion sort by tick.
    ///
    /// No allocation; fine at this capacity (<= 512 events).
    fn sort(&mut self) {
        let ev = &mut self.events;
        for i in 1..ev.len() {
            let key = ev[i];
            let mut j = i;
            while j > 0 && ev[j - 1].tick > key.tick {
                ev[j] = ev[j - 1];
                j -= 1;
            }
            ev[j] = key;
        }
    }
}
