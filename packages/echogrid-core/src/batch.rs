//! batch.rs — epoch batching of per-microphone samples
//!
//! Readings arrive one microphone at a time, tagged with the measurement
//! epoch (unix second). A batch is complete once one reading per configured
//! microphone exists; the batcher hands it out exactly once and drops the
//! slot. Insert-and-check is a single read-modify-write, so a caller
//! holding a mutex around the batcher cannot lose the completion race
//! between two concurrent arrivals.
//!
//! The buffer is bounded: half-filled batches that never complete are
//! evicted by age (`sweep`) and the slot count is capped, oldest first.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Batching policy. `expected_readings` is the configured microphone count.
#[derive(Debug, Clone, Copy)]
pub struct BatcherConfig {
    pub expected_readings: usize,
    /// Max simultaneously pending epochs before oldest-first eviction
    pub max_pending: usize,
    /// Incomplete slots older than this are dropped by `sweep`
    pub max_age: Duration,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            expected_readings: 3,
            max_pending: 64,
            max_age: Duration::from_secs(10),
        }
    }
}

#[derive(Debug)]
struct Slot {
    readings: BTreeMap<u32, f64>,
    first_seen: Instant,
}

/// Bounded collector of per-epoch microphone readings.
#[derive(Debug)]
pub struct EpochBatcher {
    cfg: BatcherConfig,
    slots: HashMap<u64, Slot>,
}

impl EpochBatcher {
    pub fn new(cfg: BatcherConfig) -> Self {
        Self { cfg, slots: HashMap::new() }
    }

    pub fn pending(&self) -> usize {
        self.slots.len()
    }

    /// Record one reading. Returns the full mic-id → amplitude mapping
    /// exactly once, when the batch reaches the configured count; the slot
    /// is removed in the same step. A duplicate reading for the same
    /// (epoch, mic) overwrites the previous value.
    pub fn insert(
        &mut self,
        epoch_s: u64,
        mic_id: u32,
        amplitude: f64,
        now: Instant,
    ) -> Option<BTreeMap<u32, f64>> {
        if !self.slots.contains_key(&epoch_s) && self.slots.len() >= self.cfg.max_pending {
            self.evict_oldest();
        }
        let slot = self
            .slots
            .entry(epoch_s)
            .or_insert_with(|| Slot { readings: BTreeMap::new(), first_seen: now });
        slot.readings.insert(mic_id, amplitude);

        if slot.readings.len() >= self.cfg.expected_readings {
            return self.slots.remove(&epoch_s).map(|s| s.readings);
        }
        None
    }

    /// Drop incomplete slots older than `max_age`. Returns how many were
    /// evicted (each one is a batch that will never estimate).
    pub fn sweep(&mut self, now: Instant) -> usize {
        let max_age = self.cfg.max_age;
        let before = self.slots.len();
        self.slots
            .retain(|_, slot| now.duration_since(slot.first_seen) <= max_age);
        before - self.slots.len()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .slots
            .iter()
            .min_by_key(|(_, slot)| slot.first_seen)
            .map(|(epoch, _)| *epoch);
        if let Some(epoch) = oldest {
            self.slots.remove(&epoch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batcher() -> EpochBatcher {
        EpochBatcher::new(BatcherConfig::default())
    }

    #[test]
    fn partial_batch_never_completes() {
        let mut b = batcher();
        let now = Instant::now();
        assert!(b.insert(100, 1, 10.0, now).is_none());
        assert!(b.insert(100, 2, 20.0, now).is_none());
        assert_eq!(b.pending(), 1);
    }

    #[test]
    fn third_reading_completes_exactly_once_and_clears() {
        let mut b = batcher();
        let now = Instant::now();
        b.insert(100, 1, 10.0, now);
        b.insert(100, 2, 20.0, now);
        let done = b.insert(100, 3, 30.0, now).expect("batch must complete");
        assert_eq!(done.len(), 3);
        assert_eq!(done[&2], 20.0);
        assert_eq!(b.pending(), 0);
        // A late duplicate for the same epoch starts a fresh slot, it does
        // not re-trigger the completed batch
        assert!(b.insert(100, 3, 31.0, now).is_none());
    }

    #[test]
    fn duplicate_reading_overwrites() {
        let mut b = batcher();
        let now = Instant::now();
        b.insert(100, 1, 10.0, now);
        b.insert(100, 1, 11.0, now);
        assert_eq!(b.pending(), 1);
        b.insert(100, 2, 20.0, now);
        let done = b.insert(100, 3, 30.0, now).unwrap();
        assert_eq!(done[&1], 11.0);
    }

    #[test]
    fn independent_epochs_do_not_interfere() {
        let mut b = batcher();
        let now = Instant::now();
        b.insert(100, 1, 10.0, now);
        b.insert(101, 1, 40.0, now);
        b.insert(100, 2, 20.0, now);
        b.insert(101, 2, 50.0, now);
        assert!(b.insert(100, 3, 30.0, now).is_some());
        assert_eq!(b.pending(), 1);
        assert!(b.insert(101, 3, 60.0, now).is_some());
    }

    #[test]
    fn sweep_evicts_stale_slots() {
        let mut b = EpochBatcher::new(BatcherConfig {
            max_age: Duration::from_secs(5),
            ..BatcherConfig::default()
        });
        let t0 = Instant::now();
        b.insert(100, 1, 10.0, t0);
        b.insert(200, 1, 10.0, t0 + Duration::from_secs(8));
        assert_eq!(b.sweep(t0 + Duration::from_secs(9)), 1);
        assert_eq!(b.pending(), 1);
        // Survivor still completes normally
        b.insert(200, 2, 20.0, t0 + Duration::from_secs(9));
        assert!(b.insert(200, 3, 30.0, t0 + Duration::from_secs(9)).is_some());
    }

    #[test]
    fn slot_count_is_bounded() {
        let mut b = EpochBatcher::new(BatcherConfig {
            max_pending: 4,
            ..BatcherConfig::default()
        });
        let t0 = Instant::now();
        for epoch in 0..10u64 {
            b.insert(epoch, 1, 1.0, t0 + Duration::from_millis(epoch));
        }
        assert_eq!(b.pending(), 4);
        // Oldest epochs were evicted; the newest still complete
        b.insert(9, 2, 2.0, t0);
        assert!(b.insert(9, 3, 3.0, t0).is_some());
    }
}
