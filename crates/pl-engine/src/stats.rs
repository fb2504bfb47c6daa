//! Render statistics published by the engine for the control side.

use std::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, AtomicUsize, Ordering};

use pl_ir::{SlotId, NUM_SLOTS};

/// Lock-free counters written once per block by the render path.
#[derive(Debug)]
pub struct EngineStats {
    voices: AtomicUsize,
    slot_voices: [AtomicU16; NUM_SLOTS],
    /// Fraction of the block's real-time budget spent rendering, as f32 bits.
    load_bits: AtomicU32,
    blocks: AtomicU64,
    overflows: AtomicU64,
}

impl Default for EngineStats {
    fn default() -> Self {
        Self {
            voices: AtomicUsize::new(0),
            slot_voices: core::array::from_fn(|_| AtomicU16::new(0)),
            load_bits: AtomicU32::new(0.0f32.to_bits()),
            blocks: AtomicU64::new(0),
            overflows: AtomicU64::new(0),
        }
    }
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn voice_count(&self) -> usize {
        self.voices.load(Ordering::Relaxed)
    }

    /// Voices currently sounding for `slot`.
    pub fn slot_voice_count(&self, slot: SlotId) -> usize {
        self.slot_voices[slot.index()].load(Ordering::Relaxed) as usize
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.load_bits.load(Ordering::Relaxed))
    }

    pub fn blocks(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    /// Timed commands applied early because the queue was full.
    pub fn queue_overflows(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }

    pub(crate) fn publish(&self, voices: usize, slot_counts: &[u16; NUM_SLOTS], load: f32) {
        self.voices.store(voices, Ordering::Relaxed);
        for (counter, &count) in self.slot_voices.iter().zip(slot_counts) {
            counter.store(count, Ordering::Relaxed);
        }
        self.load_bits.store(load.to_bits(), Ordering::Relaxed);
        self.blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overflow(&self) {
        self.overflows.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_updates_counters() {
        let stats = EngineStats::new();
        let mut counts = [0u16; NUM_SLOTS];
        counts[5] = 3;
        stats.publish(3, &counts, 0.25);
        assert_eq!(stats.voice_count(), 3);
        assert_eq!(stats.slot_voice_count(SlotId::new(5)), 3);
        assert_eq!(stats.slot_voice_count(SlotId::new(4)), 0);
        assert!((stats.load() - 0.25).abs() < 1e-6);
        assert_eq!(stats.blocks(), 1);
    }
}
