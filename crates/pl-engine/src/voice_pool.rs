//! VoicePool: preallocated registry of sounding voices.

use pl_ir::{AudioBuffer, SlotId, NUM_BANKS, NUM_SLOTS};
use slotmap::{new_key_type, SlotMap};

use crate::voice::{Voice, VoicePlan};

new_key_type! {
    /// Identifies a voice in the pool.
    pub struct VoiceKey;
}

/// Maximum number of simultaneous voices.
pub const MAX_VOICES: usize = 64;

/// Extra room for stolen voices that are still fading out.
pub const STEAL_HEADROOM: usize = 16;

/// Length of the fade applied to a stolen voice.
const STEAL_FADE_SECONDS: f64 = 0.005;

/// Fixed-capacity pool of voices with per-slot live counts.
///
/// Capacity is reserved at construction; the pool never allocates. Once
/// [`MAX_VOICES`] voices are sounding, each new voice steals the one closest
/// to its planned stop, which then fades out over a few milliseconds. Only
/// when the fade headroom is used up as well is a voice removed outright.
pub struct VoicePool {
    voices: SlotMap<VoiceKey, Voice>,
    slot_counts: [u16; NUM_SLOTS],
    sample_rate: u32,
    steal_fade: u64,
}

impl VoicePool {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            voices: SlotMap::with_capacity_and_key(MAX_VOICES + STEAL_HEADROOM),
            slot_counts: [0; NUM_SLOTS],
            sample_rate,
            steal_fade: ((sample_rate as f64 * STEAL_FADE_SECONDS) as u64).max(1),
        }
    }

    /// Start a voice from its plan. Returns the key and, if the pool had no
    /// room left at all, the voice that was removed to make some.
    pub fn start(&mut self, plan: VoicePlan) -> (VoiceKey, Option<Voice>) {
        if self.sounding_count() >= MAX_VOICES {
            let at = plan.envelope.start;
            let fade = self.steal_fade;
            let victim = self
                .voices
                .iter_mut()
                .filter(|(_, v)| !v.is_fading() && !v.is_finished())
                .min_by_key(|(_, v)| v.stop_frame())
                .map(|(_, v)| v);
            if let Some(voice) = victim {
                voice.fade_out(at, fade);
            }
        }
        let removed = if self.voices.len() >= MAX_VOICES + STEAL_HEADROOM {
            self.find_removal_candidate().and_then(|key| self.remove(key))
        } else {
            None
        };
        let voice = Voice::new(plan, self.sample_rate);
        self.slot_counts[voice.slot().index()] += 1;
        (self.voices.insert(voice), removed)
    }

    /// Voices that are neither finished nor fading after a steal.
    pub fn sounding_count(&self) -> usize {
        self.voices.values().filter(|v| !v.is_fading() && !v.is_finished()).count()
    }

    fn find_removal_candidate(&self) -> Option<VoiceKey> {
        self.voices
            .iter()
            .min_by_key(|(_, v)| (!v.is_finished(), !v.is_fading(), v.stop_frame()))
            .map(|(key, _)| key)
    }

    fn remove(&mut self, key: VoiceKey) -> Option<Voice> {
        let voice = self.voices.remove(key)?;
        let count = &mut self.slot_counts[voice.slot().index()];
        *count = count.saturating_sub(1);
        Some(voice)
    }

    pub fn get(&self, key: VoiceKey) -> Option<&Voice> {
        self.voices.get(key)
    }

    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.values()
    }

    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    pub fn slot_count(&self, slot: SlotId) -> usize {
        self.slot_counts[slot.index()] as usize
    }

    pub fn slot_counts(&self) -> &[u16; NUM_SLOTS] {
        &self.slot_counts
    }

    /// Ramp every unlocked voice of `slot` to a new pitch.
    pub fn ramp_slot_pitch(&mut self, slot: SlotId, cents: f32, frames: u32) {
        for (_, voice) in self.voices.iter_mut().filter(|(_, v)| v.slot() == slot) {
            voice.ramp_pitch(cents, frames);
        }
    }

    /// Render all voices for the block starting at `block_start`. Voices
    /// without a volume lock go to their slot bus; locked voices go to the
    /// direct bus of their bank.
    pub fn render(
        &mut self,
        block_start: u64,
        frames: usize,
        slot_buses: &mut [AudioBuffer; NUM_SLOTS],
        direct_buses: &mut [AudioBuffer; NUM_BANKS],
    ) {
        for (_, voice) in self.voices.iter_mut() {
            let bus = match voice.gain_lock() {
                None => &mut slot_buses[voice.slot().index()],
                Some(_) => &mut direct_buses[voice.slot().bank().index()],
            };
            let (left, right) = bus.stereo_mut();
            let frames = frames.min(left.len()).min(right.len());
            voice.render(block_start, &mut left[..frames], &mut right[..frames]);
        }
    }

    /// Remove voices that have stopped playing, handing each to `reaped`.
    pub fn reap_finished(&mut self, mut reaped: impl FnMut(Voice)) {
        loop {
            let Some(key) = self.voices.iter().find(|(_, v)| v.is_finished()).map(|(k, _)| k) else {
                break;
            };
            if let Some(voice) = self.remove(key) {
                reaped(voice);
            }
        }
    }

    /// Remove every voice.
    pub fn clear(&mut self, mut removed: impl FnMut(Voice)) {
        while let Some(key) = self.voices.keys().next() {
            if let Some(voice) = self.remove(key) {
                removed(voice);
            }
        }
    }
}
