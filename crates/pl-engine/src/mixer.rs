//! Mix graph: slot buses, bank strips, master chain.
//!
//! ```text
//! voice ─► slot bus ─(slot gain)─┐
//!                                ├─► bank strip (gain, pan, audibility) ─► master gain ─► compressor ─► effects ─► out
//! locked voice ─► bank direct ───┘                                                                          └─► tap
//! ```
//!
//! Every bus is allocated once; rendering a block only reads and writes
//! existing storage.

use pl_ir::{AudioBuffer, BankId, CompressorSettings, SlotId, NUM_BANKS, NUM_SLOTS};
use ringbuf::traits::{Observer, Producer};
use ringbuf::HeapProd;

use crate::dynamics::Compressor;
use crate::effects::Effect;
use crate::smoothing::SmoothedParam;

/// Gain, pan and audibility flags of one bank.
#[derive(Clone, Copy, Debug)]
pub struct BankStrip {
    pub gain: SmoothedParam,
    pub pan: SmoothedParam,
    pub muted: bool,
    pub soloed: bool,
}

impl Default for BankStrip {
    fn default() -> Self {
        Self {
            gain: SmoothedParam::new(0.8),
            pan: SmoothedParam::new(0.0),
            muted: false,
            soloed: false,
        }
    }
}

/// Left/right gains for a pan position in −1..1. Centre is unity on both
/// sides; panning attenuates the opposite side only.
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let pan = pan.clamp(-1.0, 1.0);
    if pan > 0.0 {
        (1.0 - pan, 1.0)
    } else {
        (1.0, 1.0 + pan)
    }
}

pub struct MixGraph {
    slot_buses: [AudioBuffer; NUM_SLOTS],
    direct_buses: [AudioBuffer; NUM_BANKS],
    slot_gains: [SmoothedParam; NUM_SLOTS],
    banks: [BankStrip; NUM_BANKS],
    master_gain: SmoothedParam,
    master: AudioBuffer,
    compressor: Compressor,
    effects: Vec<Box<dyn Effect>>,
    tap: Option<HeapProd<f32>>,
}

impl MixGraph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            slot_buses: core::array::from_fn(|_| AudioBuffer::stereo_block()),
            direct_buses: core::array::from_fn(|_| AudioBuffer::stereo_block()),
            slot_gains: [SmoothedParam::new(0.8); NUM_SLOTS],
            banks: [BankStrip::default(); NUM_BANKS],
            master_gain: SmoothedParam::new(0.9),
            master: AudioBuffer::stereo_block(),
            compressor: Compressor::new(&CompressorSettings::default(), sample_rate),
            effects: Vec::new(),
            tap: None,
        }
    }

    /// Buses voices render into: per-slot and per-bank direct.
    pub fn voice_buses(&mut self) -> (&mut [AudioBuffer; NUM_SLOTS], &mut [AudioBuffer; NUM_BANKS]) {
        (&mut self.slot_buses, &mut self.direct_buses)
    }

    pub fn slot_gain_mut(&mut self, slot: SlotId) -> &mut SmoothedParam {
        &mut self.slot_gains[slot.index()]
    }

    pub fn bank(&self, bank: BankId) -> &BankStrip {
        &self.banks[bank.index()]
    }

    pub fn bank_mut(&mut self, bank: BankId) -> &mut BankStrip {
        &mut self.banks[bank.index()]
    }

    pub fn master_gain_mut(&mut self) -> &mut SmoothedParam {
        &mut self.master_gain
    }

    pub fn compressor_mut(&mut self) -> &mut Compressor {
        &mut self.compressor
    }

    /// Swap in a new effects chain, returning the old one.
    pub fn replace_effects(&mut self, chain: Vec<Box<dyn Effect>>) -> Vec<Box<dyn Effect>> {
        core::mem::replace(&mut self.effects, chain)
    }

    pub fn replace_tap(&mut self, tap: Option<HeapProd<f32>>) -> Option<HeapProd<f32>> {
        core::mem::replace(&mut self.tap, tap)
    }

    /// A bank is heard unless muted, or unless another bank is soloed and
    /// it is not.
    pub fn is_audible(&self, bank: BankId) -> bool {
        let strip = &self.banks[bank.index()];
        let any_solo = self.banks.iter().any(|b| b.soloed);
        !strip.muted && (!any_solo || strip.soloed)
    }

    /// Zero every voice bus before rendering a block.
    pub fn clear(&mut self) {
        for bus in self.slot_buses.iter_mut().chain(self.direct_buses.iter_mut()) {
            bus.silence();
        }
    }

    /// Mix the voice buses of the first `frames` frames down to the master
    /// output, then run dynamics, effects and the tap.
    pub fn mix(&mut self, frames: usize) -> &AudioBuffer {
        let frames = frames.min(self.master.frames() as usize);
        self.master.silence();

        for bank in BankId::all() {
            let b = bank.index();
            let audible = self.is_audible(bank);
            let (master_l, master_r) = self.master.stereo_mut();
            for i in 0..frames {
                let mut l = self.direct_buses[b].channel(0)[i];
                let mut r = self.direct_buses[b].channel(1)[i];
                for slot in bank.slots() {
                    let g = self.slot_gains[slot.index()].next();
                    let bus = &self.slot_buses[slot.index()];
                    l += bus.channel(0)[i] * g;
                    r += bus.channel(1)[i] * g;
                }
                let strip = &mut self.banks[b];
                let gain = strip.gain.next();
                let (pl, pr) = pan_gains(strip.pan.next());
                if audible {
                    master_l[i] += l * gain * pl;
                    master_r[i] += r * gain * pr;
                }
            }
        }

        {
            let (left, right) = self.master.stereo_mut();
            for i in 0..frames {
                let g = self.master_gain.next();
                left[i] *= g;
                right[i] *= g;
            }
            self.compressor.process(&mut left[..frames], &mut right[..frames]);
            for effect in self.effects.iter_mut() {
                effect.process(&mut left[..frames], &mut right[..frames]);
            }
        }

        if let Some(tap) = self.tap.as_mut() {
            let left = self.master.channel(0);
            let right = self.master.channel(1);
            for i in 0..frames {
                if tap.vacant_len() < 2 {
                    break;
                }
                let _ = tap.try_push(left[i]);
                let _ = tap.try_push(right[i]);
            }
        }

        &self.master
    }

    pub fn output(&self) -> &AudioBuffer {
        &self.master
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::{Consumer, Split};
    use ringbuf::HeapRb;

    fn graph_with_unit_gains() -> MixGraph {
        let mut g = MixGraph::new(48000);
        for slot in SlotId::all() {
            g.slot_gain_mut(slot).set(1.0);
        }
        for bank in BankId::all() {
            g.bank_mut(bank).gain.set(1.0);
        }
        g.master_gain_mut().set(1.0);
        g
    }

    fn feed(g: &mut MixGraph, slot: usize, value: f32) {
        let (slots, _) = g.voice_buses();
        let (l, r) = slots[slot].stereo_mut();
        l.fill(value);
        r.fill(value);
    }

    #[test]
    fn pan_law() {
        assert_eq!(pan_gains(0.0), (1.0, 1.0));
        assert_eq!(pan_gains(1.0), (0.0, 1.0));
        assert_eq!(pan_gains(-0.5), (1.0, 0.5));
    }

    #[test]
    fn slot_gain_scales_bus() {
        let mut g = graph_with_unit_gains();
        g.slot_gain_mut(SlotId::new(2)).set(0.5);
        feed(&mut g, 2, 1.0);
        let out = g.mix(16);
        assert!((out.channel(0)[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn muted_bank_is_silent() {
        let mut g = graph_with_unit_gains();
        g.bank_mut(BankId::new(0)).muted = true;
        feed(&mut g, 0, 1.0);
        feed(&mut g, 8, 0.25);
        let out = g.mix(16);
        assert!((out.channel(0)[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn solo_silences_others() {
        let mut g = graph_with_unit_gains();
        g.bank_mut(BankId::new(1)).soloed = true;
        assert!(!g.is_audible(BankId::new(0)));
        assert!(g.is_audible(BankId::new(1)));
        feed(&mut g, 0, 1.0);
        feed(&mut g, 8, 0.25);
        let out = g.mix(16);
        assert!((out.channel(0)[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn clearing_solo_restores_unmuted_banks() {
        let mut g = graph_with_unit_gains();
        g.bank_mut(BankId::new(1)).soloed = true;
        g.bank_mut(BankId::new(2)).muted = true;
        feed(&mut g, 0, 1.0);
        feed(&mut g, 8, 0.25);
        feed(&mut g, 16, 0.5);
        assert!((g.mix(16).channel(0)[0] - 0.25).abs() < 1e-6);

        g.bank_mut(BankId::new(1)).soloed = false;
        assert!(g.is_audible(BankId::new(0)));
        assert!(g.is_audible(BankId::new(1)));
        assert!(!g.is_audible(BankId::new(2)));
        assert!(g.is_audible(BankId::new(3)));
        assert!((g.mix(16).channel(0)[0] - 1.25).abs() < 1e-6);
    }

    #[test]
    fn mute_beats_solo() {
        let mut g = graph_with_unit_gains();
        let bank = g.bank_mut(BankId::new(2));
        bank.soloed = true;
        bank.muted = true;
        assert!(!g.is_audible(BankId::new(2)));
        assert!(!g.is_audible(BankId::new(0)));
    }

    #[test]
    fn direct_bus_skips_slot_gain() {
        let mut g = graph_with_unit_gains();
        g.slot_gain_mut(SlotId::new(8)).set(0.0);
        {
            let (_, direct) = g.voice_buses();
            direct[1].stereo_mut().0.fill(0.4);
        }
        let out = g.mix(16);
        assert!((out.channel(0)[3] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn master_gain_ramps_without_jumps() {
        let mut g = graph_with_unit_gains();
        feed(&mut g, 0, 1.0);
        g.master_gain_mut().ramp_to(0.0, 200);
        let out = g.mix(256);
        let left = out.channel(0);
        for w in left.windows(2) {
            assert!((w[0] - w[1]).abs() <= 0.0051);
        }
        assert_eq!(left[255], 0.0);
    }

    #[test]
    fn tap_receives_interleaved_output() {
        let mut g = graph_with_unit_gains();
        let (prod, mut cons) = HeapRb::<f32>::new(64).split();
        g.replace_tap(Some(prod));
        feed(&mut g, 0, 0.5);
        g.mix(8);
        assert_eq!(cons.occupied_len(), 16);
        assert_eq!(cons.try_pop(), Some(0.5));
    }

    #[test]
    fn clear_silences_buses() {
        let mut g = graph_with_unit_gains();
        feed(&mut g, 5, 1.0);
        g.clear();
        let out = g.mix(16);
        assert_eq!(out.peak(), 0.0);
    }
}
