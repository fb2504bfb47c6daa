//! Authoritative project state, owned by the application and handed to the
//! engine as snapshots.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::groove::GrooveId;
use crate::ids::{BankId, PatternId, SlotId, NUM_BANKS};
use crate::pattern::PatternTable;
use crate::sample::SlotTable;

/// Tempo bounds in BPM.
pub const TEMPO_MIN: f32 = 20.0;
pub const TEMPO_MAX: f32 = 300.0;

/// Mixer strip and pattern track settings of one bank.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BankSettings {
    /// 0..1.
    pub volume: f32,
    /// −1 (left) .. 1 (right).
    pub pan: f32,
    pub mute: bool,
    pub solo: bool,
    pub groove: GrooveId,
    /// −1..1.
    pub groove_depth: f32,
    /// Selected pattern; must belong to this bank.
    pub pattern: PatternId,
}

impl BankSettings {
    pub fn new(bank: BankId) -> Self {
        Self {
            volume: 0.8,
            pan: 0.0,
            mute: false,
            solo: false,
            groove: GrooveId(0),
            groove_depth: 1.0,
            pattern: bank.first_pattern(),
        }
    }
}

/// Master bus dynamics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompressorSettings {
    pub enabled: bool,
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub makeup_db: f32,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_db: -12.0,
            ratio: 4.0,
            attack_ms: 5.0,
            release_ms: 120.0,
            makeup_db: 0.0,
        }
    }
}

/// One stage of the master effects chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EffectSpec {
    /// One-pole low-pass.
    Tone { cutoff_hz: f32 },
    /// Feedback delay.
    Delay { time_ms: f32, feedback: f32, mix: f32 },
    /// Bit depth and sample-rate reduction.
    Bitcrush { bits: u8, downsample: u8 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct MasterSettings {
    pub volume: f32,
    pub compressor: CompressorSettings,
    pub effects: Vec<EffectSpec>,
}

impl Default for MasterSettings {
    fn default() -> Self {
        Self {
            volume: 0.9,
            compressor: CompressorSettings::default(),
            effects: Vec::new(),
        }
    }
}

/// Everything the engine reads: slots, patterns, mixer, tempo.
///
/// Cloning is cheap for the heavy parts: pattern data sits behind an `Arc`
/// and sample buffers are shared.
#[derive(Clone, Debug)]
pub struct Project {
    /// BPM, clamped to [`TEMPO_MIN`]..[`TEMPO_MAX`] on use.
    pub tempo: f32,
    pub slots: SlotTable,
    pub patterns: Arc<PatternTable>,
    pub banks: [BankSettings; NUM_BANKS],
    pub master: MasterSettings,
    /// Slot that receives recorded audio.
    pub selected_slot: SlotId,
}

impl Project {
    pub fn new() -> Self {
        Self {
            tempo: 120.0,
            slots: SlotTable::new(),
            patterns: Arc::new(PatternTable::new()),
            banks: core::array::from_fn(|i| BankSettings::new(BankId::new(i))),
            master: MasterSettings::default(),
            selected_slot: SlotId::new(0),
        }
    }

    pub fn bank(&self, bank: BankId) -> &BankSettings {
        &self.banks[bank.index()]
    }

    pub fn bank_mut(&mut self, bank: BankId) -> &mut BankSettings {
        &mut self.banks[bank.index()]
    }

    /// Copy-on-write access to the pattern table.
    pub fn patterns_mut(&mut self) -> &mut PatternTable {
        Arc::make_mut(&mut self.patterns)
    }

    pub fn clamped_tempo(&self) -> f32 {
        self.tempo.clamp(TEMPO_MIN, TEMPO_MAX)
    }

    /// Select the pattern a bank plays. Panics if the pattern belongs to
    /// another bank.
    pub fn select_pattern(&mut self, bank: BankId, pattern: PatternId) {
        assert_eq!(pattern.bank(), bank, "pattern {} does not belong to bank {}", pattern.index(), bank.index());
        self.bank_mut(bank).pattern = pattern;
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}
