//! Fixed-range identifiers for slots, banks and patterns.
//!
//! Every table in the project has a size fixed at startup, so ids are
//! range-checked once at construction and can index arrays directly
//! afterwards. Constructing an out-of-range id is a programming error.

/// Number of banks (and pattern tracks).
pub const NUM_BANKS: usize = 4;

/// Sample slots per bank.
pub const SLOTS_PER_BANK: usize = 8;

/// Total number of sample slots.
pub const NUM_SLOTS: usize = NUM_BANKS * SLOTS_PER_BANK;

/// Patterns owned by each bank.
pub const PATTERNS_PER_BANK: usize = 32;

/// Total number of patterns.
pub const NUM_PATTERNS: usize = NUM_BANKS * PATTERNS_PER_BANK;

/// The bank whose slots drive the synthesizer instead of sample buffers.
pub const SYNTH_BANK: BankId = BankId(3);

/// A sample slot, 0..32.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u8);

impl SlotId {
    /// Panics if `index >= NUM_SLOTS`.
    pub fn new(index: usize) -> Self {
        assert!(index < NUM_SLOTS, "slot id {} out of range", index);
        Self(index as u8)
    }

    /// Slot `lane` of `bank`.
    pub fn from_bank_lane(bank: BankId, lane: usize) -> Self {
        assert!(lane < SLOTS_PER_BANK, "lane {} out of range", lane);
        Self((bank.index() * SLOTS_PER_BANK + lane) as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Owning bank.
    pub fn bank(self) -> BankId {
        BankId((self.0 as usize / SLOTS_PER_BANK) as u8)
    }

    /// Position of this slot within its bank (also its pattern lane).
    pub fn lane(self) -> usize {
        self.0 as usize % SLOTS_PER_BANK
    }

    pub fn is_synth(self) -> bool {
        self.bank() == SYNTH_BANK
    }

    pub fn all() -> impl Iterator<Item = SlotId> {
        (0..NUM_SLOTS).map(|i| SlotId(i as u8))
    }
}

/// A bank, 0..4.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BankId(u8);

impl BankId {
    /// Panics if `index >= NUM_BANKS`.
    pub fn new(index: usize) -> Self {
        assert!(index < NUM_BANKS, "bank id {} out of range", index);
        Self(index as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_synth(self) -> bool {
        self == SYNTH_BANK
    }

    /// The eight slots of this bank, in lane order.
    pub fn slots(self) -> impl Iterator<Item = SlotId> {
        (0..SLOTS_PER_BANK).map(move |lane| SlotId::from_bank_lane(self, lane))
    }

    /// The first pattern owned by this bank.
    pub fn first_pattern(self) -> PatternId {
        PatternId((self.index() * PATTERNS_PER_BANK) as u8)
    }

    pub fn all() -> impl Iterator<Item = BankId> {
        (0..NUM_BANKS).map(|i| BankId(i as u8))
    }
}

/// A pattern, 0..128. Bank `b` owns ids `32b..32b+31`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(u8);

impl PatternId {
    /// Panics if `index >= NUM_PATTERNS`.
    pub fn new(index: usize) -> Self {
        assert!(index < NUM_PATTERNS, "pattern id {} out of range", index);
        Self(index as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Owning bank.
    pub fn bank(self) -> BankId {
        BankId((self.0 as usize / PATTERNS_PER_BANK) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_bank_and_lane() {
        let slot = SlotId::new(13);
        assert_eq!(slot.bank(), BankId::new(1));
        assert_eq!(slot.lane(), 5);
        assert_eq!(SlotId::from_bank_lane(BankId::new(1), 5), slot);
    }

    #[test]
    fn synth_bank_is_last() {
        assert!(SlotId::new(24).is_synth());
        assert!(SlotId::new(31).is_synth());
        assert!(!SlotId::new(23).is_synth());
        assert_eq!(SYNTH_BANK.index(), NUM_BANKS - 1);
    }

    #[test]
    fn bank_slots_cover_eight_lanes() {
        let slots: Vec<usize> = BankId::new(2).slots().map(SlotId::index).collect();
        assert_eq!(slots, (16..24).collect::<Vec<_>>());
    }

    #[test]
    fn pattern_bank_ownership() {
        assert_eq!(PatternId::new(0).bank(), BankId::new(0));
        assert_eq!(PatternId::new(63).bank(), BankId::new(1));
        assert_eq!(BankId::new(3).first_pattern(), PatternId::new(96));
    }

    #[test]
    #[should_panic(expected = "pattern id 128 out of range")]
    fn pattern_id_out_of_range_panics() {
        PatternId::new(NUM_PATTERNS);
    }

    #[test]
    #[should_panic]
    fn slot_id_out_of_range_panics() {
        SlotId::new(32);
    }
}
