//! Master-bus effects.
//!
//! Chains are built on the control path from [`EffectSpec`]s, including
//! any buffer allocation, and swapped into the engine whole.

mod bitcrush;
mod delay;
mod tone;

pub use bitcrush::Bitcrush;
pub use delay::Delay;
pub use tone::Tone;

use pl_ir::EffectSpec;

/// Metadata describing an effect parameter.
pub struct ParamInfo {
    pub id: u16,
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

/// Static metadata about an effect.
pub struct EffectInfo {
    pub name: &'static str,
    pub short_name: &'static str,
    pub params: &'static [ParamInfo],
}

/// An in-place stereo processor on the master bus.
pub trait Effect: Send {
    fn info(&self) -> &EffectInfo;
    /// Prepare for `sample_rate`. May allocate; called before the effect
    /// reaches the render path.
    fn init(&mut self, sample_rate: u32);
    fn process(&mut self, left: &mut [f32], right: &mut [f32]);
    /// Clear internal state (delay lines, filter memory).
    fn reset(&mut self);
    fn set_param(&mut self, param: u16, value: f32);
}

/// Build and initialise one stage.
pub fn create_effect(spec: &EffectSpec, sample_rate: u32) -> Box<dyn Effect> {
    let mut effect: Box<dyn Effect> = match *spec {
        EffectSpec::Tone { cutoff_hz } => Box::new(Tone::new(cutoff_hz)),
        EffectSpec::Delay { time_ms, feedback, mix } => Box::new(Delay::new(time_ms, feedback, mix)),
        EffectSpec::Bitcrush { bits, downsample } => Box::new(Bitcrush::new(bits, downsample)),
    };
    effect.init(sample_rate);
    effect
}

/// Build a whole chain in order.
pub fn create_chain(specs: &[EffectSpec], sample_rate: u32) -> Vec<Box<dyn Effect>> {
    specs.iter().map(|spec| create_effect(spec, sample_rate)).collect()
}
