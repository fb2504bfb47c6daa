//! Bit-depth and sample-rate reduction.

use super::{Effect, EffectInfo, ParamInfo};

static PARAMS: &[ParamInfo] = &[
    ParamInfo { id: 0, name: "Bits", min: 1.0, max: 16.0, default: 8.0 },
    ParamInfo { id: 1, name: "Downsample", min: 1.0, max: 32.0, default: 1.0 },
];

static INFO: EffectInfo = EffectInfo {
    name: "Bitcrusher",
    short_name: "Crush",
    params: PARAMS,
};

pub struct Bitcrush {
    levels: f32,
    downsample: u32,
    counter: u32,
    held: (f32, f32),
}

impl Bitcrush {
    pub fn new(bits: u8, downsample: u8) -> Self {
        let mut crush = Self { levels: 0.0, downsample: 1, counter: 0, held: (0.0, 0.0) };
        crush.set_param(0, bits as f32);
        crush.set_param(1, downsample as f32);
        crush
    }

    #[inline]
    fn quantize(&self, x: f32) -> f32 {
        (x * self.levels).round() / self.levels
    }
}

impl Effect for Bitcrush {
    fn info(&self) -> &EffectInfo {
        &INFO
    }

    fn init(&mut self, _sample_rate: u32) {}

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            if self.counter == 0 {
                self.held = (self.quantize(*l), self.quantize(*r));
            }
            self.counter = (self.counter + 1) % self.downsample;
            *l = self.held.0;
            *r = self.held.1;
        }
    }

    fn reset(&mut self) {
        self.counter = 0;
        self.held = (0.0, 0.0);
    }

    fn set_param(&mut self, param: u16, value: f32) {
        match param {
            0 => {
                let bits = value.clamp(1.0, 16.0) as i32;
                self.levels = (1u32 << (bits - 1)) as f32;
            }
            1 => {
                self.downsample = value.clamp(1.0, 32.0) as u32;
                self.counter = 0;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantizes_to_bit_depth() {
        let mut c = Bitcrush::new(2, 1);
        let mut l = vec![0.3f32, 0.8, -0.6];
        let mut r = l.clone();
        c.process(&mut l, &mut r);
        assert_eq!(l, vec![0.5, 1.0, -0.5]);
    }

    #[test]
    fn downsample_holds_values() {
        let mut c = Bitcrush::new(16, 3);
        let mut l = vec![0.1f32, 0.2, 0.3, 0.4, 0.5];
        let mut r = l.clone();
        c.process(&mut l, &mut r);
        assert!((l[1] - l[0]).abs() < 1e-6);
        assert!((l[2] - l[0]).abs() < 1e-6);
        assert!((l[3] - 0.4).abs() < 1e-4);
    }
}
