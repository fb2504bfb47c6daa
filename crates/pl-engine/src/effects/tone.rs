//! One-pole RC low-pass for darkening the master bus.

use core::f32::consts::TAU;

use super::{Effect, EffectInfo, ParamInfo};

const MIN_CUTOFF: f32 = 20.0;
const MAX_CUTOFF: f32 = 20_000.0;

static PARAMS: &[ParamInfo] = &[ParamInfo {
    id: 0,
    name: "Cutoff",
    min: MIN_CUTOFF,
    max: MAX_CUTOFF,
    default: 4000.0,
}];

static INFO: EffectInfo = EffectInfo {
    name: "Tone",
    short_name: "Tone",
    params: PARAMS,
};

/// `y = y_prev + alpha * (x - y_prev)` per channel.
pub struct Tone {
    prev_left: f32,
    prev_right: f32,
    alpha: f32,
    cutoff_hz: f32,
    sample_rate: u32,
}

impl Tone {
    pub fn new(cutoff_hz: f32) -> Self {
        Self {
            prev_left: 0.0,
            prev_right: 0.0,
            alpha: 0.0,
            cutoff_hz: cutoff_hz.clamp(MIN_CUTOFF, MAX_CUTOFF),
            sample_rate: 44100,
        }
    }

    fn recompute_alpha(&mut self) {
        self.alpha = (TAU * self.cutoff_hz / self.sample_rate.max(1) as f32).min(1.0);
    }
}

impl Effect for Tone {
    fn info(&self) -> &EffectInfo {
        &INFO
    }

    fn init(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.recompute_alpha();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let alpha = self.alpha;
        let mut prev_l = self.prev_left;
        let mut prev_r = self.prev_right;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            prev_l += alpha * (*l - prev_l);
            prev_r += alpha * (*r - prev_r);
            *l = prev_l;
            *r = prev_r;
        }
        self.prev_left = prev_l;
        self.prev_right = prev_r;
    }

    fn reset(&mut self) {
        self.prev_left = 0.0;
        self.prev_right = 0.0;
    }

    fn set_param(&mut self, param: u16, value: f32) {
        if param == 0 {
            self.cutoff_hz = value.clamp(MIN_CUTOFF, MAX_CUTOFF);
            self.recompute_alpha();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_tone(cutoff: f32, sr: u32) -> Tone {
        let mut t = Tone::new(cutoff);
        t.init(sr);
        t
    }

    #[test]
    fn alpha_follows_cutoff() {
        let t = init_tone(4410.0, 44100);
        assert!((t.alpha - TAU * 0.1).abs() < 1e-6);
    }

    #[test]
    fn attenuates_alternating_signal() {
        let mut t = init_tone(1000.0, 44100);
        let mut l: Vec<f32> = (0..512).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let mut r = l.clone();
        t.process(&mut l, &mut r);
        let peak = l[256..].iter().fold(0.0f32, |a, &s| a.max(s.abs()));
        assert!(peak < 0.2, "peak {}", peak);
    }

    #[test]
    fn passes_dc() {
        let mut t = init_tone(1000.0, 44100);
        let mut l = vec![0.5f32; 2048];
        let mut r = vec![0.5f32; 2048];
        t.process(&mut l, &mut r);
        assert!((l[2047] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn reset_clears_memory() {
        let mut t = init_tone(1000.0, 44100);
        let mut l = vec![1.0f32; 64];
        let mut r = vec![1.0f32; 64];
        t.process(&mut l, &mut r);
        t.reset();
        let mut l = vec![0.0f32; 1];
        let mut r = vec![0.0f32; 1];
        t.process(&mut l, &mut r);
        assert_eq!(l[0], 0.0);
    }
}
