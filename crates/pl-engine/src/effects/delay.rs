//! Feedback delay with a circular buffer per channel.

use super::{Effect, EffectInfo, ParamInfo};

/// Longest supported delay time.
const MAX_DELAY_MS: f32 = 2000.0;

static PARAMS: &[ParamInfo] = &[
    ParamInfo { id: 0, name: "Time", min: 1.0, max: MAX_DELAY_MS, default: 250.0 },
    ParamInfo { id: 1, name: "Feedback", min: 0.0, max: 0.95, default: 0.35 },
    ParamInfo { id: 2, name: "Mix", min: 0.0, max: 1.0, default: 0.3 },
];

static INFO: EffectInfo = EffectInfo {
    name: "Delay",
    short_name: "Delay",
    params: PARAMS,
};

pub struct Delay {
    left: Vec<f32>,
    right: Vec<f32>,
    write_pos: usize,
    delay_samples: usize,
    time_ms: f32,
    feedback: f32,
    mix: f32,
    sample_rate: u32,
}

impl Delay {
    pub fn new(time_ms: f32, feedback: f32, mix: f32) -> Self {
        Self {
            left: Vec::new(),
            right: Vec::new(),
            write_pos: 0,
            delay_samples: 0,
            time_ms: time_ms.clamp(1.0, MAX_DELAY_MS),
            feedback: feedback.clamp(0.0, 0.95),
            mix: mix.clamp(0.0, 1.0),
            sample_rate: 44100,
        }
    }

    fn recompute_delay(&mut self) {
        let samples = (self.time_ms * 0.001 * self.sample_rate as f32) as usize;
        self.delay_samples = samples.clamp(1, self.left.len().saturating_sub(1).max(1));
    }
}

impl Effect for Delay {
    fn info(&self) -> &EffectInfo {
        &INFO
    }

    fn init(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        let len = (MAX_DELAY_MS * 0.001 * sample_rate as f32) as usize + 1;
        self.left = vec![0.0; len];
        self.right = vec![0.0; len];
        self.write_pos = 0;
        self.recompute_delay();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let len = self.left.len();
        if len < 2 {
            return;
        }
        let delay = self.delay_samples;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let read_pos = (self.write_pos + len - delay) % len;
            let wet_l = self.left[read_pos];
            let wet_r = self.right[read_pos];
            self.left[self.write_pos] = *l + wet_l * self.feedback;
            self.right[self.write_pos] = *r + wet_r * self.feedback;
            *l += (wet_l - *l) * self.mix;
            *r += (wet_r - *r) * self.mix;
            self.write_pos = (self.write_pos + 1) % len;
        }
    }

    fn reset(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
        self.write_pos = 0;
    }

    fn set_param(&mut self, param: u16, value: f32) {
        match param {
            0 => {
                self.time_ms = value.clamp(1.0, MAX_DELAY_MS);
                self.recompute_delay();
            }
            1 => self.feedback = value.clamp(0.0, 0.95),
            2 => self.mix = value.clamp(0.0, 1.0),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(len: usize) -> (Vec<f32>, Vec<f32>) {
        let mut l = vec![0.0f32; len];
        l[0] = 1.0;
        (l.clone(), l)
    }

    #[test]
    fn echo_arrives_after_delay_time() {
        let mut d = Delay::new(10.0, 0.0, 1.0);
        d.init(1000);
        let (mut l, mut r) = impulse(30);
        d.process(&mut l, &mut r);
        assert_eq!(l[0], 0.0);
        assert_eq!(l[10], 1.0);
        assert_eq!(l[20], 0.0);
    }

    #[test]
    fn feedback_repeats_decay() {
        let mut d = Delay::new(10.0, 0.5, 1.0);
        d.init(1000);
        let (mut l, mut r) = impulse(35);
        d.process(&mut l, &mut r);
        assert!((l[10] - 1.0).abs() < 1e-6);
        assert!((l[20] - 0.5).abs() < 1e-6);
        assert!((l[30] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn dry_mix_passes_input() {
        let mut d = Delay::new(10.0, 0.5, 0.0);
        d.init(1000);
        let (mut l, mut r) = impulse(20);
        d.process(&mut l, &mut r);
        assert_eq!(l[0], 1.0);
        assert_eq!(l[10], 0.0);
    }

    #[test]
    fn state_survives_block_boundaries() {
        let mut d = Delay::new(10.0, 0.0, 1.0);
        d.init(1000);
        let (mut l, mut r) = impulse(6);
        d.process(&mut l, &mut r);
        let mut l2 = vec![0.0f32; 6];
        let mut r2 = vec![0.0f32; 6];
        d.process(&mut l2, &mut r2);
        assert_eq!(l2[4], 1.0);
    }
}
