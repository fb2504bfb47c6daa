//! Stereo-linked feed-forward compressor for the master bus.

use pl_ir::CompressorSettings;

fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

fn gain_to_db(gain: f32) -> f32 {
    20.0 * gain.max(1e-6).log10()
}

fn smoothing_coeff(ms: f32, sample_rate: u32) -> f32 {
    let samples = ms.max(0.01) * 0.001 * sample_rate.max(1) as f32;
    (-1.0 / samples).exp()
}

pub struct Compressor {
    threshold_db: f32,
    ratio: f32,
    attack: f32,
    release: f32,
    makeup: f32,
    enabled: bool,
    /// Current gain reduction in dB (≥ 0).
    reduction_db: f32,
    sample_rate: u32,
}

impl Compressor {
    pub fn new(settings: &CompressorSettings, sample_rate: u32) -> Self {
        let mut c = Self {
            threshold_db: 0.0,
            ratio: 1.0,
            attack: 0.0,
            release: 0.0,
            makeup: 1.0,
            enabled: false,
            reduction_db: 0.0,
            sample_rate,
        };
        c.configure(settings);
        c
    }

    /// Apply new settings. Pure arithmetic, safe on the render path.
    pub fn configure(&mut self, settings: &CompressorSettings) {
        self.threshold_db = settings.threshold_db.clamp(-60.0, 0.0);
        self.ratio = settings.ratio.clamp(1.0, 20.0);
        self.attack = smoothing_coeff(settings.attack_ms, self.sample_rate);
        self.release = smoothing_coeff(settings.release_ms, self.sample_rate);
        self.makeup = db_to_gain(settings.makeup_db.clamp(0.0, 24.0));
        self.set_enabled(settings.enabled);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.reduction_db = 0.0;
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current gain reduction in dB.
    pub fn reduction_db(&self) -> f32 {
        self.reduction_db
    }

    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        if !self.enabled {
            return;
        }
        let slope = 1.0 - 1.0 / self.ratio;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let level_db = gain_to_db(l.abs().max(r.abs()));
            let over = level_db - self.threshold_db;
            let target = if over > 0.0 { over * slope } else { 0.0 };
            let coeff = if target > self.reduction_db { self.attack } else { self.release };
            self.reduction_db = target + coeff * (self.reduction_db - target);
            let gain = db_to_gain(-self.reduction_db) * self.makeup;
            *l *= gain;
            *r *= gain;
        }
    }
}
