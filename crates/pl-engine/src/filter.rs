//! Per-voice low-pass and high-pass stages.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F32};
use pl_ir::{CUTOFF_MAX, CUTOFF_MIN};

/// Coefficients computed on the control path, copied into the voice.
/// `None` means the stage is bypassed (cutoff at the open end of its range).
#[derive(Clone, Copy, Debug, Default)]
pub struct FilterSpec {
    pub lowpass: Option<Coefficients<f32>>,
    pub highpass: Option<Coefficients<f32>>,
}

impl FilterSpec {
    pub fn new(lowpass_hz: f32, highpass_hz: f32, sample_rate: u32) -> Self {
        Self {
            lowpass: lowpass_coefficients(lowpass_hz, sample_rate),
            highpass: highpass_coefficients(highpass_hz, sample_rate),
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.lowpass.is_none() && self.highpass.is_none()
    }
}

fn nyquist_limit(sample_rate: u32) -> f32 {
    sample_rate as f32 * 0.45
}

pub fn lowpass_coefficients(cutoff: f32, sample_rate: u32) -> Option<Coefficients<f32>> {
    let limit = nyquist_limit(sample_rate);
    if cutoff >= CUTOFF_MAX || cutoff >= limit {
        return None;
    }
    let cutoff = cutoff.max(CUTOFF_MIN);
    Coefficients::<f32>::from_params(Type::LowPass, (sample_rate as f32).hz(), cutoff.hz(), Q_BUTTERWORTH_F32).ok()
}

pub fn highpass_coefficients(cutoff: f32, sample_rate: u32) -> Option<Coefficients<f32>> {
    if cutoff <= CUTOFF_MIN {
        return None;
    }
    let cutoff = cutoff.min(nyquist_limit(sample_rate));
    Coefficients::<f32>::from_params(Type::HighPass, (sample_rate as f32).hz(), cutoff.hz(), Q_BUTTERWORTH_F32).ok()
}

/// Filter state for one stereo voice.
#[derive(Clone, Copy, Debug)]
pub struct StereoFilter {
    lowpass: Option<[DirectForm2Transposed<f32>; 2]>,
    highpass: Option<[DirectForm2Transposed<f32>; 2]>,
}

impl StereoFilter {
    pub fn new(spec: &FilterSpec) -> Self {
        let pair = |c: Coefficients<f32>| [DirectForm2Transposed::<f32>::new(c), DirectForm2Transposed::<f32>::new(c)];
        Self {
            lowpass: spec.lowpass.map(pair),
            highpass: spec.highpass.map(pair),
        }
    }

    #[inline]
    pub fn process(&mut self, mut left: f32, mut right: f32) -> (f32, f32) {
        if let Some([l, r]) = &mut self.highpass {
            left = l.run(left);
            right = r.run(right);
        }
        if let Some([l, r]) = &mut self.lowpass {
            left = l.run(left);
            right = r.run(right);
        }
        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_tone(filter: &mut StereoFilter, freq: f32, rate: u32, frames: usize) -> f32 {
        let mut peak = 0.0f32;
        for i in 0..frames {
            let x = (core::f32::consts::TAU * freq * i as f32 / rate as f32).sin();
            let (l, _) = filter.process(x, x);
            if i > frames / 2 {
                peak = peak.max(l.abs());
            }
        }
        peak
    }

    #[test]
    fn open_cutoffs_bypass() {
        let spec = FilterSpec::new(CUTOFF_MAX, CUTOFF_MIN, 44100);
        assert!(spec.is_bypassed());
        let mut f = StereoFilter::new(&spec);
        assert_eq!(f.process(0.3, -0.2), (0.3, -0.2));
    }

    #[test]
    fn lowpass_above_nyquist_limit_bypasses() {
        assert!(lowpass_coefficients(19000.0, 32000).is_none());
        assert!(lowpass_coefficients(1000.0, 32000).is_some());
    }

    #[test]
    fn lowpass_attenuates_high_tone() {
        let mut f = StereoFilter::new(&FilterSpec::new(500.0, CUTOFF_MIN, 44100));
        let peak = run_tone(&mut f, 8000.0, 44100, 4000);
        assert!(peak < 0.05, "peak {}", peak);
    }

    #[test]
    fn highpass_attenuates_low_tone() {
        let mut f = StereoFilter::new(&FilterSpec::new(CUTOFF_MAX, 4000.0, 44100));
        let peak = run_tone(&mut f, 100.0, 44100, 8000);
        assert!(peak < 0.05, "peak {}", peak);
    }

    #[test]
    fn lowpass_passes_low_tone() {
        let mut f = StereoFilter::new(&FilterSpec::new(5000.0, CUTOFF_MIN, 44100));
        let peak = run_tone(&mut f, 200.0, 44100, 8000);
        assert!(peak > 0.9, "peak {}", peak);
    }
}
