//! Linear parameter ramps applied per frame on the render path.

/// A value that moves linearly towards its target over a fixed number of
/// frames. Every live gain, pan and detune in the graph is one of these, so
/// control-side changes never produce a step discontinuity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothedParam {
    value: f32,
    target: f32,
    step: f32,
    remaining: u32,
}

impl SmoothedParam {
    pub fn new(value: f32) -> Self {
        Self { value, target: value, step: 0.0, remaining: 0 }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }

    /// Jump to `value` immediately.
    pub fn set(&mut self, value: f32) {
        self.value = value;
        self.target = value;
        self.remaining = 0;
    }

    /// Reach `target` after `frames` calls to [`next`](Self::next).
    pub fn ramp_to(&mut self, target: f32, frames: u32) {
        if frames == 0 {
            self.set(target);
            return;
        }
        self.target = target;
        self.step = (target - self.value) / frames as f32;
        self.remaining = frames;
    }

    /// Advance one frame and return the new value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.value = if self.remaining == 0 { self.target } else { self.value + self.step };
        }
        self.value
    }

    /// Advance `frames` frames at once.
    pub fn skip(&mut self, frames: u32) {
        if frames >= self.remaining {
            self.value = self.target;
            self.remaining = 0;
        } else {
            self.remaining -= frames;
            self.value += self.step * frames as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_lands_exactly_on_target() {
        let mut p = SmoothedParam::new(0.0);
        p.ramp_to(1.0, 4);
        let values: Vec<f32> = (0..4).map(|_| p.next()).collect();
        assert!((values[0] - 0.25).abs() < 1e-6);
        assert!((values[1] - 0.5).abs() < 1e-6);
        assert_eq!(values[3], 1.0);
        assert!(!p.is_ramping());
        assert_eq!(p.next(), 1.0);
    }

    #[test]
    fn zero_length_ramp_jumps() {
        let mut p = SmoothedParam::new(0.3);
        p.ramp_to(0.9, 0);
        assert_eq!(p.value(), 0.9);
    }

    #[test]
    fn retarget_mid_ramp_starts_from_current_value() {
        let mut p = SmoothedParam::new(0.0);
        p.ramp_to(1.0, 10);
        for _ in 0..5 {
            p.next();
        }
        p.ramp_to(0.0, 5);
        let first = p.next();
        assert!((first - 0.4).abs() < 1e-5, "got {}", first);
    }

    #[test]
    fn skip_matches_stepping() {
        let mut a = SmoothedParam::new(0.0);
        let mut b = SmoothedParam::new(0.0);
        a.ramp_to(2.0, 100);
        b.ramp_to(2.0, 100);
        for _ in 0..40 {
            a.next();
        }
        b.skip(40);
        assert!((a.value() - b.value()).abs() < 1e-4);
        b.skip(1000);
        assert_eq!(b.value(), 2.0);
    }
}
