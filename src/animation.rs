//! Scale animation and the uniform it feeds.
//!
//! The triangle breathes: every rendered frame the [`ScaleOscillator`] moves its
//! value one fixed step towards a bound and turns around when it gets there.
//! The value is uploaded as a [`ScaleUniform`] together with a brightness derived
//! from it through [`remap`].

use crate::config::ScaleConfig;

/// Linearly map `value` from `[from_min, from_max]` onto `[to_min, to_max]`.
///
/// The result is not clamped, values outside the source range extrapolate.
/// A degenerate source range maps everything onto `to_min`.
pub fn remap(value: f32, from_min: f32, from_max: f32, to_min: f32, to_max: f32) -> f32 {
    let span = from_max - from_min;
    if span == 0.0 {
        return to_min;
    }
    to_min + (value - from_min) * (to_max - to_min) / span
}

/// Ping-pong counter bounded by `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleOscillator {
    value: f32,
    step: f32,
    min: f32,
    max: f32,
}

impl ScaleOscillator {
    /// Swapped bounds are reordered and the step is taken by magnitude, so the
    /// oscillator always starts out growing.
    pub fn with_bounds(initial: f32, min: f32, max: f32, step: f32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            value: initial.clamp(min, max),
            step: step.abs(),
            min,
            max,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// `true` while the value is moving towards `max`.
    pub fn is_rising(&self) -> bool {
        self.step > 0.0
    }

    /// Move one step. Hitting or passing a bound pins the value to it and flips the direction.
    pub fn advance(&mut self) -> f32 {
        let next = self.value + self.step;
        if next >= self.max {
            self.value = self.max;
            self.step = -self.step.abs();
        } else if next <= self.min {
            self.value = self.min;
            self.step = self.step.abs();
        } else {
            self.value = next;
        }
        self.value
    }

    /// Uniform for the current value, brightness runs from half to full over the bounds.
    pub fn uniform(&self) -> ScaleUniform {
        let brightness = remap(self.value, self.min, self.max, 0.5, 1.0);
        ScaleUniform::new(self.value, brightness)
    }
}

impl From<ScaleConfig> for ScaleOscillator {
    fn from(config: ScaleConfig) -> Self {
        Self::with_bounds(config.initial, config.min, config.max, config.step)
    }
}

/// Host side of the `Uniforms` struct declared in the vertex shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ScaleUniform {
    pub scale: f32,
    pub brightness: f32,
    // Uniform buffers are sized in 16 byte steps
    _padding: [f32; 2],
}

impl ScaleUniform {
    pub fn new(scale: f32, brightness: f32) -> Self {
        Self {
            scale,
            brightness,
            _padding: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remap_hits_both_ends_and_the_midpoint() {
        assert_eq!(remap(0.0, 0.0, 10.0, 100.0, 200.0), 100.0);
        assert_eq!(remap(10.0, 0.0, 10.0, 100.0, 200.0), 200.0);
        assert_eq!(remap(5.0, 0.0, 10.0, 100.0, 200.0), 150.0);
    }

    #[test]
    fn remap_handles_reversed_target_range() {
        assert_eq!(remap(0.25, 0.0, 1.0, 1.0, 0.0), 0.75);
    }

    #[test]
    fn remap_extrapolates_outside_the_source_range() {
        assert_eq!(remap(20.0, 0.0, 10.0, 0.0, 1.0), 2.0);
        assert_eq!(remap(-10.0, 0.0, 10.0, 0.0, 1.0), -1.0);
    }

    #[test]
    fn remap_with_empty_source_range_returns_target_min() {
        assert_eq!(remap(3.0, 1.0, 1.0, 4.0, 8.0), 4.0);
    }

    #[test]
    fn oscillator_turns_around_at_max() {
        let mut osc = ScaleOscillator::with_bounds(0.5, 0.0, 1.0, 0.25);
        assert_eq!(osc.advance(), 0.75);
        assert_eq!(osc.advance(), 1.0);
        assert!(!osc.is_rising());
        assert_eq!(osc.advance(), 0.75);
    }

    #[test]
    fn oscillator_turns_around_at_min() {
        let mut osc = ScaleOscillator::with_bounds(0.25, 0.0, 1.0, 0.25);
        // climb to the top first
        for _ in 0..3 {
            osc.advance();
        }
        assert_eq!(osc.value(), 1.0);
        for _ in 0..4 {
            osc.advance();
        }
        assert_eq!(osc.value(), 0.0);
        assert!(osc.is_rising());
        assert_eq!(osc.advance(), 0.25);
    }

    #[test]
    fn oscillator_clamps_overshooting_steps() {
        let mut osc = ScaleOscillator::with_bounds(0.9, 0.0, 1.0, 0.3);
        assert_eq!(osc.advance(), 1.0);
    }

    #[test]
    fn oscillator_never_leaves_its_bounds() {
        let mut osc = ScaleOscillator::with_bounds(0.3, 0.25, 1.0, 0.007);
        let mut turns = 0;
        let mut rising = osc.is_rising();
        for _ in 0..10_000 {
            let value = osc.advance();
            assert!((0.25..=1.0).contains(&value), "{} escaped the bounds", value);
            if osc.is_rising() != rising {
                turns += 1;
                rising = osc.is_rising();
            }
        }
        assert!(turns > 10);
    }

    #[test]
    fn oscillator_normalises_swapped_bounds_and_negative_step() {
        let osc = ScaleOscillator::with_bounds(5.0, 1.0, 0.0, -0.1);
        assert_eq!(osc.min(), 0.0);
        assert_eq!(osc.max(), 1.0);
        assert_eq!(osc.value(), 1.0);
        assert!(osc.is_rising());
    }

    #[test]
    fn oscillator_from_config() {
        let osc = ScaleOscillator::from(ScaleConfig::default());
        assert_eq!(osc.value(), 0.5);
        assert_eq!(osc.min(), 0.25);
        assert_eq!(osc.max(), 1.0);
    }

    #[test]
    fn uniform_brightness_follows_scale() {
        let osc = ScaleOscillator::with_bounds(1.0, 0.0, 1.0, 0.1);
        assert_eq!(osc.uniform(), ScaleUniform::new(1.0, 1.0));
        let osc = ScaleOscillator::with_bounds(0.0, 0.0, 1.0, 0.1);
        assert_eq!(osc.uniform().brightness, 0.5);
    }

    #[test]
    fn uniform_is_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<ScaleUniform>(), 16);
        let uniform = ScaleUniform::new(2.0, 0.5);
        let bytes: &[u8] = bytemuck::bytes_of(&uniform);
        assert_eq!(&bytes[0..4], &2.0f32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &0.5f32.to_ne_bytes());
    }
}
