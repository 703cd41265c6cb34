//! Animation LOD gate
//!
//! Decides per frame whether a model's animation is due for re-evaluation.
//! Elapsed time, scaled by the bias, accumulates into a timer; evaluation
//! happens whenever the timer reaches the current LOD distance. The timer
//! wraps with `fmod` instead of resetting so the cadence keeps its phase.

use crate::settings::ANIMATION_LOD_BASESCALE;

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationLodGate {
    bias: f32,
    base_scale: f32,
    distance: f32,
    /// `None` until the first evaluation; the next check is then always due.
    timer: Option<f32>,
}

impl Default for AnimationLodGate {
    fn default() -> Self {
        Self::new(1.0, ANIMATION_LOD_BASESCALE)
    }
}

impl AnimationLodGate {
    #[must_use]
    pub fn new(bias: f32, base_scale: f32) -> Self {
        Self {
            bias: bias.max(0.0),
            base_scale,
            distance: 0.0,
            timer: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn bias(&self) -> f32 {
        self.bias
    }

    /// Sets the bias, clamped to non-negative. Zero disables throttling.
    pub fn set_bias(&mut self, bias: f32) {
        self.bias = bias.max(0.0);
    }

    #[inline]
    #[must_use]
    pub fn base_scale(&self) -> f32 {
        self.base_scale
    }

    pub fn set_base_scale(&mut self, scale: f32) {
        self.base_scale = scale;
    }

    #[inline]
    #[must_use]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance;
    }

    /// Current timer, `None` while in the never-evaluated state.
    #[inline]
    #[must_use]
    pub fn timer(&self) -> Option<f32> {
        self.timer
    }

    /// Forces the next check to report due.
    pub fn reset(&mut self) {
        self.timer = None;
    }

    /// Advances the timer by `time_step` and reports whether evaluation is due.
    pub fn check_due(&mut self, time_step: f32) -> bool {
        if self.bias <= 0.0 || self.distance <= 0.0 {
            return true;
        }

        match self.timer {
            None => {
                self.timer = Some(0.0);
                true
            }
            Some(timer) => {
                let timer = timer + self.bias * time_step * self.base_scale;
                if timer >= self.distance {
                    self.timer = Some(timer % self.distance);
                    true
                } else {
                    self.timer = Some(timer);
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_bias_always_due() {
        let mut gate = AnimationLodGate::new(0.0, 1.0);
        gate.set_distance(100.0);
        for _ in 0..10 {
            assert!(gate.check_due(0.01));
        }
        assert_eq!(gate.timer(), None);
    }

    #[test]
    fn test_zero_distance_always_due() {
        let mut gate = AnimationLodGate::new(1.0, 1.0);
        assert!(gate.check_due(0.0));
        assert!(gate.check_due(0.0));
    }

    #[test]
    fn test_reset_forces_due() {
        let mut gate = AnimationLodGate::new(1.0, 1.0);
        gate.set_distance(10.0);
        assert!(gate.check_due(1.0));
        assert!(!gate.check_due(1.0));
        gate.reset();
        assert!(gate.check_due(1.0));
        assert_eq!(gate.timer(), Some(0.0));
    }

    #[test]
    fn test_negative_bias_clamped() {
        let mut gate = AnimationLodGate::new(-3.0, 1.0);
        assert_eq!(gate.bias(), 0.0);
        gate.set_bias(-1.0);
        assert_eq!(gate.bias(), 0.0);
    }
}
