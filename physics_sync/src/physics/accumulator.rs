//! Fixed timestep accumulator decoupling physics ticks from frame time
//!
//! Frame deltas are accumulated and converted into a whole number of fixed
//! ticks. The remainder is carried to the next frame and exposed as an
//! interpolation alpha for rendering.

use tracing::warn;

const STEP_EPSILON: f32 = 1e-4;

/// Accumulator for fixed timestep physics updates
#[derive(Debug, Clone)]
pub struct PhysicsAccumulator {
    /// Accumulated time not yet consumed by a tick
    accumulated: f32,
    /// Fixed timestep for physics updates
    pub fixed_timestep: f32,
    /// Upper bound on ticks per frame
    pub max_substeps: u32,
}

impl PhysicsAccumulator {
    /// Create a new physics accumulator with the given fixed timestep
    pub fn new(fixed_timestep: f32, max_substeps: u32) -> Self {
        Self {
            accumulated: 0.0,
            fixed_timestep,
            max_substeps: max_substeps.max(1),
        }
    }

    /// Add delta time to the accumulator
    /// Returns the number of physics steps to perform
    pub fn accumulate(&mut self, delta_time: f32) -> u32 {
        if self.fixed_timestep <= 0.0 || !delta_time.is_finite() || delta_time <= 0.0 {
            return 0;
        }

        self.accumulated += delta_time;

        // Prevent spiral of death
        let limit = self.fixed_timestep * self.max_substeps as f32;
        if self.accumulated > limit {
            warn!(
                accumulated = self.accumulated,
                max_substeps = self.max_substeps,
                "Physics accumulator too large, clamping"
            );
            self.accumulated = limit;
        }

        // Tolerance keeps whole multiples of the step from rounding down
        let steps = (self.accumulated / self.fixed_timestep + STEP_EPSILON) as u32;
        let steps = steps.min(self.max_substeps);
        self.accumulated = (self.accumulated - steps as f32 * self.fixed_timestep).max(0.0);

        steps
    }

    /// Get the interpolation alpha value for rendering
    /// Alpha is in range [0, 1] representing how far between physics frames we are
    pub fn interpolation_alpha(&self) -> f32 {
        if self.fixed_timestep <= 0.0 {
            return 0.0;
        }
        (self.accumulated / self.fixed_timestep).clamp(0.0, 1.0)
    }

    /// Reset the accumulator to zero
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }

    /// Get the current accumulated time
    pub fn accumulated_time(&self) -> f32 {
        self.accumulated
    }
}

impl Default for PhysicsAccumulator {
    fn default() -> Self {
        // 100Hz physics updates
        Self::new(0.01, 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_basic() {
        let mut acc = PhysicsAccumulator::new(1.0 / 60.0, 8);

        let steps = acc.accumulate(1.0 / 30.0); // 2 frames worth
        assert_eq!(steps, 2);
        assert!(acc.interpolation_alpha() < 0.001);

        let steps = acc.accumulate(1.0 / 120.0); // Half a frame
        assert_eq!(steps, 0);
        assert!((acc.interpolation_alpha() - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_accumulator_spiral_of_death() {
        let mut acc = PhysicsAccumulator::new(1.0 / 60.0, 8);

        let steps = acc.accumulate(1.0);
        assert_eq!(steps, 8);
        assert!(acc.accumulated_time() < acc.fixed_timestep);
    }

    #[test]
    fn test_custom_substep_limit() {
        let mut acc = PhysicsAccumulator::new(0.01, 3);
        assert_eq!(acc.accumulate(0.5), 3);
    }

    #[test]
    fn test_invalid_delta_is_ignored() {
        let mut acc = PhysicsAccumulator::default();
        assert_eq!(acc.accumulate(-1.0), 0);
        assert_eq!(acc.accumulate(f32::NAN), 0);
        assert_eq!(acc.accumulated_time(), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut acc = PhysicsAccumulator::new(1.0 / 60.0, 8);
        acc.accumulate(1.0 / 120.0);
        acc.reset();
        assert_eq!(acc.accumulated_time(), 0.0);
    }
}
