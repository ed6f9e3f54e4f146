use serde::{Deserialize, Serialize};

/// RawInput holds the boolean key-down flags of one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub drs: bool,
    pub ers: bool,
}

/// ControlIntents are the continuous control values consumed by the vehicle dynamics model.
/// * `throttle` - [0, 1]
/// * `brake` - [0, 1]
/// * `steer` - [-1, 1], positive values turn left (heading increases)
/// * `drs_request`, `ers_request` - passed through, availability is checked by the car
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlIntents {
    pub throttle: f64,
    pub brake: f64,
    pub steer: f64,
    pub drs_request: bool,
    pub ers_request: bool,
}

impl ControlIntents {
    /// clamped returns the intents restricted to their declared ranges, NaN becomes 0.
    pub fn clamped(self) -> ControlIntents {
        ControlIntents {
            throttle: helpers::general::clamp_finite(self.throttle, 0.0, 1.0, 0.0),
            brake: helpers::general::clamp_finite(self.brake, 0.0, 1.0, 0.0),
            steer: helpers::general::clamp_finite(self.steer, -1.0, 1.0, 0.0),
            ..self
        }
    }
}

// below this distance the smoothed value snaps onto its target
const SNAP_EPS: f64 = 1e-4;

fn smooth(value: f64, target: f64, smoothing: f64) -> f64 {
    let next = value + (target - value) * smoothing;
    if (target - next).abs() < SNAP_EPS {
        target
    } else {
        next
    }
}

/// sample_intents is one smoothing step from the previous intents towards the targets given by
/// the raw keys: `value += (target - value) * smoothing`.
pub fn sample_intents(prev: &ControlIntents, raw: &RawInput, smoothing: f64) -> ControlIntents {
    let smoothing = helpers::general::clamp_finite(smoothing, 0.0, 1.0, 1.0);

    let throttle_target = if raw.up { 1.0 } else { 0.0 };
    let brake_target = if raw.down { 1.0 } else { 0.0 };
    let steer_target = match (raw.left, raw.right) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    };

    ControlIntents {
        throttle: smooth(prev.throttle, throttle_target, smoothing),
        brake: smooth(prev.brake, brake_target, smoothing),
        steer: smooth(prev.steer, steer_target, smoothing),
        drs_request: raw.drs,
        ers_request: raw.ers,
    }
    .clamped()
}

/// InputSampler keeps the smoothed intents of the player between ticks.
#[derive(Debug, Clone)]
pub struct InputSampler {
    smoothing: f64,
    intents: ControlIntents,
}

impl InputSampler {
    pub const DEFAULT_SMOOTHING: f64 = 0.15;

    pub fn new(smoothing: f64) -> InputSampler {
        InputSampler {
            smoothing,
            intents: ControlIntents::default(),
        }
    }

    pub fn sample(&mut self, raw: &RawInput) -> ControlIntents {
        self.intents = sample_intents(&self.intents, raw, self.smoothing);
        self.intents
    }

    pub fn intents(&self) -> ControlIntents {
        self.intents
    }

    pub fn reset(&mut self) {
        self.intents = ControlIntents::default();
    }
}

impl Default for InputSampler {
    fn default() -> Self {
        InputSampler::new(InputSampler::DEFAULT_SMOOTHING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn throttle_approaches_target_without_jump() {
        let mut sampler = InputSampler::new(0.2);
        let raw = RawInput {
            up: true,
            ..Default::default()
        };

        let first = sampler.sample(&raw);
        assert_abs_diff_eq!(first.throttle, 0.2, epsilon = 1e-12);

        let second = sampler.sample(&raw);
        assert_abs_diff_eq!(second.throttle, 0.36, epsilon = 1e-12);

        for _ in 0..200 {
            sampler.sample(&raw);
        }
        assert_eq!(sampler.intents().throttle, 1.0);
    }

    #[test]
    fn opposing_steer_keys_cancel() {
        let raw = RawInput {
            left: true,
            right: true,
            ..Default::default()
        };
        let prev = ControlIntents {
            steer: 0.5,
            ..Default::default()
        };
        let next = sample_intents(&prev, &raw, 0.5);
        assert_abs_diff_eq!(next.steer, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn right_key_steers_negative_and_stays_in_range() {
        let mut sampler = InputSampler::new(1.0);
        let raw = RawInput {
            right: true,
            ers: true,
            ..Default::default()
        };
        let intents = sampler.sample(&raw);
        assert_eq!(intents.steer, -1.0);
        assert!(intents.ers_request);
        assert!(!intents.drs_request);
    }

    #[test]
    fn release_decays_to_exact_zero() {
        let mut sampler = InputSampler::default();
        let pressed = RawInput {
            down: true,
            ..Default::default()
        };
        for _ in 0..50 {
            sampler.sample(&pressed);
        }
        for _ in 0..200 {
            sampler.sample(&RawInput::default());
        }
        assert_eq!(sampler.intents().brake, 0.0);
    }

    #[test]
    fn clamped_removes_nan() {
        let intents = ControlIntents {
            throttle: f64::NAN,
            brake: 3.0,
            steer: -7.0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(intents.throttle, 0.0);
        assert_eq!(intents.brake, 1.0);
        assert_eq!(intents.steer, -1.0);
    }
}
