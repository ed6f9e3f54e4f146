use crate::core::input::ControlIntents;
use crate::core::resources::ResourceMultipliers;
use crate::core::upgrades::UpgradeProfile;
use crate::interfaces::render_interface::VehicleTransform;
use helpers::general::{clamp_finite, normalize_angle};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// * `base_max_speed` - (m/s) Top speed with a base upgrade profile
/// * `accel_bands` - (m/s^2) Acceleration below 25 %, 50 %, 75 % and above 75 % of top speed
/// * `brake_decel` - (m/s^2) Deceleration at full brake
/// * `drag_coeff` - (m/s^2) Drag deceleration at top speed, quadratic in speed
/// * `rolling_resistance` - (m/s^2) Constant deceleration while moving
/// * `turn_rate` - (rad/s) Yaw rate at full lock and low speed
/// * `min_turn_attenuation` - Lower bound of the speed-dependent turn rate factor
/// * `turn_attenuation_slope` - Turn rate lost between standstill and top speed
/// * `steer_authority_speed` - (m/s) Below this speed steering authority fades out
/// * `ers_boost`, `drs_boost` - Throttle multipliers while the boost is active
/// * `max_dt` - (s) Upper bound of a single integration step
/// * `wheel_radius` - (m) Used for the cosmetic wheel spin
/// * `max_wheel_steer` - (rad) Cosmetic front wheel angle at full lock
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DynamicsPars {
    pub base_max_speed: f64,
    pub accel_bands: [f64; 4],
    pub brake_decel: f64,
    pub drag_coeff: f64,
    pub rolling_resistance: f64,
    pub turn_rate: f64,
    pub min_turn_attenuation: f64,
    pub turn_attenuation_slope: f64,
    pub steer_authority_speed: f64,
    pub ers_boost: f64,
    pub drs_boost: f64,
    pub max_dt: f64,
    pub wheel_radius: f64,
    pub max_wheel_steer: f64,
}

impl Default for DynamicsPars {
    fn default() -> Self {
        DynamicsPars {
            base_max_speed: 90.0,
            accel_bands: [16.0, 11.0, 7.0, 4.5],
            brake_decel: 32.0,
            drag_coeff: 5.2,
            rolling_resistance: 0.6,
            turn_rate: 1.7,
            min_turn_attenuation: 0.2,
            turn_attenuation_slope: 0.8,
            steer_authority_speed: 6.0,
            ers_boost: 1.25,
            drs_boost: 1.12,
            max_dt: 0.1,
            wheel_radius: 0.33,
            max_wheel_steer: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoostFlags {
    pub ers_active: bool,
    pub drs_active: bool,
}

/// VehicleState of one car, simulated on the x/z ground plane (y is up). A heading of 0 points
/// along +x, increasing headings rotate towards +z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleState {
    pub position: [f64; 3],
    pub heading: f64,
    pub speed: f64,
    pub intents: ControlIntents,
    pub boost: BoostFlags,
    /// Cosmetic spin angle per wheel (FL, FR, RL, RR), rad in [0, 2pi[.
    pub wheel_spin: [f64; 4],
}

impl VehicleState {
    pub fn new(ground: [f64; 2], heading: f64) -> VehicleState {
        VehicleState {
            position: [ground[0], 0.0, ground[1]],
            heading: normalize_angle(heading),
            speed: 0.0,
            intents: ControlIntents::default(),
            boost: BoostFlags::default(),
            wheel_spin: [0.0; 4],
        }
    }

    /// Position on the ground plane as [x, z].
    pub fn ground(&self) -> [f64; 2] {
        [self.position[0], self.position[2]]
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.heading.is_finite()
            && self.speed.is_finite()
    }

    pub fn transform(&self, pars: &DynamicsPars) -> VehicleTransform {
        VehicleTransform {
            position: self.position,
            yaw: self.heading,
            wheel_spin: self.wheel_spin,
            wheel_steer: self.intents.steer * pars.max_wheel_steer,
        }
    }
}

/// StepInput bundles everything the dynamics model needs besides the state itself.
/// `accel_scale` is 1.0 for the player and the aggression factor for AI drivers.
#[derive(Debug, Clone, Copy)]
pub struct StepInput<'a> {
    pub intents: ControlIntents,
    pub boost: BoostFlags,
    pub profile: &'a UpgradeProfile,
    pub multipliers: ResourceMultipliers,
    pub accel_scale: f64,
}

/// clamp_dt returns 0.0 for unusable time steps and caps the others at `max_dt`.
pub fn clamp_dt(dt: f64, max_dt: f64) -> f64 {
    if dt > 0.0 && dt.is_finite() {
        dt.min(max_dt.max(0.0))
    } else {
        0.0
    }
}

pub fn max_speed(profile: &UpgradeProfile, pars: &DynamicsPars) -> f64 {
    let v = pars.base_max_speed * profile.top_speed_mult();
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}

/// band_acceleration returns the throttle acceleration of the speed band that contains
/// `speed_frac` (speed divided by top speed).
pub fn band_acceleration(speed_frac: f64, pars: &DynamicsPars) -> f64 {
    let band = if speed_frac < 0.25 {
        0
    } else if speed_frac < 0.5 {
        1
    } else if speed_frac < 0.75 {
        2
    } else {
        3
    };
    pars.accel_bands[band]
}

/// drag_decel is the quadratic drag term `k * (speed / max_speed)^2`, reduced by aerodynamics.
pub fn drag_decel(speed: f64, max_speed: f64, aero_mult: f64, pars: &DynamicsPars) -> f64 {
    if max_speed <= 0.0 || aero_mult <= 0.0 {
        return 0.0;
    }
    let frac = speed / max_speed;
    pars.drag_coeff * frac * frac / aero_mult
}

/// turn_attenuation is `max(min, 1 - speed / max_speed * slope)`.
pub fn turn_attenuation(speed: f64, max_speed: f64, pars: &DynamicsPars) -> f64 {
    if max_speed <= 0.0 {
        return 1.0;
    }
    (1.0 - speed / max_speed * pars.turn_attenuation_slope).max(pars.min_turn_attenuation)
}

/// step integrates speed, heading and position of one car over `dt`. The same function drives
/// the player and every AI car.
pub fn step(state: &mut VehicleState, input: &StepInput, pars: &DynamicsPars, dt: f64) {
    let intents = input.intents.clamped();
    state.intents = intents;
    state.boost = input.boost;

    let dt = clamp_dt(dt, pars.max_dt);
    if dt == 0.0 {
        return;
    }

    let v_max = max_speed(input.profile, pars);
    if v_max <= 0.0 {
        state.speed = 0.0;
        return;
    }

    // longitudinal
    let speed_frac = (state.speed / v_max).clamp(0.0, 1.0);

    let mut throttle_mult =
        input.profile.engine_mult() * input.multipliers.accel * input.accel_scale.max(0.0);
    if input.boost.ers_active {
        throttle_mult *= pars.ers_boost;
    }
    if input.boost.drs_active {
        throttle_mult *= pars.drs_boost;
    }

    let accel = band_acceleration(speed_frac, pars) * intents.throttle * throttle_mult;
    let braking =
        pars.brake_decel * intents.brake * input.profile.brake_mult() * input.multipliers.brake;
    let drag = drag_decel(state.speed, v_max, input.profile.aero_mult(), pars);
    let rolling = if state.speed > 0.0 {
        pars.rolling_resistance
    } else {
        0.0
    };

    let speed_new = state.speed + (accel - braking - drag - rolling) * dt;
    state.speed = clamp_finite(speed_new, 0.0, v_max, 0.0);

    // lateral
    let authority = if pars.steer_authority_speed > 0.0 {
        (state.speed / pars.steer_authority_speed).min(1.0)
    } else {
        1.0
    };
    let yaw_rate = intents.steer
        * pars.turn_rate
        * input.profile.handling_mult()
        * input.multipliers.handling
        * turn_attenuation(state.speed, v_max, pars)
        * authority;
    state.heading = normalize_angle(state.heading + yaw_rate * dt);

    // position
    let ds = state.speed * dt;
    let x_new = state.position[0] + state.heading.cos() * ds;
    let z_new = state.position[2] + state.heading.sin() * ds;
    if x_new.is_finite() && z_new.is_finite() {
        state.position[0] = x_new;
        state.position[2] = z_new;
    }

    // cosmetic wheel spin
    if pars.wheel_radius > 0.0 {
        let dphi = ds / pars.wheel_radius;
        for spin in state.wheel_spin.iter_mut() {
            *spin = (*spin + dphi).rem_euclid(2.0 * PI);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn intents(throttle: f64, brake: f64, steer: f64) -> ControlIntents {
        ControlIntents {
            throttle,
            brake,
            steer,
            ..Default::default()
        }
    }

    fn run(state: &mut VehicleState, ci: ControlIntents, profile: &UpgradeProfile, secs: f64) {
        let pars = DynamicsPars::default();
        let input = StepInput {
            intents: ci,
            boost: BoostFlags::default(),
            profile,
            multipliers: ResourceMultipliers::default(),
            accel_scale: 1.0,
        };
        let ticks = (secs / 0.02).round() as usize;
        for _ in 0..ticks {
            step(state, &input, &pars, 0.02);
        }
    }

    #[test]
    fn acceleration_bands_decrease_with_speed() {
        let pars = DynamicsPars::default();
        assert!(band_acceleration(0.1, &pars) > band_acceleration(0.3, &pars));
        assert!(band_acceleration(0.3, &pars) > band_acceleration(0.6, &pars));
        assert!(band_acceleration(0.6, &pars) > band_acceleration(0.9, &pars));
    }

    #[test]
    fn drag_limits_top_speed_below_max() {
        let profile = UpgradeProfile::default();
        let pars = DynamicsPars::default();
        let mut state = VehicleState::new([0.0, 0.0], 0.0);
        run(&mut state, intents(1.0, 0.0, 0.0), &profile, 120.0);

        let v_max = max_speed(&profile, &pars);
        assert!(state.speed < v_max);
        assert!(state.speed > 0.8 * v_max);

        // settled: another 10 s changes nothing noticeable
        let settled = state.speed;
        run(&mut state, intents(1.0, 0.0, 0.0), &profile, 10.0);
        assert_relative_eq!(state.speed, settled, max_relative = 1e-3);
    }

    #[test]
    fn straight_line_moves_along_heading() {
        let profile = UpgradeProfile::default();
        let mut state = VehicleState::new([10.0, -5.0], PI / 2.0);
        run(&mut state, intents(1.0, 0.0, 0.0), &profile, 3.0);

        assert_relative_eq!(state.position[0], 10.0, epsilon = 1e-9);
        assert!(state.position[2] > -5.0 + 10.0);
        assert_eq!(state.position[1], 0.0);
    }

    #[test]
    fn braking_stops_and_never_reverses() {
        let profile = UpgradeProfile::default();
        let pars = DynamicsPars::default();
        let mut state = VehicleState::new([0.0, 0.0], 0.0);
        state.speed = max_speed(&profile, &pars);

        run(&mut state, intents(0.0, 1.0, 0.0), &profile, 5.0);
        assert_eq!(state.speed, 0.0);

        let pos = state.position;
        run(&mut state, intents(0.0, 1.0, 0.0), &profile, 2.0);
        assert_eq!(state.speed, 0.0);
        assert_eq!(state.position, pos);
    }

    #[test]
    fn steering_authority_drops_with_speed() {
        let pars = DynamicsPars::default();
        assert_relative_eq!(turn_attenuation(0.0, 90.0, &pars), 1.0);
        assert_relative_eq!(turn_attenuation(90.0, 90.0, &pars), 0.2, epsilon = 1e-12);
        assert_relative_eq!(turn_attenuation(45.0, 90.0, &pars), 0.6, epsilon = 1e-12);
        assert_relative_eq!(turn_attenuation(10.0, 0.0, &pars), 1.0);
    }

    #[test]
    fn no_turning_at_standstill() {
        let profile = UpgradeProfile::default();
        let mut state = VehicleState::new([0.0, 0.0], 0.3);
        run(&mut state, intents(0.0, 0.0, 1.0), &profile, 1.0);
        assert_relative_eq!(state.heading, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn positive_steer_turns_left() {
        let profile = UpgradeProfile::default();
        let mut state = VehicleState::new([0.0, 0.0], 0.0);
        state.speed = 30.0;
        run(&mut state, intents(0.5, 0.0, 1.0), &profile, 0.5);
        assert!(state.heading > 0.0);
    }

    #[test]
    fn boost_raises_acceleration() {
        let profile = UpgradeProfile::default();
        let pars = DynamicsPars::default();
        let mut plain = VehicleState::new([0.0, 0.0], 0.0);
        let mut boosted = plain;

        let base = StepInput {
            intents: intents(1.0, 0.0, 0.0),
            boost: BoostFlags::default(),
            profile: &profile,
            multipliers: ResourceMultipliers::default(),
            accel_scale: 1.0,
        };
        let with_boost = StepInput {
            boost: BoostFlags {
                ers_active: true,
                drs_active: true,
            },
            ..base
        };

        for _ in 0..50 {
            step(&mut plain, &base, &pars, 0.02);
            step(&mut boosted, &with_boost, &pars, 0.02);
        }
        assert!(boosted.speed > plain.speed);
        assert!(boosted.boost.ers_active);
    }

    #[test]
    fn damage_multiplier_slows_acceleration() {
        let profile = UpgradeProfile::default();
        let pars = DynamicsPars::default();
        let mut healthy = VehicleState::new([0.0, 0.0], 0.0);
        let mut damaged = healthy;
        let healthy_input = StepInput {
            intents: intents(1.0, 0.0, 0.0),
            boost: BoostFlags::default(),
            profile: &profile,
            multipliers: ResourceMultipliers::default(),
            accel_scale: 1.0,
        };
        let damaged_input = StepInput {
            multipliers: ResourceMultipliers {
                accel: 0.5,
                ..Default::default()
            },
            ..healthy_input
        };
        for _ in 0..10 {
            step(&mut healthy, &healthy_input, &pars, 0.05);
            step(&mut damaged, &damaged_input, &pars, 0.05);
        }
        assert!(damaged.speed < healthy.speed);
    }

    #[test]
    fn degenerate_inputs_are_ignored() {
        let profile = UpgradeProfile::default();
        let pars = DynamicsPars::default();
        let mut state = VehicleState::new([1.0, 2.0], 0.0);
        state.speed = 20.0;
        let before = state;
        let input = StepInput {
            intents: intents(f64::NAN, 0.0, f64::INFINITY),
            boost: BoostFlags::default(),
            profile: &profile,
            multipliers: ResourceMultipliers::default(),
            accel_scale: 1.0,
        };

        step(&mut state, &input, &pars, f64::NAN);
        step(&mut state, &input, &pars, -1.0);
        step(&mut state, &input, &pars, 0.0);
        assert_eq!(state.position, before.position);
        assert_eq!(state.speed, before.speed);

        let zero_top = DynamicsPars {
            base_max_speed: 0.0,
            ..DynamicsPars::default()
        };
        step(&mut state, &input, &zero_top, 0.05);
        assert_eq!(state.speed, 0.0);
        assert!(state.is_finite());
    }

    #[test]
    fn large_dt_is_clamped() {
        assert_relative_eq!(clamp_dt(5.0, 0.1), 0.1);
        assert_relative_eq!(clamp_dt(0.016, 0.1), 0.016);
        assert_eq!(clamp_dt(-0.1, 0.1), 0.0);
        assert_eq!(clamp_dt(f64::INFINITY, 0.1), 0.0);
    }

    #[test]
    fn wheels_spin_with_distance() {
        let profile = UpgradeProfile::default();
        let mut state = VehicleState::new([0.0, 0.0], 0.0);
        state.speed = 10.0;
        run(&mut state, intents(0.2, 0.0, 0.0), &profile, 0.1);
        assert!(state.wheel_spin.iter().all(|&s| s > 0.0 && s < 2.0 * PI));
    }
}
