use crate::core::dynamics::VehicleState;
use crate::core::input::{ControlIntents, RawInput};
use crate::core::track::Track;
use crate::core::upgrades::UpgradeProfile;
use helpers::general::{clamp_finite, normalize_angle};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// * `lookahead` - Lap fraction between the car and its pursuit target
/// * `steer_gain` - Steering per radian of heading error (before the skill factor)
/// * `target_speed_min_frac`, `target_speed_max_frac` - Range of the randomized cruising speed
/// as fraction of the top speed
/// * `speed_noise` - Standard deviation of the cruising speed for consistency 0 as fraction of
/// the top speed
/// * `brake_margin` - Braking starts above this multiple of the desired speed
/// * `corner_speed_floor` - Lower bound of the heading error speed reduction
/// * `autopilot_deadband` - (rad) Heading error tolerated by the key autopilot
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AiPars {
    pub lookahead: f64,
    pub steer_gain: f64,
    pub target_speed_min_frac: f64,
    pub target_speed_max_frac: f64,
    pub speed_noise: f64,
    pub brake_margin: f64,
    pub corner_speed_floor: f64,
    pub autopilot_deadband: f64,
}

impl Default for AiPars {
    fn default() -> Self {
        AiPars {
            lookahead: 0.03,
            steer_gain: 2.5,
            target_speed_min_frac: 0.72,
            target_speed_max_frac: 0.86,
            speed_noise: 0.05,
            brake_margin: 1.05,
            corner_speed_floor: 0.5,
            autopilot_deadband: 0.02,
        }
    }
}

/// * `name` - Driver name, e.g. Max Speedwell
/// * `upgrades` - Upgrade levels of the car
/// * `skill` - Scales the heading correction of the AI, (0, 1]
/// * `aggression` - Scales the acceleration of the AI
/// * `consistency` - 1.0 means no random spread of the cruising speed
/// * `lane_scale` - Racing line as scaled centerline around the track center, 1.0 = centerline
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DriverPars {
    pub name: String,
    #[serde(default)]
    pub upgrades: UpgradeProfile,
    #[serde(default = "default_skill")]
    pub skill: f64,
    #[serde(default = "default_aggression")]
    pub aggression: f64,
    #[serde(default = "default_consistency")]
    pub consistency: f64,
    #[serde(default = "default_lane_scale")]
    pub lane_scale: f64,
}

fn default_skill() -> f64 {
    0.9
}

fn default_aggression() -> f64 {
    1.0
}

fn default_consistency() -> f64 {
    0.9
}

fn default_lane_scale() -> f64 {
    1.0
}

impl DriverPars {
    pub fn new(name: &str) -> DriverPars {
        DriverPars {
            name: name.to_owned(),
            upgrades: UpgradeProfile::default(),
            skill: default_skill(),
            aggression: default_aggression(),
            consistency: default_consistency(),
            lane_scale: default_lane_scale(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AiMode {
    /// Standing on the grid, no intents are produced.
    Idle,
    /// Chasing the lookahead point on its lane.
    Following,
}

/// AiDriver is the pure-pursuit controller of one opponent. It has no collision avoidance and no
/// overtaking logic.
#[derive(Debug, Clone)]
pub struct AiDriver {
    pub skill: f64,
    pub aggression: f64,
    pub consistency: f64,
    pub lane_scale: f64,
    pub target_speed: f64,
    pub mode: AiMode,
}

/// heading_error returns the signed angle in [-pi, pi] from `heading` to the direction from
/// `from` to `to`. Coinciding points give 0.
pub fn heading_error(heading: f64, from: [f64; 2], to: [f64; 2]) -> f64 {
    let dx = to[0] - from[0];
    let dz = to[1] - from[1];
    if dx.abs() < f64::EPSILON && dz.abs() < f64::EPSILON {
        return 0.0;
    }
    normalize_angle(dz.atan2(dx) - heading)
}

/// pursuit_target returns the point `lookahead` ahead of `position` on the lane.
pub fn pursuit_target(track: &Track, position: [f64; 2], lane_scale: f64, lookahead: f64) -> [f64; 2] {
    let progress = track.angular_progress(position);
    track.lane_point(progress + lookahead, lane_scale)
}

/// desired_speed reduces the cruising speed with the heading error, so the car slows down for
/// corners.
pub fn desired_speed(target_speed: f64, heading_err: f64, ai_pars: &AiPars) -> f64 {
    target_speed * (1.0 - heading_err.abs()).max(ai_pars.corner_speed_floor)
}

/// draw_target_speed draws the cruising speed of one opponent: uniform in the configured range
/// plus a normal spread that shrinks with consistency.
pub fn draw_target_speed<R: Rng>(
    max_speed: f64,
    consistency: f64,
    ai_pars: &AiPars,
    rng: &mut R,
) -> f64 {
    let lo = ai_pars.target_speed_min_frac;
    let hi = ai_pars.target_speed_max_frac;
    let frac = if lo < hi { rng.gen_range(lo..=hi) } else { lo };

    let sigma = (1.0 - consistency).max(0.0) * ai_pars.speed_noise * max_speed;
    let noise = match Normal::new(0.0, sigma) {
        Ok(dist) if sigma > 0.0 => dist.sample(rng),
        _ => 0.0,
    };

    clamp_finite(frac * max_speed + noise, 0.3 * max_speed, max_speed, lo * max_speed)
}

impl AiDriver {
    pub fn new<R: Rng>(
        driver_pars: &DriverPars,
        max_speed: f64,
        ai_pars: &AiPars,
        rng: &mut R,
    ) -> AiDriver {
        AiDriver {
            skill: driver_pars.skill,
            aggression: driver_pars.aggression,
            consistency: driver_pars.consistency,
            lane_scale: driver_pars.lane_scale,
            target_speed: draw_target_speed(max_speed, driver_pars.consistency, ai_pars, rng),
            mode: AiMode::Idle,
        }
    }

    pub fn engage(&mut self) {
        self.mode = AiMode::Following;
    }

    /// compute_intents chases the lookahead point: the heading error scaled by skill gives the
    /// steering, the throttle holds the cruising speed reduced for corners.
    pub fn compute_intents(
        &self,
        state: &VehicleState,
        track: &Track,
        ai_pars: &AiPars,
    ) -> ControlIntents {
        if self.mode == AiMode::Idle {
            return ControlIntents::default();
        }

        let position = state.ground();
        let target = pursuit_target(track, position, self.lane_scale, ai_pars.lookahead);
        let err = heading_error(state.heading, position, target);

        let steer = clamp_finite(err * ai_pars.steer_gain * self.skill, -1.0, 1.0, 0.0);
        let v_desired = desired_speed(self.target_speed, err, ai_pars);

        let (throttle, brake) = if state.speed < v_desired {
            (1.0, 0.0)
        } else if v_desired > 0.0 && state.speed > v_desired * ai_pars.brake_margin {
            (0.0, ((state.speed / v_desired - 1.0) * 4.0).min(1.0))
        } else {
            (0.0, 0.0)
        };

        ControlIntents {
            throttle,
            brake,
            steer,
            drs_request: true,
            ers_request: false,
        }
        .clamped()
    }
}

/// autopilot_keys produces the key flags a simple human-like driver would press to follow the
/// centerline at `target_speed`. Used to drive the player headless through the Input Sampler.
pub fn autopilot_keys(
    state: &VehicleState,
    track: &Track,
    target_speed: f64,
    ai_pars: &AiPars,
) -> RawInput {
    let position = state.ground();
    let target = pursuit_target(track, position, 1.0, ai_pars.lookahead);
    let err = heading_error(state.heading, position, target);
    let v_desired = desired_speed(target_speed, err, ai_pars);

    RawInput {
        up: state.speed < v_desired,
        down: state.speed > v_desired * ai_pars.brake_margin,
        left: err > ai_pars.autopilot_deadband,
        right: err < -ai_pars.autopilot_deadband,
        drs: true,
        ers: err.abs() < ai_pars.autopilot_deadband,
    }
}
