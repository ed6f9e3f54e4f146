use crate::core::input::ControlIntents;
use crate::core::upgrades::UpgradeProfile;
use serde::{Deserialize, Serialize};

pub const MAX_PERCENT: f64 = 100.0;

/// * `fuel_initial` - (kg) Fuel load at race start
/// * `fuel_burn_rate` - (kg/s) Consumption at full throttle
/// * `tire_wear_speed_rate` - (%/s) Wear at max speed, straight line
/// * `tire_wear_steer_rate` - (%/s) Additional wear at max speed and full steering lock
/// * `pit_advisory_wear` - (%) Below this wear the car is flagged for a pit stop
/// * `damage_rate` - (%/m) Damage per meter driven off track
/// * `collision_speed_factor` - Speed multiplier applied on every off-track tick
/// * `boost_initial` - (%) Boost energy at race start
/// * `boost_regen_rate` - (%/s) Regeneration under full braking
/// * `boost_regen_min_speed` - (m/s) No regeneration below this speed
/// * `boost_drain_rate` - (%/s) Consumption while ERS is active
/// * `boost_min_energy` - (%) ERS is unavailable below this energy
/// * `wear_handling_floor` - Handling multiplier with fully worn tires
/// * `wear_brake_floor` - Brake multiplier with fully worn tires
/// * `damage_efficiency_loss` - Acceleration lost at 100 % damage
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResourcePars {
    pub fuel_initial: f64,
    pub fuel_burn_rate: f64,
    pub tire_wear_speed_rate: f64,
    pub tire_wear_steer_rate: f64,
    pub pit_advisory_wear: f64,
    pub damage_rate: f64,
    pub collision_speed_factor: f64,
    pub boost_initial: f64,
    pub boost_regen_rate: f64,
    pub boost_regen_min_speed: f64,
    pub boost_drain_rate: f64,
    pub boost_min_energy: f64,
    pub wear_handling_floor: f64,
    pub wear_brake_floor: f64,
    pub damage_efficiency_loss: f64,
}

impl Default for ResourcePars {
    fn default() -> Self {
        ResourcePars {
            fuel_initial: 110.0,
            fuel_burn_rate: 0.12,
            tire_wear_speed_rate: 0.08,
            tire_wear_steer_rate: 0.12,
            pit_advisory_wear: 30.0,
            damage_rate: 0.04,
            collision_speed_factor: 0.95,
            boost_initial: 100.0,
            boost_regen_rate: 6.0,
            boost_regen_min_speed: 8.0,
            boost_drain_rate: 18.0,
            boost_min_energy: 5.0,
            wear_handling_floor: 0.6,
            wear_brake_floor: 0.8,
            damage_efficiency_loss: 0.5,
        }
    }
}

/// ResourceMultipliers are derived from the resources every tick and scale the dynamics model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceMultipliers {
    pub accel: f64,
    pub brake: f64,
    pub handling: f64,
}

impl Default for ResourceMultipliers {
    fn default() -> Self {
        ResourceMultipliers {
            accel: 1.0,
            brake: 1.0,
            handling: 1.0,
        }
    }
}

/// ResourceInput is what the resource subsystem sees of the previous tick.
#[derive(Debug, Clone, Copy)]
pub struct ResourceInput {
    pub intents: ControlIntents,
    pub max_speed: f64,
    pub off_track: bool,
    pub ers_active: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceTickOutcome {
    pub multipliers: ResourceMultipliers,
    /// The off-track speed penalty was applied this tick.
    pub collided: bool,
    /// The pit stop advisory was raised this tick.
    pub pit_advisory_raised: bool,
}

/// ResourceState of one car.
/// * `fuel` - (kg) only decreases
/// * `tire_wear` - (%) 100 = new, decreases with speed and steering
/// * `damage` - (%) 0 = intact, increases only off track
/// * `boost_energy` - (%) KERS/ERS store
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceState {
    pub fuel: f64,
    pub tire_wear: f64,
    pub damage: f64,
    pub boost_energy: f64,
    pub needs_pit_stop: bool,
}

impl ResourceState {
    pub fn new(pars: &ResourcePars) -> ResourceState {
        let mut state = ResourceState {
            fuel: pars.fuel_initial,
            tire_wear: MAX_PERCENT,
            damage: 0.0,
            boost_energy: pars.boost_initial,
            needs_pit_stop: false,
        };
        state.clamp(pars);
        state
    }

    /// update advances all four resources by one tick and returns the multipliers for the
    /// dynamics model. An off-track tick also scales `speed` by the collision factor.
    pub fn update(
        &mut self,
        input: &ResourceInput,
        speed: &mut f64,
        profile: &UpgradeProfile,
        pars: &ResourcePars,
        dt: f64,
    ) -> ResourceTickOutcome {
        let mut outcome = ResourceTickOutcome::default();

        if dt > 0.0 && dt.is_finite() {
            let intents = input.intents.clamped();
            let speed_frac = if input.max_speed > 0.0 {
                (*speed / input.max_speed).clamp(0.0, 1.0)
            } else {
                0.0
            };

            // fuel is informational only
            self.fuel -= intents.throttle * pars.fuel_burn_rate * dt;

            // tire wear
            let wear_rate = (pars.tire_wear_speed_rate * speed_frac
                + pars.tire_wear_steer_rate * speed_frac * intents.steer.abs())
                * profile.tire_wear_mult();
            self.tire_wear -= wear_rate * dt;

            if !self.needs_pit_stop && self.tire_wear < pars.pit_advisory_wear {
                self.needs_pit_stop = true;
                outcome.pit_advisory_raised = true;
            }

            // damage and collision response
            if input.off_track && *speed > 0.0 {
                self.damage += pars.damage_rate * *speed * dt;
                *speed *= pars.collision_speed_factor;
                outcome.collided = true;
            }

            // boost energy
            if intents.brake > 0.0 && *speed >= pars.boost_regen_min_speed {
                self.boost_energy +=
                    pars.boost_regen_rate * intents.brake * profile.kers_mult() * dt;
            }
            if input.ers_active {
                self.boost_energy -= pars.boost_drain_rate / profile.kers_mult() * dt;
            }
        }

        self.clamp(pars);
        outcome.multipliers = self.multipliers(pars);
        outcome
    }

    /// multipliers derives the performance multipliers from the current resource levels.
    pub fn multipliers(&self, pars: &ResourcePars) -> ResourceMultipliers {
        let wear_frac = self.tire_wear / MAX_PERCENT;
        let damage_frac = self.damage / MAX_PERCENT;

        ResourceMultipliers {
            accel: 1.0 - damage_frac * pars.damage_efficiency_loss,
            brake: pars.wear_brake_floor + (1.0 - pars.wear_brake_floor) * wear_frac,
            handling: pars.wear_handling_floor + (1.0 - pars.wear_handling_floor) * wear_frac,
        }
    }

    pub fn ers_available(&self, pars: &ResourcePars) -> bool {
        self.boost_energy > pars.boost_min_energy
    }

    fn clamp(&mut self, pars: &ResourcePars) {
        let fuel_max = pars.fuel_initial.max(0.0);
        self.fuel = helpers::general::clamp_finite(self.fuel, 0.0, fuel_max, 0.0);
        self.tire_wear = helpers::general::clamp_finite(self.tire_wear, 0.0, MAX_PERCENT, 0.0);
        self.damage = helpers::general::clamp_finite(self.damage, 0.0, MAX_PERCENT, MAX_PERCENT);
        self.boost_energy =
            helpers::general::clamp_finite(self.boost_energy, 0.0, MAX_PERCENT, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn input(throttle: f64, brake: f64, steer: f64) -> ResourceInput {
        ResourceInput {
            intents: ControlIntents {
                throttle,
                brake,
                steer,
                ..Default::default()
            },
            max_speed: 90.0,
            off_track: false,
            ers_active: false,
        }
    }

    #[test]
    fn fuel_burns_with_throttle_only() {
        let pars = ResourcePars::default();
        let profile = UpgradeProfile::default();
        let mut res = ResourceState::new(&pars);
        let mut speed = 50.0;

        res.update(&input(0.0, 0.0, 0.0), &mut speed, &profile, &pars, 0.1);
        assert_relative_eq!(res.fuel, pars.fuel_initial);

        res.update(&input(1.0, 0.0, 0.0), &mut speed, &profile, &pars, 1.0);
        assert_relative_eq!(res.fuel, pars.fuel_initial - pars.fuel_burn_rate);
    }

    #[test]
    fn tire_wear_grows_with_steering_and_upgrades_slow_it() {
        let pars = ResourcePars::default();
        let base = UpgradeProfile::default();
        let upgraded = UpgradeProfile {
            tires: 10,
            ..Default::default()
        };

        let mut straight = ResourceState::new(&pars);
        let mut cornering = ResourceState::new(&pars);
        let mut cornering_upgraded = ResourceState::new(&pars);
        let mut speed = 90.0;

        straight.update(&input(1.0, 0.0, 0.0), &mut speed, &base, &pars, 1.0);
        cornering.update(&input(1.0, 0.0, 1.0), &mut speed, &base, &pars, 1.0);
        cornering_upgraded.update(&input(1.0, 0.0, 1.0), &mut speed, &upgraded, &pars, 1.0);

        assert!(cornering.tire_wear < straight.tire_wear);
        assert!(cornering_upgraded.tire_wear > cornering.tire_wear);
        assert!(straight.tire_wear < MAX_PERCENT);
    }

    #[test]
    fn pit_advisory_raised_once() {
        let pars = ResourcePars::default();
        let profile = UpgradeProfile::default();
        let mut res = ResourceState::new(&pars);
        res.tire_wear = pars.pit_advisory_wear + 0.01;
        let mut speed = 90.0;

        let first = res.update(&input(1.0, 0.0, 1.0), &mut speed, &profile, &pars, 0.1);
        assert!(first.pit_advisory_raised);
        assert!(res.needs_pit_stop);

        let second = res.update(&input(1.0, 0.0, 1.0), &mut speed, &profile, &pars, 0.1);
        assert!(!second.pit_advisory_raised);
    }

    #[test]
    fn off_track_accrues_damage_and_slows_down() {
        let pars = ResourcePars::default();
        let profile = UpgradeProfile::default();
        let mut res = ResourceState::new(&pars);
        let mut speed = 40.0;
        let mut off = input(1.0, 0.0, 0.0);
        off.off_track = true;

        let outcome = res.update(&off, &mut speed, &profile, &pars, 0.1);
        assert!(outcome.collided);
        assert_relative_eq!(speed, 40.0 * pars.collision_speed_factor);
        assert!(res.damage > 0.0);
        assert!(outcome.multipliers.accel < 1.0);
    }

    #[test]
    fn damage_never_grows_on_track() {
        let pars = ResourcePars::default();
        let profile = UpgradeProfile::default();
        let mut res = ResourceState::new(&pars);
        let mut speed = 80.0;

        for _ in 0..1000 {
            res.update(&input(1.0, 0.0, 0.5), &mut speed, &profile, &pars, 0.05);
        }
        assert_eq!(res.damage, 0.0);
        assert_relative_eq!(speed, 80.0);
    }

    #[test]
    fn boost_regenerates_under_braking_and_drains_when_used() {
        let pars = ResourcePars::default();
        let profile = UpgradeProfile::default();
        let mut res = ResourceState::new(&pars);
        res.boost_energy = 50.0;
        let mut speed = 40.0;

        res.update(&input(0.0, 1.0, 0.0), &mut speed, &profile, &pars, 1.0);
        assert_relative_eq!(res.boost_energy, 50.0 + pars.boost_regen_rate);

        let mut boosting = input(1.0, 0.0, 0.0);
        boosting.ers_active = true;
        res.update(&boosting, &mut speed, &profile, &pars, 1.0);
        assert_relative_eq!(
            res.boost_energy,
            50.0 + pars.boost_regen_rate - pars.boost_drain_rate
        );
    }

    #[test]
    fn no_regeneration_at_low_speed() {
        let pars = ResourcePars::default();
        let profile = UpgradeProfile::default();
        let mut res = ResourceState::new(&pars);
        res.boost_energy = 10.0;
        let mut speed = 1.0;

        res.update(&input(0.0, 1.0, 0.0), &mut speed, &profile, &pars, 1.0);
        assert_relative_eq!(res.boost_energy, 10.0);
    }

    #[test]
    fn all_values_stay_in_bounds() {
        let pars = ResourcePars::default();
        let profile = UpgradeProfile::default();
        let mut res = ResourceState::new(&pars);
        let mut speed = 90.0;
        let mut abuse = input(1.0, 1.0, 1.0);
        abuse.ers_active = true;
        abuse.off_track = true;

        for i in 0..20_000 {
            if i % 100 == 0 {
                speed = 90.0;
            }
            res.update(&abuse, &mut speed, &profile, &pars, 0.1);
            assert!(res.fuel >= 0.0);
            assert!((0.0..=MAX_PERCENT).contains(&res.tire_wear));
            assert!((0.0..=MAX_PERCENT).contains(&res.damage));
            assert!((0.0..=MAX_PERCENT).contains(&res.boost_energy));
        }
        assert_eq!(res.fuel, 0.0);
        assert!(res.needs_pit_stop);
        assert_eq!(res.damage, MAX_PERCENT);
    }
}
