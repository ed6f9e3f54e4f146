use crate::core::context::SimulationContext;
use crate::core::race::RacePhase;
use crate::interfaces::hud_interface::{HudState, LeaderboardEntry, MinimapEntry};
use helpers::general::{lin_interp, normalize_angle, ordinal};

const GRAVITY: f64 = 9.81;

// upper end of every gear as fraction of the top speed
const GEAR_TOP_FRACS: [f64; 8] = [0.12, 0.22, 0.33, 0.45, 0.57, 0.70, 0.84, 1.0];
const RPM_IDLE: f64 = 4000.0;
const RPM_GEAR_LOW: f64 = 6000.0;
const RPM_GEAR_HIGH: f64 = 12000.0;
const NEUTRAL_SPEED: f64 = 0.5;

const TIRE_TEMP_AMBIENT: f64 = 25.0;
const TIRE_TEMP_SPEED_GAIN: f64 = 60.0;
const TIRE_TEMP_STEER_GAIN: f64 = 30.0;
const TIRE_TEMP_BRAKE_GAIN: f64 = 15.0;
const TIRE_TEMP_TAU: f64 = 4.0;

/// gear_and_rpm derives a gear label and engine speed from the vehicle speed. Nothing of this is
/// simulated, it is display only.
pub fn gear_and_rpm(speed: f64, max_speed: f64) -> (String, f64) {
    if !(speed >= NEUTRAL_SPEED) || !(max_speed > 0.0) {
        return (String::from("N"), RPM_IDLE);
    }

    let frac = (speed / max_speed).clamp(0.0, 1.0);
    let gear_idx = GEAR_TOP_FRACS
        .iter()
        .position(|&top| frac <= top)
        .unwrap_or(GEAR_TOP_FRACS.len() - 1);
    let lo = if gear_idx == 0 {
        0.0
    } else {
        GEAR_TOP_FRACS[gear_idx - 1]
    };
    let hi = GEAR_TOP_FRACS[gear_idx];
    let rpm = lin_interp(frac, &[lo, hi], &[RPM_GEAR_LOW, RPM_GEAR_HIGH]);

    ((gear_idx + 1).to_string(), rpm)
}

/// tire_temp_targets returns the steady-state temperature per corner (FL, FR, RL, RR). Positive
/// steering (left turn) loads the right-hand tires, braking loads the fronts.
pub fn tire_temp_targets(speed_frac: f64, steer: f64, brake: f64) -> [f64; 4] {
    let base = TIRE_TEMP_AMBIENT + TIRE_TEMP_SPEED_GAIN * speed_frac;
    let corner_load = TIRE_TEMP_STEER_GAIN * speed_frac * steer.abs();
    let (left_load, right_load) = if steer > 0.0 {
        (0.0, corner_load)
    } else {
        (corner_load, 0.0)
    };
    let brake_load = TIRE_TEMP_BRAKE_GAIN * brake;

    [
        base + left_load + brake_load,
        base + right_load + brake_load,
        base + left_load,
        base + right_load,
    ]
}

/// TelemetryAggregator derives the HUD values from the simulation context. It never mutates the
/// simulation, it only keeps its own smoothing state between ticks.
#[derive(Debug, Clone)]
pub struct TelemetryAggregator {
    tire_temps: [f64; 4],
    prev_speed: f64,
    prev_heading: f64,
    initialized: bool,
}

impl Default for TelemetryAggregator {
    fn default() -> Self {
        TelemetryAggregator::new()
    }
}

impl TelemetryAggregator {
    pub fn new() -> TelemetryAggregator {
        TelemetryAggregator {
            tire_temps: [TIRE_TEMP_AMBIENT; 4],
            prev_speed: 0.0,
            prev_heading: 0.0,
            initialized: false,
        }
    }

    pub fn reset(&mut self) {
        *self = TelemetryAggregator::new();
    }

    /// update projects the current context onto a HUD state, `dt` is the time since the last
    /// call.
    pub fn update(&mut self, ctx: &SimulationContext, dt: f64) -> HudState {
        let player = ctx.player();
        let state = &player.state;
        let valid_dt = dt > 0.0 && dt.is_finite();

        // g-force
        let g_force = if self.initialized && valid_dt {
            let long = (state.speed - self.prev_speed) / dt;
            let yaw_rate = normalize_angle(state.heading - self.prev_heading) / dt;
            let lat = state.speed * yaw_rate;
            (long * long + lat * lat).sqrt() / GRAVITY
        } else {
            0.0
        };
        self.prev_speed = state.speed;
        self.prev_heading = state.heading;
        self.initialized = true;

        // tire temperatures
        let speed_frac = if player.max_speed > 0.0 {
            (state.speed / player.max_speed).clamp(0.0, 1.0)
        } else {
            0.0
        };
        if valid_dt {
            let targets = tire_temp_targets(speed_frac, state.intents.steer, state.intents.brake);
            let alpha = 1.0 - (-dt / TIRE_TEMP_TAU).exp();
            for (temp, target) in self.tire_temps.iter_mut().zip(targets.iter()) {
                *temp += (target - *temp) * alpha;
            }
        }

        // laps and timing
        let session_best = ctx
            .cars
            .iter()
            .filter_map(|car| car.best_lap)
            .fold(None, |best: Option<f64>, t| Some(best.map_or(t, |b| b.min(t))));
        let delta = match (player.last_lap, session_best) {
            (Some(last), Some(best)) => Some(last - best),
            _ => None,
        };
        let cur_laptime = match ctx.race.phase {
            RacePhase::Running | RacePhase::Finished => ctx.race.race_time - player.lap_start,
            _ => 0.0,
        };

        // ranking
        let order = if ctx.race.is_finished() {
            ctx.race.classification.to_owned()
        } else {
            ctx.classification()
        };
        let player_pos = order.iter().position(|&idx| idx == 0).unwrap_or(0) as u32 + 1;
        let leaderboard = order
            .iter()
            .enumerate()
            .map(|(pos, &idx)| LeaderboardEntry {
                position: pos as u32 + 1,
                car_no: ctx.cars[idx].car_no,
                name: ctx.cars[idx].name.to_owned(),
                lap: ctx.cars[idx].get_lap(),
                is_player: idx == 0,
            })
            .collect();
        let minimap = ctx
            .cars
            .iter()
            .map(|car| MinimapEntry {
                car_no: car.car_no,
                x: car.state.position[0],
                z: car.state.position[2],
                is_player: car.is_player(),
            })
            .collect();

        let lights_lit = match ctx.race.phase {
            RacePhase::RedLights { lit } => lit,
            RacePhase::Holding => ctx.consts.race_control.no_lights,
            _ => 0,
        };
        let drs_available = ctx.race.phase == RacePhase::Running
            && player.get_lap() >= ctx.race_pars.drs_allowed_lap
            && ctx
                .track
                .is_in_drs_zone(ctx.track.angular_progress(state.ground()));
        let (gear, rpm) = gear_and_rpm(state.speed, player.max_speed);

        HudState {
            phase: ctx.race.phase,
            lights_lit,
            speed: state.speed * 3.6,
            rpm,
            gear,
            throttle: state.intents.throttle * 100.0,
            brake: state.intents.brake * 100.0,
            g_force,
            fuel: player.resources.fuel,
            lap: player.get_lap().min(ctx.race_pars.tot_no_laps),
            tot_no_laps: ctx.race_pars.tot_no_laps,
            cur_laptime,
            last_laptime: player.last_lap,
            best_laptime: player.best_lap,
            delta,
            position: format!("{} / {}", ordinal(player_pos), ctx.cars.len()),
            drs_available,
            drs_active: state.boost.drs_active,
            ers_available: player.resources.ers_available(&ctx.consts.resources),
            ers_active: state.boost.ers_active,
            boost_energy: player.resources.boost_energy,
            tire_temps: self.tire_temps,
            tire_wear: player.resources.tire_wear,
            damage: player.resources.damage,
            needs_pit_stop: player.resources.needs_pit_stop,
            leaderboard,
            minimap,
            final_result: None,
        }
    }
}
