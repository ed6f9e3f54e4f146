use crate::core::driver::{AiDriver, DriverPars};
use crate::core::dynamics::{self, BoostFlags, StepInput, VehicleState};
use crate::core::input::{InputSampler, RawInput};
use crate::core::race::SimConstants;
use crate::core::resources::{ResourceInput, ResourceState};
use crate::core::state_handler::StateHandler;
use crate::core::track::Track;
use crate::core::upgrades::UpgradeProfile;
use rand::Rng;

/// ControlSource is the only difference between the player and an opponent: where the control
/// intents come from. Both feed the same dynamics model.
#[derive(Debug, Clone)]
pub enum ControlSource {
    PlayerControlled {
        sampler: InputSampler,
        raw: RawInput,
    },
    AiControlled(AiDriver),
}

/// DriveEnv is the read-only environment of one tick.
/// * `race_time` - (s) Race time at the end of the current tick
/// * `drs_enabled` - DRS may be used in this race phase
pub struct DriveEnv<'a> {
    pub track: &'a Track,
    pub consts: &'a SimConstants,
    pub dt: f64,
    pub race_time: f64,
    pub drs_enabled: bool,
    pub drs_allowed_lap: u32,
}

/// DriveOutcome collects the discrete events of one tick of one car.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveOutcome {
    pub entered_off_track: bool,
    pub collided: bool,
    pub pit_advisory_raised: bool,
    pub checkpoints_passed: u32,
    /// (s) Lap time if a lap was completed this tick.
    pub lap_completed: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Car {
    pub car_no: usize,
    pub name: String,
    pub profile: UpgradeProfile,
    pub max_speed: f64,
    pub state: VehicleState,
    pub resources: ResourceState,
    pub sh: StateHandler,
    pub control: ControlSource,
    pub off_track: bool,
    pub lap_start: f64,
    pub laptimes: Vec<f64>,
    pub last_lap: Option<f64>,
    pub best_lap: Option<f64>,
}

impl Car {
    #[allow(clippy::too_many_arguments)]
    fn new(
        car_no: usize,
        no_cars: usize,
        driver_pars: &DriverPars,
        control: ControlSource,
        track: &Track,
        consts: &SimConstants,
        no_checkpoints: usize,
        checkpoint_radius: f64,
    ) -> Car {
        let grid_pose = track.start_pose(car_no, no_cars);
        Car {
            car_no,
            name: driver_pars.name.to_owned(),
            profile: driver_pars.upgrades,
            max_speed: dynamics::max_speed(&driver_pars.upgrades, &consts.dynamics),
            state: VehicleState::new(grid_pose.0, grid_pose.1),
            resources: ResourceState::new(&consts.resources),
            sh: StateHandler::new(
                track.checkpoints(no_checkpoints, checkpoint_radius),
                checkpoint_radius,
            ),
            control,
            off_track: false,
            lap_start: 0.0,
            laptimes: vec![],
            last_lap: None,
            best_lap: None,
        }
    }

    /// new_player creates the player car on the first grid slot.
    pub fn new_player(
        no_cars: usize,
        driver_pars: &DriverPars,
        track: &Track,
        consts: &SimConstants,
        no_checkpoints: usize,
        checkpoint_radius: f64,
    ) -> Car {
        let control = ControlSource::PlayerControlled {
            sampler: InputSampler::new(consts.input_smoothing),
            raw: RawInput::default(),
        };
        Car::new(
            0,
            no_cars,
            driver_pars,
            control,
            track,
            consts,
            no_checkpoints,
            checkpoint_radius,
        )
    }

    /// new_opponent creates an AI car, its cruising speed is drawn from `rng`.
    #[allow(clippy::too_many_arguments)]
    pub fn new_opponent<R: Rng>(
        car_no: usize,
        no_cars: usize,
        driver_pars: &DriverPars,
        track: &Track,
        consts: &SimConstants,
        no_checkpoints: usize,
        checkpoint_radius: f64,
        rng: &mut R,
    ) -> Car {
        let max_speed = dynamics::max_speed(&driver_pars.upgrades, &consts.dynamics);
        let control =
            ControlSource::AiControlled(AiDriver::new(driver_pars, max_speed, &consts.ai, rng));
        Car::new(
            car_no,
            no_cars,
            driver_pars,
            control,
            track,
            consts,
            no_checkpoints,
            checkpoint_radius,
        )
    }

    pub fn is_player(&self) -> bool {
        matches!(self.control, ControlSource::PlayerControlled { .. })
    }

    /// set_raw_input stores the key flags used by the next tick, ignored for AI cars.
    pub fn set_raw_input(&mut self, input: RawInput) {
        if let ControlSource::PlayerControlled { raw, .. } = &mut self.control {
            *raw = input;
        }
    }

    pub fn get_lap(&self) -> u32 {
        self.sh.get_lap()
    }

    /// engage starts the AI controller, no-op for the player.
    pub fn engage(&mut self, race_time: f64) {
        self.lap_start = race_time;
        if let ControlSource::AiControlled(ai) = &mut self.control {
            ai.engage();
        }
    }

    /// drive advances the car by one tick: resources first (based on the state of the previous
    /// tick), then new intents, boost gating, dynamics and finally checkpoint detection.
    pub fn drive(&mut self, env: &DriveEnv) -> DriveOutcome {
        let mut outcome = DriveOutcome::default();
        let consts = env.consts;

        // resources ---------------------------------------------------------------------------
        let off_track = env.track.is_off_track(self.state.ground());
        outcome.entered_off_track = off_track && !self.off_track;
        self.off_track = off_track;

        let res_input = ResourceInput {
            intents: self.state.intents,
            max_speed: self.max_speed,
            off_track,
            ers_active: self.state.boost.ers_active,
        };
        let res_outcome = self.resources.update(
            &res_input,
            &mut self.state.speed,
            &self.profile,
            &consts.resources,
            env.dt,
        );
        outcome.collided = res_outcome.collided;
        outcome.pit_advisory_raised = res_outcome.pit_advisory_raised;

        // control intents ---------------------------------------------------------------------
        let (intents, accel_scale) = match &mut self.control {
            ControlSource::PlayerControlled { sampler, raw } => (sampler.sample(raw), 1.0),
            ControlSource::AiControlled(ai) => (
                ai.compute_intents(&self.state, env.track, &consts.ai),
                ai.aggression,
            ),
        };

        // boost gating ------------------------------------------------------------------------
        let progress = env.track.angular_progress(self.state.ground());
        let boost = BoostFlags {
            drs_active: intents.drs_request
                && env.drs_enabled
                && self.sh.get_lap() >= env.drs_allowed_lap
                && env.track.is_in_drs_zone(progress),
            ers_active: intents.ers_request && self.resources.ers_available(&consts.resources),
        };

        // dynamics ----------------------------------------------------------------------------
        let step_input = StepInput {
            intents,
            boost,
            profile: &self.profile,
            multipliers: res_outcome.multipliers,
            accel_scale,
        };
        dynamics::step(&mut self.state, &step_input, &consts.dynamics, env.dt);

        // checkpoints and lap timing ----------------------------------------------------------
        outcome.checkpoints_passed = self.sh.update(self.state.ground());

        if self.sh.get_new_lap() {
            let laptime = env.race_time - self.lap_start;
            self.lap_start = env.race_time;
            self.laptimes.push(laptime);
            self.last_lap = Some(laptime);
            self.best_lap = Some(self.best_lap.map_or(laptime, |best| best.min(laptime)));
            outcome.lap_completed = Some(laptime);
        }

        outcome
    }

    /// reset_to_start_line puts the car back onto the start line (first grid position) at
    /// standstill. Laps and resources are kept, the checkpoints of the current lap have to be
    /// passed again.
    pub fn reset_to_start_line(&mut self, track: &Track) {
        let (pos, heading) = track.start_pose(0, 1);
        self.state = VehicleState::new(pos, heading);
        self.off_track = false;
        self.sh.clear_checkpoints();
        if let ControlSource::PlayerControlled { sampler, raw } = &mut self.control {
            sampler.reset();
            *raw = RawInput::default();
        }
    }
}
