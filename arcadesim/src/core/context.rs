use crate::core::car::{Car, DriveEnv};
use crate::core::driver::DriverPars;
use crate::core::input::RawInput;
use crate::core::race::{classify_entries, RacePars, RacePhase, RaceState, SimConstants};
use crate::core::track::Track;
use crate::interfaces::render_interface::RenderSink;
use crate::post::race_result::{ClassificationEntry, RaceEventKind, RaceResult};
use crate::pre::read_sim_pars::SimPars;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// create_rng returns a seeded generator, or one seeded from the OS if no seed is given.
pub fn create_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// SimulationContext owns the complete state of one race: track, cars (player at index 0) and
/// race state. It is created at race start and passed by reference to everything that reads
/// or mutates the simulation.
#[derive(Debug)]
pub struct SimulationContext {
    pub track: Track,
    pub cars: Vec<Car>,
    pub race: RaceState,
    pub consts: SimConstants,
    pub race_pars: RacePars,
    player_pars: DriverPars,
    opponent_pars: Vec<DriverPars>,
    rng: StdRng,
}

impl SimulationContext {
    /// new validates the parameters, creates the track and places all cars on the grid.
    pub fn new(sim_pars: &SimPars, rng: StdRng) -> anyhow::Result<SimulationContext> {
        sim_pars.validate()?;
        let track = Track::from_pars(&sim_pars.track_pars)?;

        Ok(SimulationContext::from_parts(
            track,
            &sim_pars.player_pars,
            &sim_pars.opponent_pars,
            &sim_pars.race_pars,
            &sim_pars.sim_constants,
            rng,
        ))
    }

    /// from_parts creates the context from already validated parts.
    pub fn from_parts(
        track: Track,
        player_pars: &DriverPars,
        opponent_pars: &[DriverPars],
        race_pars: &RacePars,
        consts: &SimConstants,
        rng: StdRng,
    ) -> SimulationContext {
        let mut ctx = SimulationContext {
            track,
            cars: vec![],
            race: RaceState::new(),
            consts: consts.to_owned(),
            race_pars: race_pars.to_owned(),
            player_pars: player_pars.to_owned(),
            opponent_pars: opponent_pars.to_vec(),
            rng,
        };
        ctx.create_cars();
        ctx
    }

    fn create_cars(&mut self) {
        let no_cars = self.opponent_pars.len() + 1;
        let mut cars = Vec::with_capacity(no_cars);
        cars.push(Car::new_player(
            no_cars,
            &self.player_pars,
            &self.track,
            &self.consts,
            self.race_pars.no_checkpoints,
            self.race_pars.checkpoint_radius,
        ));

        for (i, driver_pars) in self.opponent_pars.iter().enumerate() {
            cars.push(Car::new_opponent(
                i + 1,
                no_cars,
                driver_pars,
                &self.track,
                &self.consts,
                self.race_pars.no_checkpoints,
                self.race_pars.checkpoint_radius,
                &mut self.rng,
            ));
        }
        self.cars = cars;
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHOD ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// simulate_timestep advances the whole race by one tick. Invalid time steps are ignored,
    /// too large ones are clamped. Nothing changes in Idle and Finished.
    pub fn simulate_timestep(&mut self, dt: f64) {
        if !(dt > 0.0 && dt.is_finite()) {
            log::warn!("Ignoring invalid time step {}", dt);
            return;
        }
        let dt = dt.min(self.consts.dynamics.max_dt);

        match self.race.phase {
            RacePhase::Idle | RacePhase::Finished => {}
            RacePhase::Running => self.simulate_running(dt),
            _ => {
                self.race.session_time += dt;
                let entered_running = self.race.advance_start_sequence(
                    dt,
                    &self.consts.race_control,
                    &mut self.rng,
                );
                if entered_running {
                    self.race.race_time = 0.0;
                    for car in self.cars.iter_mut() {
                        car.engage(0.0);
                    }
                }
            }
        }
    }

    fn simulate_running(&mut self, dt: f64) {
        self.race.session_time += dt;
        self.race.race_time += dt;

        let env = DriveEnv {
            track: &self.track,
            consts: &self.consts,
            dt,
            race_time: self.race.race_time,
            drs_enabled: true,
            drs_allowed_lap: self.race_pars.drs_allowed_lap,
        };

        // all cars in fixed order
        for car in self.cars.iter_mut() {
            let outcome = car.drive(&env);

            if outcome.checkpoints_passed > 0 {
                log::debug!(
                    "Car {} passed {} checkpoint(s), {} of {} this lap",
                    car.car_no,
                    outcome.checkpoints_passed,
                    car.sh.get_no_passed(),
                    self.race_pars.no_checkpoints
                );
            }
            if outcome.entered_off_track {
                log::debug!("Car {} left the track at {:.3}s", car.car_no, env.race_time);
                self.race.log_event(RaceEventKind::OffTrack, vec![car.car_no]);
            }
            if outcome.pit_advisory_raised {
                log::debug!("Car {} should pit, tire wear {:.1}%", car.car_no, car.resources.tire_wear);
                self.race.log_event(RaceEventKind::PitAdvisory, vec![car.car_no]);
            }
            if let Some(laptime) = outcome.lap_completed {
                let lap = car.sh.get_compl_lap();
                log::info!("Car {} ({}) completed lap {} in {:.3}s", car.car_no, car.name, lap, laptime);
                self.race.log_event(RaceEventKind::LapCompleted { lap, laptime }, vec![car.car_no]);
            }
        }

        // finish as soon as the player starts the lap after the last one
        if self.cars[0].get_lap() > self.race_pars.tot_no_laps {
            let classification = self.classification();
            log::info!(
                "Race finished after {:.3}s, winner car {}",
                self.race.race_time,
                classification.first().copied().unwrap_or(0)
            );
            self.race.finish(classification);
        }
    }

    // ---------------------------------------------------------------------------------------------
    // CONTROL -------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// start begins the light sequence. Returns false if the race was already started.
    pub fn start(&mut self) -> bool {
        self.race.start()
    }

    /// set_player_input stores the key flags of the player for the next tick.
    pub fn set_player_input(&mut self, raw: RawInput) {
        if self.race.is_finished() {
            return;
        }
        self.cars[0].set_raw_input(raw);
    }

    /// reset_player puts the player back onto the start line at standstill. Not possible after
    /// the finish.
    pub fn reset_player(&mut self) -> bool {
        if self.race.is_finished() {
            return false;
        }
        self.cars[0].reset_to_start_line(&self.track);
        log::info!("Player reset to the start line at {:.3}s", self.race.session_time);
        self.race.log_event(RaceEventKind::PlayerReset, vec![0]);
        true
    }

    /// restart reinitializes all cars and the race state with the same parameters. The random
    /// number generator continues, so the opponents draw new cruising speeds.
    pub fn restart(&mut self) {
        self.race = RaceState::new();
        self.create_cars();
        log::info!("Race restarted");
    }

    // ---------------------------------------------------------------------------------------------
    // METHODS (HELPERS) ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn player(&self) -> &Car {
        &self.cars[0]
    }

    pub fn phase(&self) -> RacePhase {
        self.race.phase
    }

    /// classification returns the car indices ordered by lap count, then angular progress.
    pub fn classification(&self) -> Vec<usize> {
        let laps: Vec<u32> = self.cars.iter().map(|car| car.get_lap()).collect();
        let progress: Vec<f64> = self
            .cars
            .iter()
            .map(|car| self.track.angular_progress(car.state.ground()))
            .collect();
        classify_entries(&laps, &progress)
    }

    /// publish_transforms hands the transform of every car to the renderer.
    pub fn publish_transforms(&self, sink: &mut dyn RenderSink) {
        for car in self.cars.iter() {
            sink.set_transform(car.car_no, &car.state.transform(&self.consts.dynamics));
        }
    }

    pub fn get_race_result(&self) -> RaceResult {
        let order = if self.race.is_finished() {
            self.race.classification.to_owned()
        } else {
            self.classification()
        };

        let classification = order
            .iter()
            .enumerate()
            .map(|(pos, &idx)| {
                let car = &self.cars[idx];
                ClassificationEntry {
                    position: pos as u32 + 1,
                    car_no: car.car_no,
                    name: car.name.to_owned(),
                    laps: car.get_lap(),
                    progress: self.track.angular_progress(car.state.ground()),
                    best_lap: car.best_lap,
                    racetime: car.laptimes.iter().sum(),
                }
            })
            .collect();

        RaceResult {
            tot_no_laps: self.race_pars.tot_no_laps,
            finished: self.race.is_finished(),
            race_time: self.race.race_time,
            classification,
            laptimes: self.cars.iter().map(|car| car.laptimes.to_owned()).collect(),
            events: self.race.events.to_owned(),
        }
    }
}
