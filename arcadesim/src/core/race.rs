use crate::core::driver::AiPars;
use crate::core::dynamics::DynamicsPars;
use crate::core::input::InputSampler;
use crate::core::resources::ResourcePars;
use crate::post::race_result::{RaceEvent, RaceEventKind};
use helpers::general::{argsort, SortOrder};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// * `tot_no_laps` - Total number of laps, the race is finished when the player starts lap
/// `tot_no_laps + 1`
/// * `seed` - Seed of the random number generator (random if not set)
/// * `no_checkpoints` - Number of checkpoints per lap
/// * `checkpoint_radius` - (m) A checkpoint is passed within this distance
/// * `drs_allowed_lap` - First lap in which DRS may be used
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RacePars {
    pub tot_no_laps: u32,
    pub seed: Option<u64>,
    pub no_checkpoints: usize,
    pub checkpoint_radius: f64,
    pub drs_allowed_lap: u32,
}

impl Default for RacePars {
    fn default() -> Self {
        RacePars {
            tot_no_laps: 3,
            seed: None,
            no_checkpoints: 8,
            checkpoint_radius: 30.0,
            drs_allowed_lap: 2,
        }
    }
}

/// * `countdown` - (s) Duration of the countdown before the first light
/// * `light_step` - (s) Duration of every red light step
/// * `no_lights` - Number of red lights
/// * `hold_min`, `hold_max` - (s) Bounds of the random hold with all lights on
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RaceControlPars {
    pub countdown: f64,
    pub light_step: f64,
    pub no_lights: u8,
    pub hold_min: f64,
    pub hold_max: f64,
}

impl Default for RaceControlPars {
    fn default() -> Self {
        RaceControlPars {
            countdown: 1.0,
            light_step: 1.0,
            no_lights: 5,
            hold_min: 2.0,
            hold_max: 4.0,
        }
    }
}

/// SimConstants collects the tuning of all models, every part may be overridden in the parameter
/// file.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SimConstants {
    pub dynamics: DynamicsPars,
    pub resources: ResourcePars,
    pub ai: AiPars,
    pub race_control: RaceControlPars,
    pub input_smoothing: f64,
}

impl Default for SimConstants {
    fn default() -> Self {
        SimConstants {
            dynamics: DynamicsPars::default(),
            resources: ResourcePars::default(),
            ai: AiPars::default(),
            race_control: RaceControlPars::default(),
            input_smoothing: InputSampler::DEFAULT_SMOOTHING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    Idle,
    Countdown,
    /// `lit` lights are on, 1 to `no_lights`.
    RedLights { lit: u8 },
    Holding,
    Green,
    Running,
    Finished,
}

impl Default for RacePhase {
    fn default() -> Self {
        RacePhase::Idle
    }
}

impl RacePhase {
    /// is_start_sequence returns true between Countdown and Green (both included).
    pub fn is_start_sequence(&self) -> bool {
        matches!(
            self,
            RacePhase::Countdown | RacePhase::RedLights { .. } | RacePhase::Holding | RacePhase::Green
        )
    }
}

/// RaceState is the race-wide part of the state machine. The per-car progress (laps,
/// checkpoints, lap times) is kept by the cars.
/// * `phase_time` - (s) Time spent in the current phase
/// * `hold_duration` - (s) Randomized duration of the hold, drawn when the last light comes on
/// * `session_time` - (s) Time since the start of the countdown
/// * `race_time` - (s) Time since the start of the Running phase
#[derive(Debug, Clone, Default)]
pub struct RaceState {
    pub phase: RacePhase,
    pub phase_time: f64,
    pub hold_duration: f64,
    pub session_time: f64,
    pub race_time: f64,
    pub classification: Vec<usize>,
    pub events: Vec<RaceEvent>,
}

impl RaceState {
    pub fn new() -> RaceState {
        RaceState::default()
    }

    fn set_phase(&mut self, phase: RacePhase) {
        log::info!("Race phase {:?} at {:.3}s", phase, self.session_time);
        self.phase = phase;
        self.events.push(RaceEvent {
            kind: RaceEventKind::PhaseChange(phase),
            time_s: self.session_time,
            cars: vec![],
        });
    }

    pub fn log_event(&mut self, kind: RaceEventKind, cars: Vec<usize>) {
        self.events.push(RaceEvent {
            kind,
            time_s: self.session_time,
            cars,
        });
    }

    /// start leaves Idle and starts the countdown. Returns false if the race is not Idle.
    pub fn start(&mut self) -> bool {
        if self.phase != RacePhase::Idle {
            return false;
        }
        self.phase_time = 0.0;
        self.session_time = 0.0;
        self.race_time = 0.0;
        self.set_phase(RacePhase::Countdown);
        true
    }

    /// advance_start_sequence moves the light sequence forward by `dt`. Left over time is carried
    /// into the next phase, so the phase durations do not depend on the tick length. Green is
    /// kept for exactly one tick. Returns true on the tick that enters Running.
    pub fn advance_start_sequence<R: Rng>(
        &mut self,
        dt: f64,
        pars: &RaceControlPars,
        rng: &mut R,
    ) -> bool {
        if self.phase == RacePhase::Green {
            self.phase_time = 0.0;
            self.set_phase(RacePhase::Running);
            return true;
        }
        if !self.phase.is_start_sequence() {
            return false;
        }

        self.phase_time += dt;

        loop {
            let phase = self.phase;
            match phase {
                RacePhase::Countdown if self.phase_time >= pars.countdown => {
                    self.phase_time -= pars.countdown;
                    self.set_phase(RacePhase::RedLights { lit: 1 });
                }
                RacePhase::RedLights { lit } if self.phase_time >= pars.light_step => {
                    self.phase_time -= pars.light_step;
                    if lit < pars.no_lights {
                        self.set_phase(RacePhase::RedLights { lit: lit + 1 });
                    } else {
                        self.hold_duration = draw_hold_duration(pars, rng);
                        log::debug!("Hold duration {:.3}s", self.hold_duration);
                        self.set_phase(RacePhase::Holding);
                    }
                }
                RacePhase::Holding if self.phase_time >= self.hold_duration => {
                    self.phase_time = 0.0;
                    self.set_phase(RacePhase::Green);
                    break;
                }
                _ => break,
            }
        }
        false
    }

    /// finish enters the terminal phase with the given classification.
    pub fn finish(&mut self, classification: Vec<usize>) {
        self.classification = classification;
        self.set_phase(RacePhase::Finished);
    }

    pub fn is_finished(&self) -> bool {
        self.phase == RacePhase::Finished
    }
}

/// draw_hold_duration draws the hold uniformly in [hold_min, hold_max].
pub fn draw_hold_duration<R: Rng>(pars: &RaceControlPars, rng: &mut R) -> f64 {
    if pars.hold_min < pars.hold_max {
        rng.gen_range(pars.hold_min..=pars.hold_max)
    } else {
        pars.hold_min
    }
}

/// classify_entries returns the entity indices sorted by lap count descending, then by angular
/// progress descending. Entities with equal keys keep their index order.
pub fn classify_entries(laps: &[u32], progress: &[f64]) -> Vec<usize> {
    let race_progs: Vec<f64> = laps
        .iter()
        .zip(progress.iter())
        .map(|(&lap, &prog)| lap as f64 + helpers::general::clamp_finite(prog, 0.0, 0.999_999, 0.0))
        .collect();

    argsort(&race_progs, SortOrder::Descending)
}
