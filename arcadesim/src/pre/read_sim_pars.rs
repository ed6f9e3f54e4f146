use crate::core::driver::DriverPars;
use crate::core::race::{RacePars, SimConstants};
use crate::core::track::{TrackPars, LINE_CHECKPOINT_MARGIN};
use crate::error::SimError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;

/// SimPars is used to store all other parameter structs.
/// * `player_pars` - Driver of the player car, it always starts from pole
/// * `opponent_pars` - AI drivers, lined up behind the player in the given order
/// * `sim_constants` - Model tuning, defaults are used for everything not given
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SimPars {
    pub race_pars: RacePars,
    #[serde(default)]
    pub track_pars: TrackPars,
    pub player_pars: DriverPars,
    #[serde(default)]
    pub opponent_pars: Vec<DriverPars>,
    #[serde(default)]
    pub sim_constants: SimConstants,
}

impl Default for SimPars {
    /// Built-in scenario: the player against three AI drivers on the procedural oval.
    fn default() -> Self {
        let opponent = |name: &str, skill: f64, lane_scale: f64| DriverPars {
            skill,
            lane_scale,
            ..DriverPars::new(name)
        };

        SimPars {
            race_pars: RacePars::default(),
            track_pars: TrackPars::default(),
            player_pars: DriverPars::new("Player"),
            opponent_pars: vec![
                opponent("Max Speedwell", 0.95, 0.99),
                opponent("Lena Apex", 0.9, 1.0),
                opponent("Tom Slipstream", 0.85, 1.01),
            ],
            sim_constants: SimConstants::default(),
        }
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), SimError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SimError::InvalidParameter { name, value })
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<(), SimError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SimError::InvalidParameter { name, value })
    }
}

fn check_driver(pars: &DriverPars) -> Result<(), SimError> {
    pars.upgrades.validate()?;
    check_positive("skill", pars.skill)?;
    check_non_negative("aggression", pars.aggression)?;
    check_non_negative("consistency", pars.consistency)?;
    if !(0.5..=1.5).contains(&pars.lane_scale) {
        return Err(SimError::InvalidParameter {
            name: "lane_scale",
            value: pars.lane_scale,
        });
    }
    Ok(())
}

impl SimPars {
    /// validate checks everything that would otherwise make the simulation meaningless, e.g. a
    /// race without laps or an upgrade level outside of [1, 10].
    pub fn validate(&self) -> Result<(), SimError> {
        // race
        if self.race_pars.tot_no_laps < 1 {
            return Err(SimError::NoLaps);
        }
        if self.race_pars.no_checkpoints < 1 {
            return Err(SimError::NoCheckpoints);
        }
        check_positive("checkpoint_radius", self.race_pars.checkpoint_radius)?;

        // track
        if self.track_pars.centerline_file.is_none() {
            if self.track_pars.no_points < 3 {
                return Err(SimError::TrackTooShort(self.track_pars.no_points));
            }
            check_positive("radius_x", self.track_pars.radius_x)?;
            check_positive("radius_z", self.track_pars.radius_z)?;
        }
        check_positive("half_width", self.track_pars.half_width)?;
        check_non_negative("d_first_gridpos", self.track_pars.d_first_gridpos)?;
        check_non_negative("d_per_gridpos", self.track_pars.d_per_gridpos)?;

        // the line checkpoint lies one radius plus the margin past the line
        let d_line_cp = self.race_pars.checkpoint_radius + LINE_CHECKPOINT_MARGIN;
        if self.track_pars.d_first_gridpos <= d_line_cp + self.race_pars.checkpoint_radius {
            log::warn!(
                "Last grid position is only {:.1}m past the line, within reach of the line checkpoint \
                at {:.1}m, the first lap will be completed early",
                self.track_pars.d_first_gridpos,
                d_line_cp
            );
        }

        // race control
        let rc = &self.sim_constants.race_control;
        check_non_negative("countdown", rc.countdown)?;
        check_non_negative("light_step", rc.light_step)?;
        check_non_negative("hold_min", rc.hold_min)?;
        check_non_negative("hold_max", rc.hold_max)?;
        if rc.hold_min > rc.hold_max {
            return Err(SimError::InvalidParameter {
                name: "hold_min",
                value: rc.hold_min,
            });
        }
        check_positive("max_dt", self.sim_constants.dynamics.max_dt)?;
        if !(0.0..1.0).contains(&self.sim_constants.input_smoothing) {
            return Err(SimError::InvalidParameter {
                name: "input_smoothing",
                value: self.sim_constants.input_smoothing,
            });
        }

        // drivers
        check_driver(&self.player_pars)?;
        for driver_pars in self.opponent_pars.iter() {
            check_driver(driver_pars)?;
        }

        Ok(())
    }
}

/// read_sim_pars reads the JSON file and decodes the JSON string into the simulation parameters
/// struct.
pub fn read_sim_pars(filepath: &Path) -> anyhow::Result<SimPars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open parameter file {}!",
            filepath.to_string_lossy()
        ))?;
    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse parameter file {}!",
        filepath.to_string_lossy()
    ))?;
    Ok(pars)
}

/// read_sim_constants reads a JSON file containing only the model tuning.
pub fn read_sim_constants(filepath: &Path) -> anyhow::Result<SimConstants> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open simulation constants file {}!",
            filepath.to_string_lossy()
        ))?;
    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse simulation constants file {}!",
        filepath.to_string_lossy()
    ))?;
    Ok(pars)
}

/// load_sim_pars assembles the simulation parameters: the parameter file if given (otherwise the
/// built-in scenario), with its model tuning replaced by the constants file if given. The result
/// is validated.
pub fn load_sim_pars(
    parfile_path: Option<&Path>,
    constants_path: Option<&Path>,
) -> anyhow::Result<SimPars> {
    let mut sim_pars = match parfile_path {
        Some(path) => {
            log::info!("Reading simulation parameters from {:?}", path);
            read_sim_pars(path)?
        }
        None => {
            log::info!("No parameter file given, using the built-in oval race");
            SimPars::default()
        }
    };

    if let Some(path) = constants_path {
        log::info!("Reading simulation constants from {:?}", path);
        sim_pars.sim_constants = read_sim_constants(path)?;
    }

    sim_pars.validate()?;
    Ok(sim_pars)
}
