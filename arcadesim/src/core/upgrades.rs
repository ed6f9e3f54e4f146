use crate::error::SimError;
use serde::{Deserialize, Serialize};

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 10;

// gain per level above 1
const ENGINE_GAIN: f64 = 0.05;
const AERO_GAIN: f64 = 0.04;
const HANDLING_GAIN: f64 = 0.03;
const BRAKE_GAIN: f64 = 0.05;
const KERS_GAIN: f64 = 0.10;
const TIRE_WEAR_GAIN: f64 = 0.10;
const TOP_SPEED_ENGINE_GAIN: f64 = 0.015;
const TOP_SPEED_AERO_GAIN: f64 = 0.010;

/// UpgradeProfile is handed over by the career layer at race start and never changes during a
/// race.
/// * `engine` - acceleration and top speed
/// * `aerodynamics` - drag reduction and top speed
/// * `tires` - handling authority and slower tire wear
/// * `brakes` - deceleration
/// * `kers` - energy recovery and boost efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeProfile {
    pub engine: u8,
    pub aerodynamics: u8,
    pub tires: u8,
    pub brakes: u8,
    pub kers: u8,
}

impl Default for UpgradeProfile {
    fn default() -> Self {
        UpgradeProfile {
            engine: MIN_LEVEL,
            aerodynamics: MIN_LEVEL,
            tires: MIN_LEVEL,
            brakes: MIN_LEVEL,
            kers: MIN_LEVEL,
        }
    }
}

fn steps(level: u8) -> f64 {
    (level.clamp(MIN_LEVEL, MAX_LEVEL) - MIN_LEVEL) as f64
}

impl UpgradeProfile {
    pub fn new(
        engine: u8,
        aerodynamics: u8,
        tires: u8,
        brakes: u8,
        kers: u8,
    ) -> Result<UpgradeProfile, SimError> {
        let profile = UpgradeProfile {
            engine,
            aerodynamics,
            tires,
            brakes,
            kers,
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        let levels = [
            ("engine", self.engine),
            ("aerodynamics", self.aerodynamics),
            ("tires", self.tires),
            ("brakes", self.brakes),
            ("kers", self.kers),
        ];

        for &(name, level) in levels.iter() {
            if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
                return Err(SimError::UpgradeLevel { name, level });
            }
        }
        Ok(())
    }

    pub fn engine_mult(&self) -> f64 {
        1.0 + ENGINE_GAIN * steps(self.engine)
    }

    /// Drag is divided by this value.
    pub fn aero_mult(&self) -> f64 {
        1.0 + AERO_GAIN * steps(self.aerodynamics)
    }

    pub fn handling_mult(&self) -> f64 {
        1.0 + HANDLING_GAIN * steps(self.tires)
    }

    pub fn brake_mult(&self) -> f64 {
        1.0 + BRAKE_GAIN * steps(self.brakes)
    }

    pub fn kers_mult(&self) -> f64 {
        1.0 + KERS_GAIN * steps(self.kers)
    }

    /// Attenuation applied to the tire wear rate, 1.0 at level 1.
    pub fn tire_wear_mult(&self) -> f64 {
        1.0 / (1.0 + TIRE_WEAR_GAIN * steps(self.tires))
    }

    /// Multiplier on the base top speed.
    pub fn top_speed_mult(&self) -> f64 {
        1.0 + TOP_SPEED_ENGINE_GAIN * steps(self.engine)
            + TOP_SPEED_AERO_GAIN * steps(self.aerodynamics)
    }
}
