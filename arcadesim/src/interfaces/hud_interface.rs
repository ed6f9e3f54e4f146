use crate::core::race::RacePhase;
use crate::post::race_result::RaceResult;
use serde::Serialize;

pub const MAX_HUD_UPDATE_FREQUENCY: f64 = 20.0;

#[derive(Debug, Clone, Default, Serialize)]
pub struct LeaderboardEntry {
    pub position: u32,
    pub car_no: usize,
    pub name: String,
    pub lap: u32,
    pub is_player: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MinimapEntry {
    pub car_no: usize,
    pub x: f64,
    pub z: f64,
    pub is_player: bool,
}

/// HudState is everything the HUD shows of the player, refreshed every tick.
/// * `speed` - (km/h)
/// * `throttle`, `brake` - (%)
/// * `g_force` - (g) Combined longitudinal and lateral acceleration
/// * `cur_laptime` - (s) Time in the current lap (0 before the start)
/// * `delta` - (s) Last lap minus session best lap, negative is faster
/// * `position` - e.g. "2nd / 4"
/// * `tire_temps` - (degC) FL, FR, RL, RR
#[derive(Debug, Clone, Default, Serialize)]
pub struct HudState {
    pub phase: RacePhase,
    pub lights_lit: u8,
    pub speed: f64,
    pub rpm: f64,
    pub gear: String,
    pub throttle: f64,
    pub brake: f64,
    pub g_force: f64,
    pub fuel: f64,
    pub lap: u32,
    pub tot_no_laps: u32,
    pub cur_laptime: f64,
    pub last_laptime: Option<f64>,
    pub best_laptime: Option<f64>,
    pub delta: Option<f64>,
    pub position: String,
    pub drs_available: bool,
    pub drs_active: bool,
    pub ers_available: bool,
    pub ers_active: bool,
    pub boost_energy: f64,
    pub tire_temps: [f64; 4],
    pub tire_wear: f64,
    pub damage: f64,
    pub needs_pit_stop: bool,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub minimap: Vec<MinimapEntry>,

    // final results payload (sent once when race finishes)
    pub final_result: Option<RaceResult>,
}
