use crate::core::race::RacePhase;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::io::Write as IoWrite;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub enum RaceEventKind {
    PhaseChange(RacePhase),
    LapCompleted { lap: u32, laptime: f64 },
    OffTrack,
    PitAdvisory,
    PlayerReset,
}

/// RaceEvent is one entry of the race log.
/// * `time_s` - (s) Session time since the start of the countdown
/// * `cars` - Affected cars (empty for race-wide events)
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RaceEvent {
    pub kind: RaceEventKind,
    pub time_s: f64,
    pub cars: Vec<usize>,
}

/// ClassificationEntry is one row of the classification.
/// * `laps` - Lap counter (starts at 1, a car that finished 3 laps shows 4)
/// * `progress` - Angular progress in the current lap, [0, 1[
/// * `racetime` - (s) Sum of the completed lap times
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClassificationEntry {
    pub position: u32,
    pub car_no: usize,
    pub name: String,
    pub laps: u32,
    pub progress: f64,
    pub best_lap: Option<f64>,
    pub racetime: f64,
}

/// RaceResult contains all race information that is required for post-processing the results.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RaceResult {
    pub tot_no_laps: u32,
    pub finished: bool,
    pub race_time: f64,
    pub classification: Vec<ClassificationEntry>,
    /// Lap times per car, indexed by car number.
    pub laptimes: Vec<Vec<f64>>,
    pub events: Vec<RaceEvent>,
}

impl RaceResult {
    pub fn get_player_position(&self) -> Option<u32> {
        self.classification
            .iter()
            .find(|entry| entry.car_no == 0)
            .map(|entry| entry.position)
    }

    pub fn get_winner(&self) -> Option<&ClassificationEntry> {
        self.classification.first()
    }

    fn format_lap_and_race_times(&self) -> Result<String, std::fmt::Error> {
        let mut content = String::new();
        let max_no_laps = self.laptimes.iter().map(|l| l.len()).max().unwrap_or(0);

        // header, cars in classification order
        let mut header = String::from("lap, ");
        for (i, entry) in self.classification.iter().enumerate() {
            let sep = if i + 1 < self.classification.len() { ", " } else { "" };
            write!(&mut header, "{:3} ({}){}", entry.car_no, entry.name, sep)?;
        }

        let mut tmp_string_laptime = String::new();
        let mut tmp_string_racetime = String::new();
        let mut racetimes = vec![0.0; self.laptimes.len()];

        for lap in 0..max_no_laps {
            write!(&mut tmp_string_laptime, "{:3}, ", lap + 1)?;
            write!(&mut tmp_string_racetime, "{:3}, ", lap + 1)?;

            for (i, entry) in self.classification.iter().enumerate() {
                let sep = if i + 1 < self.classification.len() { ", " } else { "\n" };
                match self.laptimes.get(entry.car_no).and_then(|l| l.get(lap)) {
                    Some(laptime) => {
                        racetimes[entry.car_no] += laptime;
                        write!(&mut tmp_string_laptime, "{:8.3}s{}", laptime, sep)?;
                        write!(
                            &mut tmp_string_racetime,
                            "{:8.3}s{}",
                            racetimes[entry.car_no], sep
                        )?;
                    }
                    None => {
                        write!(&mut tmp_string_laptime, "{:>9}{}", "-", sep)?;
                        write!(&mut tmp_string_racetime, "{:>9}{}", "-", sep)?;
                    }
                }
            }
        }

        writeln!(&mut content, "RESULT: Lap times")?;
        writeln!(&mut content, "{}", header)?;
        writeln!(&mut content, "{}", tmp_string_laptime)?;
        writeln!(&mut content, "RESULT: Race times")?;
        writeln!(&mut content, "{}", header)?;
        writeln!(&mut content, "{}", tmp_string_racetime)?;
        Ok(content)
    }

    fn format_classification(&self) -> Result<String, std::fmt::Error> {
        let mut content = String::new();
        writeln!(&mut content, "RESULT: Classification")?;
        for entry in self.classification.iter() {
            let best = match entry.best_lap {
                Some(t) => format!("{:8.3}s", t),
                None => format!("{:>9}", "-"),
            };
            writeln!(
                &mut content,
                "{:>4} {:3} {:<20} lap {:2} + {:5.3}, best {}, race time {:8.3}s",
                helpers::general::ordinal(entry.position),
                entry.car_no,
                entry.name,
                entry.laps,
                entry.progress,
                best,
                entry.racetime
            )?;
        }
        Ok(content)
    }

    /// print_lap_and_race_times prints the resulting lap and race times to the console output.
    pub fn print_lap_and_race_times(&self) {
        match self.format_lap_and_race_times() {
            Ok(content) => print!("{}", content),
            Err(e) => log::warn!("Could not format lap times: {}", e),
        }
    }

    pub fn print_classification(&self) {
        match self.format_classification() {
            Ok(content) => print!("{}", content),
            Err(e) => log::warn!("Could not format classification: {}", e),
        }
    }

    /// write_lap_and_race_times_to_file writes classification, lap and race times to a text
    /// file.
    pub fn write_lap_and_race_times_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let mut content = self.format_classification()?;
        content.push('\n');
        content.push_str(&self.format_lap_and_race_times()?);

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .context(format!("Failed to create directory {}!", dir.to_string_lossy()))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)
            .context(format!("Failed to open result file {}!", path.to_string_lossy()))?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------
// PROFILE RECORD ----------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

// prize money and stars for positions 1, 2, 3, 4, everything behind gets the last entry
const PRIZE_MONEY: [u32; 5] = [5000, 3000, 2000, 1000, 500];
const PRIZE_STARS: [u32; 5] = [3, 2, 1, 0, 0];

/// award_for_position returns money and stars for a finishing position (1-based).
pub fn award_for_position(position: u32) -> (u32, u32) {
    let idx = (position.max(1) as usize - 1).min(PRIZE_MONEY.len() - 1);
    (PRIZE_MONEY[idx], PRIZE_STARS[idx])
}

/// CareerTotals are the aggregate profile counters, owned by the persistence layer.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CareerTotals {
    pub races: u32,
    pub wins: u32,
    pub podiums: u32,
    pub money: u64,
    pub stars: u32,
}

/// ProfileRecord is handed to the persistence layer at race end.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProfileRecord {
    pub finishing_position: u32,
    pub no_cars: usize,
    pub money_awarded: u32,
    pub stars_awarded: u32,
    pub best_lap: Option<f64>,
    pub career: CareerTotals,
}

impl ProfileRecord {
    /// from_result creates the record of the player (car 0). Returns None if the race was not
    /// finished.
    pub fn from_result(result: &RaceResult, prev_totals: &CareerTotals) -> Option<ProfileRecord> {
        if !result.finished {
            return None;
        }
        let player = result.classification.iter().find(|e| e.car_no == 0)?;
        let (money, stars) = award_for_position(player.position);

        let mut career = prev_totals.to_owned();
        career.races += 1;
        if player.position == 1 {
            career.wins += 1;
        }
        if player.position <= 3 {
            career.podiums += 1;
        }
        career.money += money as u64;
        career.stars += stars;

        Some(ProfileRecord {
            finishing_position: player.position,
            no_cars: result.classification.len(),
            money_awarded: money,
            stars_awarded: stars,
            best_lap: player.best_lap,
            career,
        })
    }

    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let fh = std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)
            .context(format!(
                "Failed to open profile file {}!",
                path.to_string_lossy()
            ))?;
        serde_json::to_writer_pretty(&fh, self).context("Failed to serialize profile record!")?;
        Ok(())
    }
}

/// read_career_totals reads the career counters of a previously written profile record. A
/// missing file yields fresh totals.
pub fn read_career_totals(path: &Path) -> anyhow::Result<CareerTotals> {
    if !path.exists() {
        return Ok(CareerTotals::default());
    }
    let fh = std::fs::OpenOptions::new()
        .read(true)
        .open(path)
        .context(format!("Failed to open profile file {}!", path.to_string_lossy()))?;
    let record: ProfileRecord = serde_json::from_reader(&fh).context(format!(
        "Failed to parse profile file {}!",
        path.to_string_lossy()
    ))?;
    Ok(record.career)
}
