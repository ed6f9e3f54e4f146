use crate::core::track::TrackCheckpoint;

/// StateHandler tracks the lap progress of one car via its own set of checkpoints. A lap is
/// completed as soon as every checkpoint was passed, afterwards all checkpoints are reset. The
/// order in which the checkpoints are passed is not enforced.
#[derive(Debug, Clone)]
pub struct StateHandler {
    checkpoints: Vec<TrackCheckpoint>,
    radius: f64,
    // the lap counter starts at 1 and is the lap currently driven
    lap_prev: u32,
    lap_cur: u32,
}

impl StateHandler {
    pub fn new(checkpoints: Vec<TrackCheckpoint>, radius: f64) -> StateHandler {
        StateHandler {
            checkpoints,
            radius,
            lap_prev: 1,
            lap_cur: 1,
        }
    }

    /// update marks every unpassed checkpoint within the radius of `position` and completes the
    /// lap if none is left. Returns the number of checkpoints passed during this call.
    pub fn update(&mut self, position: [f64; 2]) -> u32 {
        self.lap_prev = self.lap_cur;

        let mut no_passed = 0;
        for cp in self.checkpoints.iter_mut().filter(|cp| !cp.passed) {
            let d = ((position[0] - cp.anchor[0]).powi(2) + (position[1] - cp.anchor[1]).powi(2))
                .sqrt();
            if d <= self.radius {
                cp.passed = true;
                no_passed += 1;
            }
        }

        if !self.checkpoints.is_empty() && self.checkpoints.iter().all(|cp| cp.passed) {
            self.lap_cur += 1;
            self.checkpoints.iter_mut().for_each(|cp| cp.passed = false);
        }

        no_passed
    }

    /// get_lap returns the lap currently driven (starting at 1).
    pub fn get_lap(&self) -> u32 {
        self.lap_cur
    }

    /// get_compl_lap returns the number of completed laps.
    pub fn get_compl_lap(&self) -> u32 {
        self.lap_cur - 1
    }

    /// get_new_lap returns true if the last update completed a lap.
    pub fn get_new_lap(&self) -> bool {
        self.lap_cur > self.lap_prev
    }

    pub fn get_no_passed(&self) -> usize {
        self.checkpoints.iter().filter(|cp| cp.passed).count()
    }

    /// clear_checkpoints resets the checkpoint flags but keeps the lap count.
    pub fn clear_checkpoints(&mut self) {
        self.checkpoints.iter_mut().for_each(|cp| cp.passed = false);
        self.lap_prev = self.lap_cur;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_checkpoints() -> Vec<TrackCheckpoint> {
        [[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]]
            .iter()
            .map(|&anchor| TrackCheckpoint {
                anchor,
                passed: false,
            })
            .collect()
    }

    #[test]
    fn lap_completes_when_all_checkpoints_passed() {
        let mut sh = StateHandler::new(square_checkpoints(), 10.0);
        assert_eq!(sh.update([1.0, 1.0]), 1);
        assert_eq!(sh.update([99.0, 2.0]), 1);
        assert_eq!(sh.update([50.0, 50.0]), 0);
        assert_eq!(sh.update([95.0, 95.0]), 1);
        assert!(!sh.get_new_lap());
        assert_eq!(sh.get_lap(), 1);

        assert_eq!(sh.update([0.0, 92.0]), 1);
        assert!(sh.get_new_lap());
        assert_eq!(sh.get_lap(), 2);
        assert_eq!(sh.get_compl_lap(), 1);
        assert_eq!(sh.get_no_passed(), 0);

        // flag only set for a single update
        sh.update([50.0, 50.0]);
        assert!(!sh.get_new_lap());
    }

    #[test]
    fn order_is_not_enforced() {
        let mut sh = StateHandler::new(square_checkpoints(), 10.0);
        for p in [[0.0, 100.0], [100.0, 100.0], [100.0, 0.0], [0.0, 0.0]] {
            sh.update(p);
        }
        assert_eq!(sh.get_lap(), 2);
    }

    #[test]
    fn staying_at_one_checkpoint_never_completes_a_lap() {
        let mut sh = StateHandler::new(square_checkpoints(), 10.0);
        for _ in 0..100 {
            sh.update([0.0, 0.0]);
        }
        assert_eq!(sh.get_lap(), 1);
        assert_eq!(sh.get_no_passed(), 1);
    }

    #[test]
    fn clearing_checkpoints_keeps_the_lap() {
        let mut sh = StateHandler::new(square_checkpoints(), 10.0);
        for p in [[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0], [0.0, 0.0]] {
            sh.update(p);
        }
        assert_eq!(sh.get_lap(), 2);
        assert_eq!(sh.get_no_passed(), 1);

        sh.clear_checkpoints();
        assert_eq!(sh.get_lap(), 2);
        assert_eq!(sh.get_no_passed(), 0);
        assert!(!sh.get_new_lap());
    }

    #[test]
    fn empty_checkpoint_list_never_completes_a_lap() {
        let mut sh = StateHandler::new(vec![], 10.0);
        sh.update([0.0, 0.0]);
        assert_eq!(sh.get_lap(), 1);
    }
}
