use crate::core::context::{create_rng, SimulationContext};
use crate::core::driver::autopilot_keys;
use crate::core::scheduler::Scheduler;
use crate::interfaces::hud_interface::{HudState, MAX_HUD_UPDATE_FREQUENCY};
use crate::post::race_result::RaceResult;
use crate::pre::read_sim_pars::SimPars;
use flume::Sender;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// Cruising speed of the autopilot that drives the player in headless runs, as fraction of the
/// top speed.
pub const AUTOPILOT_SPEED_FRAC: f64 = 0.8;

/// handle_race creates and simulates a race on the basis of the inserted parameters, and returns
/// the results for post-processing. The player car is driven by the key autopilot.
/// * `seed` - Overrides the seed of the race parameters
/// * `max_race_time` - (s) Session time after which an unfinished race is aborted
/// * `tx` - If inserted, the race is simulated in real time and the HUD state is sent through it
pub fn handle_race(
    sim_pars: &SimPars,
    timestep_size: f64,
    max_race_time: f64,
    seed: Option<u64>,
    tx: Option<&Sender<HudState>>,
    realtime_factor: f64,
) -> anyhow::Result<RaceResult> {
    let rng = create_rng(seed.or(sim_pars.race_pars.seed));
    let ctx = SimulationContext::new(sim_pars, rng)?;
    let mut sched = Scheduler::new(ctx);
    sched.ctx_mut().start();

    let realtime_factor = if realtime_factor > 0.0 && realtime_factor.is_finite() {
        realtime_factor
    } else {
        log::warn!("Invalid real-time factor {}, using 1.0", realtime_factor);
        1.0
    };

    let mut t_update_print = 0.0;
    let mut t_update_hud = f64::NEG_INFINITY;

    while !sched.ctx().race.is_finished() && sched.ctx().race.session_time < max_race_time {
        let t_start = Instant::now();

        // drive the player through the input sampler
        let keys = {
            let ctx = sched.ctx();
            let player = ctx.player();
            autopilot_keys(
                &player.state,
                &ctx.track,
                AUTOPILOT_SPEED_FRAC * player.max_speed,
                &ctx.consts.ai,
            )
        };
        sched.ctx_mut().set_player_input(keys);

        let hud = match sched.advance(timestep_size) {
            Some(hud) => hud,
            None => anyhow::bail!("Time step size {} was rejected!", timestep_size),
        };

        let session_time = sched.ctx().race.session_time;
        if session_time > t_update_print + 0.9999 {
            log::debug!(
                "Simulating... Current session time is {:.3}s, player is in lap {}",
                session_time,
                hud.lap
            );
            t_update_print = session_time;
        }

        if let Some(tx) = tx {
            if session_time > t_update_hud + 1.0 / MAX_HUD_UPDATE_FREQUENCY - 0.001 {
                tx.send(hud)
                    .map_err(|_| anyhow::anyhow!("HUD receiver disconnected!"))?;
                t_update_hud = session_time;
            }

            // sleep until the time step is over in real time
            let t_target = Duration::from_secs_f64(timestep_size.min(0.1) / realtime_factor);
            let t_elapsed = t_start.elapsed();
            if t_elapsed < t_target {
                sleep(t_target - t_elapsed);
            }
        }
    }

    let result = sched.ctx().get_race_result();
    if !result.finished {
        log::warn!(
            "Race aborted after {:.3}s session time without finishing",
            sched.ctx().race.session_time
        );
    }
    log::debug!(
        "Average tick time {:.4}ms over the last ticks",
        sched.stats().avg_tick_time_ms
    );

    // send the final result once
    if let Some(tx) = tx {
        let final_hud = HudState {
            final_result: Some(result.to_owned()),
            ..sched.snapshot()
        };
        tx.send(final_hud)
            .map_err(|_| anyhow::anyhow!("HUD receiver disconnected!"))?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_race() -> SimPars {
        let mut sim_pars = SimPars::default();
        sim_pars.race_pars.tot_no_laps = 1;
        sim_pars
    }

    #[test]
    fn headless_race_finishes() {
        let result = handle_race(&short_race(), 0.05, 600.0, Some(12), None, 1.0).unwrap();
        assert!(result.finished);
        assert_eq!(result.classification.len(), 4);
        assert!(result.get_player_position().is_some());
        assert_eq!(result.laptimes[0].len(), 1);
    }

    #[test]
    fn race_is_aborted_after_max_time() {
        let result = handle_race(&short_race(), 0.05, 5.0, Some(12), None, 1.0).unwrap();
        assert!(!result.finished);
    }

    #[test]
    fn same_seed_same_result() {
        let a = handle_race(&short_race(), 0.05, 600.0, Some(99), None, 1.0).unwrap();
        let b = handle_race(&short_race(), 0.05, 600.0, Some(99), None, 1.0).unwrap();
        assert_eq!(a.classification, b.classification);
        assert_eq!(a.laptimes, b.laptimes);
    }

    #[test]
    fn streaming_ends_with_final_result() {
        let (tx, rx) = flume::unbounded();
        // very fast real time to keep the test short
        let result = handle_race(&short_race(), 0.1, 3.0, Some(5), Some(&tx), 1000.0).unwrap();
        drop(tx);

        let huds: Vec<HudState> = rx.iter().collect();
        assert!(huds.len() > 1);
        let last = huds.last().unwrap();
        assert_eq!(
            last.final_result.as_ref().map(|r| r.race_time),
            Some(result.race_time)
        );
        assert!(huds[..huds.len() - 1].iter().all(|h| h.final_result.is_none()));
    }
}
