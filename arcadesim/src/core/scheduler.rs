use crate::core::context::SimulationContext;
use crate::core::telemetry::TelemetryAggregator;
use crate::interfaces::hud_interface::HudState;
use crate::interfaces::render_interface::RenderSink;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;

const TICK_TIME_WINDOW: usize = 60;

/// SchedulerStats summarizes the work of the scheduler.
/// * `tick_count` - Number of ticks simulated since the last restart
/// * `sim_time` - (s) Simulated time since the last restart
/// * `avg_tick_time_ms` - (ms) Mean wall-clock time of the last ticks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub tick_count: u64,
    pub sim_time: f64,
    pub avg_tick_time_ms: f64,
    pub paused: bool,
}

/// Scheduler drives the simulation context forward with the frame time supplied by the host loop
/// and derives the HUD state after every tick.
#[derive(Debug)]
pub struct Scheduler {
    ctx: SimulationContext,
    telemetry: TelemetryAggregator,
    paused: bool,
    tick_count: u64,
    sim_time: f64,
    tick_times: VecDeque<f64>,
}

impl Scheduler {
    pub fn new(ctx: SimulationContext) -> Scheduler {
        Scheduler {
            ctx,
            telemetry: TelemetryAggregator::new(),
            paused: false,
            tick_count: 0,
            sim_time: 0.0,
            tick_times: VecDeque::with_capacity(TICK_TIME_WINDOW),
        }
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHOD ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// advance performs one tick of length `dt` (clamped by the context) and returns the updated
    /// HUD state. Nothing happens while paused.
    pub fn advance(&mut self, dt: f64) -> Option<HudState> {
        if self.paused {
            return None;
        }
        if !(dt > 0.0 && dt.is_finite()) {
            log::warn!("Scheduler received invalid frame time {}", dt);
            return None;
        }
        let dt = dt.min(self.ctx.consts.dynamics.max_dt);

        let tick_start = Instant::now();
        self.ctx.simulate_timestep(dt);
        let hud = self.telemetry.update(&self.ctx, dt);

        // record tick time
        if self.tick_times.len() == TICK_TIME_WINDOW {
            self.tick_times.pop_front();
        }
        self.tick_times
            .push_back(tick_start.elapsed().as_secs_f64() * 1000.0);
        self.tick_count += 1;
        self.sim_time += dt;

        Some(hud)
    }

    /// advance_with_sink is advance followed by publishing the car transforms to the renderer.
    pub fn advance_with_sink(&mut self, dt: f64, sink: &mut dyn RenderSink) -> Option<HudState> {
        let hud = self.advance(dt)?;
        self.ctx.publish_transforms(sink);
        Some(hud)
    }

    /// snapshot derives the HUD state without advancing the simulation.
    pub fn snapshot(&mut self) -> HudState {
        self.telemetry.update(&self.ctx, 0.0)
    }

    // ---------------------------------------------------------------------------------------------
    // CONTROL -------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn pause(&mut self) {
        if !self.paused {
            log::info!("Simulation paused at {:.3}s", self.sim_time);
        }
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            log::info!("Simulation resumed at {:.3}s", self.sim_time);
        }
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// restart puts the race back into Idle with all cars on the grid and clears the statistics.
    pub fn restart(&mut self) {
        self.ctx.restart();
        self.telemetry.reset();
        self.paused = false;
        self.tick_count = 0;
        self.sim_time = 0.0;
        self.tick_times.clear();
    }

    pub fn stats(&self) -> SchedulerStats {
        let avg_tick_time_ms = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f64>() / self.tick_times.len() as f64
        };

        SchedulerStats {
            tick_count: self.tick_count,
            sim_time: self.sim_time,
            avg_tick_time_ms,
            paused: self.paused,
        }
    }

    pub fn ctx(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut SimulationContext {
        &mut self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::driver::DriverPars;
    use crate::core::input::RawInput;
    use crate::core::race::{RacePars, RacePhase, SimConstants};
    use crate::core::track::{ellipse, Track, TrackPars};
    use crate::interfaces::render_interface::TransformBuffer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scheduler() -> Scheduler {
        let track = Track::new("Oval", ellipse(400.0, 250.0, 256), 12.0, &TrackPars::default())
            .unwrap();
        let ctx = SimulationContext::from_parts(
            track,
            &DriverPars::new("Player"),
            &[DriverPars::new("Ai 1")],
            &RacePars::default(),
            &SimConstants::default(),
            StdRng::seed_from_u64(21),
        );
        Scheduler::new(ctx)
    }

    #[test]
    fn paused_scheduler_does_nothing() {
        let mut sched = scheduler();
        sched.ctx_mut().start();
        sched.pause();
        assert!(sched.is_paused());
        for _ in 0..10 {
            assert!(sched.advance(0.05).is_none());
        }
        assert_eq!(sched.ctx().race.session_time, 0.0);
        assert_eq!(sched.stats().tick_count, 0);

        sched.resume();
        assert!(sched.advance(0.05).is_some());
        assert_eq!(sched.stats().tick_count, 1);
    }

    #[test]
    fn large_frame_times_are_clamped() {
        let mut sched = scheduler();
        sched.ctx_mut().start();
        sched.advance(5.0);
        assert!(sched.stats().sim_time <= 0.1 + 1e-12);
        assert!(sched.advance(-0.1).is_none());
        assert!(sched.advance(f64::INFINITY).is_none());
        assert_eq!(sched.stats().tick_count, 1);
    }

    #[test]
    fn tick_times_are_windowed() {
        let mut sched = scheduler();
        for _ in 0..200 {
            sched.advance(1.0 / 60.0);
        }
        assert_eq!(sched.tick_times.len(), TICK_TIME_WINDOW);
        assert!(sched.stats().avg_tick_time_ms >= 0.0);

        // the newest tick replaces the oldest one
        let newest_before = *sched.tick_times.back().unwrap();
        sched.tick_times[0] = -1.0;
        sched.advance(1.0 / 60.0);
        assert_eq!(sched.tick_times.len(), TICK_TIME_WINDOW);
        assert!(sched.tick_times.iter().all(|&t| t >= 0.0));
        assert_eq!(sched.tick_times[TICK_TIME_WINDOW - 2], newest_before);
    }

    #[test]
    fn restart_clears_everything() {
        let mut sched = scheduler();
        sched.ctx_mut().start();
        sched.ctx_mut().set_player_input(RawInput {
            up: true,
            ..Default::default()
        });
        for _ in 0..300 {
            sched.advance(0.05);
        }
        sched.pause();
        sched.restart();

        let stats = sched.stats();
        assert_eq!(stats.tick_count, 0);
        assert_eq!(stats.sim_time, 0.0);
        assert!(!stats.paused);
        assert_eq!(sched.ctx().phase(), RacePhase::Idle);
        assert_eq!(sched.ctx().player().state.speed, 0.0);
    }

    #[test]
    fn snapshot_does_not_advance() {
        let mut sched = scheduler();
        sched.ctx_mut().start();
        sched.advance(0.05);
        let hud = sched.snapshot();
        assert_eq!(hud.phase, RacePhase::Countdown);
        assert_eq!(sched.stats().tick_count, 1);
        assert_eq!(sched.ctx().race.session_time, 0.05);
    }

    #[test]
    fn sink_receives_transforms() {
        let mut sched = scheduler();
        let mut buffer = TransformBuffer::default();
        let hud = sched.advance_with_sink(0.016, &mut buffer);
        assert!(hud.is_some());
        assert_eq!(buffer.no_updates, 2);

        sched.pause();
        assert!(sched.advance_with_sink(0.016, &mut buffer).is_none());
        assert_eq!(buffer.no_updates, 2);
    }
}
