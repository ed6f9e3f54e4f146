use arcadesim::core::handle_race::handle_race;
use arcadesim::interfaces::hud_interface::HudState;
use arcadesim::post::race_result::{read_career_totals, ProfileRecord, RaceResult};
use arcadesim::pre::read_sim_pars::load_sim_pars;
use arcadesim::pre::sim_opts::SimOpts;
use clap::Parser;
use rayon::prelude::*;
use std::thread;
use std::time::Instant;

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

fn format_hud(hud: &HudState) -> String {
    let lights: String = (0..5)
        .map(|i| if i < hud.lights_lit { 'O' } else { '.' })
        .collect();
    format!(
        "{:?} [{}] lap {}/{} {} | {:5.1} km/h gear {} {:5.0} rpm | fuel {:5.1}kg tires {:5.1}% \
        damage {:4.1}% boost {:5.1}%{}{}{}",
        hud.phase,
        lights,
        hud.lap,
        hud.tot_no_laps,
        hud.position,
        hud.speed,
        hud.gear,
        hud.rpm,
        hud.fuel,
        hud.tire_wear,
        hud.damage,
        hud.boost_energy,
        if hud.drs_active { " DRS" } else { "" },
        if hud.ers_active { " ERS" } else { "" },
        if hud.needs_pit_stop { " BOX" } else { "" },
    )
}

fn postprocess(race_result: &RaceResult, sim_opts: &SimOpts) -> anyhow::Result<()> {
    race_result.print_classification();
    race_result.print_lap_and_race_times();

    if let Some(output_path) = &sim_opts.output_path {
        race_result.write_lap_and_race_times_to_file(output_path)?;
        log::info!("Results written to {:?}", output_path);
    }

    if let Some(profile_path) = &sim_opts.profile_path {
        let prev_totals = read_career_totals(profile_path)?;
        match ProfileRecord::from_result(race_result, &prev_totals) {
            Some(record) => {
                record.write_json(profile_path)?;
                log::info!(
                    "Finished P{} of {}, awarded {} money and {} stars",
                    record.finishing_position,
                    record.no_cars,
                    record.money_awarded,
                    record.stars_awarded
                );
            }
            None => log::warn!("Race was not finished, profile record not written"),
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();
    init_logging(sim_opts.debug);

    // get simulation parameters
    let sim_pars = load_sim_pars(
        sim_opts.parfile_path.as_deref(),
        sim_opts.constants_path.as_deref(),
    )?;

    let timestep_size = sim_opts.clamped_timestep_size();
    let seed = sim_opts.seed.or(sim_pars.race_pars.seed);
    log::info!(
        "Simulating {} laps on {} with {} cars and a time step size of {:.4}s",
        sim_pars.race_pars.tot_no_laps,
        sim_pars.track_pars.name,
        sim_pars.opponent_pars.len() + 1,
        timestep_size
    );

    // EXECUTION -----------------------------------------------------------------------------------
    if sim_opts.realtime {
        // REAL-TIME CASE - race runs in a worker thread, the HUD is printed in the main thread
        let (tx, rx) = flume::unbounded();
        let sim_opts_thread = sim_opts.clone();
        let sim_pars_thread = sim_pars.clone();

        let handle = thread::spawn(move || {
            handle_race(
                &sim_pars_thread,
                timestep_size,
                sim_opts_thread.max_race_time,
                seed,
                Some(&tx),
                sim_opts_thread.realtime_factor,
            )
        });

        let mut race_result = None;
        for hud in rx.iter() {
            if hud.final_result.is_some() {
                race_result = hud.final_result;
            } else {
                println!("{}", format_hud(&hud));
            }
        }

        let thread_result = handle
            .join()
            .map_err(|_| anyhow::anyhow!("Simulation thread panicked!"))??;
        postprocess(race_result.as_ref().unwrap_or(&thread_result), &sim_opts)?;
    } else if sim_opts.no_sim_runs <= 1 {
        // SINGLE RUN CASE
        let t_start = Instant::now();
        let race_result = handle_race(
            &sim_pars,
            timestep_size,
            sim_opts.max_race_time,
            seed,
            None,
            1.0,
        )?;
        log::info!("Execution time: {}ms", t_start.elapsed().as_millis());
        postprocess(&race_result, &sim_opts)?;
    } else {
        // BATCH CASE - independent races in parallel, run i uses seed + i if a seed is given
        let t_start = Instant::now();
        let race_results: Vec<RaceResult> = (0..sim_opts.no_sim_runs)
            .into_par_iter()
            .map(|i| {
                handle_race(
                    &sim_pars,
                    timestep_size,
                    sim_opts.max_race_time,
                    seed.map(|s| s.wrapping_add(i as u64)),
                    None,
                    1.0,
                )
            })
            .collect::<anyhow::Result<Vec<RaceResult>>>()?;
        log::info!(
            "Execution time for {} runs: {}ms",
            sim_opts.no_sim_runs,
            t_start.elapsed().as_millis()
        );

        // count wins per car
        let no_cars = sim_pars.opponent_pars.len() + 1;
        let mut no_wins = vec![0u32; no_cars];
        let mut no_unfinished = 0;
        for race_result in race_results.iter() {
            if !race_result.finished {
                no_unfinished += 1;
                continue;
            }
            if let Some(winner) = race_result.get_winner() {
                no_wins[winner.car_no] += 1;
            }
        }

        println!("RESULT: Wins after {} runs", sim_opts.no_sim_runs);
        let names: Vec<&str> = std::iter::once(sim_pars.player_pars.name.as_str())
            .chain(sim_pars.opponent_pars.iter().map(|p| p.name.as_str()))
            .collect();
        for (car_no, (name, wins)) in names.iter().zip(no_wins.iter()).enumerate() {
            println!("RESULT: Car {:2} {:20} {:5} wins", car_no, name, wins);
        }
        if no_unfinished > 0 {
            log::warn!("{} runs did not finish within the maximum race time", no_unfinished);
        }

        if let Some(first) = race_results.first() {
            postprocess(first, &sim_opts)?;
        }
    }

    Ok(())
}
