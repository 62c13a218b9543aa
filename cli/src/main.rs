use clap::Parser;
use log::LevelFilter;
use racebot::core::race::RaceStatus;
use racebot::post::race_result::RaceResult;
use racebot::pre::check_race_pars::check_race_opts_pars;
use racebot::pre::race_opts::RaceOpts;
use racebot::pre::read_race_pars::read_race_pars;
use rayon::prelude::*;
use std::cmp::min;
use std::time::Instant;

// set maximum number of concurrently running jobs in case of running more than a single race
const MAX_NO_CONCURRENT_JOBS: u32 = 200;

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get race options from the command line arguments and read race parameters
    let race_opts: RaceOpts = RaceOpts::parse();

    env_logger::Builder::new()
        .filter_level(if race_opts.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let race_pars = read_race_pars(race_opts.parfile_path.as_path())?;

    // check race options and parameters
    check_race_opts_pars(&race_opts, &race_pars)?;

    // create vector for the race results and run race(s)
    let mut race_results: Vec<RaceResult> = Vec::with_capacity(race_opts.no_races as usize);

    // print race details
    println!(
        "INFO: Running {} with {} entrants and a timer tick of {}ms",
        race_pars.race_info.seed_str(),
        race_pars.entrants.len(),
        race_pars.race_config.tick_ms
    );

    // EXECUTION -----------------------------------------------------------------------------------
    let t_start = Instant::now();

    if race_opts.no_races == 1 {
        // SINGLE THREAD ---------------------------------------------------------------------------
        race_results.push(racebot::core::handle_race::handle_race(
            &race_pars,
            race_opts.debug,
        )?);
    } else {
        // MULTIPLE THREADS ------------------------------------------------------------------------
        let mut no_races_left = race_opts.no_races;

        while no_races_left > 0 {
            // calculate number of races to execute in current loop
            let tmp_no_races = min(no_races_left, MAX_NO_CONCURRENT_JOBS);

            // run the races and save the results
            let tmp_results = (0..tmp_no_races)
                .into_par_iter()
                .map(|_| racebot::core::handle_race::handle_race(&race_pars, false))
                .collect::<anyhow::Result<Vec<RaceResult>>>()?;
            race_results.extend(tmp_results);

            // reduce remaining races
            no_races_left -= tmp_no_races;
        }
    }

    println!(
        "INFO: Execution time (total): {}ms",
        t_start.elapsed().as_millis()
    );

    // POST-PROCESSING -----------------------------------------------------------------------------
    // print results
    if race_results.len() == 1 {
        race_results[0].print_results();
    } else {
        let no_finalized = race_results
            .iter()
            .filter(|result| result.status == RaceStatus::Finalized)
            .count();

        println!("RESULT: Race summary");
        println!(
            "{} races, {} finalized, {} cancelled",
            race_results.len(),
            no_finalized,
            race_results.len() - no_finalized
        );
    }

    Ok(())
}
