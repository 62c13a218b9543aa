use crate::core::race::RaceConfig;
use crate::pre::race_opts::RaceOpts;
use crate::pre::read_race_pars::RacePars;
use anyhow::Context;
use helpers::general::{count_duplicates, InputValueError};

/// check_race_opts_pars assures that the inserted options and parameters are within reasonable
/// limits and raises an error if not.
pub fn check_race_opts_pars(race_opts: &RaceOpts, race_pars: &RacePars) -> anyhow::Result<()> {
    // PART 1: RACE OPTIONS
    if !(1..=200).contains(&race_opts.no_races) {
        return Err(InputValueError).context(format!(
            "no_races is {}, which is not within the reasonable range of [1, 200]!",
            race_opts.no_races
        ));
    }

    // PART 2: RACE PARAMETERS
    check_race_config(&race_pars.race_config)?;

    // ENTRANTS ------------------------------------------------------------------------------------
    let ids: Vec<u64> = race_pars
        .entrants
        .iter()
        .map(|entrant| entrant.racer_pars.id)
        .collect();

    if count_duplicates(&ids) > 0 {
        return Err(InputValueError).context("Every entrant id must be unique!");
    }

    if race_pars.entrants.len() < race_pars.race_config.min_entrants() {
        return Err(InputValueError).context(format!(
            "The race requires at least {} entrants, but {} are given!",
            race_pars.race_config.min_entrants(),
            race_pars.entrants.len()
        ));
    }

    if race_pars
        .entrants
        .iter()
        .any(|entrant| entrant.racer_pars.name.trim().is_empty())
    {
        return Err(InputValueError).context("Every entrant must have a non-empty name!");
    }

    if race_pars.entrants.iter().all(|entrant| entrant.action.is_none()) {
        return Err(InputValueError).context(
            "At least one entrant must finish or forfeit, otherwise the race never ends!",
        );
    }

    Ok(())
}

/// check_race_config checks the timer configuration of a race.
pub fn check_race_config(race_config: &RaceConfig) -> anyhow::Result<()> {
    if !(1..=600).contains(&race_config.countdown_secs) {
        return Err(InputValueError).context(format!(
            "countdown_secs is {}s, which is not within the reasonable range of [1, 600]s!",
            race_config.countdown_secs
        ));
    }

    if race_config.incremental_countdown_start > race_config.countdown_secs {
        return Err(InputValueError).context(format!(
            "incremental_countdown_start ({}s) must not exceed countdown_secs ({}s)!",
            race_config.incremental_countdown_start, race_config.countdown_secs
        ));
    }

    if race_config.finalize_secs > 3600 {
        return Err(InputValueError).context(format!(
            "finalize_secs is {}s, which is not within the reasonable range of [0, 3600]s!",
            race_config.finalize_secs
        ));
    }

    if !(1..=10_000).contains(&race_config.tick_ms) {
        return Err(InputValueError).context(format!(
            "tick_ms is {}ms, which is not within the reasonable range of [1, 10000]ms!",
            race_config.tick_ms
        ));
    }

    Ok(())
}
