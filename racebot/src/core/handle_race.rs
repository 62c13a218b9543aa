use crate::core::clock::SystemClock;
use crate::core::race::Race;
use crate::interfaces::channel_room::{ChannelRoom, RoomEvent};
use crate::post::race_result::RaceResult;
use crate::pre::read_race_pars::{EntrantAction, EntrantPars, RacePars};
use anyhow::{bail, Context};
use flume::RecvTimeoutError;
use helpers::general::InputValueError;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// additional timer seconds granted on top of the configured windows before a race is aborted
const DEADLINE_SLACK_TICKS: u32 = 5;

/// handle_race creates a race on the basis of the inserted parameters, drives it from the entry
/// to the finalization, and returns the results for post-processing. All entrants enter and
/// ready up, the countdown starts as soon as everybody is ready, and the scripted entrant
/// actions are applied relative to the race start.
pub fn handle_race(race_pars: &RacePars, print_debug: bool) -> anyhow::Result<RaceResult> {
    // create the race
    let (room, rx) = ChannelRoom::new();
    let race = Race::new(
        race_pars.race_config.to_owned(),
        race_pars.race_info.to_owned(),
        Arc::new(room),
        Arc::new(SystemClock::new()),
    );
    race.initialize();

    // enter and ready all entrants
    for entrant in race_pars.entrants.iter() {
        if !race.enter_racer(&entrant.racer_pars) || !race.ready_racer(entrant.racer_pars.id) {
            return Err(InputValueError).context(format!(
                "Entrant {} could not enter the race!",
                entrant.racer_pars.name
            ));
        }
    }

    if !race.all_ready() || !race.begin_race_countdown() {
        bail!("Race countdown could not be started!");
    }

    // drive the race by consuming the room events until the race is recorded
    let deadline = Instant::now() + max_race_duration(race_pars);
    let tick = race_pars.race_config.tick();
    let mut actions_scheduled = false;

    loop {
        let t_left = deadline.saturating_duration_since(Instant::now());

        if t_left.is_zero() {
            race.cancel();
            bail!("Race did not finish within {}s!", max_race_duration(race_pars).as_secs());
        }

        match rx.recv_timeout(t_left.min(tick)) {
            Ok(RoomEvent::Message(text)) => println!("ROOM: {}", text),
            Ok(RoomEvent::Leaderboard(leaderboard)) => {
                if print_debug {
                    println!("DEBUG: Leaderboard update\n{}", leaderboard)
                }
            }
            Ok(RoomEvent::Finalized(result)) => return Ok(result),
            Ok(RoomEvent::Fault(fault)) => println!("WARNING: Race fault: {}", fault),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => bail!("Race room closed unexpectedly!"),
        }

        // apply the scripted actions as soon as the race is running
        if !actions_scheduled && race.start_time().is_some() {
            schedule_actions(&race, &race_pars.entrants)?;
            actions_scheduled = true;
        }
    }
}

/// schedule_actions spawns a thread per entrant with a scripted action that applies the action
/// after the given delay.
fn schedule_actions(race: &Race, entrants: &[EntrantPars]) -> anyhow::Result<()> {
    for entrant in entrants.iter() {
        let action = match entrant.action {
            Some(action) => action,
            None => continue,
        };
        let race = race.clone();
        let id = entrant.racer_pars.id;

        thread::Builder::new()
            .name(format!("entrant-{}", id))
            .spawn(move || {
                thread::sleep(Duration::from_millis(action.after_ms()));

                let success = match action {
                    EntrantAction::Finish { .. } => race.finish_racer(id),
                    EntrantAction::Forfeit { .. } => race.forfeit_racer(id),
                };
                if !success {
                    println!("WARNING: Action {:?} of racer {} was rejected", action, id);
                }
            })
            .context("Failed to spawn entrant thread!")?;
    }
    Ok(())
}

/// max_race_duration returns an upper bound for the wall time from the start of the countdown
/// until the results are recorded.
fn max_race_duration(race_pars: &RacePars) -> Duration {
    let config = &race_pars.race_config;
    let max_action_ms = race_pars
        .entrants
        .iter()
        .filter_map(|entrant| entrant.action.map(|action| action.after_ms()))
        .max()
        .unwrap_or(0);

    // countdown and finalization both wait for one additional tick before announcing
    let ticks = config.countdown_secs + config.finalize_secs + 2 + DEADLINE_SLACK_TICKS;
    config.tick() * ticks + Duration::from_millis(max_action_ms)
}
