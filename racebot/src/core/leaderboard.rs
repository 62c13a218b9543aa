use crate::core::race_info::RaceInfo;
use crate::core::racer::{Racer, RacerId, RacerState};
use std::fmt;

/// * `rank` - Rank of the racer, only set for finished racers
/// * `id` - Participant id of the racer
/// * `name` - Display name of the racer
/// * `state` - Racer state at the time the leaderboard was created
/// * `finish_time` - (cs) Finish or forfeit time
/// * `status_str` - Status as shown in the leaderboard, e.g. `Finished (0:01.20)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: Option<u32>,
    pub id: RacerId,
    pub name: String,
    pub state: RacerState,
    pub finish_time: Option<u32>,
    pub status_str: String,
}

/// Leaderboard is a snapshot of the race standings. It is recomputed whenever it is requested
/// and never stored by the race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaderboard {
    pub seed_str: String,
    pub status_str: String,
    pub elapsed: Option<u32>,
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new<'a, I>(
        race_info: &RaceInfo,
        status_str: &str,
        elapsed: Option<u32>,
        racers: I,
    ) -> Leaderboard
    where
        I: IntoIterator<Item = &'a Racer>,
    {
        let mut racers: Vec<&Racer> = racers.into_iter().collect();
        sort_leaderboard(&mut racers);

        let mut rank = 0;
        let entries = racers
            .into_iter()
            .map(|racer| {
                // only finished racers count towards the rank
                let entry_rank = if racer.is_finished() {
                    rank += 1;
                    Some(rank)
                } else {
                    None
                };

                LeaderboardEntry {
                    rank: entry_rank,
                    id: racer.id,
                    name: racer.name.to_owned(),
                    state: racer.state(),
                    finish_time: racer.finish_time(),
                    status_str: racer.status_str(),
                }
            })
            .collect();

        Leaderboard {
            seed_str: race_info.seed_str(),
            status_str: status_str.to_owned(),
            elapsed,
            entries,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }
}

impl fmt::Display for Leaderboard {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seed_str)?;
        writeln!(f, "Race Status: {}", self.status_str)?;

        let max_name_len = self
            .entries
            .iter()
            .map(|entry| entry.name.chars().count())
            .max()
            .unwrap_or(0);

        for entry in self.entries.iter() {
            let rank_str = match entry.rank {
                Some(rank) => format!("{}.", rank),
                None => String::new(),
            };
            writeln!(
                f,
                "{:>4} {:<width$} --- {}",
                rank_str,
                entry.name,
                entry.status_str,
                width = max_name_len
            )?;
        }
        Ok(())
    }
}

/// sort_leaderboard sorts the racers into leaderboard order: finished racers by ascending finish
/// time, then forfeited racers, then everyone still in the race. The sort is stable, i.e.
/// forfeited and remaining racers keep their relative order.
pub fn sort_leaderboard(racers: &mut [&Racer]) {
    racers.sort_by_key(|racer| match racer.state() {
        RacerState::Finished => (0, racer.finish_time().unwrap_or(0)),
        RacerState::Forfeit => (1, 0),
        _ => (2, 0),
    })
}

/// sort_racer_list sorts finished racers by ascending finish time to the front and keeps every
/// other racer in its relative order behind them.
pub fn sort_racer_list(racers: &mut [&Racer]) {
    racers.sort_by_key(|racer| match (racer.is_finished(), racer.finish_time()) {
        (true, Some(time)) => (0, time),
        _ => (1, 0),
    })
}
