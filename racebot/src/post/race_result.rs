use crate::core::leaderboard::LeaderboardEntry;
use crate::core::race::RaceStatus;
use crate::core::race_info::RaceInfo;
use chrono::{DateTime, Utc};
use helpers::racetime;
use std::fmt::Write;

/// RaceResult contains all race information that is required for recording the race, it is
/// handed over to the room when the race is finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceResult {
    pub status: RaceStatus,
    pub race_info: RaceInfo,
    pub start_time: Option<DateTime<Utc>>,
    pub entries: Vec<LeaderboardEntry>,
}

impl RaceResult {
    /// winner returns the fastest finished racer, if anybody finished.
    pub fn winner(&self) -> Option<&LeaderboardEntry> {
        self.entries.iter().find(|entry| entry.rank == Some(1))
    }

    pub fn num_finished(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.rank.is_some())
            .count()
    }

    /// print_results prints the race result to the console output.
    pub fn print_results(&self) {
        // create string with the race details
        let mut tmp_string_details = String::new();

        writeln!(&mut tmp_string_details, "{}", self.race_info.seed_str()).unwrap();
        writeln!(&mut tmp_string_details, "Status: {:?}", self.status).unwrap();
        match self.start_time {
            Some(start_time) => write!(
                &mut tmp_string_details,
                "Started: {}",
                start_time.format("%Y-%m-%d %H:%M:%S UTC")
            )
            .unwrap(),
            None => write!(&mut tmp_string_details, "Started: -").unwrap(),
        }

        // create string for the standings
        let mut tmp_string_standings = String::from("rank, racer, time");

        for entry in self.entries.iter() {
            let rank_str = match entry.rank {
                Some(rank) => format!("{:4}", rank),
                None => String::from("   -"),
            };
            let time_str = match (entry.rank, entry.finish_time) {
                (Some(_), Some(time)) => racetime::to_str(time),
                _ => entry.status_str.to_owned(),
            };
            write!(
                &mut tmp_string_standings,
                "\n{}, {}, {}",
                rank_str, entry.name, time_str
            )
            .unwrap();
        }

        // print everything to the console
        println!("RESULT: Race details");
        println!("{}", tmp_string_details);

        println!("RESULT: Standings");
        println!("{}", tmp_string_standings);
    }
}
