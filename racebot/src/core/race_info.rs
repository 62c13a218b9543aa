use serde::Deserialize;

/// * `category` - Race category shown to the racers, e.g. Cadence
/// * `seed` - Seed of the race, None for unseeded races
///
/// The race info is only used for display purposes.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct RaceInfo {
    pub category: String,
    #[serde(default)]
    pub seed: Option<u32>,
}

impl RaceInfo {
    /// seed_str returns the first line of the leaderboard, e.g. `Cadence -- Seed: 1234`.
    pub fn seed_str(&self) -> String {
        match self.seed {
            Some(seed) => format!("{} -- Seed: {}", self.category, seed),
            None => format!("{} -- Unseeded", self.category),
        }
    }
}
