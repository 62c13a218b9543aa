use crate::core::race::RaceConfig;
use crate::core::race_info::RaceInfo;
use crate::core::racer::RacerPars;
use anyhow::Context;
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::Path;

/// EntrantAction is the scripted behavior of an entrant once the race started.
/// * `Finish` - finish the race `after_ms` milliseconds after the start
/// * `Forfeit` - forfeit the race `after_ms` milliseconds after the start
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntrantAction {
    Finish { after_ms: u64 },
    Forfeit { after_ms: u64 },
}

impl EntrantAction {
    pub fn after_ms(&self) -> u64 {
        match *self {
            EntrantAction::Finish { after_ms } | EntrantAction::Forfeit { after_ms } => after_ms,
        }
    }
}

/// * `racer_pars` - Identity of the entrant
/// * `action` - Scripted action, None for entrants that stay in the race until it is finalized
#[derive(Debug, Deserialize, Clone)]
pub struct EntrantPars {
    #[serde(flatten)]
    pub racer_pars: RacerPars,
    #[serde(default)]
    pub action: Option<EntrantAction>,
}

/// RacePars is used to store all other parameter structs.
#[derive(Debug, Deserialize, Clone)]
pub struct RacePars {
    #[serde(default)]
    pub race_config: RaceConfig,
    #[serde(default)]
    pub race_info: RaceInfo,
    pub entrants: Vec<EntrantPars>,
}

/// read_race_pars reads the JSON file and decodes the JSON string into the race parameters
/// struct.
pub fn read_race_pars(filepath: &Path) -> anyhow::Result<RacePars> {
    // open file
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .with_context(|| format!("Failed to open parameter file {}!", filepath.display()))?;

    // read and parse parameter file content
    let pars = serde_json::from_reader(&fh)
        .with_context(|| format!("Failed to parse parameter file {}!", filepath.display()))?;
    Ok(pars)
}
