use helpers::racetime;
use serde::Deserialize;

/// Opaque participant id as handed over by the command layer (e.g. a chat user id).
pub type RacerId = u64;

/// * `id` - Stable external participant id
/// * `name` - Display name, e.g. incnone
#[derive(Debug, Deserialize, Clone)]
pub struct RacerPars {
    pub id: RacerId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacerState {
    Entered,
    Ready,
    Racing,
    Finished,
    Forfeit,
}

/// The Racer contains a statemachine tracking a single participant from entering the race until
/// finishing or forfeiting it.
///
/// Possible statemachine states:
/// * `Entered` -> initial state after entering the race
/// * `Ready` -> reachable from `Entered` (`ready`), returning to `Entered` by `unready`
/// * `Racing` -> reachable from `Ready` once the countdown fires, or by `unfinish`/`unforfeit`
/// * `Finished` -> reachable from `Racing`, finish time is recorded
/// * `Forfeit` -> reachable from `Racing`, forfeit time is recorded
///
/// `finish_time` is set if and only if the racer is in state `Finished` or `Forfeit`.
#[derive(Debug, Clone)]
pub struct Racer {
    pub id: RacerId,
    pub name: String,
    state: RacerState,
    finish_time: Option<u32>,
}

impl Racer {
    pub fn new(racer_pars: &RacerPars) -> Racer {
        Racer {
            id: racer_pars.id,
            name: racer_pars.name.to_owned(),
            state: RacerState::Entered,
            finish_time: None,
        }
    }

    // ---------------------------------------------------------------------------------------------
    // TRANSITIONS ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn ready(&mut self) -> bool {
        self.transition(RacerState::Entered, RacerState::Ready)
    }

    pub fn unready(&mut self) -> bool {
        self.transition(RacerState::Ready, RacerState::Entered)
    }

    /// begin_race is called for every racer when the countdown fires. A racer that is not ready
    /// at this point indicates a broken guard elsewhere, the caller must treat a false return as
    /// an internal-consistency fault.
    pub fn begin_race(&mut self) -> bool {
        self.transition(RacerState::Ready, RacerState::Racing)
    }

    /// force_begin_race puts the racer into the racing state no matter whether it was ready. It
    /// is only used to repair the race after begin_race failed for this racer.
    pub(crate) fn force_begin_race(&mut self) {
        self.state = RacerState::Racing;
        self.finish_time = None;
    }

    pub fn finish(&mut self, time: u32) -> bool {
        self.complete(RacerState::Finished, time)
    }

    pub fn forfeit(&mut self, time: u32) -> bool {
        self.complete(RacerState::Forfeit, time)
    }

    pub fn unfinish(&mut self) -> bool {
        self.uncomplete(RacerState::Finished)
    }

    pub fn unforfeit(&mut self) -> bool {
        self.uncomplete(RacerState::Forfeit)
    }

    fn transition(&mut self, from: RacerState, to: RacerState) -> bool {
        if self.state != from {
            return false;
        }
        self.state = to;
        true
    }

    fn complete(&mut self, to: RacerState, time: u32) -> bool {
        if !self.transition(RacerState::Racing, to) {
            return false;
        }
        self.finish_time = Some(time);
        true
    }

    fn uncomplete(&mut self, from: RacerState) -> bool {
        if !self.transition(from, RacerState::Racing) {
            return false;
        }
        self.finish_time = None;
        true
    }

    // ---------------------------------------------------------------------------------------------
    // GETTERS -------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn state(&self) -> RacerState {
        self.state
    }

    /// finish_time returns the finish (or forfeit) time in centiseconds since the race start.
    pub fn finish_time(&self) -> Option<u32> {
        self.finish_time
    }

    pub fn is_ready(&self) -> bool {
        self.state == RacerState::Ready
    }

    pub fn is_racing(&self) -> bool {
        self.state == RacerState::Racing
    }

    pub fn is_finished(&self) -> bool {
        self.state == RacerState::Finished
    }

    pub fn is_forfeit(&self) -> bool {
        self.state == RacerState::Forfeit
    }

    pub fn is_done_racing(&self) -> bool {
        matches!(self.state, RacerState::Finished | RacerState::Forfeit)
    }

    /// status_str returns the status as shown in the leaderboard, e.g. `Finished (1:02.35)`.
    pub fn status_str(&self) -> String {
        match (self.state, self.finish_time) {
            (RacerState::Entered, _) => String::from("Entered"),
            (RacerState::Ready, _) => String::from("Ready"),
            (RacerState::Racing, _) => String::from("Racing"),
            (RacerState::Finished, Some(time)) => format!("Finished ({})", racetime::to_str(time)),
            (RacerState::Finished, None) => String::from("Finished"),
            (RacerState::Forfeit, _) => String::from("Forfeit"),
        }
    }
}
