use crate::core::leaderboard::Leaderboard;
use crate::core::race::RaceError;
use crate::post::race_result::RaceResult;
use std::fmt::Debug;

/// Room is the chat room a race takes place in. The race calls it after every state change but
/// never waits for the messages to be delivered; ordering and retries are up to the room.
pub trait Room: Debug + Send + Sync {
    /// notify broadcasts a text message to all racers, e.g. `GO!`.
    fn notify(&self, text: &str);

    /// refresh_leaderboard is called with a fresh snapshot whenever the standings changed.
    fn refresh_leaderboard(&self, leaderboard: &Leaderboard);

    /// on_finalize is called once when the race is finalized or cancelled after its grace
    /// window, such that the result can be recorded.
    fn on_finalize(&self, result: &RaceResult);

    /// report_fault escalates internal-consistency faults of the race. The race has already
    /// logged them and kept itself in a defined state.
    fn report_fault(&self, _fault: &RaceError) {}
}
