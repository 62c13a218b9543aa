use crate::core::leaderboard::Leaderboard;
use crate::core::race::RaceError;
use crate::interfaces::room::Room;
use crate::post::race_result::RaceResult;
use flume::{Receiver, Sender};
use log::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    Message(String),
    Leaderboard(Leaderboard),
    Finalized(RaceResult),
    Fault(RaceError),
}

/// ChannelRoom forwards every room event over a channel, such that the events can be consumed in
/// another thread (the race driver, a chat connector, or a test).
#[derive(Debug, Clone)]
pub struct ChannelRoom {
    tx: Sender<RoomEvent>,
}

impl ChannelRoom {
    pub fn new() -> (ChannelRoom, Receiver<RoomEvent>) {
        let (tx, rx) = flume::unbounded();
        (ChannelRoom { tx }, rx)
    }

    fn send(&self, event: RoomEvent) {
        // a room without listener simply drops its events
        if self.tx.send(event).is_err() {
            debug!("Room event dropped, nobody is listening anymore");
        }
    }
}

impl Room for ChannelRoom {
    fn notify(&self, text: &str) {
        self.send(RoomEvent::Message(text.to_owned()))
    }

    fn refresh_leaderboard(&self, leaderboard: &Leaderboard) {
        self.send(RoomEvent::Leaderboard(leaderboard.to_owned()))
    }

    fn on_finalize(&self, result: &RaceResult) {
        self.send(RoomEvent::Finalized(result.to_owned()))
    }

    fn report_fault(&self, fault: &RaceError) {
        self.send(RoomEvent::Fault(fault.to_owned()))
    }
}
