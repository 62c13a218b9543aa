use crate::core::clock::Clock;
use crate::core::leaderboard::{sort_racer_list, Leaderboard};
use crate::core::race_info::RaceInfo;
use crate::core::racer::{Racer, RacerId, RacerPars, RacerState};
use crate::core::scheduled_task::{ScheduledTask, TaskToken};
use crate::interfaces::room::Room;
use crate::post::race_result::RaceResult;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;

/// * `countdown_secs` - (s) Length of the countdown between closing the entry and the race start
/// * `incremental_countdown_start` - (s) Remaining countdown time from which on every second is
/// announced
/// * `finalize_secs` - (s) Grace window between the first racer finishing or forfeiting and the
/// results being finalized
/// * `require_at_least_two` - Minimum-entrant policy: a race needs two entrants instead of one
/// * `tick_ms` - (ms) Wall length of one timer second (only shortened for tests and demos)
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RaceConfig {
    pub countdown_secs: u32,
    pub incremental_countdown_start: u32,
    pub finalize_secs: u32,
    pub require_at_least_two: bool,
    pub tick_ms: u64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        RaceConfig {
            countdown_secs: 10,
            incremental_countdown_start: 5,
            finalize_secs: 15,
            require_at_least_two: true,
            tick_ms: 1000,
        }
    }
}

impl RaceConfig {
    pub fn min_entrants(&self) -> usize {
        if self.require_at_least_two {
            2
        } else {
            1
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// RaceStatus describes the lifecycle of a race. Paused races are in status `Racing`, see
/// `Race::is_paused`.
///
/// Possible transitions:
/// * `Uninitialized` -> `EntryOpen` (initialize)
/// * `EntryOpen` -> `CountingDown` (begin_race_countdown), back by cancel_countdown
/// * `CountingDown` -> `Racing` (countdown fires)
/// * `Racing` -> `Completed` (first racer finished or forfeited), back by cancel_finalization
/// * `Completed` -> `Finalized` or `Cancelled` (finalization fires, depending on whether anybody
/// finished)
/// * every non-terminal status -> `Cancelled` (cancel)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceStatus {
    Uninitialized,
    EntryOpen,
    CountingDown,
    Racing,
    Completed,
    Finalized,
    Cancelled,
}

impl Default for RaceStatus {
    fn default() -> Self {
        RaceStatus::Uninitialized
    }
}

impl RaceStatus {
    /// is_before_race returns true as long as the race has not been started by the countdown.
    pub fn is_before_race(self) -> bool {
        matches!(
            self,
            RaceStatus::Uninitialized | RaceStatus::EntryOpen | RaceStatus::CountingDown
        )
    }

    pub fn is_complete(self) -> bool {
        matches!(
            self,
            RaceStatus::Completed | RaceStatus::Finalized | RaceStatus::Cancelled
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RaceStatus::Finalized | RaceStatus::Cancelled)
    }

    pub fn description(self) -> &'static str {
        match self {
            RaceStatus::Uninitialized => "Not initialized.",
            RaceStatus::EntryOpen => "Waiting for racers to ready.",
            RaceStatus::CountingDown => "Starting!",
            RaceStatus::Racing => "In progress!",
            RaceStatus::Completed => "Complete.",
            RaceStatus::Finalized => "Results finalized.",
            RaceStatus::Cancelled => "Race cancelled.",
        }
    }
}

/// RaceError covers internal-consistency faults only. Rule violations by the caller (entering
/// twice, finishing before the start, ...) are reported as `false` by the race operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RaceError {
    #[error("racer {name} ({id}) was {state:?} instead of Ready when the countdown fired")]
    RacerNotReady {
        id: RacerId,
        name: String,
        state: RacerState,
    },
    #[error("failed to spawn the {timer} timer: {reason}")]
    TimerSpawn { timer: &'static str, reason: String },
}

/// Effect is a room notification collected while the race state is locked and dispatched to the
/// room after the lock was released.
enum Effect {
    Notify(String),
    RefreshLeaderboard(Leaderboard),
    Finalize(RaceResult),
    Fault(RaceError),
}

#[derive(Debug, Default)]
struct RaceState {
    status: RaceStatus,
    racers: Vec<Racer>,
    start_clock: Option<Duration>,
    start_wall_time: Option<DateTime<Utc>>,
    paused_at_clock: Option<Duration>,
    no_entrants_since: Option<Duration>,
    countdown: Option<ScheduledTask>,
    finalization: Option<ScheduledTask>,
}

impl RaceState {
    fn racer(&self, id: RacerId) -> Option<&Racer> {
        self.racers.iter().find(|racer| racer.id == id)
    }

    fn racer_mut(&mut self, id: RacerId) -> Option<&mut Racer> {
        self.racers.iter_mut().find(|racer| racer.id == id)
    }

    fn is_paused(&self) -> bool {
        self.paused_at_clock.is_some()
    }

    fn num_finished(&self) -> usize {
        self.racers.iter().filter(|racer| racer.is_finished()).count()
    }

    fn num_not_ready(&self) -> usize {
        self.racers.iter().filter(|racer| !racer.is_ready()).count()
    }

    /// elapsed returns the race time since the start, frozen at the pause instant while paused.
    fn elapsed(&self, now: Duration) -> Option<u32> {
        let start_clock = self.start_clock?;
        let until = self.paused_at_clock.unwrap_or(now);
        Some(to_centis(until.saturating_sub(start_clock)))
    }

    fn status_description(&self) -> &'static str {
        if self.status == RaceStatus::Racing && self.is_paused() {
            "Paused!"
        } else {
            self.status.description()
        }
    }
}

#[derive(Debug)]
struct Shared {
    config: RaceConfig,
    race_info: RaceInfo,
    room: Arc<dyn Room>,
    clock: Arc<dyn Clock>,
    state: Mutex<RaceState>,
}

/// Race is the handle of a single race. Cloning it is cheap, all clones refer to the same race.
///
/// Every operation locks the race state, performs its whole mutation without yielding, and
/// notifies the room only after the lock was released. The countdown and the finalization run
/// as scheduled tasks on their own threads and call back into the race when they fire. The
/// tasks only keep a weak reference, i.e. dropping the last handle stops them.
#[derive(Debug, Clone)]
pub struct Race {
    shared: Arc<Shared>,
}

impl Race {
    pub fn new(
        config: RaceConfig,
        race_info: RaceInfo,
        room: Arc<dyn Room>,
        clock: Arc<dyn Clock>,
    ) -> Race {
        Race {
            shared: Arc::new(Shared {
                config,
                race_info,
                room,
                clock,
                state: Mutex::new(RaceState::default()),
            }),
        }
    }

    // ---------------------------------------------------------------------------------------------
    // LIFECYCLE -----------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// initialize opens the entry. It must be called once before racers can enter.
    pub fn initialize(&self) -> bool {
        self.mutate(|state, effects| {
            if state.status != RaceStatus::Uninitialized {
                return false;
            }
            state.status = RaceStatus::EntryOpen;
            state.no_entrants_since = Some(self.shared.clock.monotonic());
            self.refresh(state, effects);
            true
        })
    }

    /// begin_race_countdown closes the entry and starts the countdown. Whether all racers are
    /// ready must be checked by the caller (see all_ready).
    pub fn begin_race_countdown(&self) -> bool {
        self.mutate(|state, effects| {
            if state.status != RaceStatus::EntryOpen {
                return false;
            }

            match self.spawn_timer("countdown", run_countdown) {
                Ok(task) => {
                    state.countdown = Some(task);
                    state.status = RaceStatus::CountingDown;
                    debug!("Countdown started for {} racers", state.racers.len());
                    self.refresh(state, effects);
                    true
                }
                Err(fault) => {
                    effects.push(Effect::Fault(fault));
                    false
                }
            }
        })
    }

    /// cancel_countdown reverts a race that is counting down to the entry phase. It returns
    /// false only if there is no countdown to cancel anymore, i.e. the countdown is already
    /// firing or the race has started. Before the countdown it returns true.
    pub fn cancel_countdown(&self, display_msgs: bool) -> bool {
        self.mutate(|state, effects| self.cancel_countdown_locked(state, effects, display_msgs))
    }

    /// cancel_finalization reverts a completed race to racing. It returns false only if the
    /// results cannot be reopened anymore, i.e. the finalization is already firing or the race
    /// is finalized or cancelled. While the race is not completed it returns true.
    pub fn cancel_finalization(&self, display_msgs: bool) -> bool {
        self.mutate(|state, effects| {
            self.cancel_finalization_locked(state, effects, display_msgs)
        })
    }

    pub fn pause(&self) -> bool {
        self.mutate(|state, effects| {
            if state.status != RaceStatus::Racing || state.is_paused() {
                return false;
            }
            state.paused_at_clock = Some(self.shared.clock.monotonic());
            debug!("Race paused");
            self.refresh(state, effects);
            true
        })
    }

    pub fn unpause(&self) -> bool {
        self.mutate(|state, effects| {
            if !matches!(state.status, RaceStatus::Racing | RaceStatus::Completed) {
                return false;
            }
            let paused_at_clock = match state.paused_at_clock.take() {
                Some(paused_at_clock) => paused_at_clock,
                None => return false,
            };

            // shift the start by the paused duration such that elapsed times continue seamlessly
            let paused_for = self
                .shared
                .clock
                .monotonic()
                .saturating_sub(paused_at_clock);
            if let Some(start_clock) = state.start_clock.as_mut() {
                *start_clock += paused_for;
            }
            debug!("Race unpaused after {}ms", paused_for.as_millis());
            self.refresh(state, effects);
            true
        })
    }

    /// cancel stops the race for good, no matter in which phase it is. Terminal races stay
    /// untouched.
    pub fn cancel(&self) -> bool {
        self.mutate(|state, effects| {
            if state.status.is_terminal() {
                return false;
            }

            for task in [state.countdown.take(), state.finalization.take()]
                .into_iter()
                .flatten()
            {
                if !task.cancel() {
                    warn!(
                        "The {} timer was already firing while the race got cancelled",
                        task.name()
                    );
                }
            }

            state.status = RaceStatus::Cancelled;
            state.paused_at_clock = None;
            info!("Race cancelled");
            effects.push(Effect::Notify(String::from("The race has been cancelled.")));
            self.refresh(state, effects);
            true
        })
    }

    // ---------------------------------------------------------------------------------------------
    // RACERS --------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn enter_racer(&self, racer_pars: &RacerPars) -> bool {
        self.mutate(|state, effects| {
            if state.status != RaceStatus::EntryOpen || state.racer(racer_pars.id).is_some() {
                return false;
            }
            state.racers.push(Racer::new(racer_pars));
            debug!("{} entered the race", racer_pars.name);
            self.refresh(state, effects);
            true
        })
    }

    /// unenter_racer removes a racer before the race started. If too few racers remain, a running
    /// countdown is cancelled; failing to do so is tolerated and the race starts anyway.
    pub fn unenter_racer(&self, id: RacerId) -> bool {
        self.mutate(|state, effects| {
            if !state.status.is_before_race() || state.racer(id).is_none() {
                return false;
            }
            state.racers.retain(|racer| racer.id != id);

            if state.racers.is_empty() {
                state.no_entrants_since = Some(self.shared.clock.monotonic());
            }
            self.refresh(state, effects);

            if state.racers.len() < self.shared.config.min_entrants()
                && !self.cancel_countdown_locked(state, effects, true)
            {
                warn!("Not enough racers left, but the countdown could not be cancelled anymore");
            }
            true
        })
    }

    pub fn ready_racer(&self, id: RacerId) -> bool {
        self.mutate(|state, effects| {
            let ready = state.racer_mut(id).map_or(false, Racer::ready);
            if ready {
                self.refresh(state, effects);
            }
            ready
        })
    }

    /// unready_racer puts a ready racer back into the entered state. A running countdown is
    /// cancelled first; if that fails, the racer stays ready.
    pub fn unready_racer(&self, id: RacerId) -> bool {
        self.mutate(|state, effects| {
            if !state.racer(id).map_or(false, Racer::is_ready) {
                return false;
            }
            if !self.cancel_countdown_locked(state, effects, true) {
                return false;
            }
            let unready = state.racer_mut(id).map_or(false, Racer::unready);
            if unready {
                self.refresh(state, effects);
            }
            unready
        })
    }

    pub fn finish_racer(&self, id: RacerId) -> bool {
        self.complete_racer(id, "finished", Racer::finish)
    }

    pub fn forfeit_racer(&self, id: RacerId) -> bool {
        self.complete_racer(id, "forfeited", Racer::forfeit)
    }

    pub fn unfinish_racer(&self, id: RacerId) -> bool {
        self.uncomplete_racer(id, Racer::is_finished, Racer::unfinish)
    }

    pub fn unforfeit_racer(&self, id: RacerId) -> bool {
        self.uncomplete_racer(id, Racer::is_forfeit, Racer::unforfeit)
    }

    /// complete_racer records the current race time as finish or forfeit time of the racer and
    /// ends the race if it was the first racer to be done. Only possible while racing or within
    /// the grace window.
    fn complete_racer(
        &self,
        id: RacerId,
        verb: &str,
        complete: fn(&mut Racer, u32) -> bool,
    ) -> bool {
        self.mutate(|state, effects| {
            // results are immutable once recorded or cancelled
            if state.status.is_before_race() || state.status.is_terminal() {
                return false;
            }

            let time = state.elapsed(self.shared.clock.monotonic()).unwrap_or(0);
            let racer = match state.racer_mut(id) {
                Some(racer) => racer,
                None => return false,
            };
            if !complete(racer, time) {
                return false;
            }
            info!("{} {} after {}cs", racer.name, verb, time);

            self.check_for_race_end(state, effects);
            self.refresh(state, effects);
            true
        })
    }

    /// uncomplete_racer returns a finished or forfeited racer to racing. A running finalization
    /// is cancelled first; if that fails, the racer keeps its result.
    fn uncomplete_racer(
        &self,
        id: RacerId,
        is_completed: fn(&Racer) -> bool,
        uncomplete: fn(&mut Racer) -> bool,
    ) -> bool {
        self.mutate(|state, effects| {
            if state.status == RaceStatus::Finalized
                || !state.racer(id).map_or(false, is_completed)
            {
                return false;
            }
            if !self.cancel_finalization_locked(state, effects, true) {
                return false;
            }
            let reverted = state.racer_mut(id).map_or(false, uncomplete);
            if reverted {
                self.refresh(state, effects);
            }
            reverted
        })
    }

    // ---------------------------------------------------------------------------------------------
    // QUERIES -------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn status(&self) -> RaceStatus {
        self.shared.state.lock().status
    }

    pub fn config(&self) -> &RaceConfig {
        &self.shared.config
    }

    pub fn race_info(&self) -> &RaceInfo {
        &self.shared.race_info
    }

    pub fn is_paused(&self) -> bool {
        self.shared.state.lock().is_paused()
    }

    pub fn is_entry_open(&self) -> bool {
        self.status() == RaceStatus::EntryOpen
    }

    pub fn is_before_race(&self) -> bool {
        self.status().is_before_race()
    }

    pub fn is_complete(&self) -> bool {
        self.status().is_complete()
    }

    pub fn has_racer(&self, id: RacerId) -> bool {
        self.shared.state.lock().racer(id).is_some()
    }

    /// racer returns a snapshot of the given racer.
    pub fn racer(&self, id: RacerId) -> Option<Racer> {
        self.shared.state.lock().racer(id).cloned()
    }

    pub fn num_racers(&self) -> usize {
        self.shared.state.lock().racers.len()
    }

    pub fn num_not_ready(&self) -> usize {
        self.shared.state.lock().num_not_ready()
    }

    pub fn num_finished(&self) -> usize {
        self.shared.state.lock().num_finished()
    }

    /// all_ready returns true if every racer is ready and there are enough racers to start.
    pub fn all_ready(&self) -> bool {
        let state = self.shared.state.lock();
        state.num_not_ready() == 0 && state.racers.len() >= self.shared.config.min_entrants()
    }

    /// start_time returns the UTC wall-clock time of the race start.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.shared.state.lock().start_wall_time
    }

    /// current_time returns the elapsed race time in centiseconds while the race is running
    /// (frozen while paused), None otherwise.
    pub fn current_time(&self) -> Option<u32> {
        let state = self.shared.state.lock();
        self.current_time_locked(&state)
    }

    pub fn no_entrants_since(&self) -> Option<Duration> {
        self.shared.state.lock().no_entrants_since
    }

    /// racer_list returns snapshots of all racers, finished racers first ordered by time.
    pub fn racer_list(&self) -> Vec<Racer> {
        let state = self.shared.state.lock();
        let mut racers: Vec<&Racer> = state.racers.iter().collect();
        sort_racer_list(&mut racers);
        racers.into_iter().cloned().collect()
    }

    pub fn leaderboard(&self) -> Leaderboard {
        let state = self.shared.state.lock();
        self.leaderboard_locked(&state)
    }

    pub fn result(&self) -> RaceResult {
        let state = self.shared.state.lock();
        self.result_locked(&state)
    }

    // ---------------------------------------------------------------------------------------------
    // METHODS (HELPERS) ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// mutate runs f with the race state locked and dispatches the collected effects to the room
    /// afterwards.
    fn mutate<T>(&self, f: impl FnOnce(&mut RaceState, &mut Vec<Effect>) -> T) -> T {
        let mut effects = Vec::new();
        let ret = {
            let mut state = self.shared.state.lock();
            f(&mut state, &mut effects)
        };
        self.dispatch(effects);
        ret
    }

    fn dispatch(&self, effects: Vec<Effect>) {
        let room = &self.shared.room;

        for effect in effects {
            match effect {
                Effect::Notify(text) => room.notify(&text),
                Effect::RefreshLeaderboard(leaderboard) => room.refresh_leaderboard(&leaderboard),
                Effect::Finalize(result) => room.on_finalize(&result),
                Effect::Fault(fault) => room.report_fault(&fault),
            }
        }
    }

    fn refresh(&self, state: &RaceState, effects: &mut Vec<Effect>) {
        effects.push(Effect::RefreshLeaderboard(self.leaderboard_locked(state)));
    }

    fn current_time_locked(&self, state: &RaceState) -> Option<u32> {
        if state.status != RaceStatus::Racing {
            return None;
        }
        state.elapsed(self.shared.clock.monotonic())
    }

    fn leaderboard_locked(&self, state: &RaceState) -> Leaderboard {
        Leaderboard::new(
            &self.shared.race_info,
            state.status_description(),
            self.current_time_locked(state),
            &state.racers,
        )
    }

    fn result_locked(&self, state: &RaceState) -> RaceResult {
        RaceResult {
            status: state.status,
            race_info: self.shared.race_info.to_owned(),
            start_time: state.start_wall_time,
            entries: self.leaderboard_locked(state).entries,
        }
    }

    fn spawn_timer(
        &self,
        timer: &'static str,
        body: fn(Weak<Shared>, RaceConfig, TaskToken),
    ) -> Result<ScheduledTask, RaceError> {
        let race = Arc::downgrade(&self.shared);
        let config = self.shared.config.to_owned();

        ScheduledTask::spawn(&format!("race-{}", timer), move |token| {
            body(race, config, token)
        })
        .map_err(|err| {
            let fault = RaceError::TimerSpawn {
                timer,
                reason: err.to_string(),
            };
            error!("{}", fault);
            fault
        })
    }

    fn cancel_countdown_locked(
        &self,
        state: &mut RaceState,
        effects: &mut Vec<Effect>,
        display_msgs: bool,
    ) -> bool {
        match state.status {
            RaceStatus::Uninitialized | RaceStatus::EntryOpen => true,
            RaceStatus::CountingDown => {
                if !state.countdown.as_ref().map_or(false, ScheduledTask::cancel) {
                    debug!("Countdown is already firing and cannot be cancelled");
                    return false;
                }
                state.countdown = None;
                state.status = RaceStatus::EntryOpen;
                debug!("Countdown cancelled");
                self.refresh(state, effects);
                if display_msgs {
                    effects.push(Effect::Notify(String::from("Countdown cancelled.")));
                }
                true
            }
            _ => false,
        }
    }

    fn cancel_finalization_locked(
        &self,
        state: &mut RaceState,
        effects: &mut Vec<Effect>,
        display_msgs: bool,
    ) -> bool {
        match state.status {
            RaceStatus::Completed => {
                if !state
                    .finalization
                    .as_ref()
                    .map_or(false, ScheduledTask::cancel)
                {
                    debug!("Finalization is already firing and cannot be cancelled");
                    return false;
                }
                state.finalization = None;
                state.status = RaceStatus::Racing;
                debug!("Finalization cancelled");
                self.refresh(state, effects);
                if display_msgs {
                    effects.push(Effect::Notify(String::from(
                        "Race end cancelled -- unfinished racers may continue!",
                    )));
                }
                true
            }
            RaceStatus::Finalized | RaceStatus::Cancelled => false,
            _ => true,
        }
    }

    /// begin_race is called by the countdown once it claimed its task. All racers start racing
    /// and the start clocks are recorded.
    fn begin_race(&self) {
        self.mutate(|state, effects| {
            // the race may have been cancelled between the claim and this call
            if state.status != RaceStatus::CountingDown {
                debug!("Countdown fired in status {:?}, ignoring", state.status);
                return;
            }
            state.countdown = None;

            for racer in state.racers.iter_mut() {
                if !racer.begin_race() {
                    let fault = RaceError::RacerNotReady {
                        id: racer.id,
                        name: racer.name.to_owned(),
                        state: racer.state(),
                    };
                    error!("{}", fault);
                    racer.force_begin_race();
                    effects.push(Effect::Fault(fault));
                }
            }

            state.start_clock = Some(self.shared.clock.monotonic());
            state.start_wall_time = Some(self.shared.clock.wall());
            state.paused_at_clock = None;
            state.status = RaceStatus::Racing;
            info!("Race started with {} racers", state.racers.len());

            effects.push(Effect::Notify(String::from("GO!")));
            self.refresh(state, effects);
        })
    }

    /// check_for_race_end completes the race as soon as any racer finished or forfeited.
    fn check_for_race_end(&self, state: &mut RaceState, effects: &mut Vec<Effect>) {
        if state.status != RaceStatus::Racing || !state.racers.iter().any(Racer::is_done_racing) {
            return;
        }
        state.status = RaceStatus::Completed;

        match self.spawn_timer("finalization", run_finalization) {
            Ok(task) => {
                debug!("Race completed, finalizing in {}s", self.shared.config.finalize_secs);
                state.finalization = Some(task);
            }
            Err(fault) => {
                // without a timer the grace window cannot be granted, finalize right away
                effects.push(Effect::Fault(fault));
                self.finalize_locked(state, effects);
            }
        }
    }

    /// finalize_race is called by the finalization once it claimed its task.
    fn finalize_race(&self) {
        self.mutate(|state, effects| {
            if state.status != RaceStatus::Completed {
                debug!("Finalization fired in status {:?}, ignoring", state.status);
                return;
            }
            self.finalize_locked(state, effects)
        })
    }

    fn finalize_locked(&self, state: &mut RaceState, effects: &mut Vec<Effect>) {
        state.finalization = None;
        state.paused_at_clock = None;
        state.status = if state.num_finished() > 0 {
            RaceStatus::Finalized
        } else {
            RaceStatus::Cancelled
        };
        info!("Race results recorded with status {:?}", state.status);

        self.refresh(state, effects);
        effects.push(Effect::Finalize(self.result_locked(state)));
    }
}

#[cfg(test)]
impl Race {
    /// freeze_countdown_at_fire swaps the running countdown for one that has already claimed
    /// itself but never starts the race, i.e. the race stays in the instant between the countdown
    /// firing and the start until complete_countdown is called.
    pub(crate) fn freeze_countdown_at_fire(&self) -> bool {
        let mut state = self.shared.state.lock();
        if state.status != RaceStatus::CountingDown {
            return false;
        }
        if let Some(task) = state.countdown.take() {
            task.cancel();
        }

        let (tx, rx) = flume::bounded(1);
        let task = match ScheduledTask::spawn("race-countdown", move |token| {
            tx.send(token.claim()).ok();
        }) {
            Ok(task) => task,
            Err(_) => return false,
        };
        state.countdown = Some(task);
        rx.recv() == Ok(true)
    }

    pub(crate) fn complete_countdown(&self) {
        self.begin_race()
    }
}

// -------------------------------------------------------------------------------------------------
// TIMERS ------------------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

/// run_countdown is the body of the countdown task: a short pause, the announcement of the
/// countdown length, then one tick per second with the last seconds announced individually.
fn run_countdown(race: Weak<Shared>, config: RaceConfig, token: TaskToken) {
    let tick = config.tick();

    if !token.sleep(tick) {
        return;
    }

    let mut remaining = config.countdown_secs;
    let text = format!("The race will begin in {} seconds.", remaining);
    if !announce(&race, &token, text) {
        return;
    }

    while remaining > 0 {
        if remaining <= config.incremental_countdown_start
            && !announce(&race, &token, remaining.to_string())
        {
            return;
        }
        if !token.sleep(tick) {
            return;
        }
        remaining -= 1;
    }

    // from here on the countdown can no longer be cancelled
    if !token.claim() {
        return;
    }
    if let Some(shared) = race.upgrade() {
        Race { shared }.begin_race()
    }
}

/// run_finalization is the body of the finalization task: a short pause, the announcement of
/// the grace window, then the grace window itself.
fn run_finalization(race: Weak<Shared>, config: RaceConfig, token: TaskToken) {
    let tick = config.tick();

    if !token.sleep(tick) {
        return;
    }

    let text = format!("The race will end in {} seconds.", config.finalize_secs);
    if !announce(&race, &token, text) {
        return;
    }
    if !token.sleep(tick * config.finalize_secs) {
        return;
    }

    if !token.claim() {
        return;
    }
    if let Some(shared) = race.upgrade() {
        Race { shared }.finalize_race()
    }
}

/// announce sends a message to the room unless the task was cancelled. The check is performed
/// with the race state locked, cancellations are performed under the same lock, so a cancelled
/// task never announces anything.
fn announce(race: &Weak<Shared>, token: &TaskToken, text: String) -> bool {
    let shared = match race.upgrade() {
        Some(shared) => shared,
        None => return false,
    };

    Race { shared }.mutate(|_, effects| {
        if !token.is_pending() {
            return false;
        }
        effects.push(Effect::Notify(text));
        true
    })
}

fn to_centis(duration: Duration) -> u32 {
    (duration.as_millis() / 10).min(u32::MAX as u128) as u32
}
