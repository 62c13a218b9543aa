pub mod core {
    pub mod clock;
    pub mod handle_race;
    pub mod leaderboard;
    pub mod race;
    pub mod race_info;
    pub mod racer;
    pub mod scheduled_task;
}

pub mod interfaces {
    pub mod channel_room;
    pub mod room;
}

pub mod post {
    pub mod race_result;
}

pub mod pre {
    pub mod check_race_pars;
    pub mod race_opts;
    pub mod read_race_pars;
}





#[cfg(test)]
mod race_tests {
    use crate::core::race::{RaceError, RaceStatus};
    use crate::core::racer::RacerState;
    use crate::interfaces::channel_room::RoomEvent;
    use crate::test_utils::{
        create_race, create_started_race, drain_messages, fast_config, racer_pars, slow_config,
        wait_for, wait_for_message, wait_for_result,
    };
    use std::thread::sleep;
    use std::time::{Duration, Instant};

    // ENTRY ---------------------------------------------------------------------------------------
    #[test]
    fn test_enter_racer() {
        let (race, _, _rx) = create_race(slow_config());
        assert!(race.enter_racer(&racer_pars(1, "A")));
        assert!(!race.enter_racer(&racer_pars(1, "A")));
        assert_eq!(race.num_racers(), 1);
        assert_eq!(race.racer(1).unwrap().state(), RacerState::Entered);
        assert!(race.has_racer(1));
        assert!(!race.has_racer(2));
    }
    #[test]
    fn test_enter_racer_requires_initialize() {
        let (race, _, _rx) = create_race(slow_config());
        assert!(!race.initialize());

        let (room, _rx) = crate::interfaces::channel_room::ChannelRoom::new();
        let uninitialized = crate::core::race::Race::new(
            slow_config(),
            Default::default(),
            std::sync::Arc::new(room),
            std::sync::Arc::new(crate::core::clock::SystemClock::new()),
        );
        assert_eq!(uninitialized.status(), RaceStatus::Uninitialized);
        assert!(!uninitialized.enter_racer(&racer_pars(1, "A")));
    }
    #[test]
    fn test_enter_racer_after_countdown_start() {
        let (race, _, _rx) = create_race(slow_config());
        assert!(race.enter_racer(&racer_pars(1, "A")));
        assert!(race.begin_race_countdown());
        assert_eq!(race.status(), RaceStatus::CountingDown);
        assert!(!race.enter_racer(&racer_pars(2, "B")));
        assert!(race.cancel());
    }
    #[test]
    fn test_all_ready() {
        let (race, _, _rx) = create_race(slow_config());
        assert!(race.enter_racer(&racer_pars(1, "A")));
        assert!(race.ready_racer(1));
        assert!(!race.all_ready());
        assert!(race.enter_racer(&racer_pars(2, "B")));
        assert_eq!(race.num_not_ready(), 1);
        assert!(!race.all_ready());
        assert!(race.ready_racer(2));
        assert!(race.all_ready());
    }
    #[test]
    fn test_unenter_records_no_entrants() {
        let (race, clock, _rx) = create_race(slow_config());
        assert_eq!(race.no_entrants_since(), Some(Duration::ZERO));
        assert!(race.enter_racer(&racer_pars(1, "A")));
        clock.advance(Duration::from_secs(30));
        assert!(race.unenter_racer(1));
        assert!(!race.unenter_racer(1));
        assert_eq!(race.no_entrants_since(), Some(Duration::from_secs(30)));
    }
    #[test]
    fn test_unenter_below_minimum_cancels_countdown() {
        let (race, _, rx) = create_race(slow_config());
        for id in 1..=2 {
            assert!(race.enter_racer(&racer_pars(id, "racer")));
            assert!(race.ready_racer(id));
        }
        assert!(race.begin_race_countdown());
        assert!(race.unenter_racer(2));
        assert_eq!(race.status(), RaceStatus::EntryOpen);
        assert!(drain_messages(&rx).contains(&String::from("Countdown cancelled.")));
    }
    #[test]
    fn test_unenter_after_start() {
        let (race, _, _rx) = create_started_race(fast_config(), &[(1, "A")]);
        assert!(!race.unenter_racer(1));
        assert!(race.has_racer(1));
    }
    #[test]
    fn test_unenter_below_minimum_after_countdown_fired() {
        let (race, _, rx) = create_race(slow_config());
        for id in 1..=2 {
            assert!(race.enter_racer(&racer_pars(id, "racer")));
            assert!(race.ready_racer(id));
        }
        assert!(race.begin_race_countdown());
        assert!(race.freeze_countdown_at_fire());

        // the countdown cannot be cancelled anymore, unready fails and unenter is tolerated
        assert!(!race.unready_racer(1));
        assert!(race.racer(1).unwrap().is_ready());
        assert!(race.unenter_racer(2));
        assert_eq!(race.status(), RaceStatus::CountingDown);
        assert!(!drain_messages(&rx).contains(&String::from("Countdown cancelled.")));

        race.complete_countdown();
        assert_eq!(race.status(), RaceStatus::Racing);
        assert_eq!(race.num_racers(), 1);
        assert!(race.racer(1).unwrap().is_racing());
        assert!(race.start_time().is_some());
    }

    // COUNTDOWN -----------------------------------------------------------------------------------
    #[test]
    fn test_countdown_announcements() {
        let (race, _, rx) = create_race(fast_config());
        for id in 1..=2 {
            assert!(race.enter_racer(&racer_pars(id, "racer")));
            assert!(race.ready_racer(id));
        }
        assert!(race.begin_race_countdown());
        assert_eq!(
            wait_for_message(&rx, "GO!"),
            vec!["The race will begin in 2 seconds.", "1", "GO!"]
        );
        assert_eq!(race.status(), RaceStatus::Racing);
        assert!(race.racer_list().iter().all(|racer| racer.is_racing()));
        assert!(race.start_time().is_some());
        assert_eq!(race.current_time(), Some(0));
    }
    #[test]
    fn test_begin_countdown_requires_entry_open() {
        let (race, _, _rx) = create_race(slow_config());
        assert!(race.begin_race_countdown());
        assert!(!race.begin_race_countdown());
        assert!(race.cancel());
        assert!(!race.begin_race_countdown());
    }
    #[test]
    fn test_cancel_countdown() {
        let (race, _, rx) = create_race(slow_config());
        for id in 1..=2 {
            assert!(race.enter_racer(&racer_pars(id, "racer")));
            assert!(race.ready_racer(id));
        }
        assert!(race.begin_race_countdown());
        assert!(race.cancel_countdown(true));
        assert_eq!(race.status(), RaceStatus::EntryOpen);
        assert!(race.racer_list().iter().all(|racer| racer.is_ready()));
        assert_eq!(race.start_time(), None);
        assert_eq!(drain_messages(&rx), vec!["Countdown cancelled."]);

        // a cancelled countdown can be restarted
        assert!(race.begin_race_countdown());
        assert!(race.cancel_countdown(false));
        assert!(drain_messages(&rx).is_empty());
    }
    #[test]
    fn test_cancelled_countdown_stays_silent() {
        let (race, _, rx) = create_race(fast_config());
        assert!(race.enter_racer(&racer_pars(1, "A")));
        assert!(race.ready_racer(1));
        assert!(race.begin_race_countdown());
        assert!(race.cancel_countdown(false));

        sleep(Duration::from_millis(50));
        assert_eq!(race.status(), RaceStatus::EntryOpen);
        assert!(drain_messages(&rx).is_empty());
    }
    #[test]
    fn test_cancel_countdown_after_start() {
        let (race, _, _rx) = create_started_race(fast_config(), &[(1, "A")]);
        assert!(!race.cancel_countdown(true));
        assert_eq!(race.status(), RaceStatus::Racing);
    }
    #[test]
    fn test_cancel_countdown_at_firing_instant() {
        let mut config = fast_config();
        config.countdown_secs = 1;
        config.incremental_countdown_start = 0;
        config.tick_ms = 1;

        for i in 0..30 {
            let (race, _, _rx) = create_race(config.to_owned());
            for id in 1..=2 {
                assert!(race.enter_racer(&racer_pars(id, "racer")));
                assert!(race.ready_racer(id));
            }
            assert!(race.begin_race_countdown());
            sleep(Duration::from_micros(250 * (i % 12)));

            if race.cancel_countdown(false) {
                sleep(Duration::from_millis(10));
                assert_eq!(race.status(), RaceStatus::EntryOpen);
                assert!(race.racer_list().iter().all(|racer| racer.is_ready()));
                assert_eq!(race.start_time(), None);
            } else {
                assert!(wait_for(|| race.status() == RaceStatus::Racing));
                assert!(race.racer_list().iter().all(|racer| racer.is_racing()));
                assert!(race.start_time().is_some());
            }
        }
    }
    #[test]
    fn test_racer_not_ready_at_start_is_reported() {
        let (race, _, rx) = create_race(fast_config());
        assert!(race.enter_racer(&racer_pars(1, "A")));
        assert!(race.enter_racer(&racer_pars(2, "B")));
        assert!(race.ready_racer(1));
        assert!(race.begin_race_countdown());

        let fault = loop {
            match rx.recv_timeout(Duration::from_secs(5)) {
                Ok(RoomEvent::Fault(fault)) => break fault,
                Ok(_) => {}
                Err(err) => panic!("no fault reported: {:?}", err),
            }
        };
        assert_eq!(
            fault,
            RaceError::RacerNotReady {
                id: 2,
                name: String::from("B"),
                state: RacerState::Entered,
            }
        );

        wait_for_message(&rx, "GO!");
        assert!(!rx
            .try_iter()
            .any(|event| matches!(event, RoomEvent::Fault(_))));
        assert_eq!(race.status(), RaceStatus::Racing);
        assert!(race.racer(2).unwrap().is_racing());
    }

    // READY ---------------------------------------------------------------------------------------
    #[test]
    fn test_unready_cancels_countdown() {
        let (race, _, rx) = create_race(slow_config());
        for id in 1..=2 {
            assert!(race.enter_racer(&racer_pars(id, "racer")));
            assert!(race.ready_racer(id));
        }
        assert!(race.begin_race_countdown());
        assert!(race.unready_racer(1));
        assert_eq!(race.status(), RaceStatus::EntryOpen);
        assert_eq!(race.racer(1).unwrap().state(), RacerState::Entered);
        assert_eq!(race.racer(2).unwrap().state(), RacerState::Ready);
        assert_eq!(drain_messages(&rx), vec!["Countdown cancelled."]);
    }
    #[test]
    fn test_unready_not_ready_racer() {
        let (race, _, _rx) = create_race(slow_config());
        assert!(race.enter_racer(&racer_pars(1, "A")));
        assert!(!race.unready_racer(1));
        assert!(!race.unready_racer(2));
        assert!(!race.ready_racer(2));
    }
    #[test]
    fn test_unready_after_start() {
        let (race, _, _rx) = create_started_race(fast_config(), &[(1, "A")]);
        assert!(!race.unready_racer(1));
        assert!(race.racer(1).unwrap().is_racing());
    }

    // FINISH --------------------------------------------------------------------------------------
    #[test]
    fn test_finish_before_start() {
        let (race, _, _rx) = create_race(slow_config());
        assert!(race.enter_racer(&racer_pars(1, "A")));
        assert!(race.ready_racer(1));
        assert!(!race.finish_racer(1));
        assert!(!race.forfeit_racer(1));
    }
    #[test]
    fn test_finish_twice() {
        let mut config = fast_config();
        config.finalize_secs = 60;
        let (race, clock, _rx) = create_started_race(config, &[(1, "A"), (2, "B")]);

        clock.advance_centis(4_200);
        assert!(race.finish_racer(1));
        clock.advance_centis(100);
        assert!(!race.finish_racer(1));
        assert_eq!(race.racer(1).unwrap().finish_time(), Some(4_200));
        assert!(!race.finish_racer(3));
        assert!(race.cancel());
    }
    #[test]
    fn test_single_forfeit_cancels_race() {
        let (race, clock, rx) = create_started_race(fast_config(), &[(1, "A")]);
        clock.advance_centis(250);
        assert!(race.forfeit_racer(1));
        assert_eq!(race.status(), RaceStatus::Completed);

        let (result, messages) = wait_for_result(&rx);
        assert_eq!(result.status, RaceStatus::Cancelled);
        assert_eq!(race.status(), RaceStatus::Cancelled);
        assert!(messages.contains(&String::from("The race will end in 2 seconds.")));
        assert_eq!(result.num_finished(), 0);
        assert_eq!(result.winner(), None);
    }
    #[test]
    fn test_finish_and_forfeit_finalizes_race() {
        let config = fast_config();
        let grace_window = config.tick() * (config.finalize_secs + 1);
        let (race, clock, rx) = create_started_race(config, &[(1, "X"), (2, "Y")]);
        drain_messages(&rx);

        clock.advance_centis(120);
        let t_done = Instant::now();
        assert!(race.finish_racer(1));
        assert_eq!(race.status(), RaceStatus::Completed);
        clock.advance_centis(180);
        assert!(race.forfeit_racer(2));
        assert_eq!(race.status(), RaceStatus::Completed);

        let (result, messages) = wait_for_result(&rx);
        assert!(t_done.elapsed() >= grace_window);
        assert_eq!(result.status, RaceStatus::Finalized);
        assert_eq!(messages, vec!["The race will end in 2 seconds."]);

        let names: Vec<&str> = result.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["X", "Y"]);
        assert_eq!(result.entries[0].finish_time, Some(120));
        assert_eq!(result.entries[0].rank, Some(1));
        assert_eq!(result.entries[1].state, RacerState::Forfeit);
        assert_eq!(result.entries[1].finish_time, Some(300));
        assert_eq!(result.winner().map(|e| e.id), Some(1));
        assert_eq!(result.start_time, race.start_time());
    }
    #[test]
    fn test_unfinish_cancels_finalization() {
        let mut config = fast_config();
        config.finalize_secs = 60;
        let (race, clock, rx) = create_started_race(config, &[(1, "A"), (2, "B")]);
        drain_messages(&rx);

        clock.advance_centis(500);
        assert!(race.finish_racer(1));
        assert_eq!(race.status(), RaceStatus::Completed);
        assert!(!race.unforfeit_racer(1));
        assert!(race.unfinish_racer(1));
        assert_eq!(race.status(), RaceStatus::Racing);
        assert_eq!(race.racer(1).unwrap().finish_time(), None);
        assert!(drain_messages(&rx)
            .contains(&String::from("Race end cancelled -- unfinished racers may continue!")));

        // racers may be marked done again after the finalization was cancelled
        clock.advance_centis(100);
        assert!(race.finish_racer(1));
        assert_eq!(race.racer(1).unwrap().finish_time(), Some(600));
        assert_eq!(race.status(), RaceStatus::Completed);
        assert!(race.cancel());
    }
    #[test]
    fn test_unfinish_after_finalization() {
        let (race, _, rx) = create_started_race(fast_config(), &[(1, "A")]);
        assert!(race.finish_racer(1));
        let (result, _) = wait_for_result(&rx);
        assert_eq!(result.status, RaceStatus::Finalized);
        assert!(!race.unfinish_racer(1));
        assert!(!race.cancel_finalization(true));
        assert!(race.racer(1).unwrap().is_finished());
    }
    #[test]
    fn test_unforfeit_cancels_finalization() {
        let mut config = fast_config();
        config.finalize_secs = 60;
        let (race, clock, rx) = create_started_race(config, &[(1, "A"), (2, "B")]);

        clock.advance_centis(300);
        assert!(race.forfeit_racer(2));
        assert_eq!(race.status(), RaceStatus::Completed);
        assert!(!race.unfinish_racer(2));
        assert!(race.unforfeit_racer(2));
        assert_eq!(race.status(), RaceStatus::Racing);
        assert!(race.racer(2).unwrap().is_racing());
        assert_eq!(race.racer(2).unwrap().finish_time(), None);
        assert!(drain_messages(&rx)
            .contains(&String::from("Race end cancelled -- unfinished racers may continue!")));
        assert!(race.cancel());
    }
    #[test]
    fn test_finish_after_finalization() {
        let (race, _, rx) = create_started_race(fast_config(), &[(1, "A"), (2, "B")]);
        assert!(race.finish_racer(1));
        let (result, _) = wait_for_result(&rx);
        assert_eq!(result.status, RaceStatus::Finalized);

        assert!(!race.finish_racer(2));
        assert!(!race.forfeit_racer(2));
        assert!(race.racer(2).unwrap().is_racing());
        assert_eq!(race.result(), result);
    }
    #[test]
    fn test_finish_after_cancel() {
        let (race, _, _rx) = create_started_race(fast_config(), &[(1, "A")]);
        assert!(race.cancel());
        assert!(!race.finish_racer(1));
        assert!(!race.forfeit_racer(1));
        assert_eq!(race.num_finished(), 0);
        assert!(race.racer(1).unwrap().is_racing());
    }

    // PAUSE ---------------------------------------------------------------------------------------
    #[test]
    fn test_pause_freezes_time() {
        let (race, clock, _rx) = create_started_race(fast_config(), &[(1, "A"), (2, "B")]);
        assert!(!race.unpause());

        clock.advance_centis(100);
        assert!(race.pause());
        assert!(!race.pause());
        assert!(race.is_paused());
        assert_eq!(race.status(), RaceStatus::Racing);
        assert_eq!(race.leaderboard().status_str, "Paused!");

        clock.advance_centis(500);
        assert_eq!(race.current_time(), Some(100));

        assert!(race.unpause());
        assert_eq!(race.current_time(), Some(100));
        clock.advance_centis(50);
        assert_eq!(race.current_time(), Some(150));
        assert!(race.finish_racer(1));
        assert_eq!(race.racer(1).unwrap().finish_time(), Some(150));
        assert!(race.cancel());
    }
    #[test]
    fn test_pause_before_start() {
        let (race, _, _rx) = create_race(slow_config());
        assert!(!race.pause());
        assert!(!race.unpause());
        assert_eq!(race.current_time(), None);
    }
    #[test]
    fn test_finish_while_paused() {
        let mut config = fast_config();
        config.finalize_secs = 60;
        let (race, clock, _rx) = create_started_race(config, &[(1, "A"), (2, "B")]);

        clock.advance_centis(100);
        assert!(race.pause());
        clock.advance_centis(400);
        assert!(race.finish_racer(1));
        assert_eq!(race.racer(1).unwrap().finish_time(), Some(100));
        assert_eq!(race.status(), RaceStatus::Completed);
        assert!(race.is_paused());

        // unpausing within the grace window continues from the pause instant
        assert!(race.unpause());
        clock.advance_centis(50);
        assert!(race.forfeit_racer(2));
        assert_eq!(race.racer(2).unwrap().finish_time(), Some(150));
        assert!(race.cancel());
    }
    #[test]
    fn test_cancel_clears_pause() {
        let (race, clock, _rx) = create_started_race(fast_config(), &[(1, "A")]);
        clock.advance_centis(100);
        assert!(race.pause());
        assert!(race.cancel());
        assert!(!race.is_paused());
        assert!(!race.unpause());
        assert_eq!(race.leaderboard().status_str, "Race cancelled.");
    }
    #[test]
    fn test_finalize_clears_pause() {
        let (race, clock, rx) = create_started_race(fast_config(), &[(1, "A")]);
        clock.advance_centis(100);
        assert!(race.pause());
        assert!(race.finish_racer(1));

        let (result, _) = wait_for_result(&rx);
        assert_eq!(result.status, RaceStatus::Finalized);
        assert_eq!(result.entries[0].finish_time, Some(100));
        assert!(!race.is_paused());
        assert!(!race.unpause());
    }

    // CANCEL --------------------------------------------------------------------------------------
    #[test]
    fn test_cancel_race() {
        let (race, _, rx) = create_started_race(fast_config(), &[(1, "A")]);
        drain_messages(&rx);
        assert!(race.cancel());
        assert_eq!(race.status(), RaceStatus::Cancelled);
        assert!(race.is_complete());
        assert!(!race.cancel());
        assert_eq!(drain_messages(&rx), vec!["The race has been cancelled."]);
        assert_eq!(race.current_time(), None);
    }
    #[test]
    fn test_cancel_during_countdown() {
        let (race, _, rx) = create_race(fast_config());
        assert!(race.enter_racer(&racer_pars(1, "A")));
        assert!(race.ready_racer(1));
        assert!(race.begin_race_countdown());
        assert!(race.cancel());

        sleep(Duration::from_millis(50));
        assert_eq!(race.status(), RaceStatus::Cancelled);
        assert!(race.racer(1).unwrap().is_ready());
        assert!(!drain_messages(&rx).contains(&String::from("GO!")));
    }
    #[test]
    fn test_cancel_during_finalization() {
        let (race, _, rx) = create_started_race(fast_config(), &[(1, "A")]);
        assert!(race.finish_racer(1));
        assert!(race.cancel());

        sleep(Duration::from_millis(50));
        assert_eq!(race.status(), RaceStatus::Cancelled);
        assert!(!rx
            .try_iter()
            .any(|event| matches!(event, RoomEvent::Finalized(_))));
    }
}
