use crate::{
    EpochMillis,
    config::Game,
    game_state::{Adjust, GameState, TeamInfo, VisibilityFlag},
    protocol,
    side::Side,
    time_entry::format_time,
    transport::PublishChannel,
};
use log::*;

pub type ChangeCallback = Box<dyn FnMut(&GameState)>;

/// Everything the operator can do to a game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Score(Side, Adjust),
    Counter(Side, Adjust),
    Round(Adjust),
    Swap,
    Toggle(VisibilityFlag),
    Start,
    Pause,
    ResetClock(u32),
    SetRemaining(u32),
    SetTeamInfo(Side, TeamInfo),
    /// Sends the current state again without changing it
    Rebroadcast,
}

/// The single authoritative owner of a game's state for one control session.
///
/// Applying a command and broadcasting the result are separate steps. `apply_command` does
/// both, `tick` broadcasts while the clock runs.
pub struct Publisher {
    state: GameState,
    listeners: Vec<ChangeCallback>,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Publisher {
    pub fn new(config: &Game) -> Self {
        Self {
            state: GameState::new(config),
            listeners: vec![],
        }
    }

    /// The live state. The clock inside it may have an anchor from long ago, use `snapshot` to
    /// get what would be sent.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn on_change(&mut self, callback: ChangeCallback) {
        self.listeners.push(callback);
    }

    /// Sends every snapshot to `channel` as an encoded frame
    pub fn attach<P: PublishChannel + 'static>(&mut self, mut channel: P) {
        self.on_change(Box::new(move |state: &GameState| {
            match protocol::encode(state) {
                Ok(frame) => {
                    if let Err(e) = channel.publish(&frame) {
                        warn!("Failed to publish snapshot: {e}");
                    }
                }
                Err(e) => error!("Failed to encode snapshot: {e}"),
            }
        }));
    }

    pub fn snapshot(&self, now: EpochMillis) -> GameState {
        let mut snapshot = self.state.clone();
        snapshot.clock = snapshot.clock.rebased(now);
        snapshot
    }

    pub fn broadcast(&mut self, now: EpochMillis) {
        let snapshot = self.snapshot(now);
        trace!("{} Broadcasting snapshot", self.status_string(now));
        for listener in self.listeners.iter_mut() {
            listener(&snapshot);
        }
    }

    /// Applies `command` and broadcasts the resulting state
    pub fn apply_command(&mut self, command: Command, now: EpochMillis) {
        self.apply(command, now);
        self.broadcast(now);
    }

    /// Applies `command` without broadcasting. Returns true if the state changed.
    pub fn apply(&mut self, command: Command, now: EpochMillis) -> bool {
        let before = self.state.clone();
        // A clock that ran out since the last tick must stop before anything acts on it
        self.state.clock.tick(now);

        match command {
            Command::Score(side, adjust) => {
                self.state.adjust_score(side, adjust);
                info!(
                    "{} {side} score {adjust:?}, now {}",
                    self.status_string(now),
                    self.state.teams[side].score
                );
            }
            Command::Counter(side, adjust) => {
                self.state.adjust_counter(side, adjust);
                info!(
                    "{} {side} {} {adjust:?}, now {}",
                    self.status_string(now),
                    self.state.secondary_counter_kind,
                    self.state.teams[side].secondary_counter
                );
            }
            Command::Round(adjust) => {
                self.state.adjust_round(adjust);
                info!("{} Round {adjust:?}", self.status_string(now));
            }
            Command::Swap => {
                self.state.swap_sides();
                info!("{} Swapped sides", self.status_string(now));
            }
            Command::Toggle(flag) => {
                self.state.toggle(flag);
                info!(
                    "{} {flag} is now {}",
                    self.status_string(now),
                    if self.state.is_visible(flag) {
                        "shown"
                    } else {
                        "hidden"
                    }
                );
            }
            Command::Start => {
                if self.state.clock.start(now) {
                    info!("{} Starting the clock", self.status_string(now));
                } else {
                    debug!("{} Clock not started", self.status_string(now));
                }
            }
            Command::Pause => {
                if self.state.clock.pause(now) {
                    info!("{} Stopped the clock", self.status_string(now));
                } else {
                    debug!("{} Clock already stopped", self.status_string(now));
                }
            }
            Command::ResetClock(secs) => {
                self.state.clock.reset(secs);
                info!("{} Reset the clock", self.status_string(now));
            }
            Command::SetRemaining(secs) => {
                self.state.clock.set_remaining(secs, now);
                info!("{} Set the clock", self.status_string(now));
            }
            Command::SetTeamInfo(side, info) => {
                self.state.teams[side].set_info(&info);
                info!("{} Updated {side} team info", self.status_string(now));
            }
            Command::Rebroadcast => {
                debug!("{} Rebroadcast requested", self.status_string(now));
            }
        }

        self.state != before
    }

    /// Settles the clock at `now` and broadcasts if it was running. Returns true if a snapshot
    /// was sent.
    pub fn tick(&mut self, now: EpochMillis) -> bool {
        if !self.state.clock.is_running() {
            return false;
        }
        self.state.clock.tick(now);
        self.broadcast(now);
        true
    }

    /// When the next `tick` should happen, if the clock is running
    pub fn next_tick_at(&self, now: EpochMillis) -> Option<EpochMillis> {
        self.state.clock.next_change_at(now)
    }

    fn status_string(&self, now: EpochMillis) -> String {
        let clock = &self.state.clock;
        format!(
            "[{:>5} {} R{} {}-{}]",
            format_time(clock.remaining_at(now)),
            if clock.is_running() { "RUN" } else { "STP" },
            self.state.round,
            self.state.teams.home.score,
            self.state.teams.away.score,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        clock::ClockState,
        game_state::MIN_ROUND,
        subscriber::Subscriber,
        transport::LocalChannel,
    };
    use enum_iterator::all;
    use proptest::prelude::*;
    use std::{cell::RefCell, rc::Rc, sync::Once};

    static INIT: Once = Once::new();

    pub fn initialize() {
        INIT.call_once(|| {
            env_logger::init();
        });
    }

    const START: EpochMillis = 1_700_000_000_000;

    fn recorder(publisher: &mut Publisher) -> Rc<RefCell<Vec<GameState>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        publisher.on_change(Box::new(move |state: &GameState| {
            sink.borrow_mut().push(state.clone())
        }));
        seen
    }

    #[test]
    fn test_every_command_broadcasts() {
        initialize();
        let mut publisher = Publisher::new(&Game::default());
        let seen = recorder(&mut publisher);

        publisher.apply_command(Command::Score(Side::Home, Adjust::Increment), START);
        publisher.apply_command(Command::Score(Side::Home, Adjust::Decrement), START);
        publisher.apply_command(Command::Score(Side::Home, Adjust::Decrement), START);
        publisher.apply_command(Command::Rebroadcast, START);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].teams.home.score, 1);
        assert_eq!(seen[1].teams.home.score, 0);
        assert_eq!(seen[2].teams.home.score, 0);
        assert_eq!(seen[3], *publisher.state());
    }

    #[test]
    fn test_apply_reports_changes() {
        initialize();
        let mut publisher = Publisher::new(&Game::default());
        let seen = recorder(&mut publisher);

        assert!(publisher.apply(Command::Round(Adjust::Increment), START));
        assert!(!publisher.apply(Command::Pause, START));
        assert!(!publisher.apply(Command::Rebroadcast, START));
        assert!(publisher.apply(Command::Toggle(VisibilityFlag::Round), START));
        assert!(seen.borrow().is_empty());

        publisher.broadcast(START);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].round, 2);
        assert!(!seen.borrow()[0].show_round);
    }

    #[test]
    fn test_set_team_info() {
        initialize();
        let mut publisher = Publisher::new(&Game::default());
        publisher.apply_command(Command::Score(Side::Away, Adjust::Increment), START);
        publisher.apply_command(
            Command::SetTeamInfo(
                Side::Away,
                TeamInfo {
                    name: "Sharks".to_string(),
                    school: "South High".to_string(),
                    accent_color: "#00ff00".to_string(),
                    ..Default::default()
                },
            ),
            START,
        );
        let away = &publisher.state().teams.away;
        assert_eq!(away.name, "Sharks");
        assert_eq!(away.accent_color, "#00ff00");
        assert_eq!(away.score, 1);
        assert_eq!(publisher.state().teams.home.accent_color, "#ff4655");
    }

    #[test]
    fn test_tick_only_broadcasts_while_running() {
        initialize();
        let mut publisher = Publisher::new(&Game {
            period_length_secs: 2,
            ..Default::default()
        });
        let seen = recorder(&mut publisher);

        assert!(!publisher.tick(START));
        assert_eq!(publisher.next_tick_at(START), None);

        publisher.apply_command(Command::Start, START);
        assert_eq!(publisher.next_tick_at(START), Some(START + 1_000));
        assert!(publisher.tick(START + 1_000));
        assert!(publisher.tick(START + 2_000));
        assert!(!publisher.tick(START + 3_000));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1].clock.remaining_at(START + 1_000), 1);
        assert_eq!(seen[2].clock, ClockState::Stopped { remaining_secs: 0 });
    }

    #[test]
    fn test_command_after_expiry_sees_stopped_clock() {
        initialize();
        let mut publisher = Publisher::new(&Game {
            period_length_secs: 5,
            ..Default::default()
        });
        publisher.apply_command(Command::Start, START);
        publisher.apply_command(Command::SetRemaining(30), START + 60_000);
        assert_eq!(
            publisher.state().clock,
            ClockState::Stopped { remaining_secs: 30 }
        );
    }

    #[test]
    fn test_expiry_before_a_command_counts_as_a_change() {
        initialize();
        let mut publisher = Publisher::new(&Game {
            period_length_secs: 5,
            ..Default::default()
        });
        publisher.apply(Command::Start, START);
        assert!(publisher.apply(Command::Pause, START + 60_000));
        assert_eq!(
            publisher.state().clock,
            ClockState::Stopped { remaining_secs: 0 }
        );
        assert!(!publisher.apply(Command::Pause, START + 61_000));
    }

    #[test]
    fn test_snapshot_is_rebased() {
        initialize();
        let mut publisher = Publisher::new(&Game::default());
        publisher.apply_command(Command::Start, START);
        let now = START + 15_250;
        assert_eq!(
            publisher.snapshot(now).clock,
            ClockState::CountingDown {
                start_time: START + 15_000,
                remaining_at_start: 585,
            }
        );
        assert_eq!(publisher.state().clock.anchor(), Some(START));
    }

    #[test]
    fn test_two_subscribers_see_paused_clock() {
        initialize();
        let mut channel = LocalChannel::new();
        let mut first_endpoint = channel.endpoint();
        let mut second_endpoint = channel.endpoint();
        let (first, _) = Subscriber::attach(&mut first_endpoint);
        let (second, _) = Subscriber::attach(&mut second_endpoint);
        first_endpoint.connect();
        second_endpoint.connect();

        let mut publisher = Publisher::new(&Game::default());
        publisher.attach(channel.clone());
        assert_eq!(publisher.state().clock.remaining_at(START), 600);

        publisher.apply_command(Command::Start, START);
        publisher.apply_command(Command::Pause, START + 15_000);
        assert_eq!(
            publisher.state().clock,
            ClockState::Stopped { remaining_secs: 585 }
        );

        for subscriber in [first, second] {
            let subscriber = subscriber.borrow();
            let latest = subscriber.latest().unwrap();
            assert_eq!(latest.clock, ClockState::Stopped { remaining_secs: 585 });
            assert!(!latest.clock.is_running());
        }
    }

    #[test]
    fn test_reconnected_subscriber_heals_on_next_broadcast() {
        initialize();
        let mut channel = LocalChannel::new();
        let mut endpoint = channel.endpoint();
        let (subscriber, _) = Subscriber::attach(&mut endpoint);
        let mut publisher = Publisher::new(&Game::default());
        publisher.attach(channel.clone());

        publisher.apply_command(Command::Score(Side::Home, Adjust::Increment), START);
        assert_eq!(subscriber.borrow().latest(), None);

        endpoint.connect();
        publisher.apply_command(Command::Score(Side::Home, Adjust::Increment), START);
        publisher.apply_command(Command::Start, START);

        endpoint.disconnect();
        publisher.apply_command(Command::Score(Side::Away, Adjust::Increment), START + 500);
        publisher.tick(START + 1_000);
        assert_eq!(subscriber.borrow().latest().unwrap().teams.away.score, 0);

        endpoint.connect();
        publisher.tick(START + 2_000);
        let subscriber = subscriber.borrow();
        let latest = subscriber.latest().unwrap();
        assert_eq!(latest.teams.home.score, 2);
        assert_eq!(latest.teams.away.score, 1);
        assert_eq!(latest.clock.remaining_at(START + 2_000), 598);
    }

    fn any_side() -> impl Strategy<Value = Side> {
        prop_oneof![Just(Side::Home), Just(Side::Away)]
    }

    fn any_adjust() -> impl Strategy<Value = Adjust> {
        prop_oneof![
            3 => Just(Adjust::Decrement),
            2 => Just(Adjust::Increment),
            1 => Just(Adjust::Reset),
        ]
    }

    fn any_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            (any_side(), any_adjust()).prop_map(|(side, adjust)| Command::Score(side, adjust)),
            (any_side(), any_adjust()).prop_map(|(side, adjust)| Command::Counter(side, adjust)),
            any_adjust().prop_map(Command::Round),
            Just(Command::Swap),
            Just(Command::Start),
            Just(Command::Pause),
            (0u32..1_000).prop_map(Command::SetRemaining),
        ]
    }

    proptest! {
        #[test]
        fn test_counts_never_go_below_floor(
            commands in prop::collection::vec((any_command(), 0u64..5_000), 0..200)
        ) {
            let mut publisher = Publisher::new(&Game::default());
            let mut scores = [0u32; 2];
            let mut counters = [0u32; 2];
            let mut round = MIN_ROUND;
            let index = |side: Side| match side {
                Side::Home => 0,
                Side::Away => 1,
            };
            let step = |value: u32, adjust: Adjust, floor: u32| match adjust {
                Adjust::Increment => value + 1,
                Adjust::Decrement => if value > floor { value - 1 } else { floor },
                Adjust::Reset => floor,
            };

            let mut now = START;
            for (command, delay) in commands {
                now += delay;
                match &command {
                    Command::Score(side, adjust) => {
                        scores[index(*side)] = step(scores[index(*side)], *adjust, 0)
                    }
                    Command::Counter(side, adjust) => {
                        counters[index(*side)] = step(counters[index(*side)], *adjust, 0)
                    }
                    Command::Round(adjust) => round = step(round, *adjust, MIN_ROUND),
                    Command::Swap => {
                        scores.swap(0, 1);
                        counters.swap(0, 1);
                    }
                    _ => {}
                }
                publisher.apply_command(command, now);

                let state = publisher.snapshot(now);
                prop_assert!(state.validate().is_ok());
                prop_assert!(state.round >= MIN_ROUND);
                prop_assert_eq!(state.round, round);
                for side in all::<Side>() {
                    prop_assert_eq!(state.teams[side].score, scores[index(side)]);
                    prop_assert_eq!(state.teams[side].secondary_counter, counters[index(side)]);
                }
                if state.clock.is_running() {
                    prop_assert!(state.clock.remaining_at(now) > 0);
                }
            }
        }
    }
}
