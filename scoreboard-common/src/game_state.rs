use crate::{bundles::HomeAwayBundle, clock::ClockState, config::Game, side::Side};
use derivative::Derivative;
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_ROUND: u32 = 1;

/// What the per-team number tracked next to the score means. Both kinds behave identically,
/// they only differ in label and starting value.
#[derive(Derivative, Serialize, Deserialize)]
#[derivative(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CounterKind {
    #[derivative(Default)]
    Fouls,
    Timeouts,
}

impl CounterKind {
    pub fn initial_value(self) -> u32 {
        match self {
            Self::Fouls => 0,
            Self::Timeouts => 7,
        }
    }
}

impl core::fmt::Display for CounterKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Self::Fouls => write!(f, "Fouls"),
            Self::Timeouts => write!(f, "Timeouts"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Sequence)]
pub enum VisibilityFlag {
    Scoreboard,
    Timer,
    Round,
}

impl core::fmt::Display for VisibilityFlag {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Self::Scoreboard => write!(f, "Scoreboard"),
            Self::Timer => write!(f, "Timer"),
            Self::Round => write!(f, "Round"),
        }
    }
}

/// A step applied to one of the clamped counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    Increment,
    Decrement,
    Reset,
}

impl Adjust {
    fn apply(self, value: u32, floor: u32) -> u32 {
        match self {
            Self::Increment => value.saturating_add(1),
            Self::Decrement => value.saturating_sub(1).max(floor),
            Self::Reset => floor,
        }
    }
}

/// The cosmetic identity of a team. Opaque to everything except the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub name: String,
    pub school: String,
    pub logo_ref: String,
    pub accent_color: String,
    pub display_class_hint: String,
}

impl TeamInfo {
    pub fn with_color(accent_color: &str) -> Self {
        Self {
            accent_color: accent_color.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamState {
    pub name: String,
    pub school: String,
    pub score: u32,
    pub secondary_counter: u32,
    pub logo_ref: String,
    pub accent_color: String,
    pub display_class_hint: String,
}

impl TeamState {
    pub fn new(info: &TeamInfo, secondary_counter: u32) -> Self {
        let mut team = Self {
            secondary_counter,
            ..Default::default()
        };
        team.set_info(info);
        team
    }

    pub fn set_info(&mut self, info: &TeamInfo) {
        self.name.clone_from(&info.name);
        self.school.clone_from(&info.school);
        self.logo_ref.clone_from(&info.logo_ref);
        self.accent_color.clone_from(&info.accent_color);
        self.display_class_hint.clone_from(&info.display_class_hint);
    }

    pub fn info(&self) -> TeamInfo {
        TeamInfo {
            name: self.name.clone(),
            school: self.school.clone(),
            logo_ref: self.logo_ref.clone(),
            accent_color: self.accent_color.clone(),
            display_class_hint: self.display_class_hint.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    #[serde(flatten)]
    pub teams: HomeAwayBundle<TeamState>,
    pub round: u32,
    pub clock: ClockState,
    pub show_scoreboard: bool,
    pub show_timer: bool,
    pub show_round: bool,
    #[serde(default)]
    pub secondary_counter_kind: CounterKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameStateError {
    #[error("The round must be at least {MIN_ROUND}, got {0}")]
    RoundOutOfRange(u32),
}

impl GameState {
    pub fn new(config: &Game) -> Self {
        let counter = config.counter_start();
        Self {
            teams: HomeAwayBundle::new(
                TeamState::new(&config.home, counter),
                TeamState::new(&config.away, counter),
            ),
            round: MIN_ROUND,
            clock: ClockState::new(config.period_length_secs),
            show_scoreboard: true,
            show_timer: true,
            show_round: true,
            secondary_counter_kind: config.counter,
        }
    }

    /// Checks the invariants the types can't express on their own
    pub fn validate(&self) -> Result<(), GameStateError> {
        if self.round < MIN_ROUND {
            return Err(GameStateError::RoundOutOfRange(self.round));
        }
        Ok(())
    }

    pub fn adjust_score(&mut self, side: Side, adjust: Adjust) {
        let team = &mut self.teams[side];
        team.score = adjust.apply(team.score, 0);
    }

    pub fn adjust_counter(&mut self, side: Side, adjust: Adjust) {
        let team = &mut self.teams[side];
        team.secondary_counter = adjust.apply(team.secondary_counter, 0);
    }

    pub fn adjust_round(&mut self, adjust: Adjust) {
        self.round = adjust.apply(self.round, MIN_ROUND);
    }

    /// Exchanges every per-team number. Names, logos and colors stay where they are.
    pub fn swap_sides(&mut self) {
        let HomeAwayBundle { home, away } = &mut self.teams;
        core::mem::swap(&mut home.score, &mut away.score);
        core::mem::swap(&mut home.secondary_counter, &mut away.secondary_counter);
    }

    pub fn is_visible(&self, flag: VisibilityFlag) -> bool {
        match flag {
            VisibilityFlag::Scoreboard => self.show_scoreboard,
            VisibilityFlag::Timer => self.show_timer,
            VisibilityFlag::Round => self.show_round,
        }
    }

    pub fn toggle(&mut self, flag: VisibilityFlag) {
        let value = match flag {
            VisibilityFlag::Scoreboard => &mut self.show_scoreboard,
            VisibilityFlag::Timer => &mut self.show_timer,
            VisibilityFlag::Round => &mut self.show_round,
        };
        *value = !*value;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use enum_iterator::all;

    fn state() -> GameState {
        GameState::new(&Game::default())
    }

    #[test]
    fn test_defaults() {
        let state = state();
        assert_eq!(state.round, 1);
        assert_eq!(state.clock, ClockState::new(600));
        assert_eq!(state.teams.home.accent_color, "#ff4655");
        assert_eq!(state.teams.away.accent_color, "#1b97d4");
        assert_eq!(state.teams.home.secondary_counter, 0);
        for flag in all::<VisibilityFlag>() {
            assert!(state.is_visible(flag));
        }
        assert_eq!(state.validate(), Ok(()));
    }

    #[test]
    fn test_timeouts_variant_start() {
        let config = Game {
            counter: CounterKind::Timeouts,
            ..Default::default()
        };
        let state = GameState::new(&config);
        assert_eq!(state.secondary_counter_kind, CounterKind::Timeouts);
        assert_eq!(state.teams.home.secondary_counter, 7);
        assert_eq!(state.teams.away.secondary_counter, 7);
    }

    #[test]
    fn test_adjust_clamps() {
        let mut state = state();
        state.adjust_score(Side::Home, Adjust::Decrement);
        assert_eq!(state.teams.home.score, 0);
        state.adjust_score(Side::Home, Adjust::Increment);
        state.adjust_score(Side::Home, Adjust::Increment);
        assert_eq!(state.teams.home.score, 2);
        state.adjust_score(Side::Home, Adjust::Reset);
        assert_eq!(state.teams.home.score, 0);

        state.adjust_counter(Side::Away, Adjust::Decrement);
        assert_eq!(state.teams.away.secondary_counter, 0);
        state.adjust_counter(Side::Away, Adjust::Increment);
        assert_eq!(state.teams.away.secondary_counter, 1);

        state.adjust_round(Adjust::Decrement);
        assert_eq!(state.round, 1);
        state.adjust_round(Adjust::Increment);
        state.adjust_round(Adjust::Increment);
        assert_eq!(state.round, 3);
        state.adjust_round(Adjust::Reset);
        assert_eq!(state.round, 1);
    }

    #[test]
    fn test_swap_exchanges_score_and_counter_together() {
        let mut state = state();
        state.teams.home.name = "Eagles".to_string();
        state.teams.home.score = 10;
        state.teams.home.secondary_counter = 2;
        state.teams.away.name = "Sharks".to_string();
        state.teams.away.score = 7;
        state.teams.away.secondary_counter = 3;

        state.swap_sides();

        assert_eq!(state.teams.home.score, 7);
        assert_eq!(state.teams.home.secondary_counter, 3);
        assert_eq!(state.teams.away.score, 10);
        assert_eq!(state.teams.away.secondary_counter, 2);
        assert_eq!(state.teams.home.name, "Eagles");
        assert_eq!(state.teams.away.name, "Sharks");
    }

    #[test]
    fn test_toggle() {
        let mut state = state();
        state.toggle(VisibilityFlag::Timer);
        assert!(!state.show_timer);
        assert!(state.show_scoreboard);
        assert!(state.show_round);
        state.toggle(VisibilityFlag::Timer);
        assert!(state.show_timer);
    }

    #[test]
    fn test_set_info_leaves_numbers() {
        let mut team = TeamState::new(&TeamInfo::with_color("#000000"), 4);
        team.score = 12;
        team.set_info(&TeamInfo {
            name: "Eagles".to_string(),
            school: "North High".to_string(),
            logo_ref: "https://example.com/eagles.png".to_string(),
            accent_color: "#123456".to_string(),
            display_class_hint: "bg-emerald-900".to_string(),
        });
        assert_eq!(team.score, 12);
        assert_eq!(team.secondary_counter, 4);
        assert_eq!(team.school, "North High");
        assert_eq!(team.accent_color, "#123456");
        assert_eq!(team.info().name, "Eagles");
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(state()).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "home",
            "away",
            "round",
            "clock",
            "showScoreboard",
            "showTimer",
            "showRound",
            "secondaryCounterKind",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
        let home = object["home"].as_object().unwrap();
        for key in [
            "name",
            "school",
            "score",
            "secondaryCounter",
            "logoRef",
            "accentColor",
            "displayClassHint",
        ] {
            assert!(home.contains_key(key), "missing home.{key}");
        }
    }

    #[test]
    fn test_round_trip() {
        let mut original = state();
        original.teams.home.score = 10;
        original.teams.away.secondary_counter = 3;
        original.round = 4;
        original.show_round = false;
        original.clock = ClockState::CountingDown {
            start_time: 1_700_000_000_000,
            remaining_at_start: 321,
        };
        let json = serde_json::to_string(&original).unwrap();
        let decoded: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_validate_round() {
        let mut state = state();
        state.round = 0;
        assert_eq!(state.validate(), Err(GameStateError::RoundOutOfRange(0)));
    }
}
