use crate::game_state::{CounterKind, TeamInfo};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// The time the clock is set to at the start of a session and by a plain reset
    pub period_length_secs: u32,
    pub counter: CounterKind,
    /// Overrides the starting value that comes with `counter`
    pub counter_start: Option<u32>,
    pub home: TeamInfo,
    pub away: TeamInfo,
}

impl Default for Game {
    fn default() -> Self {
        Self {
            period_length_secs: 600,
            counter: CounterKind::Fouls,
            counter_start: None,
            home: TeamInfo::with_color("#ff4655"),
            away: TeamInfo::with_color("#1b97d4"),
        }
    }
}

impl Game {
    pub fn counter_start(&self) -> u32 {
        self.counter_start
            .unwrap_or_else(|| self.counter.initial_value())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_ser_game() {
        let game: Game = Default::default();
        let serialized = toml::to_string(&game).unwrap();
        let deser = toml::from_str(&serialized);
        assert_eq!(deser, Ok(game));
    }

    #[test]
    fn test_deser_timeouts_variant() {
        let file = indoc!(
            r##"
            period_length_secs = 720
            counter = "timeouts"

            [home]
            name = "Home"
            school = "School"
            logo_ref = ""
            accent_color = "#ff4655"
            display_class_hint = ""

            [away]
            name = "Away"
            school = "School"
            logo_ref = ""
            accent_color = "#1b97d4"
            display_class_hint = ""
            "##
        );
        let game: Game = toml::from_str(file).unwrap();
        assert_eq!(game.period_length_secs, 720);
        assert_eq!(game.counter, CounterKind::Timeouts);
        assert_eq!(game.counter_start(), 7);
        assert_eq!(game.home.name, "Home");
    }

    #[test]
    fn test_counter_start_override() {
        let game = Game {
            counter: CounterKind::Timeouts,
            counter_start: Some(5),
            ..Default::default()
        };
        assert_eq!(game.counter_start(), 5);
    }
}
