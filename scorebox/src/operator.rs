//! The operator's command line language.
//!
//! One command per line, keywords are case-insensitive:
//!
//! ```text
//! home|away score|counter +|-|reset
//! round +|-|reset
//! swap
//! toggle scoreboard|timer|round
//! start
//! pause
//! reset [MM:SS]
//! time MM:SS
//! home|away name|school|logo|color|class <text>
//! send
//! ```

use scoreboard_common::{
    config::Game,
    game_state::{Adjust, GameState, VisibilityFlag},
    publisher::Command,
    side::Side,
    time_entry::parse_time_entry,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),
    #[error("Missing {0}")]
    MissingArgument(&'static str),
    #[error("Unexpected argument: {0:?}")]
    BadArgument(String),
}

type Result<T> = std::result::Result<T, ParseError>;

/// Translates one line of operator input. `state` supplies the team details that a single
/// field edit leaves unchanged.
pub fn parse_command(line: &str, game: &Game, state: &GameState) -> Result<Command> {
    let line = line.trim();
    let (keyword, rest) = split_word(line);
    if keyword.is_empty() {
        return Err(ParseError::Empty);
    }

    match keyword.to_lowercase().as_str() {
        "home" => parse_team_command(Side::Home, rest, state),
        "away" => parse_team_command(Side::Away, rest, state),
        "round" => Ok(Command::Round(parse_adjust(only_word(rest, "an adjustment")?)?)),
        "swap" => no_arguments(rest, Command::Swap),
        "toggle" => {
            let flag = match only_word(rest, "a flag")?.to_lowercase().as_str() {
                "scoreboard" => VisibilityFlag::Scoreboard,
                "timer" => VisibilityFlag::Timer,
                "round" => VisibilityFlag::Round,
                other => return Err(ParseError::BadArgument(other.to_string())),
            };
            Ok(Command::Toggle(flag))
        }
        "start" => no_arguments(rest, Command::Start),
        "pause" | "stop" => no_arguments(rest, Command::Pause),
        "reset" => {
            if rest.is_empty() {
                Ok(Command::ResetClock(game.period_length_secs))
            } else {
                Ok(Command::ResetClock(parse_time_entry(rest)))
            }
        }
        "time" => {
            if rest.is_empty() {
                Err(ParseError::MissingArgument("a time"))
            } else {
                Ok(Command::SetRemaining(parse_time_entry(rest)))
            }
        }
        "send" => no_arguments(rest, Command::Rebroadcast),
        _ => Err(ParseError::UnknownCommand(keyword.to_string())),
    }
}

fn parse_team_command(side: Side, args: &str, state: &GameState) -> Result<Command> {
    let (field, value) = split_word(args);
    let field = field.to_lowercase();

    let mut info = state.teams[side].info();
    let target = match field.as_str() {
        "score" => {
            return Ok(Command::Score(
                side,
                parse_adjust(only_word(value, "an adjustment")?)?,
            ));
        }
        "counter" | "fouls" | "timeouts" => {
            return Ok(Command::Counter(
                side,
                parse_adjust(only_word(value, "an adjustment")?)?,
            ));
        }
        "name" => &mut info.name,
        "school" => &mut info.school,
        "logo" => &mut info.logo_ref,
        "color" | "colour" => &mut info.accent_color,
        "class" => &mut info.display_class_hint,
        "" => return Err(ParseError::MissingArgument("a team field")),
        _ => return Err(ParseError::BadArgument(field.clone())),
    };
    *target = value.to_string();

    Ok(Command::SetTeamInfo(side, info))
}

fn parse_adjust(word: &str) -> Result<Adjust> {
    match word.to_lowercase().as_str() {
        "+" | "up" => Ok(Adjust::Increment),
        "-" | "down" => Ok(Adjust::Decrement),
        "reset" => Ok(Adjust::Reset),
        other => Err(ParseError::BadArgument(other.to_string())),
    }
}

fn split_word(input: &str) -> (&str, &str) {
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

fn only_word<'a>(input: &'a str, what: &'static str) -> Result<&'a str> {
    let (word, rest) = split_word(input);
    if word.is_empty() {
        Err(ParseError::MissingArgument(what))
    } else if !rest.is_empty() {
        Err(ParseError::BadArgument(rest.to_string()))
    } else {
        Ok(word)
    }
}

fn no_arguments(rest: &str, command: Command) -> Result<Command> {
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(ParseError::BadArgument(rest.to_string()))
    }
}
