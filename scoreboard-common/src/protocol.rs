//! Frames exchanged between the control surface and the displays.
//!
//! Every frame carries a complete snapshot, so a display that missed any number of frames is
//! fully caught up by the next one it receives.

use crate::game_state::{GameState, GameStateError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum Message {
    Score(GameState),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Invalid snapshot: {0}")]
    Invalid(#[from] GameStateError),
}

pub fn encode(state: &GameState) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(&Message::Score(state.clone()))?)
}

pub fn decode(frame: &str) -> Result<GameState, SnapshotError> {
    let Message::Score(state) = serde_json::from_str::<Message>(frame.trim_end())?;
    state.validate()?;
    Ok(state)
}
