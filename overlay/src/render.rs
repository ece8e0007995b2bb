use scoreboard_common::{
    game_state::{GameState, TeamState},
    subscriber::View,
    time_entry::format_time,
};

const WIDTH: usize = 40;

/// Draws the scoreboard as plain text. A hidden scoreboard draws nothing.
pub fn render(view: View<'_>, stale: bool) -> String {
    let state = match view {
        View::Waiting => return center("Waiting for the scoreboard..."),
        View::Hidden => return String::new(),
        View::Visible(state) => state,
    };

    let mut lines: Vec<String> = state
        .teams
        .iter()
        .map(|(_, team)| team_line(team, state))
        .collect();

    let mut footer = vec![];
    if state.show_round {
        footer.push(format!("Round {}", state.round));
    }
    if state.show_timer {
        footer.push(format_time(state.clock.recorded_secs()));
    }
    if !footer.is_empty() {
        lines.push(center(&footer.join("   ")));
    }
    if stale {
        lines.push(center("(reconnecting)"));
    }

    lines.join("\n")
}

fn team_line(team: &TeamState, state: &GameState) -> String {
    let name = if team.school.is_empty() {
        team.name.clone()
    } else {
        format!("{} ({})", team.name, team.school)
    };
    let counter = format!("{} {}", state.secondary_counter_kind, team.secondary_counter);
    let width = WIDTH.saturating_sub(counter.len() + 6);
    format!("{name:<width$} {:>4}  {counter}", team.score)
}

fn center(text: &str) -> String {
    format!("{text:^WIDTH$}").trim_end().to_string()
}
