use crate::{config::Config, operator::parse_command, update_sender::UpdateSender};
use log::*;
use scoreboard_common::{
    EpochMillis,
    config::Game,
    now_millis,
    publisher::{Command, Publisher},
    time_entry::format_time,
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    select,
    time::{Duration, Sleep, sleep},
};

/// Runs one control session until operator input ends
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut publisher = Publisher::new(&config.game);
    publisher.attach(UpdateSender::new(
        config.network.port,
        config.network.send_on_connect,
    ));
    publisher.apply_command(Command::Rebroadcast, now_millis());
    println!("{}", summary(&publisher, now_millis()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let next_tick = NextTick::new(publisher.next_tick_at(now_millis()), now_millis());

        select! {
            _ = next_tick => {
                publisher.tick(now_millis());
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        let now = now_millis();
                        if handle_line(&mut publisher, &config.game, &line, now) {
                            println!("{}", summary(&publisher, now));
                        }
                    }
                    None => {
                        info!("Operator input closed, ending the session");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Returns true if the line was a command
fn handle_line(publisher: &mut Publisher, game: &Game, line: &str, now: EpochMillis) -> bool {
    if line.trim().is_empty() {
        return false;
    }
    match parse_command(line, game, publisher.state()) {
        Ok(command) => {
            publisher.apply_command(command, now);
            true
        }
        Err(e) => {
            warn!("Ignoring operator input {line:?}: {e}");
            false
        }
    }
}

fn summary(publisher: &Publisher, now: EpochMillis) -> String {
    let state = publisher.state();
    format!(
        "{} {} ({}) - ({}) {} {} | Round {} | {} {}",
        state.teams.home.name,
        state.teams.home.score,
        state.teams.home.secondary_counter,
        state.teams.away.secondary_counter,
        state.teams.away.score,
        state.teams.away.name,
        state.round,
        format_time(state.clock.remaining_at(now)),
        if state.clock.is_running() {
            "running"
        } else {
            "stopped"
        },
    )
}

enum NextTick {
    Never(core::future::Pending<()>),
    Time(Pin<Box<Sleep>>),
}

impl NextTick {
    fn new(at: Option<EpochMillis>, now: EpochMillis) -> Self {
        match at {
            Some(at) => Self::Time(Box::pin(sleep(Duration::from_millis(
                at.saturating_sub(now),
            )))),
            None => Self::Never(core::future::pending()),
        }
    }
}

impl Future for NextTick {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match *self {
            Self::Never(ref mut pend) => Pin::new(pend).poll(cx),
            Self::Time(ref mut slp) => slp.as_mut().poll(cx),
        }
    }
}
