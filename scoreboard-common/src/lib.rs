pub mod bundles;

pub mod clock;

pub mod config;

pub mod game_state;

pub mod protocol;

pub mod publisher;

pub mod side;

pub mod subscriber;

pub mod time_entry;

pub mod transport;

/// Wall clock time in milliseconds since the unix epoch
pub type EpochMillis = u64;

pub fn now_millis() -> EpochMillis {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    u64::try_from(nanos / 1_000_000).unwrap_or(0)
}
