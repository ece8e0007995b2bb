use serde::{Deserialize, Serialize};
pub use scoreboard_common::config::Game;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub port: u16,
    /// Send the latest snapshot to each display as soon as it connects
    pub send_on_connect: bool,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            port: 8000,
            send_on_connect: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub game: Game,
    pub network: Network,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ser_network() {
        let n: Network = Default::default();
        let serialized = toml::to_string(&n).unwrap();
        let deser = toml::from_str(&serialized);
        assert_eq!(deser, Ok(n));
    }

    #[test]
    fn test_ser_config() {
        let config: Config = Default::default();
        let serialized = toml::to_string(&config).unwrap();
        let deser = toml::from_str(&serialized);
        assert_eq!(deser, Ok(config));
    }
}
