//! Session configuration, read from an optional `session.toml`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::session::PlayerKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Who plays each side
    pub white: PlayerKind,
    pub black: PlayerKind,
    /// Pacing delay before a scheduled computer move fires, in ms
    pub think_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            white: PlayerKind::Human,
            black: PlayerKind::Computer,
            think_delay_ms: 250,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<SessionConfig, String> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| format!("Failed to read: {e}"))?;
        toml::from_str(&contents).map_err(|e| format!("Failed to parse: {e}"))
    }

    /// Loads the file when present, otherwise the defaults.
    pub fn load_or_default(path: &Path) -> SessionConfig {
        if path.exists() {
            match SessionConfig::load(path) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(%err, "ignoring unreadable session config");
                    SessionConfig::default()
                }
            }
        } else {
            SessionConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_config() {
        let config: SessionConfig =
            toml::from_str("white = \"computer\"\nblack = \"human\"\nthink_delay_ms = 50\n")
                .unwrap();
        assert_eq!(config.white, PlayerKind::Computer);
        assert_eq!(config.black, PlayerKind::Human);
        assert_eq!(config.think_delay_ms, 50);
    }

    #[test]
    fn defaults_pit_a_human_against_the_engine() {
        let config = SessionConfig::default();
        assert_eq!(config.white, PlayerKind::Human);
        assert_eq!(config.black, PlayerKind::Computer);
    }
}
