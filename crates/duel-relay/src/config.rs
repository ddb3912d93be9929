//! Server settings and how they are read from the environment.

use std::fmt;
use std::str::FromStr;

use duel_relay_transport::DEFAULT_PATH;

use crate::RelayError;

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 8080;

/// Frames a connection may have queued before new ones are dropped.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// What the server does with the frames it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayMode {
    /// Pair players into named rooms and relay between opponents.
    #[default]
    Rooms,
    /// Send every frame straight back to its sender. A connectivity
    /// smoke test with no rooms at all.
    Echo,
}

impl FromStr for RelayMode {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rooms" => Ok(Self::Rooms),
            "echo" => Ok(Self::Echo),
            other => Err(RelayError::Config(format!(
                "RELAY_MODE must be \"rooms\" or \"echo\", got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for RelayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rooms => write!(f, "rooms"),
            Self::Echo => write!(f, "echo"),
        }
    }
}

/// Everything needed to start a [`RelayServer`](crate::RelayServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind_addr: String,
    /// HTTP path WebSocket upgrades are accepted on.
    pub path: String,
    /// Capacity of each connection's outbound queue.
    pub outbound_capacity: usize,
    /// Rooms or echo.
    pub mode: RelayMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            path: DEFAULT_PATH.to_string(),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            mode: RelayMode::default(),
        }
    }
}

impl ServerConfig {
    /// Reads `PORT` and `RELAY_MODE` from the process environment.
    ///
    /// Unset variables fall back to the defaults; set but unparsable ones
    /// are an error.
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a caller-supplied lookup.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, RelayError> {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT").filter(|p| !p.trim().is_empty()) {
            let port: u16 = port.trim().parse().map_err(|_| {
                RelayError::Config(format!("PORT must be a port number, got {port:?}"))
            })?;
            config.bind_addr = format!("0.0.0.0:{port}");
        }

        if let Some(mode) = lookup("RELAY_MODE") {
            config.mode = mode.parse()?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_is_empty() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.path, "/ws");
        assert_eq!(config.mode, RelayMode::Rooms);
    }

    #[test]
    fn test_port_from_env() {
        let config =
            ServerConfig::from_lookup(lookup(&[("PORT", "10000")])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:10000");
    }

    #[test]
    fn test_blank_port_uses_default() {
        let config = ServerConfig::from_lookup(lookup(&[("PORT", "")])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let result = ServerConfig::from_lookup(lookup(&[("PORT", "http")]));
        assert!(matches!(result, Err(RelayError::Config(_))));
    }

    #[test]
    fn test_echo_mode_from_env() {
        let config =
            ServerConfig::from_lookup(lookup(&[("RELAY_MODE", "Echo")])).unwrap();
        assert_eq!(config.mode, RelayMode::Echo);
        assert_eq!(config.mode.to_string(), "echo");
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let result =
            ServerConfig::from_lookup(lookup(&[("RELAY_MODE", "lobby")]));
        assert!(matches!(result, Err(RelayError::Config(_))));
    }
}
