//! Group configuration.
//!
//! A [`GroupConfig`] fixes the number of ranks in a [`World`](crate::World)
//! and the optional receive timeout that turns a stalled exchange into an
//! error instead of a hang.
//!
//! # Environment Variables
//!
//! | Setting | Variable | Default |
//! |---------|----------|---------|
//! | `size` | `FERROPAR_NPROCS` | `1` |
//! | `recv_timeout` | `FERROPAR_RECV_TIMEOUT_MS` | none (block forever) |

use crate::error::{Error, Result};
use std::env;
use std::time::Duration;

/// Environment variable holding the group size.
pub const NPROCS_VAR: &str = "FERROPAR_NPROCS";

/// Environment variable holding the receive timeout in milliseconds.
pub const RECV_TIMEOUT_VAR: &str = "FERROPAR_RECV_TIMEOUT_MS";

/// Configuration of an SPMD group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupConfig {
    /// Number of ranks.
    pub size: i32,
    /// Upper bound on how long a single receive may block.
    pub recv_timeout: Option<Duration>,
}

impl GroupConfig {
    /// Configuration for `size` ranks with no receive timeout.
    pub fn new(size: i32) -> Self {
        GroupConfig {
            size,
            recv_timeout: None,
        }
    }

    /// Set the receive timeout.
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = Some(timeout);
        self
    }

    /// Read the configuration from `FERROPAR_NPROCS` and `FERROPAR_RECV_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let size = match lookup(NPROCS_VAR) {
            Some(s) => s
                .trim()
                .parse::<i32>()
                .map_err(|_| Error::InvalidConfig(format!("{NPROCS_VAR}={s}")))?,
            None => 1,
        };

        let recv_timeout = match lookup(RECV_TIMEOUT_VAR) {
            Some(s) => {
                let ms = s
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| Error::InvalidConfig(format!("{RECV_TIMEOUT_VAR}={s}")))?;
                Some(Duration::from_millis(ms))
            }
            None => None,
        };

        let config = GroupConfig { size, recv_timeout };
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration describes a usable group.
    pub fn validate(&self) -> Result<()> {
        if self.size < 1 {
            return Err(Error::InvalidGroupSize(self.size));
        }
        Ok(())
    }
}

impl Default for GroupConfig {
    fn default() -> Self {
        GroupConfig::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = GroupConfig::from_lookup(lookup_in(&[])).unwrap();
        assert_eq!(config, GroupConfig::default());
    }

    #[test]
    fn parses_size_and_timeout() {
        let config = GroupConfig::from_lookup(lookup_in(&[
            (NPROCS_VAR, " 4 "),
            (RECV_TIMEOUT_VAR, "250"),
        ]))
        .unwrap();
        assert_eq!(config.size, 4);
        assert_eq!(config.recv_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn rejects_malformed_values() {
        let err = GroupConfig::from_lookup(lookup_in(&[(NPROCS_VAR, "four")])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(err.to_string().contains("FERROPAR_NPROCS"), "got: {err}");

        let err = GroupConfig::from_lookup(lookup_in(&[(RECV_TIMEOUT_VAR, "-1")])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn rejects_empty_group() {
        let err = GroupConfig::from_lookup(lookup_in(&[(NPROCS_VAR, "0")])).unwrap_err();
        assert_eq!(err, Error::InvalidGroupSize(0));
        assert!(err.is_configuration());
    }

    #[test]
    fn builder_sets_timeout() {
        let config = GroupConfig::new(3).with_recv_timeout(Duration::from_secs(1));
        assert_eq!(config.size, 3);
        assert_eq!(config.recv_timeout, Some(Duration::from_secs(1)));
        assert!(config.validate().is_ok());
    }
}
