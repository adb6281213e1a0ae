// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use serde::Deserialize;

use crate::error::{Error, ErrorKind};

mod general;
mod listener;
mod log;

pub use self::log::{Log, LogLevel};
pub use general::General;
pub use listener::{Listener, Protocol};

/// Server main config.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    general: General,

    #[serde(default = "Listener::default_listeners")]
    listeners: Vec<Listener>,

    #[serde(default)]
    log: Log,
}

impl Config {
    #[must_use]
    pub const fn general(&self) -> &General {
        &self.general
    }

    #[must_use]
    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    #[must_use]
    pub const fn log(&self) -> &Log {
        &self.log
    }

    /// Validate config.
    ///
    /// # Errors
    ///
    /// Returns error if some options in config are invalid.
    pub fn validate(&self) -> Result<(), Error> {
        if self.general.max_packet_size() < 16 {
            return Err(Error::new(
                ErrorKind::ConfigError,
                "max_packet_size is too small to fit any control packet",
            ));
        }
        if self.general.max_keepalive() == 0 {
            return Err(Error::new(
                ErrorKind::ConfigError,
                "max_keepalive must be greater than 0",
            ));
        }
        if self.general.max_inflight_messages() == 0 {
            return Err(Error::new(
                ErrorKind::ConfigError,
                "max_inflight_messages must be greater than 0",
            ));
        }
        if self.listeners.is_empty() {
            return Err(Error::new(
                ErrorKind::ConfigError,
                "at least one listener is required",
            ));
        }
        for listener in &self.listeners {
            if listener.protocol() == Protocol::Mqtts
                && (listener.cert_file().is_none() || listener.key_file().is_none())
            {
                return Err(Error::from_string(
                    ErrorKind::ConfigError,
                    format!(
                        "listener {}: mqtts requires cert_file and key_file",
                        listener.address()
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let config: Config = toml::from_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.listeners().len(), 1);
        assert_eq!(config.general().max_keepalive(), 600);
    }

    #[test]
    fn test_parse_listener_config() {
        const INPUT: &str = r#"
[general]
max_keepalive = 120
max_queued_messages = 16

[[listeners]]
protocol = "mqtt"
address = "127.0.0.1:2883"

[log]
log_level = "debug"
"#;
        let config: Config = toml::from_str(INPUT).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.general().max_keepalive(), 120);
        assert_eq!(config.general().max_queued_messages(), 16);
        assert_eq!(config.listeners()[0].address(), "127.0.0.1:2883");
        assert_eq!(config.log().log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_mqtts_requires_cert() {
        const INPUT: &str = r#"
[[listeners]]
protocol = "mqtts"
address = "127.0.0.1:8883"
"#;
        let config: Config = toml::from_str(INPUT).unwrap();
        assert!(config.validate().is_err());
    }
}
