// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Binding protocol types.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Raw Mqtt protocol, in TCP.
    #[serde(alias = "mqtt")]
    Mqtt,

    /// Raw Mqtt protocol, in TCP with TLS encryption.
    #[serde(alias = "mqtts")]
    Mqtts,
}

/// Listener represents a unique ip/port combination and mqtt connection
/// protocol.
#[derive(Debug, Deserialize, Clone)]
pub struct Listener {
    /// Binding protocol.
    ///
    /// Default is mqtt.
    #[serde(default = "Listener::default_protocol")]
    protocol: Protocol,

    /// Binding address, including domain name and port.
    ///
    /// Common addresses are:
    /// - 0.0.0.0:1883, for mqtt
    /// - 0.0.0.0:8883, for mqtts
    ///
    /// Default is 127.0.0.1:1883
    #[serde(default = "Listener::default_address")]
    address: String,

    /// Path to TLS cert file.
    ///
    /// Default is None.
    #[serde(default)]
    cert_file: Option<PathBuf>,

    /// Path to TLS private key file.
    ///
    /// Default is None.
    #[serde(default)]
    key_file: Option<PathBuf>,

    /// Seconds a connection may stay idle before its CONNECT packet
    /// arrives. 0 disables the timeout.
    ///
    /// Default is 10.
    #[serde(default = "Listener::default_connect_timeout")]
    connect_timeout: u64,

    /// Whether clients connecting with a zero length client id get a
    /// server assigned one. With this off such clients are rejected.
    ///
    /// Default is true.
    #[serde(default = "Listener::default_allow_empty_client_id")]
    allow_empty_client_id: bool,
}

impl Listener {
    const fn default_protocol() -> Protocol {
        Protocol::Mqtt
    }

    fn default_address() -> String {
        "127.0.0.1:1883".to_owned()
    }

    const fn default_connect_timeout() -> u64 {
        10
    }

    const fn default_allow_empty_client_id() -> bool {
        true
    }

    #[must_use]
    pub fn default_listeners() -> Vec<Self> {
        vec![Self::default()]
    }

    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn cert_file(&self) -> Option<&Path> {
        self.cert_file.as_deref()
    }

    #[must_use]
    pub fn key_file(&self) -> Option<&Path> {
        self.key_file.as_deref()
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> u64 {
        self.connect_timeout
    }

    #[must_use]
    pub const fn allow_empty_client_id(&self) -> bool {
        self.allow_empty_client_id
    }
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            protocol: Self::default_protocol(),
            address: Self::default_address(),
            cert_file: None,
            key_file: None,
            connect_timeout: Self::default_connect_timeout(),
            allow_empty_client_id: Self::default_allow_empty_client_id(),
        }
    }
}
