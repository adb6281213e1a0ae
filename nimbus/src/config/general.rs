// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use serde::Deserialize;

/// Process wide limits.
#[derive(Debug, Clone, Deserialize)]
pub struct General {
    /// Largest control packet accepted or produced, in bytes.
    ///
    /// A CONNECT declaring a larger remaining length is dropped before its
    /// body is buffered.
    ///
    /// Default is 1 MiB.
    #[serde(default = "General::default_max_packet_size")]
    max_packet_size: usize,

    /// Upper bound for the client requested keep alive, in seconds.
    ///
    /// A client asking for more gets this value back in the
    /// server-keep-alive property of the CONNACK.
    ///
    /// Default is 600.
    #[serde(default = "General::default_max_keepalive")]
    max_keepalive: u16,

    /// Upper bound for the session expiry interval, in seconds.
    ///
    /// Default is 7200.
    #[serde(default = "General::default_session_expiry_cap")]
    session_expiry_cap: u32,

    /// Maximum number of unacknowledged QoS 1 publishes per session.
    ///
    /// Default is 32.
    #[serde(default = "General::default_max_inflight_messages")]
    max_inflight_messages: usize,

    /// Maximum number of QoS 1 publishes queued for an offline or slow
    /// session. The oldest message is dropped on overflow.
    ///
    /// Default is 1024.
    #[serde(default = "General::default_max_queued_messages")]
    max_queued_messages: usize,

    /// Maximum bytes buffered for a client that stops reading. Exceeding
    /// the cap closes the connection.
    ///
    /// Default is 256 KiB.
    #[serde(default = "General::default_max_write_buffer")]
    max_write_buffer: usize,

    /// Maximum number of subscriptions per session. 0 means unlimited.
    ///
    /// Default is 0.
    #[serde(default = "General::default_max_subscriptions")]
    max_subscriptions: usize,
}

impl General {
    const fn default_max_packet_size() -> usize {
        1024 * 1024
    }

    const fn default_max_keepalive() -> u16 {
        600
    }

    const fn default_session_expiry_cap() -> u32 {
        7200
    }

    const fn default_max_inflight_messages() -> usize {
        32
    }

    const fn default_max_queued_messages() -> usize {
        1024
    }

    const fn default_max_write_buffer() -> usize {
        256 * 1024
    }

    const fn default_max_subscriptions() -> usize {
        0
    }

    #[must_use]
    pub const fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    #[must_use]
    pub const fn max_keepalive(&self) -> u16 {
        self.max_keepalive
    }

    #[must_use]
    pub const fn session_expiry_cap(&self) -> u32 {
        self.session_expiry_cap
    }

    #[must_use]
    pub const fn max_inflight_messages(&self) -> usize {
        self.max_inflight_messages
    }

    #[must_use]
    pub const fn max_queued_messages(&self) -> usize {
        self.max_queued_messages
    }

    #[must_use]
    pub const fn max_write_buffer(&self) -> usize {
        self.max_write_buffer
    }

    #[must_use]
    pub const fn max_subscriptions(&self) -> usize {
        self.max_subscriptions
    }
}

impl Default for General {
    fn default() -> Self {
        Self {
            max_packet_size: Self::default_max_packet_size(),
            max_keepalive: Self::default_max_keepalive(),
            session_expiry_cap: Self::default_session_expiry_cap(),
            max_inflight_messages: Self::default_max_inflight_messages(),
            max_queued_messages: Self::default_max_queued_messages(),
            max_write_buffer: Self::default_max_write_buffer(),
            max_subscriptions: Self::default_max_subscriptions(),
        }
    }
}
