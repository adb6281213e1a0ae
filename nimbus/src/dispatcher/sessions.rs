// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Per client-id session state and the process wide registry.

use codec::{PacketId, PublishPacket, SubscribeOptions, TopicFilter};
use std::collections::{HashMap, VecDeque};
use tokio::time::{Duration, Instant};

use crate::types::{ChannelGid, SESSION_EXPIRY_NEVER};

/// One subscription as stored in a session.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub filter: TopicFilter,
    pub options: SubscribeOptions,
    pub subscription_id: Option<usize>,
}

/// State attached to a client identifier.
///
/// A session outlives its connection while the session expiry interval
/// permits; the channel reference is the `gid`, cleared when the
/// connection goes away.
#[derive(Debug)]
pub struct Session {
    client_id: String,

    /// Current live connection, None while offline.
    gid: Option<ChannelGid>,

    /// Seconds the session survives after disconnect. 0 destroys it at
    /// once, `SESSION_EXPIRY_NEVER` keeps it forever.
    expiry_interval: u32,

    /// Destruction deadline, set while offline.
    expire_at: Option<Instant>,

    /// Keyed by the full original filter string, share prefix included.
    subscriptions: HashMap<String, Subscription>,

    /// QoS 1 publishes waiting for a free in-flight slot or for the
    /// session to reconnect. Packets here carry no packet id yet.
    pending: VecDeque<PublishPacket>,

    /// QoS 1 publishes on the wire, awaiting PUBACK, in send order.
    inflight: Vec<(PacketId, PublishPacket)>,

    /// Wrapping allocator state for outbound packet ids.
    next_packet_id: u16,

    /// Messages dropped due to the queue bound.
    dropped: u64,
}

impl Session {
    #[must_use]
    pub fn new(client_id: &str, gid: ChannelGid, expiry_interval: u32) -> Self {
        Self {
            client_id: client_id.to_owned(),
            gid: Some(gid),
            expiry_interval,
            expire_at: None,
            subscriptions: HashMap::new(),
            pending: VecDeque::new(),
            inflight: Vec::new(),
            next_packet_id: 1,
            dropped: 0,
        }
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub const fn gid(&self) -> Option<ChannelGid> {
        self.gid
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.gid.is_some()
    }

    pub fn set_expiry_interval(&mut self, expiry_interval: u32) {
        self.expiry_interval = expiry_interval;
    }

    /// Attach to a new connection and cancel any running expiry.
    pub fn bind(&mut self, gid: ChannelGid) {
        self.gid = Some(gid);
        self.expire_at = None;
    }

    /// Detach from the current connection without touching expiry state;
    /// used during takeover where a rebind follows at once.
    pub fn take_gid(&mut self) -> Option<ChannelGid> {
        self.gid.take()
    }

    /// Detach from the connection.
    ///
    /// Unacknowledged in-flight publishes go back to the front of the
    /// pending queue marked as duplicates, so the next connection
    /// retransmits them first and in order. Returns true if the session
    /// should be destroyed right away.
    pub fn set_offline(&mut self, expiry_override: Option<u32>) -> bool {
        self.gid = None;
        if let Some(expiry) = expiry_override {
            self.expiry_interval = expiry;
        }

        self.requeue_inflight();

        if self.expiry_interval == 0 {
            return true;
        }
        if self.expiry_interval != SESSION_EXPIRY_NEVER {
            self.expire_at =
                Some(Instant::now() + Duration::from_secs(u64::from(self.expiry_interval)));
        }
        false
    }

    /// Move every unacknowledged publish back to the head of the queue,
    /// marked as a duplicate delivery.
    pub fn requeue_inflight(&mut self) {
        for (_packet_id, mut packet) in self.inflight.drain(..).rev() {
            packet.set_packet_id(PacketId::new(0));
            // set_dup only fails for QoS 0, which never enters inflight.
            let _ret = packet.set_dup(true);
            self.pending.push_front(packet);
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expire_at.is_some_and(|at| at <= now)
    }

    /// Replace or add a subscription; returns true if it replaced one.
    pub fn subscribe(&mut self, subscription: Subscription) -> bool {
        self.subscriptions
            .insert(subscription.filter.filter().to_owned(), subscription)
            .is_some()
    }

    /// Remove the subscription with exactly this filter string.
    pub fn unsubscribe(&mut self, filter: &str) -> Option<Subscription> {
        self.subscriptions.remove(filter)
    }

    #[must_use]
    pub const fn subscriptions(&self) -> &HashMap<String, Subscription> {
        &self.subscriptions
    }

    /// Queue a QoS 1 publish, dropping the oldest entry when the bound is
    /// hit. Returns true if something was dropped.
    pub fn queue_message(&mut self, packet: PublishPacket, max_queued: usize) -> bool {
        let mut overflow = false;
        if max_queued > 0 && self.pending.len() >= max_queued {
            let _oldest = self.pending.pop_front();
            self.dropped += 1;
            overflow = true;
            log::warn!(
                "session {}: queue full, dropped oldest message ({} dropped so far)",
                self.client_id,
                self.dropped
            );
        }
        self.pending.push_back(packet);
        overflow
    }

    /// Take up to `max_inflight - inflight` queued messages, each with a
    /// fresh packet id, and remember them as awaiting acknowledgement.
    #[must_use]
    pub fn ready_messages(&mut self, max_inflight: usize) -> Vec<PublishPacket> {
        let mut ready = Vec::new();
        while self.inflight.len() < max_inflight {
            let Some(mut packet) = self.pending.pop_front() else {
                break;
            };
            let packet_id = self.allocate_packet_id();
            packet.set_packet_id(packet_id);
            self.inflight.push((packet_id, packet.clone()));
            ready.push(packet);
        }
        ready
    }

    /// Client acknowledged `packet_id`; returns false for unknown ids.
    pub fn acknowledge(&mut self, packet_id: PacketId) -> bool {
        let before = self.inflight.len();
        self.inflight.retain(|(id, _)| *id != packet_id);
        self.inflight.len() != before
    }

    /// Next unused non-zero packet id.
    ///
    /// Wraps at 65535 and skips ids still awaiting acknowledgement
    /// [MQTT-2.2.1-4].
    fn allocate_packet_id(&mut self) -> PacketId {
        loop {
            let candidate = self.next_packet_id;
            self.next_packet_id = if self.next_packet_id == u16::MAX {
                1
            } else {
                self.next_packet_id + 1
            };
            if candidate != 0
                && !self
                    .inflight
                    .iter()
                    .any(|(id, _)| id.value() == candidate)
            {
                return PacketId::new(candidate);
            }
        }
    }
}

/// The identifier → session registry.
///
/// Only the dispatcher touches it, so serial per-actor processing makes
/// takeover atomic with respect to CONNECT handling.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,

    /// Live connection index.
    gids: HashMap<ChannelGid, String>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn get(&self, client_id: &str) -> Option<&Session> {
        self.sessions.get(client_id)
    }

    pub fn get_mut(&mut self, client_id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(client_id)
    }

    #[must_use]
    pub fn client_by_gid(&self, gid: ChannelGid) -> Option<&str> {
        self.gids.get(&gid).map(String::as_str)
    }

    pub fn insert(&mut self, session: Session) {
        if let Some(gid) = session.gid() {
            self.gids.insert(gid, session.client_id().to_owned());
        }
        self.sessions
            .insert(session.client_id().to_owned(), session);
    }

    pub fn remove(&mut self, client_id: &str) -> Option<Session> {
        let session = self.sessions.remove(client_id)?;
        if let Some(gid) = session.gid() {
            self.gids.remove(&gid);
        }
        Some(session)
    }

    /// Attach `client_id` to a new live connection.
    pub fn bind(&mut self, client_id: &str, gid: ChannelGid) {
        if let Some(session) = self.sessions.get_mut(client_id) {
            session.bind(gid);
            self.gids.insert(gid, client_id.to_owned());
        }
    }

    /// Drop the live-connection index entry; the session itself stays.
    pub fn unbind(&mut self, gid: ChannelGid) {
        self.gids.remove(&gid);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Client ids whose expiry deadline has passed.
    #[must_use]
    pub fn expired_sessions(&self, now: Instant) -> Vec<String> {
        self.sessions
            .values()
            .filter(|s| s.is_expired(now))
            .map(|s| s.client_id().to_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::QoS;

    fn publish(topic: &str) -> PublishPacket {
        PublishPacket::new(topic, QoS::AtLeastOnce, b"payload").unwrap()
    }

    #[test]
    fn test_packet_id_allocation_skips_inflight() {
        let gid = ChannelGid::new(0, 1);
        let mut session = Session::new("c1", gid, 0);
        session.queue_message(publish("t"), 16);
        session.queue_message(publish("t"), 16);

        let ready = session.ready_messages(8);
        assert_eq!(ready.len(), 2);
        assert_eq!(ready[0].packet_id().value(), 1);
        assert_eq!(ready[1].packet_id().value(), 2);

        // Wrap the counter; 1 and 2 are still in flight and are skipped.
        session.next_packet_id = u16::MAX;
        session.queue_message(publish("t"), 16);
        session.queue_message(publish("t"), 16);
        let ready = session.ready_messages(8);
        assert_eq!(ready[0].packet_id().value(), u16::MAX);
        assert_eq!(ready[1].packet_id().value(), 3);
    }

    #[test]
    fn test_queue_bound_drops_oldest() {
        let gid = ChannelGid::new(0, 1);
        let mut session = Session::new("c1", gid, 0);
        assert!(!session.queue_message(publish("a"), 2));
        assert!(!session.queue_message(publish("b"), 2));
        assert!(session.queue_message(publish("c"), 2));

        let ready = session.ready_messages(8);
        assert_eq!(ready.len(), 2);
        assert_eq!(ready[0].topic(), "b");
        assert_eq!(ready[1].topic(), "c");
    }

    #[test]
    fn test_offline_requeues_inflight_as_dup() {
        let gid = ChannelGid::new(0, 1);
        let mut session = Session::new("c1", gid, 3600);
        session.queue_message(publish("a"), 16);
        session.queue_message(publish("b"), 16);
        let sent = session.ready_messages(8);
        assert_eq!(sent.len(), 2);
        assert!(session.acknowledge(sent[0].packet_id()));

        let destroy = session.set_offline(None);
        assert!(!destroy);

        // The unacknowledged "b" comes back first, marked dup.
        let ready = session.ready_messages(8);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].topic(), "b");
        assert!(ready[0].dup());
    }

    #[test]
    fn test_expiry_zero_destroys_at_once() {
        let gid = ChannelGid::new(0, 1);
        let mut session = Session::new("c1", gid, 0);
        assert!(session.set_offline(None));

        // A DISCONNECT override of 0 also destroys at once.
        let mut session = Session::new("c1", gid, 10);
        assert!(session.set_offline(Some(0)));
    }

    #[test]
    fn test_store_gid_index() {
        let gid = ChannelGid::new(1, 7);
        let mut store = SessionStore::new();
        store.insert(Session::new("c1", gid, 0));
        assert_eq!(store.client_by_gid(gid), Some("c1"));

        store.unbind(gid);
        assert_eq!(store.client_by_gid(gid), None);
        assert!(store.get("c1").is_some());
    }
}
