// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Subscription matching and delivery planning.

use codec::{PublishPacket, QoS, TopicFilter};
use std::collections::HashMap;

use super::sessions::SessionStore;

/// What one receiving session is owed for a routed publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub client_id: String,
    pub qos: QoS,
    pub retain: bool,
    pub subscription_ids: Vec<usize>,
}

/// Members of one `$share/<name>/<filter>` group with its round robin
/// cursor.
#[derive(Debug)]
struct ShareGroup {
    filter: TopicFilter,
    members: Vec<String>,
    cursor: usize,
}

/// Plans deliveries for publishes.
///
/// Non-shared matching scans the session registry per publish; shared
/// subscriptions keep their own group table because the round robin
/// cursor is cross-session state.
#[derive(Debug, Default)]
pub struct Router {
    /// Keyed by (share name, filter path).
    share_groups: HashMap<(String, String), ShareGroup>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new subscription; only shared filters need router state.
    pub fn subscribe(&mut self, client_id: &str, filter: &TopicFilter) {
        let Some(share) = filter.share_name() else {
            return;
        };
        let key = (share.to_owned(), filter.path().to_owned());
        let group = self.share_groups.entry(key).or_insert_with(|| ShareGroup {
            filter: filter.clone(),
            members: Vec::new(),
            cursor: 0,
        });
        if !group.members.iter().any(|m| m == client_id) {
            group.members.push(client_id.to_owned());
        }
    }

    /// Drop a subscription from its share group, if any.
    pub fn unsubscribe(&mut self, client_id: &str, filter: &TopicFilter) {
        let Some(share) = filter.share_name() else {
            return;
        };
        let key = (share.to_owned(), filter.path().to_owned());
        if let Some(group) = self.share_groups.get_mut(&key) {
            group.members.retain(|m| m != client_id);
            if group.members.is_empty() {
                self.share_groups.remove(&key);
            }
        }
    }

    /// Remove a destroyed session from every share group.
    pub fn remove_session(&mut self, client_id: &str) {
        self.share_groups
            .retain(|_key, group| {
                group.members.retain(|m| m != client_id);
                !group.members.is_empty()
            });
    }

    /// Compute the receivers of `packet`.
    ///
    /// Non-shared subscriptions: one delivery per matching session, the
    /// effective QoS being the maximum over its matching filters of
    /// min(publish QoS, subscription QoS), with the union of their
    /// subscription identifiers. Shared subscriptions: one delivery per
    /// matching group, round robin over connected members.
    #[must_use]
    pub fn route(
        &mut self,
        publisher: &str,
        packet: &PublishPacket,
        store: &SessionStore,
    ) -> Vec<Delivery> {
        let topic = packet.topic();
        let mut deliveries = Vec::new();

        for session in store.iter() {
            let mut best: Option<Delivery> = None;
            for subscription in session.subscriptions().values() {
                if subscription.filter.is_shared() {
                    continue;
                }
                if !subscription.filter.is_match(topic) {
                    continue;
                }
                // The no-local option suppresses echo to the publishing
                // session only.
                if subscription.options.no_local() && session.client_id() == publisher {
                    continue;
                }

                let qos = packet.qos().min(subscription.options.qos());
                let retain = subscription.options.retain_as_published() && packet.retain();
                match &mut best {
                    None => {
                        best = Some(Delivery {
                            client_id: session.client_id().to_owned(),
                            qos,
                            retain,
                            subscription_ids: subscription.subscription_id.into_iter().collect(),
                        });
                    }
                    Some(delivery) => {
                        // Overlapping filters on one session collapse into
                        // a single delivery.
                        delivery.qos = delivery.qos.max(qos);
                        delivery.retain = delivery.retain || retain;
                        if let Some(id) = subscription.subscription_id {
                            if !delivery.subscription_ids.contains(&id) {
                                delivery.subscription_ids.push(id);
                            }
                        }
                    }
                }
            }
            if let Some(delivery) = best {
                deliveries.push(delivery);
            }
        }

        for group in self.share_groups.values_mut() {
            if !group.filter.is_match(topic) {
                continue;
            }
            let Some(member) = Self::pick_member(group, store) else {
                continue;
            };
            let Some(session) = store.get(&member) else {
                continue;
            };
            let Some(subscription) = session.subscriptions().get(group.filter.filter()) else {
                continue;
            };
            deliveries.push(Delivery {
                client_id: member,
                qos: packet.qos().min(subscription.options.qos()),
                retain: subscription.options.retain_as_published() && packet.retain(),
                subscription_ids: subscription.subscription_id.into_iter().collect(),
            });
        }

        deliveries
    }

    /// Round robin among connected members; a group with every member
    /// offline still elects one so the message queues somewhere fair.
    fn pick_member(group: &mut ShareGroup, store: &SessionStore) -> Option<String> {
        let len = group.members.len();
        if len == 0 {
            return None;
        }

        for i in 0..len {
            let index = (group.cursor + i) % len;
            let member = &group.members[index];
            if store.get(member).is_some_and(super::sessions::Session::is_connected) {
                group.cursor = (index + 1) % len;
                return Some(member.clone());
            }
        }

        let index = group.cursor % len;
        group.cursor = (index + 1) % len;
        Some(group.members[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::sessions::{Session, Subscription};
    use crate::types::ChannelGid;
    use codec::SubscribeOptions;

    fn subscription(filter: &str, qos: QoS) -> Subscription {
        Subscription {
            filter: TopicFilter::parse(filter).unwrap(),
            options: SubscribeOptions::new(qos),
            subscription_id: None,
        }
    }

    fn store_with(entries: &[(&str, u64, &str, QoS)]) -> SessionStore {
        let mut store = SessionStore::new();
        for (client_id, channel_id, filter, qos) in entries {
            let mut session = Session::new(client_id, ChannelGid::new(0, *channel_id), 0);
            session.subscribe(subscription(filter, *qos));
            store.insert(session);
        }
        store
    }

    #[test]
    fn test_route_single_match() {
        let store = store_with(&[("a", 1, "x/y", QoS::AtLeastOnce)]);
        let mut router = Router::new();
        let packet = PublishPacket::new("x/y", QoS::AtMostOnce, b"m").unwrap();

        let deliveries = router.route("b", &packet, &store);
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].client_id, "a");
        // Effective QoS is the smaller of publish and subscription QoS.
        assert_eq!(deliveries[0].qos, QoS::AtMostOnce);
    }

    #[test]
    fn test_route_overlapping_filters_dedup() {
        let mut store = store_with(&[("a", 1, "x/#", QoS::AtMostOnce)]);
        store
            .get_mut("a")
            .unwrap()
            .subscribe(subscription("x/+", QoS::AtLeastOnce));
        let mut router = Router::new();
        let packet = PublishPacket::new("x/y", QoS::AtLeastOnce, b"m").unwrap();

        let deliveries = router.route("b", &packet, &store);
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].qos, QoS::AtLeastOnce);
    }

    #[test]
    fn test_route_no_local() {
        let mut store = SessionStore::new();
        let mut session = Session::new("a", ChannelGid::new(0, 1), 0);
        let mut options = SubscribeOptions::new(QoS::AtMostOnce);
        options.set_no_local(true);
        session.subscribe(Subscription {
            filter: TopicFilter::parse("x").unwrap(),
            options,
            subscription_id: None,
        });
        store.insert(session);

        let mut router = Router::new();
        let publish = PublishPacket::new("x", QoS::AtMostOnce, b"m").unwrap();
        assert!(router.route("a", &publish, &store).is_empty());
        assert_eq!(router.route("b", &publish, &store).len(), 1);
    }

    #[test]
    fn test_shared_round_robin() {
        let mut store = store_with(&[
            ("a", 1, "$share/g/x", QoS::AtLeastOnce),
            ("b", 2, "$share/g/x", QoS::AtLeastOnce),
        ]);
        let mut router = Router::new();
        for client_id in ["a", "b"] {
            let session = store.get_mut(client_id).unwrap();
            let filter = session.subscriptions().values().next().unwrap().filter.clone();
            router.subscribe(client_id, &filter);
        }

        let packet = PublishPacket::new("x", QoS::AtMostOnce, b"m").unwrap();
        let mut counts = std::collections::HashMap::new();
        for _ in 0..4 {
            let deliveries = router.route("p", &packet, &store);
            assert_eq!(deliveries.len(), 1);
            *counts.entry(deliveries[0].client_id.clone()).or_insert(0) += 1;
        }
        assert_eq!(counts.get("a"), Some(&2));
        assert_eq!(counts.get("b"), Some(&2));
    }

    #[test]
    fn test_shared_group_removed_with_last_member() {
        let filter = TopicFilter::parse("$share/g/x").unwrap();
        let mut router = Router::new();
        router.subscribe("a", &filter);
        router.subscribe("b", &filter);

        router.unsubscribe("a", &filter);
        router.remove_session("b");
        assert!(router.share_groups.is_empty());
    }
}
