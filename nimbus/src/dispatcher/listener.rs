// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Listener cmd handlers: the CONNECT/publish/subscribe flows of the
//! session manager.

use codec::{
    PacketId, Properties, Property, PublishAckPacket, PublishPacket, QoS, ReasonCode,
    SubscribeAckPacket, SubscribePacket, TopicFilter, UnsubscribeAckPacket, UnsubscribePacket,
    VarInt,
};
use tokio::time::Instant;

use super::sessions::{Session, Subscription};
use super::Dispatcher;
use crate::commands::{
    ConnectDecision, ConnectRequest, DispatcherToListenerCmd, ListenerToDispatcherCmd,
};
use crate::error::{Error, ErrorKind};
use crate::types::ChannelGid;

impl Dispatcher {
    pub(super) async fn handle_listener_cmd(
        &mut self,
        cmd: ListenerToDispatcherCmd,
    ) -> Result<(), Error> {
        match cmd {
            ListenerToDispatcherCmd::Connect(gid, request) => {
                self.on_listener_connect(gid, request).await
            }
            ListenerToDispatcherCmd::Publish(gid, packet) => {
                self.on_listener_publish(gid, packet).await
            }
            ListenerToDispatcherCmd::PublishAck(gid, packet_id) => {
                self.on_listener_publish_ack(gid, packet_id).await
            }
            ListenerToDispatcherCmd::Subscribe(gid, packet) => {
                self.on_listener_subscribe(gid, packet).await
            }
            ListenerToDispatcherCmd::Unsubscribe(gid, packet) => {
                self.on_listener_unsubscribe(gid, packet).await
            }
            ListenerToDispatcherCmd::Offline(gid, expiry_override) => {
                self.on_listener_offline(gid, expiry_override).await
            }
        }
    }

    /// CONNECT arrived for `request.client_id`.
    ///
    /// An existing live connection with the same id is evicted with
    /// reason 0x8E [MQTT-3.1.4-3]; the stored session is kept or
    /// discarded according to the clean start flag and its expiry state.
    async fn on_listener_connect(
        &mut self,
        gid: ChannelGid,
        request: ConnectRequest,
    ) -> Result<(), Error> {
        let now = Instant::now();
        if self
            .store
            .get(&request.client_id)
            .is_some_and(|s| s.is_expired(now))
        {
            // The sweep has not caught it yet; a CONNECT observes the
            // expiry first.
            self.destroy_session(&request.client_id);
            self.counters.sessions_expired += 1;
        }

        let mut old_gid = None;
        let mut session_present = false;
        if let Some(session) = self.store.get_mut(&request.client_id) {
            old_gid = session.take_gid();
            if old_gid.is_some() {
                // That connection will never acknowledge anything again.
                session.requeue_inflight();
            }
            session_present = !request.clean_start;
        }

        if let Some(old_gid) = old_gid {
            self.store.unbind(old_gid);
            self.counters.sessions_taken_over += 1;
            log::info!(
                "dispatcher: session {} taken over by channel {:?}",
                request.client_id,
                gid
            );
            self.send_to_listener(
                old_gid,
                DispatcherToListenerCmd::Disconnect(
                    old_gid.channel_id(),
                    ReasonCode::SessionTakenOver,
                ),
            )
            .await?;
        }

        if session_present {
            self.store.bind(&request.client_id, gid);
            if let Some(session) = self.store.get_mut(&request.client_id) {
                session.set_expiry_interval(request.session_expiry);
            }
        } else {
            // Either absent, expired, or explicitly discarded by clean
            // start.
            self.destroy_session(&request.client_id);
            self.store.insert(Session::new(
                &request.client_id,
                gid,
                request.session_expiry,
            ));
            self.counters.sessions_created += 1;
        }

        self.send_to_listener(
            gid,
            DispatcherToListenerCmd::ConnectAck(
                gid.channel_id(),
                ConnectDecision {
                    session_present,
                    reason_code: ReasonCode::Success,
                },
            ),
        )
        .await?;

        if session_present {
            // Retained QoS 1 backlog goes out right behind the CONNACK.
            self.flush_session(&request.client_id).await?;
        }
        Ok(())
    }

    /// The connection is gone; park or destroy the session.
    async fn on_listener_offline(
        &mut self,
        gid: ChannelGid,
        expiry_override: Option<u32>,
    ) -> Result<(), Error> {
        let Some(client_id) = self.store.client_by_gid(gid).map(ToOwned::to_owned) else {
            // Stale close from a connection that was already taken over.
            return Ok(());
        };
        self.store.unbind(gid);

        let destroy = self
            .store
            .get_mut(&client_id)
            .is_some_and(|session| session.set_offline(expiry_override));
        if destroy {
            log::info!("dispatcher: session {client_id} ends with its connection");
            self.destroy_session(&client_id);
        }
        Ok(())
    }

    /// Route a publish to every matching session, then acknowledge the
    /// publisher.
    async fn on_listener_publish(
        &mut self,
        gid: ChannelGid,
        packet: PublishPacket,
    ) -> Result<(), Error> {
        let Some(publisher) = self.store.client_by_gid(gid) else {
            log::warn!("dispatcher: publish from unbound channel {gid:?}");
            return Ok(());
        };

        let deliveries = self.router.route(publisher, &packet, &self.store);
        for delivery in deliveries {
            let mut forwarded = PublishPacket::new(packet.topic(), delivery.qos, packet.message())?;
            forwarded.set_retain(delivery.retain);
            copy_forwarded_properties(packet.properties(), forwarded.properties_mut());
            for subscription_id in delivery.subscription_ids {
                let id = VarInt::from(subscription_id)
                    .map_err(|err| Error::from_string(ErrorKind::EncodeError, err.to_string()))?;
                forwarded
                    .properties_mut()
                    .push(Property::SubscriptionIdentifier(id));
            }

            self.deliver(&delivery.client_id, forwarded).await?;
            self.counters.publish_routed += 1;
        }

        // A QoS 1 publish is acknowledged only after the router has
        // enqueued it for every matching session.
        if packet.qos() == QoS::AtLeastOnce {
            self.send_to_listener(
                gid,
                DispatcherToListenerCmd::PublishAck(
                    gid.channel_id(),
                    PublishAckPacket::new(packet.packet_id()),
                ),
            )
            .await?;
        }
        Ok(())
    }

    /// Hand one forwarded publish to its receiving session.
    async fn deliver(&mut self, client_id: &str, packet: PublishPacket) -> Result<(), Error> {
        let Some(session) = self.store.get_mut(client_id) else {
            return Ok(());
        };

        if packet.qos() == QoS::AtMostOnce {
            // QoS 0 is live-only: nothing is queued for offline sessions.
            if let Some(gid) = session.gid() {
                self.send_to_listener(
                    gid,
                    DispatcherToListenerCmd::Publish(gid.channel_id(), packet),
                )
                .await?;
            } else {
                self.counters.publish_dropped += 1;
            }
            return Ok(());
        }

        if session.queue_message(packet, self.general.max_queued_messages()) {
            self.counters.queue_overflows += 1;
        }
        if session.is_connected() {
            self.flush_session(client_id).await?;
        }
        Ok(())
    }

    /// Push queued QoS 1 messages into the in-flight window.
    async fn flush_session(&mut self, client_id: &str) -> Result<(), Error> {
        let max_inflight = self.general.max_inflight_messages();
        let Some(session) = self.store.get_mut(client_id) else {
            return Ok(());
        };
        let Some(gid) = session.gid() else {
            return Ok(());
        };
        let ready = session.ready_messages(max_inflight);

        for packet in ready {
            self.send_to_listener(
                gid,
                DispatcherToListenerCmd::Publish(gid.channel_id(), packet),
            )
            .await?;
        }
        Ok(())
    }

    /// The receiver acknowledged one of our QoS 1 deliveries.
    async fn on_listener_publish_ack(
        &mut self,
        gid: ChannelGid,
        packet_id: PacketId,
    ) -> Result<(), Error> {
        let Some(client_id) = self.store.client_by_gid(gid).map(ToOwned::to_owned) else {
            return Ok(());
        };
        let known = self
            .store
            .get_mut(&client_id)
            .is_some_and(|session| session.acknowledge(packet_id));
        if known {
            self.flush_session(&client_id).await?;
        } else {
            log::warn!(
                "dispatcher: PUBACK for unknown packet id {packet_id} from {client_id}"
            );
        }
        Ok(())
    }

    /// Install the subscriptions of one SUBSCRIBE packet and answer with
    /// a SUBACK mirroring them in order [MQTT-3.8.4-4].
    async fn on_listener_subscribe(
        &mut self,
        gid: ChannelGid,
        packet: SubscribePacket,
    ) -> Result<(), Error> {
        let Some(client_id) = self.store.client_by_gid(gid).map(ToOwned::to_owned) else {
            log::warn!("dispatcher: subscribe from unbound channel {gid:?}");
            return Ok(());
        };

        let subscription_id = packet.properties().subscription_identifier();
        let max_subscriptions = self.general.max_subscriptions();
        let mut reason_codes = Vec::with_capacity(packet.topics().len());

        for topic in packet.topics() {
            let reason_code = match TopicFilter::parse(topic.filter()) {
                Err(_err) => ReasonCode::TopicFilterInvalid,
                // No-local on a shared subscription is not allowed
                // [MQTT-3.8.3-4].
                Ok(filter) if filter.is_shared() && topic.options().no_local() => {
                    ReasonCode::TopicFilterInvalid
                }
                Ok(filter) => self.install_subscription(
                    &client_id,
                    filter,
                    topic.options(),
                    subscription_id,
                    max_subscriptions,
                ),
            };
            reason_codes.push(reason_code);
        }

        self.send_to_listener(
            gid,
            DispatcherToListenerCmd::SubscribeAck(
                gid.channel_id(),
                SubscribeAckPacket::with_vec(packet.packet_id(), reason_codes),
            ),
        )
        .await
    }

    fn install_subscription(
        &mut self,
        client_id: &str,
        filter: TopicFilter,
        mut options: codec::SubscribeOptions,
        subscription_id: Option<usize>,
        max_subscriptions: usize,
    ) -> ReasonCode {
        let Some(session) = self.store.get_mut(client_id) else {
            return ReasonCode::UnspecifiedError;
        };

        if max_subscriptions > 0
            && session.subscriptions().len() >= max_subscriptions
            && !session.subscriptions().contains_key(filter.filter())
        {
            return ReasonCode::QuotaExceeded;
        }

        // The broker grants at most QoS 1.
        let granted = options.qos().min(QoS::AtLeastOnce);
        options.set_qos(granted);

        self.router.subscribe(client_id, &filter);
        session.subscribe(Subscription {
            filter,
            options,
            subscription_id,
        });

        match granted {
            QoS::AtMostOnce => ReasonCode::Success,
            _ => ReasonCode::GrantedQoS1,
        }
    }

    /// Remove subscriptions and answer with an UNSUBACK mirroring the
    /// filters in order.
    async fn on_listener_unsubscribe(
        &mut self,
        gid: ChannelGid,
        packet: UnsubscribePacket,
    ) -> Result<(), Error> {
        let Some(client_id) = self.store.client_by_gid(gid).map(ToOwned::to_owned) else {
            log::warn!("dispatcher: unsubscribe from unbound channel {gid:?}");
            return Ok(());
        };

        let mut reason_codes = Vec::with_capacity(packet.topics_len());
        for filter in packet.topics() {
            let removed = self
                .store
                .get_mut(&client_id)
                .and_then(|session| session.unsubscribe(filter));
            match removed {
                Some(subscription) => {
                    self.router.unsubscribe(&client_id, &subscription.filter);
                    reason_codes.push(ReasonCode::Success);
                }
                None => reason_codes.push(ReasonCode::NoSubscriptionExisted),
            }
        }

        self.send_to_listener(
            gid,
            DispatcherToListenerCmd::UnsubscribeAck(
                gid.channel_id(),
                UnsubscribeAckPacket::with_vec(packet.packet_id(), reason_codes),
            ),
        )
        .await
    }
}

/// Properties a broker forwards unaltered to subscribers
/// [MQTT-3.3.2-4 .. MQTT-3.3.2-20].
fn copy_forwarded_properties(src: &Properties, dst: &mut Properties) {
    for property in src.props() {
        match property {
            Property::PayloadFormatIndicator(_)
            | Property::MessageExpiryInterval(_)
            | Property::ContentType(_)
            | Property::ResponseTopic(_)
            | Property::CorrelationData(_)
            | Property::UserProperty(_) => dst.push(property.clone()),
            _ => {}
        }
    }
}
