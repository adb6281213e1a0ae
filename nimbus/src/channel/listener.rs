// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Handles commands from the listener.

use codec::{
    ConnectAckPacket, Property, PublishAckPacket, PublishPacket, ReasonCode, StringData,
    SubscribeAckPacket, U16Data, U32Data, UnsubscribeAckPacket,
};

use super::{Channel, Status};
use crate::commands::{ConnectDecision, ListenerToChannelCmd};
use crate::error::Error;

impl Channel {
    pub(super) async fn handle_listener_cmd(
        &mut self,
        cmd: ListenerToChannelCmd,
    ) -> Result<(), Error> {
        match cmd {
            ListenerToChannelCmd::ConnectAck(decision) => {
                self.on_listener_connect_ack(decision).await
            }
            ListenerToChannelCmd::Publish(packet) => self.on_listener_publish(packet).await,
            ListenerToChannelCmd::PublishAck(packet) => {
                self.on_listener_publish_ack(packet).await
            }
            ListenerToChannelCmd::SubscribeAck(packet) => {
                self.on_listener_subscribe_ack(packet).await
            }
            ListenerToChannelCmd::UnsubscribeAck(packet) => {
                self.on_listener_unsubscribe_ack(packet).await
            }
            ListenerToChannelCmd::Disconnect(reason_code) => {
                self.on_listener_disconnect(reason_code).await
            }
        }
    }

    /// The session manager decided about our CONNECT; finish the
    /// handshake on the wire.
    async fn on_listener_connect_ack(&mut self, decision: ConnectDecision) -> Result<(), Error> {
        let mut ack_packet =
            ConnectAckPacket::new(decision.session_present, decision.reason_code);

        if let Some(server_keep_alive) = self.server_keep_alive {
            ack_packet
                .properties_mut()
                .push(Property::ServerKeepAlive(U16Data::new(server_keep_alive)));
        }
        if let Some(assigned) = &self.assigned_client_id {
            let assigned = StringData::from_str(assigned)?;
            ack_packet
                .properties_mut()
                .push(Property::AssignedClientIdentifier(assigned));
        }
        // The negotiated session expiry is echoed only when it differs
        // from what the client asked for.
        if self.echo_session_expiry {
            ack_packet
                .properties_mut()
                .push(Property::SessionExpiryInterval(U32Data::new(
                    self.session_expiry,
                )));
        }

        let reason_code = decision.reason_code;
        self.send(ack_packet).await?;

        if reason_code.is_error() {
            // A failed CONNACK is followed by the socket close
            // [MQTT-3.2.2-7].
            self.close_after_drain();
        } else {
            self.status = Status::Connected;
            self.reset_deadline();
        }
        Ok(())
    }

    async fn on_listener_publish(&mut self, packet: PublishPacket) -> Result<(), Error> {
        self.send(packet).await
    }

    /// Acknowledge an inbound QoS 1 publish; the router has taken the
    /// message by now.
    async fn on_listener_publish_ack(&mut self, packet: PublishAckPacket) -> Result<(), Error> {
        self.send(packet).await
    }

    async fn on_listener_subscribe_ack(
        &mut self,
        packet: SubscribeAckPacket,
    ) -> Result<(), Error> {
        // The SUBACK packet MUST have the same packet identifier as the
        // SUBSCRIBE packet it acknowledges [MQTT-3.8.4-2]; the dispatcher
        // built it that way.
        self.send(packet).await
    }

    async fn on_listener_unsubscribe_ack(
        &mut self,
        packet: UnsubscribeAckPacket,
    ) -> Result<(), Error> {
        self.send(packet).await
    }

    async fn on_listener_disconnect(&mut self, reason_code: ReasonCode) -> Result<(), Error> {
        self.disconnect_with(reason_code).await
    }
}
