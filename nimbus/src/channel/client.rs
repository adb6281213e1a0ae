// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Handles client packets.

use codec::{
    utils::random_client_id, ByteArray, ConnectPacket, DecodePacket, DisconnectPacket, MqttPacket,
    PingResponsePacket, PublishAckPacket, PublishPacket, QoS, ReasonCode, SubscribePacket,
    UnsubscribePacket,
};

use super::{Channel, Status};
use crate::commands::{ChannelToListenerCmd, ConnectRequest};
use crate::error::Error;

impl Channel {
    pub(super) async fn handle_client_frame(&mut self, buf: &[u8]) -> Result<(), Error> {
        let mut ba = ByteArray::new(buf);
        let packet = match MqttPacket::decode(&mut ba) {
            Ok(packet) => packet,
            Err(err) => return self.on_decode_error(err).await,
        };

        // The first and only acceptable packet on a fresh connection is
        // CONNECT; the server may close anything else without a response
        // [MQTT-3.1.0-1].
        if self.status == Status::Init && !matches!(packet, MqttPacket::Connect(_)) {
            log::info!(
                "channel {}: {:?} before CONNECT, closing",
                self.id,
                packet.packet_type()
            );
            self.status = Status::Disconnected;
            return Ok(());
        }

        match packet {
            MqttPacket::Connect(packet) => self.on_client_connect(packet).await,
            MqttPacket::Publish(packet) => self.on_client_publish(packet).await,
            MqttPacket::PublishAck(packet) => self.on_client_publish_ack(packet).await,
            MqttPacket::Subscribe(packet) => self.on_client_subscribe(packet).await,
            MqttPacket::Unsubscribe(packet) => self.on_client_unsubscribe(packet).await,
            MqttPacket::PingRequest(_) => self.on_client_ping().await,
            MqttPacket::Disconnect(packet) => self.on_client_disconnect(packet).await,
            MqttPacket::Auth(_) => {
                // Extended authentication is not performed, so an AUTH
                // packet can never legally appear.
                self.disconnect_with(ReasonCode::ProtocolError).await
            }
            MqttPacket::ConnectAck(_)
            | MqttPacket::SubscribeAck(_)
            | MqttPacket::UnsubscribeAck(_)
            | MqttPacket::PingResponse(_) => {
                // Server-to-client packets from a client.
                self.disconnect_with(ReasonCode::ProtocolError).await
            }
        }
    }

    async fn on_client_connect(&mut self, packet: ConnectPacket) -> Result<(), Error> {
        if self.status != Status::Init {
            // A client can only send the CONNECT packet once over a
            // network connection [MQTT-3.1.0-2].
            log::error!("channel {}: second CONNECT packet", self.id);
            return self.disconnect_with(ReasonCode::ProtocolError).await;
        }

        if packet.properties().authentication_method().is_some() {
            return self
                .reject_connect(ReasonCode::BadAuthenticationMethod)
                .await;
        }

        if packet.connect_flags().will() {
            log::warn!(
                "channel {}: will message from {:?} dropped, wills are not supported",
                self.id,
                packet.client_id()
            );
        }

        let client_id = if packet.client_id().is_empty() {
            if !self.config.allow_empty_client_id() {
                return self.reject_connect(ReasonCode::ClientIdentifierNotValid).await;
            }
            let client_id = random_client_id();
            self.assigned_client_id = Some(client_id.clone());
            client_id
        } else {
            packet.client_id().to_owned()
        };
        self.client_id = client_id.clone();

        // Use the client's keep alive unless it exceeds the broker cap;
        // then impose the cap through the server-keep-alive property.
        let requested_keep_alive = packet.keep_alive();
        if requested_keep_alive > self.config.max_keepalive() {
            self.keep_alive = self.config.max_keepalive();
            self.server_keep_alive = Some(self.keep_alive);
        } else {
            self.keep_alive = requested_keep_alive;
        }

        let requested_expiry = packet
            .properties()
            .session_expiry_interval()
            .unwrap_or(0);
        self.session_expiry = requested_expiry.min(self.config.session_expiry_cap());
        self.echo_session_expiry = self.session_expiry != requested_expiry;

        self.status = Status::Connecting;
        let request = ConnectRequest {
            client_id,
            clean_start: packet.connect_flags().clean_start(),
            session_expiry: self.session_expiry,
        };
        self.sender
            .send(ChannelToListenerCmd::Connect(self.id, request))
            .await
            .map_err(Into::into)
    }

    async fn on_client_publish(&mut self, packet: PublishPacket) -> Result<(), Error> {
        // QoS 2 is wire-legal but this broker only grants QoS 0 and 1.
        if packet.qos() == QoS::ExactOnce {
            log::error!(
                "channel {}: QoS 2 publish from {}, not supported",
                self.id,
                self.client_id
            );
            return self.disconnect_with(ReasonCode::QoSNotSupported).await;
        }

        self.sender
            .send(ChannelToListenerCmd::Publish(self.id, packet))
            .await
            .map_err(Into::into)
    }

    async fn on_client_publish_ack(&mut self, packet: PublishAckPacket) -> Result<(), Error> {
        self.sender
            .send(ChannelToListenerCmd::PublishAck(self.id, packet.packet_id()))
            .await
            .map_err(Into::into)
    }

    async fn on_client_subscribe(&mut self, packet: SubscribePacket) -> Result<(), Error> {
        self.sender
            .send(ChannelToListenerCmd::Subscribe(self.id, packet))
            .await
            .map_err(Into::into)
    }

    async fn on_client_unsubscribe(&mut self, packet: UnsubscribePacket) -> Result<(), Error> {
        self.sender
            .send(ChannelToListenerCmd::Unsubscribe(self.id, packet))
            .await
            .map_err(Into::into)
    }

    async fn on_client_ping(&mut self) -> Result<(), Error> {
        // The server MUST send a PINGRESP packet in response to a PINGREQ
        // packet [MQTT-3.12.4-1].
        self.send(PingResponsePacket::new()).await
    }

    async fn on_client_disconnect(&mut self, packet: DisconnectPacket) -> Result<(), Error> {
        // The server never replies to DISCONNECT; the connection is
        // released right away.
        let expiry_override = packet.properties().session_expiry_interval();
        self.status = Status::Disconnected;
        self.sender
            .send(ChannelToListenerCmd::Disconnect(
                self.id,
                expiry_override.map(|v| v.min(self.config.session_expiry_cap())),
            ))
            .await
            .map_err(Into::into)
    }

    /// Refuse the handshake: a CONNACK with an error reason code, then
    /// close [MQTT-3.2.2-7].
    async fn reject_connect(&mut self, reason_code: ReasonCode) -> Result<(), Error> {
        let ack_packet = codec::ConnectAckPacket::new(false, reason_code);
        self.send(ack_packet).await?;
        self.close_after_drain();
        Ok(())
    }
}
