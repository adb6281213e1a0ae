// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use codec::{
    PacketId, PublishAckPacket, PublishPacket, ReasonCode, SubscribeAckPacket, SubscribePacket,
    UnsubscribeAckPacket, UnsubscribePacket,
};

use crate::types::{ChannelGid, ChannelId};

/// Connection facts a channel has negotiated before the session manager
/// gets involved.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    /// Final client id, server assigned one included.
    pub client_id: String,

    /// Clean start flag from the connect flags byte.
    pub clean_start: bool,

    /// Session expiry interval in seconds, already capped by the broker
    /// configuration.
    pub session_expiry: u32,
}

/// Session manager decision about a CONNECT.
#[derive(Debug, Clone, Copy)]
pub struct ConnectDecision {
    pub session_present: bool,
    pub reason_code: ReasonCode,
}

#[derive(Debug, Clone)]
pub enum ChannelToListenerCmd {
    Connect(ChannelId, ConnectRequest),
    Publish(ChannelId, PublishPacket),
    PublishAck(ChannelId, PacketId),
    Subscribe(ChannelId, SubscribePacket),
    Unsubscribe(ChannelId, UnsubscribePacket),

    /// Client sent DISCONNECT; the payload is the session expiry override
    /// from its properties, if any.
    Disconnect(ChannelId, Option<u32>),

    /// Socket closed or channel terminated without a DISCONNECT packet.
    Closed(ChannelId),
}

#[derive(Debug, Clone)]
pub enum ListenerToChannelCmd {
    ConnectAck(ConnectDecision),
    Publish(PublishPacket),
    PublishAck(PublishAckPacket),
    SubscribeAck(SubscribeAckPacket),
    UnsubscribeAck(UnsubscribeAckPacket),

    /// Send DISCONNECT with this reason code, then close the socket.
    Disconnect(ReasonCode),
}

#[derive(Debug, Clone)]
pub enum ListenerToDispatcherCmd {
    Connect(ChannelGid, ConnectRequest),
    Publish(ChannelGid, PublishPacket),
    PublishAck(ChannelGid, PacketId),
    Subscribe(ChannelGid, SubscribePacket),
    Unsubscribe(ChannelGid, UnsubscribePacket),

    /// Connection is gone, cleanly or not. The payload is the session
    /// expiry override from a DISCONNECT packet, if one was received.
    Offline(ChannelGid, Option<u32>),
}

#[derive(Debug, Clone)]
pub enum DispatcherToListenerCmd {
    ConnectAck(ChannelId, ConnectDecision),
    Publish(ChannelId, PublishPacket),
    PublishAck(ChannelId, PublishAckPacket),
    SubscribeAck(ChannelId, SubscribeAckPacket),
    UnsubscribeAck(ChannelId, UnsubscribeAckPacket),
    Disconnect(ChannelId, ReasonCode),
}
