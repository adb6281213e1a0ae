// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

#![deny(
    warnings,
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic
)]
#![allow(clippy::multiple_crate_versions)]

mod auth;
mod base;
mod binary_data;
mod bool_data;
mod byte_array;
mod connect;
mod connect_ack;
mod disconnect;
mod error;
pub mod frame;
mod header;
mod packet;
mod packet_id;
mod ping_request;
mod ping_response;
mod property;
mod publish;
mod publish_ack;
mod reason_code;
mod string_data;
mod string_pair_data;
mod subscribe;
mod subscribe_ack;
pub mod topic;
mod u16_data;
mod u32_data;
mod unsubscribe;
mod unsubscribe_ack;
pub mod utils;
mod var_int;

pub use auth::{AuthPacket, AUTH_PROPERTIES, AUTH_REASONS};
pub use base::{DecodePacket, EncodePacket, ProtocolLevel, QoS};
pub use binary_data::BinaryData;
pub use bool_data::BoolData;
pub use byte_array::ByteArray;
pub use connect::{
    ConnectFlags, ConnectPacket, CONNECT_PROPERTIES, PROTOCOL_NAME, WILL_PROPERTIES,
};
pub use connect_ack::{ConnectAckPacket, CONNECT_ACK_PROPERTIES};
pub use disconnect::{DisconnectPacket, DISCONNECT_PROPERTIES};
pub use error::{DecodeError, EncodeError};
pub use frame::{check_frame, FrameStatus};
pub use header::{FixedHeader, Packet, PacketType};
pub use packet::MqttPacket;
pub use packet_id::PacketId;
pub use ping_request::PingRequestPacket;
pub use ping_response::PingResponsePacket;
pub use property::{Properties, Property, PropertyType};
pub use publish::{PublishPacket, PUBLISH_PROPERTIES};
pub use publish_ack::{PublishAckPacket, PUBLISH_ACK_PROPERTIES, PUBLISH_ACK_REASONS};
pub use reason_code::ReasonCode;
pub use string_data::StringData;
pub use string_pair_data::StringPairData;
pub use subscribe::{
    RetainHandling, SubscribeOptions, SubscribePacket, SubscribeTopic, SUBSCRIBE_PROPERTIES,
};
pub use subscribe_ack::{SubscribeAckPacket, SUBSCRIBE_ACK_PROPERTIES, SUBSCRIBE_REASONS};
pub use topic::{PubTopic, TopicFilter};
pub use u16_data::U16Data;
pub use u32_data::U32Data;
pub use unsubscribe::{UnsubscribePacket, UNSUBSCRIBE_PROPERTIES};
pub use unsubscribe_ack::{
    UnsubscribeAckPacket, UNSUBSCRIBE_ACK_PROPERTIES, UNSUBSCRIBE_REASONS,
};
pub use var_int::{VarInt, VarIntError, MAX_VAR_INT};
