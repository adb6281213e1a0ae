// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use crate::property::check_property_type_list;
use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, Packet, PacketId,
    PacketType, Properties, PropertyType, ReasonCode, VarIntError,
};

/// `SubscribeAckPacket` is sent by the server to confirm receipt and
/// processing of a SUBSCRIBE packet.
///
/// Basic structure of the packet:
///
/// ```txt
///  7                  0
/// +--------------------+
/// | Fixed header       |
/// +--------------------+
/// | Packet id          |
/// +--------------------+
/// | Properties         |
/// +--------------------+
/// | Reason codes       |
/// +--------------------+
/// ```
///
/// The payload contains one reason code per topic filter of the SUBSCRIBE
/// packet being acknowledged, in the same order [MQTT-3.9.3-1].
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubscribeAckPacket {
    packet_id: PacketId,
    properties: Properties,
    reason_codes: Vec<ReasonCode>,
}

/// Properties available in the SUBACK variable header.
pub const SUBSCRIBE_ACK_PROPERTIES: &[PropertyType] =
    &[PropertyType::ReasonString, PropertyType::UserProperty];

/// Reason codes available in SUBACK packets.
pub const SUBSCRIBE_REASONS: &[ReasonCode] = &[
    ReasonCode::Success,
    ReasonCode::GrantedQoS1,
    ReasonCode::GrantedQoS2,
    ReasonCode::UnspecifiedError,
    ReasonCode::ImplementationSpecificError,
    ReasonCode::NotAuthorized,
    ReasonCode::TopicFilterInvalid,
    ReasonCode::PacketIdentifierInUse,
    ReasonCode::QuotaExceeded,
    ReasonCode::SharedSubscriptionsNotSupported,
    ReasonCode::SubscriptionIdentifiersNotSupported,
    ReasonCode::WildcardSubscriptionsNotSupported,
];

impl SubscribeAckPacket {
    #[must_use]
    pub fn new(packet_id: PacketId, reason_code: ReasonCode) -> Self {
        Self::with_vec(packet_id, vec![reason_code])
    }

    #[must_use]
    pub fn with_vec(packet_id: PacketId, reason_codes: Vec<ReasonCode>) -> Self {
        Self {
            packet_id,
            properties: Properties::new(),
            reason_codes,
        }
    }

    #[must_use]
    pub const fn packet_id(&self) -> PacketId {
        self.packet_id
    }

    #[must_use]
    pub fn reason_codes(&self) -> &[ReasonCode] {
        &self.reason_codes
    }

    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    fn get_fixed_header(&self) -> Result<FixedHeader, VarIntError> {
        let remaining_length = PacketId::bytes()
            + self.properties.bytes()
            + self.reason_codes.len() * ReasonCode::bytes();
        FixedHeader::new(PacketType::SubscribeAck, remaining_length)
    }
}

impl DecodePacket for SubscribeAckPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::SubscribeAck {
            return Err(DecodeError::InvalidPacketType);
        }

        let end = ba.offset() + fixed_header.remaining_length();

        let packet_id = PacketId::decode(ba)?;

        let properties = Properties::decode(ba)?;
        if let Err(property_type) =
            check_property_type_list(properties.props(), SUBSCRIBE_ACK_PROPERTIES)
        {
            log::error!(
                "SubscribeAckPacket: property type {:?} cannot be used in properties!",
                property_type
            );
            return Err(DecodeError::InvalidPropertyType);
        }

        let mut reason_codes = Vec::new();
        while ba.offset() < end {
            let reason_code = ReasonCode::decode(ba)?;
            if !SUBSCRIBE_REASONS.contains(&reason_code) {
                return Err(DecodeError::InvalidReasonCode);
            }
            reason_codes.push(reason_code);
        }

        Ok(Self {
            packet_id,
            properties,
            reason_codes,
        })
    }
}

impl EncodePacket for SubscribeAckPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let old_len = buf.len();

        let fixed_header = self.get_fixed_header()?;
        fixed_header.encode(buf)?;
        self.packet_id.encode(buf)?;
        self.properties.encode(buf)?;
        for reason_code in &self.reason_codes {
            reason_code.encode(buf)?;
        }

        Ok(buf.len() - old_len)
    }
}

impl Packet for SubscribeAckPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::SubscribeAck
    }

    fn bytes(&self) -> Result<usize, VarIntError> {
        let fixed_header = self.get_fixed_header()?;
        Ok(fixed_header.bytes() + fixed_header.remaining_length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_ack_round_trip() {
        let packet = SubscribeAckPacket::with_vec(
            PacketId::new(10),
            vec![ReasonCode::GrantedQoS1, ReasonCode::TopicFilterInvalid],
        );
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(&buf, &[0x90, 0x05, 0x00, 0x0a, 0x00, 0x01, 0x8f]);

        let mut ba = ByteArray::new(&buf);
        let decoded = SubscribeAckPacket::decode(&mut ba).unwrap();
        assert_eq!(decoded, packet);
    }
}
