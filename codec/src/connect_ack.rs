// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use crate::property::check_property_type_list;
use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, Packet,
    PacketType, Properties, PropertyType, ReasonCode, VarIntError,
};

/// `ConnectAckPacket` is the packet sent by the server in response to a
/// CONNECT packet. It MUST be the first packet sent from the server to the
/// client [MQTT-3.2.0-1].
///
/// Basic structure of the packet:
///
/// ```txt
///  7                  0
/// +--------------------+
/// | Fixed header       |
/// +--------------------+
/// | Ack flags          |
/// +--------------------+
/// | Reason code        |
/// +--------------------+
/// | Properties         |
/// +--------------------+
/// ```
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectAckPacket {
    /// Bit 0 of the ack flags is the Session Present flag; bits 1-7 are
    /// reserved and MUST be 0 [MQTT-3.2.2-1].
    ///
    /// If the server accepts a connection with Clean Start set to 1, it
    /// MUST set Session Present to 0 [MQTT-3.2.2-2]. If a server sends a
    /// CONNACK packet containing a non-zero reason code it MUST set
    /// Session Present to 0 [MQTT-3.2.2-6].
    session_present: bool,

    reason_code: ReasonCode,

    properties: Properties,
}

/// Properties available in the CONNACK variable header.
pub const CONNECT_ACK_PROPERTIES: &[PropertyType] = &[
    PropertyType::SessionExpiryInterval,
    PropertyType::ReceiveMaximum,
    PropertyType::MaximumQoS,
    PropertyType::RetainAvailable,
    PropertyType::MaximumPacketSize,
    PropertyType::AssignedClientIdentifier,
    PropertyType::TopicAliasMaximum,
    PropertyType::ReasonString,
    PropertyType::UserProperty,
    PropertyType::WildcardSubscriptionAvailable,
    PropertyType::SubscriptionIdentifierAvailable,
    PropertyType::SharedSubscriptionAvailable,
    PropertyType::ServerKeepAlive,
    PropertyType::ResponseInformation,
    PropertyType::ServerReference,
    PropertyType::AuthenticationMethod,
    PropertyType::AuthenticationData,
];

impl ConnectAckPacket {
    #[must_use]
    pub fn new(session_present: bool, reason_code: ReasonCode) -> Self {
        // A failed CONNACK never reports a resumed session [MQTT-3.2.2-6].
        let session_present = session_present && !reason_code.is_error();
        Self {
            session_present,
            reason_code,
            properties: Properties::new(),
        }
    }

    #[must_use]
    pub const fn session_present(&self) -> bool {
        self.session_present
    }

    #[must_use]
    pub const fn reason_code(&self) -> ReasonCode {
        self.reason_code
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    fn get_fixed_header(&self) -> Result<FixedHeader, VarIntError> {
        let remaining_length = 1 + ReasonCode::bytes() + self.properties.bytes();
        FixedHeader::new(PacketType::ConnectAck, remaining_length)
    }
}

impl DecodePacket for ConnectAckPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::ConnectAck {
            return Err(DecodeError::InvalidPacketType);
        }

        let ack_flags = ba.read_byte()?;
        if ack_flags & 0b1111_1110 != 0 {
            return Err(DecodeError::InvalidPacketFlags);
        }
        let session_present = ack_flags & 0b0000_0001 == 0b0000_0001;

        let reason_code = ReasonCode::decode(ba)?;

        let properties = Properties::decode(ba)?;
        if let Err(property_type) =
            check_property_type_list(properties.props(), CONNECT_ACK_PROPERTIES)
        {
            log::error!(
                "ConnectAckPacket: property type {:?} cannot be used in properties!",
                property_type
            );
            return Err(DecodeError::InvalidPropertyType);
        }

        Ok(Self {
            session_present,
            reason_code,
            properties,
        })
    }
}

impl EncodePacket for ConnectAckPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let old_len = buf.len();

        let fixed_header = self.get_fixed_header()?;
        fixed_header.encode(buf)?;

        buf.push(u8::from(self.session_present));
        self.reason_code.encode(buf)?;
        self.properties.encode(buf)?;

        Ok(buf.len() - old_len)
    }
}

impl Packet for ConnectAckPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::ConnectAck
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
    fn test_connect_ack_round_trip() {
        let packet = ConnectAckPacket::new(true, ReasonCode::Success);
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(&buf, &[0x20, 0x03, 0x01, 0x00, 0x00]);

        let mut ba = ByteArray::new(&buf);
        let decoded = ConnectAckPacket::decode(&mut ba).unwrap();
        assert_eq!(decoded, packet);
        assert!(decoded.session_present());
    }

    #[test]
    fn test_error_ack_clears_session_present() {
        let packet = ConnectAckPacket::new(true, ReasonCode::ClientIdentifierNotValid);
        assert!(!packet.session_present());
    }
}
