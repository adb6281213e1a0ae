// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::io::Write;

use crate::property::check_property_type_list;
use crate::utils::validate_client_id;
use crate::{
    BinaryData, ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader,
    Packet, PacketType, Properties, PropertyType, ProtocolLevel, PubTopic, QoS, StringData,
    VarIntError,
};

/// Protocol name of every CONNECT packet.
pub const PROTOCOL_NAME: &str = "MQTT";

/// Structure of the connect flags byte:
///
/// ```txt
///  7 6 5 4 3 2 1 0
/// +-+-+-+-+-+-+-+-+
/// |U|P|R| Q |W|C|0|
/// +-+-+-+-+-+-+-+-+
/// ```
///
/// U = username, P = password, R = will retain, Q = will QoS,
/// W = will flag, C = clean start. Bit 0 is reserved and MUST be 0
/// [MQTT-3.1.2-3].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectFlags {
    clean_start: bool,
    will: bool,
    will_qos: QoS,
    will_retain: bool,
    has_password: bool,
    has_username: bool,
}

impl ConnectFlags {
    #[must_use]
    pub const fn new(clean_start: bool) -> Self {
        Self {
            clean_start,
            will: false,
            will_qos: QoS::AtMostOnce,
            will_retain: false,
            has_password: false,
            has_username: false,
        }
    }

    #[must_use]
    pub const fn clean_start(&self) -> bool {
        self.clean_start
    }

    #[must_use]
    pub const fn will(&self) -> bool {
        self.will
    }

    #[must_use]
    pub const fn will_qos(&self) -> QoS {
        self.will_qos
    }

    #[must_use]
    pub const fn will_retain(&self) -> bool {
        self.will_retain
    }

    #[must_use]
    pub const fn has_username(&self) -> bool {
        self.has_username
    }

    #[must_use]
    pub const fn has_password(&self) -> bool {
        self.has_password
    }

    /// Byte length in packet.
    #[must_use]
    pub const fn bytes() -> usize {
        1
    }
}

impl DecodePacket for ConnectFlags {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let flags = ba.read_byte()?;

        // The Server MUST validate that the reserved flag in the CONNECT
        // packet is set to 0 [MQTT-3.1.2-3].
        if flags & 0b0000_0001 != 0 {
            return Err(DecodeError::InvalidPacketFlags);
        }

        let clean_start = flags & 0b0000_0010 != 0;
        let will = flags & 0b0000_0100 != 0;
        let will_qos = QoS::try_from((flags & 0b0001_1000) >> 3)?;
        let will_retain = flags & 0b0010_0000 != 0;
        let has_password = flags & 0b0100_0000 != 0;
        let has_username = flags & 0b1000_0000 != 0;

        // If the Will Flag is set to 0, then Will QoS and Will Retain MUST
        // be 0 [MQTT-3.1.2-11, MQTT-3.1.2-13].
        if !will && (will_qos != QoS::AtMostOnce || will_retain) {
            return Err(DecodeError::InvalidPacketFlags);
        }

        Ok(Self {
            clean_start,
            will,
            will_qos,
            will_retain,
            has_password,
            has_username,
        })
    }
}

impl EncodePacket for ConnectFlags {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let flags = u8::from(self.clean_start) << 1
            | u8::from(self.will) << 2
            | (self.will_qos as u8) << 3
            | u8::from(self.will_retain) << 5
            | u8::from(self.has_password) << 6
            | u8::from(self.has_username) << 7;
        buf.push(flags);
        Ok(Self::bytes())
    }
}

/// `ConnectPacket` is the first packet a client sends to the server after
/// the network connection is established.
///
/// Basic structure of the packet:
///
/// ```txt
///  7                  0
/// +--------------------+
/// | Fixed header       |
/// +--------------------+
/// | Protocol name      |
/// +--------------------+
/// | Protocol level     |
/// +--------------------+
/// | Connect flags      |
/// +--------------------+
/// | Keep alive         |
/// +--------------------+
/// | Properties         |
/// +--------------------+
/// | Client id          |
/// +--------------------+
/// | Will properties    |
/// +--------------------+
/// | Will topic         |
/// +--------------------+
/// | Will payload       |
/// +--------------------+
/// | Username           |
/// +--------------------+
/// | Password           |
/// +--------------------+
/// ```
///
/// Will fields, username and password are only present when the matching
/// connect flag bits are set.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectPacket {
    connect_flags: ConnectFlags,

    /// Time interval measured in seconds. A value of zero disables the
    /// keep alive mechanism on the client side; the server may still
    /// override it with a server keep alive [MQTT-3.1.2-21].
    keep_alive: u16,

    properties: Properties,

    client_id: StringData,

    will_properties: Properties,
    will_topic: Option<PubTopic>,
    will_payload: BinaryData,

    username: StringData,
    password: BinaryData,
}

/// Properties available in the CONNECT variable header.
pub const CONNECT_PROPERTIES: &[PropertyType] = &[
    PropertyType::SessionExpiryInterval,
    PropertyType::ReceiveMaximum,
    PropertyType::MaximumPacketSize,
    PropertyType::TopicAliasMaximum,
    PropertyType::RequestResponseInformation,
    PropertyType::RequestProblemInformation,
    PropertyType::UserProperty,
    PropertyType::AuthenticationMethod,
    PropertyType::AuthenticationData,
];

/// Properties available in the will property list.
pub const WILL_PROPERTIES: &[PropertyType] = &[
    PropertyType::WillDelayInterval,
    PropertyType::PayloadFormatIndicator,
    PropertyType::MessageExpiryInterval,
    PropertyType::ContentType,
    PropertyType::ResponseTopic,
    PropertyType::CorrelationData,
    PropertyType::UserProperty,
];

impl ConnectPacket {
    /// Create a new CONNECT packet with `client_id`.
    ///
    /// # Errors
    ///
    /// Returns error if `client_id` is invalid.
    pub fn new(client_id: &str) -> Result<Self, EncodeError> {
        let client_id = StringData::from_str(client_id)?;
        Ok(Self {
            connect_flags: ConnectFlags::new(true),
            keep_alive: 60,
            client_id,
            ..Self::default()
        })
    }

    pub fn set_connect_flags(&mut self, connect_flags: ConnectFlags) -> &mut Self {
        self.connect_flags = connect_flags;
        self
    }

    #[must_use]
    pub const fn connect_flags(&self) -> &ConnectFlags {
        &self.connect_flags
    }

    pub fn set_keep_alive(&mut self, keep_alive: u16) -> &mut Self {
        self.keep_alive = keep_alive;
        self
    }

    #[must_use]
    pub const fn keep_alive(&self) -> u16 {
        self.keep_alive
    }

    /// Update client id.
    ///
    /// # Errors
    ///
    /// Returns error if `client_id` is invalid.
    pub fn set_client_id(&mut self, client_id: &str) -> Result<&mut Self, EncodeError> {
        self.client_id = StringData::from_str(client_id)?;
        Ok(self)
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        self.client_id.as_str()
    }

    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    #[must_use]
    pub fn password(&self) -> &[u8] {
        self.password.as_slice()
    }

    #[must_use]
    pub fn will_topic(&self) -> Option<&str> {
        self.will_topic.as_ref().map(PubTopic::as_str)
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    fn get_fixed_header(&self) -> Result<FixedHeader, VarIntError> {
        let mut remaining_length = 2 + PROTOCOL_NAME.len()
            + 1 // protocol level
            + ConnectFlags::bytes()
            + 2 // keep alive
            + self.properties.bytes()
            + self.client_id.bytes();
        if self.connect_flags.will() {
            remaining_length += self.will_properties.bytes();
            if let Some(will_topic) = &self.will_topic {
                remaining_length += will_topic.bytes();
            }
            remaining_length += self.will_payload.bytes();
        }
        if self.connect_flags.has_username() {
            remaining_length += self.username.bytes();
        }
        if self.connect_flags.has_password() {
            remaining_length += self.password.bytes();
        }

        FixedHeader::new(PacketType::Connect, remaining_length)
    }
}

impl DecodePacket for ConnectPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::Connect {
            return Err(DecodeError::InvalidPacketType);
        }

        // The protocol name MUST be the UTF-8 string "MQTT" [MQTT-3.1.2-1].
        let protocol_name = StringData::decode(ba)?;
        if protocol_name.as_str() != PROTOCOL_NAME {
            return Err(DecodeError::InvalidProtocolName);
        }

        let _protocol_level = ProtocolLevel::decode(ba)?;
        let connect_flags = ConnectFlags::decode(ba)?;
        let keep_alive = ba.read_u16()?;

        let properties = Properties::decode(ba)?;
        if let Err(property_type) = check_property_type_list(properties.props(), CONNECT_PROPERTIES)
        {
            log::error!(
                "ConnectPacket: property type {:?} cannot be used in properties!",
                property_type
            );
            return Err(DecodeError::InvalidPropertyType);
        }
        // It is a Protocol Error to include Authentication Data if there is
        // no Authentication Method.
        if properties.authentication_method().is_none()
            && properties
                .props()
                .iter()
                .any(|p| p.property_type() == PropertyType::AuthenticationData)
        {
            return Err(DecodeError::InvalidPropertyType);
        }

        // An empty client id is tolerated here; the server decides whether
        // to assign one or to reject the connection.
        let client_id = StringData::decode(ba)?;
        if !client_id.is_empty() {
            validate_client_id(client_id.as_str())?;
        }

        let (will_properties, will_topic, will_payload) = if connect_flags.will() {
            let will_properties = Properties::decode(ba)?;
            if let Err(property_type) =
                check_property_type_list(will_properties.props(), WILL_PROPERTIES)
            {
                log::error!(
                    "ConnectPacket: property type {:?} cannot be used in will properties!",
                    property_type
                );
                return Err(DecodeError::InvalidPropertyType);
            }
            let will_topic = PubTopic::decode(ba)?;
            let will_payload = BinaryData::decode(ba)?;
            (will_properties, Some(will_topic), will_payload)
        } else {
            (Properties::new(), None, BinaryData::default())
        };

        let username = if connect_flags.has_username() {
            StringData::decode(ba)?
        } else {
            StringData::default()
        };
        let password = if connect_flags.has_password() {
            BinaryData::decode(ba)?
        } else {
            BinaryData::default()
        };

        Ok(Self {
            connect_flags,
            keep_alive,
            properties,
            client_id,
            will_properties,
            will_topic,
            will_payload,
            username,
            password,
        })
    }
}

impl EncodePacket for ConnectPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let old_len = buf.len();

        let fixed_header = self.get_fixed_header()?;
        fixed_header.encode(buf)?;

        let protocol_name = StringData::from_str(PROTOCOL_NAME)?;
        protocol_name.encode(buf)?;
        ProtocolLevel::V5.encode(buf)?;
        self.connect_flags.encode(buf)?;
        buf.write_all(&self.keep_alive.to_be_bytes())?;
        self.properties.encode(buf)?;

        self.client_id.encode(buf)?;
        if self.connect_flags.will() {
            self.will_properties.encode(buf)?;
            if let Some(will_topic) = &self.will_topic {
                will_topic.encode(buf)?;
            }
            self.will_payload.encode(buf)?;
        }
        if self.connect_flags.has_username() {
            self.username.encode(buf)?;
        }
        if self.connect_flags.has_password() {
            self.password.encode(buf)?;
        }

        Ok(buf.len() - old_len)
    }
}

impl Packet for ConnectPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Connect
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
    fn test_connect_round_trip() {
        let mut packet = ConnectPacket::new("c1").unwrap();
        packet.set_keep_alive(30);

        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();

        let mut ba = ByteArray::new(&buf);
        let decoded = ConnectPacket::decode(&mut ba).unwrap();
        assert_eq!(decoded, packet);
        assert_eq!(decoded.client_id(), "c1");
        assert_eq!(decoded.keep_alive(), 30);
        assert!(decoded.connect_flags().clean_start());
    }

    #[test]
    fn test_connect_rejects_bad_protocol_name() {
        let mut packet = ConnectPacket::new("c1").unwrap();
        packet.set_keep_alive(30);
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        // Corrupt the protocol name: "MQTT" -> "MQTS".
        buf[7] = b'S';

        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            ConnectPacket::decode(&mut ba),
            Err(DecodeError::InvalidProtocolName)
        );
    }

    #[test]
    fn test_connect_rejects_reserved_flag() {
        let mut packet = ConnectPacket::new("c1").unwrap();
        packet.set_keep_alive(30);
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        // The connect flags byte follows fixed header (2), protocol
        // name (6) and level (1).
        buf[9] |= 0b0000_0001;

        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            ConnectPacket::decode(&mut ba),
            Err(DecodeError::InvalidPacketFlags)
        );
    }
}
