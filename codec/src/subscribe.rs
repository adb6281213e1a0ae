// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::convert::TryFrom;

use crate::property::{check_multiple_subscription_identifiers, check_property_type_list};
use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, Packet, PacketId,
    PacketType, Properties, PropertyType, QoS, StringData, VarIntError,
};

/// Retain handling option of a subscription.
///
/// Parsed and stored, but inert: the broker keeps no retained message
/// store.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RetainHandling {
    /// Send retained messages at the time of the subscribe.
    #[default]
    SendAtSubscribe = 0,

    /// Send retained messages only if the subscription does not already
    /// exist.
    SendAtSubscribeIfNew = 1,

    /// Do not send retained messages.
    DoNotSend = 2,
}

impl TryFrom<u8> for RetainHandling {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::SendAtSubscribe),
            1 => Ok(Self::SendAtSubscribeIfNew),
            2 => Ok(Self::DoNotSend),
            _ => Err(DecodeError::InvalidSubscriptionOptions),
        }
    }
}

/// Subscription options byte:
///
/// ```txt
///  7 6 5 4 3 2 1 0
/// +---+---+-+-+---+
/// | 0 | H |R|L| Q |
/// +---+---+-+-+---+
/// ```
///
/// Q = maximum QoS, L = no-local, R = retain-as-published,
/// H = retain-handling. Bits 6 and 7 are reserved and MUST be 0
/// [MQTT-3.8.3-5].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOptions {
    qos: QoS,
    no_local: bool,
    retain_as_published: bool,
    retain_handling: RetainHandling,
}

impl SubscribeOptions {
    #[must_use]
    pub const fn new(qos: QoS) -> Self {
        Self {
            qos,
            no_local: false,
            retain_as_published: false,
            retain_handling: RetainHandling::SendAtSubscribe,
        }
    }

    #[must_use]
    pub const fn qos(&self) -> QoS {
        self.qos
    }

    pub fn set_qos(&mut self, qos: QoS) -> &mut Self {
        self.qos = qos;
        self
    }

    pub fn set_no_local(&mut self, no_local: bool) -> &mut Self {
        self.no_local = no_local;
        self
    }

    #[must_use]
    pub const fn no_local(&self) -> bool {
        self.no_local
    }

    pub fn set_retain_as_published(&mut self, retain_as_published: bool) -> &mut Self {
        self.retain_as_published = retain_as_published;
        self
    }

    #[must_use]
    pub const fn retain_as_published(&self) -> bool {
        self.retain_as_published
    }

    #[must_use]
    pub const fn retain_handling(&self) -> RetainHandling {
        self.retain_handling
    }

    /// Byte length in packet.
    #[must_use]
    pub const fn bytes() -> usize {
        1
    }
}

impl DecodePacket for SubscribeOptions {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let byte = ba.read_byte()?;
        if byte & 0b1100_0000 != 0 {
            return Err(DecodeError::InvalidSubscriptionOptions);
        }
        let qos = QoS::try_from(byte & 0b0000_0011)?;
        let no_local = byte & 0b0000_0100 != 0;
        let retain_as_published = byte & 0b0000_1000 != 0;
        let retain_handling = RetainHandling::try_from((byte & 0b0011_0000) >> 4)?;
        Ok(Self {
            qos,
            no_local,
            retain_as_published,
            retain_handling,
        })
    }
}

impl EncodePacket for SubscribeOptions {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let byte = (self.qos as u8)
            | u8::from(self.no_local) << 2
            | u8::from(self.retain_as_published) << 3
            | (self.retain_handling as u8) << 4;
        buf.push(byte);
        Ok(Self::bytes())
    }
}

/// One (topic filter, options) pair in the SUBSCRIBE payload.
///
/// The filter travels as a raw string: per-filter validation is the
/// server's business so that an invalid filter earns its own SUBACK
/// reason code instead of poisoning the whole packet.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubscribeTopic {
    filter: StringData,
    options: SubscribeOptions,
}

impl SubscribeTopic {
    /// Create a new entry from `filter` and `options`.
    ///
    /// # Errors
    ///
    /// Returns error if `filter` is not a valid string.
    pub fn new(filter: &str, options: SubscribeOptions) -> Result<Self, EncodeError> {
        let filter = StringData::from_str(filter)?;
        Ok(Self { filter, options })
    }

    #[must_use]
    pub fn filter(&self) -> &str {
        self.filter.as_str()
    }

    #[must_use]
    pub const fn options(&self) -> SubscribeOptions {
        self.options
    }

    #[must_use]
    pub fn bytes(&self) -> usize {
        self.filter.bytes() + SubscribeOptions::bytes()
    }
}

impl DecodePacket for SubscribeTopic {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let filter = StringData::decode(ba)?;
        if filter.is_empty() {
            return Err(DecodeError::InvalidTopicFilter);
        }
        let options = SubscribeOptions::decode(ba)?;
        Ok(Self { filter, options })
    }
}

impl EncodePacket for SubscribeTopic {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let filter_bytes = self.filter.encode(buf)?;
        let options_bytes = self.options.encode(buf)?;
        Ok(filter_bytes + options_bytes)
    }
}

/// `SubscribePacket` creates one or more subscriptions.
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
/// | Topic filter 0     |
/// +--------------------+
/// | Options 0          |
/// +--------------------+
/// | Topic filter ..    |
/// +--------------------+
/// | Options ..         |
/// +--------------------+
/// ```
///
/// The payload MUST contain at least one filter/options pair
/// [MQTT-3.8.3-2].
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubscribePacket {
    packet_id: PacketId,
    properties: Properties,
    topics: Vec<SubscribeTopic>,
}

/// Properties available in the SUBSCRIBE variable header.
pub const SUBSCRIBE_PROPERTIES: &[PropertyType] = &[
    PropertyType::SubscriptionIdentifier,
    PropertyType::UserProperty,
];

impl SubscribePacket {
    /// Create a new SUBSCRIBE packet with a single entry.
    ///
    /// # Errors
    ///
    /// Returns error if `filter` is invalid.
    pub fn new(filter: &str, qos: QoS, packet_id: PacketId) -> Result<Self, EncodeError> {
        let topic = SubscribeTopic::new(filter, SubscribeOptions::new(qos))?;
        Ok(Self {
            packet_id,
            properties: Properties::new(),
            topics: vec![topic],
        })
    }

    #[must_use]
    pub fn with_topics(packet_id: PacketId, topics: Vec<SubscribeTopic>) -> Self {
        Self {
            packet_id,
            properties: Properties::new(),
            topics,
        }
    }

    #[must_use]
    pub const fn packet_id(&self) -> PacketId {
        self.packet_id
    }

    #[must_use]
    pub fn topics(&self) -> &[SubscribeTopic] {
        &self.topics
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    fn get_fixed_header(&self) -> Result<FixedHeader, VarIntError> {
        let remaining_length = PacketId::bytes()
            + self.properties.bytes()
            + self.topics.iter().map(SubscribeTopic::bytes).sum::<usize>();
        FixedHeader::new(PacketType::Subscribe, remaining_length)
    }
}

impl DecodePacket for SubscribePacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::Subscribe {
            return Err(DecodeError::InvalidPacketType);
        }

        let end = ba.offset() + fixed_header.remaining_length();

        let packet_id = PacketId::decode(ba)?;
        if packet_id.value() == 0 {
            return Err(DecodeError::InvalidPacketId);
        }

        let properties = Properties::decode(ba)?;
        if let Err(property_type) =
            check_property_type_list(properties.props(), SUBSCRIBE_PROPERTIES)
        {
            log::error!(
                "SubscribePacket: property type {:?} cannot be used in properties!",
                property_type
            );
            return Err(DecodeError::InvalidPropertyType);
        }
        if check_multiple_subscription_identifiers(properties.props()).is_err() {
            return Err(DecodeError::DuplicateProperty);
        }

        let mut topics = Vec::new();
        while ba.offset() < end {
            topics.push(SubscribeTopic::decode(ba)?);
        }
        if ba.offset() != end {
            return Err(DecodeError::InvalidRemainingLength);
        }

        // A SUBSCRIBE packet with no payload is a Protocol Error
        // [MQTT-3.8.3-2].
        if topics.is_empty() {
            return Err(DecodeError::InvalidTopicFilter);
        }

        Ok(Self {
            packet_id,
            properties,
            topics,
        })
    }
}

impl EncodePacket for SubscribePacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let old_len = buf.len();

        let fixed_header = self.get_fixed_header()?;
        fixed_header.encode(buf)?;
        self.packet_id.encode(buf)?;
        self.properties.encode(buf)?;
        for topic in &self.topics {
            topic.encode(buf)?;
        }

        Ok(buf.len() - old_len)
    }
}

impl Packet for SubscribePacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Subscribe
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
    fn test_subscribe_round_trip() {
        let packet = SubscribePacket::new("a/b", QoS::AtLeastOnce, PacketId::new(10)).unwrap();
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(
            &buf,
            &[0x82, 0x09, 0x00, 0x0a, 0x00, 0x00, 0x03, b'a', b'/', b'b', 0x01]
        );

        let mut ba = ByteArray::new(&buf);
        let decoded = SubscribePacket::decode(&mut ba).unwrap();
        assert_eq!(decoded, packet);
        assert_eq!(decoded.topics().len(), 1);
        assert_eq!(decoded.topics()[0].filter(), "a/b");
        assert_eq!(decoded.topics()[0].options().qos(), QoS::AtLeastOnce);
    }

    #[test]
    fn test_subscribe_options_reserved_bits() {
        let buf = [0b0100_0001];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            SubscribeOptions::decode(&mut ba),
            Err(DecodeError::InvalidSubscriptionOptions)
        );
    }

    #[test]
    fn test_subscribe_options_round_trip() {
        let mut options = SubscribeOptions::new(QoS::AtLeastOnce);
        options.set_no_local(true).set_retain_as_published(true);
        let mut buf = Vec::new();
        options.encode(&mut buf).unwrap();
        assert_eq!(&buf, &[0b0000_1101]);

        let mut ba = ByteArray::new(&buf);
        assert_eq!(SubscribeOptions::decode(&mut ba), Ok(options));
    }

    #[test]
    fn test_subscribe_empty_payload_rejected() {
        // Packet id + empty properties, no filters.
        let buf = [0x82, 0x03, 0x00, 0x01, 0x00];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            SubscribePacket::decode(&mut ba),
            Err(DecodeError::InvalidTopicFilter)
        );
    }

    #[test]
    fn test_subscribe_multiple_topics_keep_order() {
        let topics = vec![
            SubscribeTopic::new("x", SubscribeOptions::new(QoS::AtMostOnce)).unwrap(),
            SubscribeTopic::new("y/#", SubscribeOptions::new(QoS::AtLeastOnce)).unwrap(),
        ];
        let packet = SubscribePacket::with_topics(PacketId::new(2), topics);
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();

        let mut ba = ByteArray::new(&buf);
        let decoded = SubscribePacket::decode(&mut ba).unwrap();
        assert_eq!(decoded.topics()[0].filter(), "x");
        assert_eq!(decoded.topics()[1].filter(), "y/#");
    }
}
