// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::convert::TryFrom;

use crate::{
    BinaryData, BoolData, ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket,
    PubTopic, StringData, StringPairData, U16Data, U32Data, VarInt,
};

/// Property types which may appear more than once in a property list.
///
/// Subscription identifiers repeat in PUBLISH packets forwarded for
/// overlapping subscriptions; SUBSCRIBE packets additionally restrict them
/// to one, see [`check_multiple_subscription_identifiers`].
pub const MULTIPLE_PROPERTIES: &[PropertyType] = &[
    PropertyType::UserProperty,
    PropertyType::SubscriptionIdentifier,
];

/// SUBSCRIBE allows at most one subscription identifier.
///
/// # Errors
///
/// Returns the offending property type.
pub fn check_multiple_subscription_identifiers(
    properties: &[Property],
) -> Result<(), PropertyType> {
    let count = properties
        .iter()
        .filter(|p| p.property_type() == PropertyType::SubscriptionIdentifier)
        .count();
    if count > 1 {
        return Err(PropertyType::SubscriptionIdentifier);
    }
    Ok(())
}

/// Check that all `properties` belong to the `types` set, and that no
/// singleton property repeats.
///
/// # Errors
///
/// Returns the offending property type.
pub fn check_property_type_list(
    properties: &[Property],
    types: &[PropertyType],
) -> Result<(), PropertyType> {
    if properties.is_empty() {
        return Ok(());
    }

    for property in properties {
        if !types.contains(&property.property_type()) {
            return Err(property.property_type());
        }
    }

    for property_type in types {
        let count = properties
            .iter()
            .filter(|p| p.property_type() == *property_type)
            .count();
        if count > 1 && !MULTIPLE_PROPERTIES.contains(property_type) {
            return Err(*property_type);
        }
    }

    Ok(())
}

/// Property identifier byte.
#[allow(clippy::module_name_repetitions)]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    PayloadFormatIndicator = 0x01,
    MessageExpiryInterval = 0x02,
    ContentType = 0x03,
    ResponseTopic = 0x08,
    CorrelationData = 0x09,
    SubscriptionIdentifier = 0x0b,
    SessionExpiryInterval = 0x11,
    AssignedClientIdentifier = 0x12,
    ServerKeepAlive = 0x13,
    AuthenticationMethod = 0x15,
    AuthenticationData = 0x16,
    RequestProblemInformation = 0x17,
    WillDelayInterval = 0x18,
    RequestResponseInformation = 0x19,
    ResponseInformation = 0x1a,
    ServerReference = 0x1c,
    ReasonString = 0x1f,
    ReceiveMaximum = 0x21,
    TopicAliasMaximum = 0x22,
    TopicAlias = 0x23,
    MaximumQoS = 0x24,
    RetainAvailable = 0x25,
    UserProperty = 0x26,
    MaximumPacketSize = 0x27,
    WildcardSubscriptionAvailable = 0x28,
    SubscriptionIdentifierAvailable = 0x29,
    SharedSubscriptionAvailable = 0x2a,
}

impl PropertyType {
    /// Get byte length of the identifier in packet.
    ///
    /// All defined identifiers fit in a single var int byte.
    #[must_use]
    pub const fn bytes() -> usize {
        1
    }
}

impl TryFrom<u8> for PropertyType {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0x01 => Ok(Self::PayloadFormatIndicator),
            0x02 => Ok(Self::MessageExpiryInterval),
            0x03 => Ok(Self::ContentType),
            0x08 => Ok(Self::ResponseTopic),
            0x09 => Ok(Self::CorrelationData),
            0x0b => Ok(Self::SubscriptionIdentifier),
            0x11 => Ok(Self::SessionExpiryInterval),
            0x12 => Ok(Self::AssignedClientIdentifier),
            0x13 => Ok(Self::ServerKeepAlive),
            0x15 => Ok(Self::AuthenticationMethod),
            0x16 => Ok(Self::AuthenticationData),
            0x17 => Ok(Self::RequestProblemInformation),
            0x18 => Ok(Self::WillDelayInterval),
            0x19 => Ok(Self::RequestResponseInformation),
            0x1a => Ok(Self::ResponseInformation),
            0x1c => Ok(Self::ServerReference),
            0x1f => Ok(Self::ReasonString),
            0x21 => Ok(Self::ReceiveMaximum),
            0x22 => Ok(Self::TopicAliasMaximum),
            0x23 => Ok(Self::TopicAlias),
            0x24 => Ok(Self::MaximumQoS),
            0x25 => Ok(Self::RetainAvailable),
            0x26 => Ok(Self::UserProperty),
            0x27 => Ok(Self::MaximumPacketSize),
            0x28 => Ok(Self::WildcardSubscriptionAvailable),
            0x29 => Ok(Self::SubscriptionIdentifierAvailable),
            0x2a => Ok(Self::SharedSubscriptionAvailable),
            _ => Err(DecodeError::InvalidPropertyType),
        }
    }
}

/// A single decoded property.
///
/// Each property is only legal in an enumerated set of packet types; the
/// per-packet `*_PROPERTIES` tables describe those sets and
/// [`check_property_type_list`] enforces them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    /// Byte. Used in PUBLISH, Will Properties.
    ///
    /// 0 means unspecified bytes, 1 means UTF-8 encoded character data.
    PayloadFormatIndicator(BoolData),

    /// Four Byte Integer, lifetime of the message in seconds.
    /// Used in PUBLISH, Will Properties.
    MessageExpiryInterval(U32Data),

    /// UTF-8 Encoded String describing the content of the message.
    /// Used in PUBLISH, Will Properties.
    ContentType(StringData),

    /// Topic Name for a response message.
    /// Used in PUBLISH, Will Properties.
    ResponseTopic(PubTopic),

    /// Binary Data used by the sender of a request message to identify
    /// which request a response message is for.
    /// Used in PUBLISH, Will Properties.
    CorrelationData(BinaryData),

    /// Variable Byte Integer, 1..=268,435,455. Zero is a Protocol Error.
    /// Used in PUBLISH (server to client) and SUBSCRIBE.
    SubscriptionIdentifier(VarInt),

    /// Four Byte Integer, Session Expiry Interval in seconds.
    ///
    /// 0 (or absent) ends the session when the network connection closes;
    /// 0xFFFF_FFFF means the session does not expire.
    /// Used in CONNECT, CONNACK, DISCONNECT.
    SessionExpiryInterval(U32Data),

    /// The Client Identifier assigned by the server because a zero length
    /// one was found in the CONNECT packet [MQTT-3.2.2-16].
    /// Used in CONNACK.
    AssignedClientIdentifier(StringData),

    /// Keep Alive time assigned by the server, which overrides the value
    /// the client asked for [MQTT-3.2.2-21].
    /// Used in CONNACK.
    ServerKeepAlive(U16Data),

    /// Name of the extended authentication method.
    /// Used in CONNECT, CONNACK, AUTH.
    AuthenticationMethod(StringData),

    /// Authentication data as defined by the authentication method.
    /// Used in CONNECT, CONNACK, AUTH.
    AuthenticationData(BinaryData),

    /// Byte, 0 or 1. Whether Reason String or User Properties may be sent
    /// in the case of failures.
    /// Used in CONNECT.
    RequestProblemInformation(BoolData),

    /// Four Byte Integer, seconds to delay publishing the will message.
    /// Will Properties only.
    WillDelayInterval(U32Data),

    /// Byte, 0 or 1. Whether the server may return Response Information
    /// in the CONNACK.
    /// Used in CONNECT.
    RequestResponseInformation(BoolData),

    /// UTF-8 Encoded String used as the basis for creating a Response
    /// Topic.
    /// Used in CONNACK.
    ResponseInformation(StringData),

    /// UTF-8 Encoded String identifying another server to use.
    /// Used in CONNACK, DISCONNECT.
    ServerReference(StringData),

    /// Human readable diagnostic string. Not parsed by clients.
    /// Used in CONNACK, PUBACK, SUBACK, UNSUBACK, DISCONNECT, AUTH.
    ReasonString(StringData),

    /// Two Byte Integer, maximum number of QoS > 0 publications the
    /// sender is willing to process concurrently. Zero is a Protocol
    /// Error.
    /// Used in CONNECT, CONNACK.
    ReceiveMaximum(U16Data),

    /// Two Byte Integer, highest Topic Alias value accepted.
    /// Used in CONNECT, CONNACK.
    TopicAliasMaximum(U16Data),

    /// Two Byte Integer identifying the topic instead of the Topic Name.
    /// Zero is a Protocol Error.
    /// Used in PUBLISH.
    TopicAlias(U16Data),

    /// Byte, 0 or 1. Maximum QoS the server supports.
    /// Used in CONNACK.
    MaximumQoS(BoolData),

    /// Byte, 0 or 1. Whether the server supports retained messages.
    /// Used in CONNACK.
    RetainAvailable(BoolData),

    /// UTF-8 String Pair. May appear multiple times; order is preserved.
    /// Used in all packets that carry properties.
    UserProperty(StringPairData),

    /// Four Byte Integer, maximum packet size the sender is willing to
    /// accept. Zero is a Protocol Error.
    /// Used in CONNECT, CONNACK.
    MaximumPacketSize(U32Data),

    /// Byte, 0 or 1. Whether the server supports Wildcard Subscriptions.
    /// Used in CONNACK.
    WildcardSubscriptionAvailable(BoolData),

    /// Byte, 0 or 1. Whether the server supports Subscription Identifiers.
    /// Used in CONNACK.
    SubscriptionIdentifierAvailable(BoolData),

    /// Byte, 0 or 1. Whether the server supports Shared Subscriptions.
    /// Used in CONNACK.
    SharedSubscriptionAvailable(BoolData),
}

impl Property {
    #[must_use]
    pub const fn property_type(&self) -> PropertyType {
        match self {
            Self::PayloadFormatIndicator(_) => PropertyType::PayloadFormatIndicator,
            Self::MessageExpiryInterval(_) => PropertyType::MessageExpiryInterval,
            Self::ContentType(_) => PropertyType::ContentType,
            Self::ResponseTopic(_) => PropertyType::ResponseTopic,
            Self::CorrelationData(_) => PropertyType::CorrelationData,
            Self::SubscriptionIdentifier(_) => PropertyType::SubscriptionIdentifier,
            Self::SessionExpiryInterval(_) => PropertyType::SessionExpiryInterval,
            Self::AssignedClientIdentifier(_) => PropertyType::AssignedClientIdentifier,
            Self::ServerKeepAlive(_) => PropertyType::ServerKeepAlive,
            Self::AuthenticationMethod(_) => PropertyType::AuthenticationMethod,
            Self::AuthenticationData(_) => PropertyType::AuthenticationData,
            Self::RequestProblemInformation(_) => PropertyType::RequestProblemInformation,
            Self::WillDelayInterval(_) => PropertyType::WillDelayInterval,
            Self::RequestResponseInformation(_) => PropertyType::RequestResponseInformation,
            Self::ResponseInformation(_) => PropertyType::ResponseInformation,
            Self::ServerReference(_) => PropertyType::ServerReference,
            Self::ReasonString(_) => PropertyType::ReasonString,
            Self::ReceiveMaximum(_) => PropertyType::ReceiveMaximum,
            Self::TopicAliasMaximum(_) => PropertyType::TopicAliasMaximum,
            Self::TopicAlias(_) => PropertyType::TopicAlias,
            Self::MaximumQoS(_) => PropertyType::MaximumQoS,
            Self::RetainAvailable(_) => PropertyType::RetainAvailable,
            Self::UserProperty(_) => PropertyType::UserProperty,
            Self::MaximumPacketSize(_) => PropertyType::MaximumPacketSize,
            Self::WildcardSubscriptionAvailable(_) => PropertyType::WildcardSubscriptionAvailable,
            Self::SubscriptionIdentifierAvailable(_) => {
                PropertyType::SubscriptionIdentifierAvailable
            }
            Self::SharedSubscriptionAvailable(_) => PropertyType::SharedSubscriptionAvailable,
        }
    }

    /// Byte length in packet, identifier byte included.
    #[must_use]
    pub fn bytes(&self) -> usize {
        let value_bytes = match self {
            Self::PayloadFormatIndicator(_)
            | Self::RequestProblemInformation(_)
            | Self::RequestResponseInformation(_)
            | Self::MaximumQoS(_)
            | Self::RetainAvailable(_)
            | Self::WildcardSubscriptionAvailable(_)
            | Self::SubscriptionIdentifierAvailable(_)
            | Self::SharedSubscriptionAvailable(_) => BoolData::bytes(),
            Self::MessageExpiryInterval(_)
            | Self::SessionExpiryInterval(_)
            | Self::WillDelayInterval(_)
            | Self::MaximumPacketSize(_) => U32Data::bytes(),
            Self::ServerKeepAlive(_)
            | Self::ReceiveMaximum(_)
            | Self::TopicAliasMaximum(_)
            | Self::TopicAlias(_) => U16Data::bytes(),
            Self::ContentType(s)
            | Self::AssignedClientIdentifier(s)
            | Self::AuthenticationMethod(s)
            | Self::ResponseInformation(s)
            | Self::ServerReference(s)
            | Self::ReasonString(s) => s.bytes(),
            Self::ResponseTopic(t) => t.bytes(),
            Self::CorrelationData(b) | Self::AuthenticationData(b) => b.bytes(),
            Self::SubscriptionIdentifier(v) => v.bytes(),
            Self::UserProperty(pair) => pair.bytes(),
        };
        PropertyType::bytes() + value_bytes
    }
}

impl DecodePacket for Property {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let id = VarInt::decode(ba)?;
        let id = u8::try_from(id.value()).map_err(|_| DecodeError::InvalidPropertyType)?;
        let property_type = PropertyType::try_from(id)?;
        match property_type {
            PropertyType::PayloadFormatIndicator => {
                BoolData::decode(ba).map(Self::PayloadFormatIndicator)
            }
            PropertyType::MessageExpiryInterval => {
                U32Data::decode(ba).map(Self::MessageExpiryInterval)
            }
            PropertyType::ContentType => StringData::decode(ba).map(Self::ContentType),
            PropertyType::ResponseTopic => PubTopic::decode(ba).map(Self::ResponseTopic),
            PropertyType::CorrelationData => BinaryData::decode(ba).map(Self::CorrelationData),
            PropertyType::SubscriptionIdentifier => {
                let value = VarInt::decode(ba)?;
                // The Subscription Identifier can have the value of 1 to
                // 268,435,455; zero is a Protocol Error.
                if value.is_empty() {
                    return Err(DecodeError::InvalidPropertyValue);
                }
                Ok(Self::SubscriptionIdentifier(value))
            }
            PropertyType::SessionExpiryInterval => {
                U32Data::decode(ba).map(Self::SessionExpiryInterval)
            }
            PropertyType::AssignedClientIdentifier => {
                StringData::decode(ba).map(Self::AssignedClientIdentifier)
            }
            PropertyType::ServerKeepAlive => U16Data::decode(ba).map(Self::ServerKeepAlive),
            PropertyType::AuthenticationMethod => {
                StringData::decode(ba).map(Self::AuthenticationMethod)
            }
            PropertyType::AuthenticationData => {
                BinaryData::decode(ba).map(Self::AuthenticationData)
            }
            PropertyType::RequestProblemInformation => {
                BoolData::decode(ba).map(Self::RequestProblemInformation)
            }
            PropertyType::WillDelayInterval => U32Data::decode(ba).map(Self::WillDelayInterval),
            PropertyType::RequestResponseInformation => {
                BoolData::decode(ba).map(Self::RequestResponseInformation)
            }
            PropertyType::ResponseInformation => {
                StringData::decode(ba).map(Self::ResponseInformation)
            }
            PropertyType::ServerReference => StringData::decode(ba).map(Self::ServerReference),
            PropertyType::ReasonString => StringData::decode(ba).map(Self::ReasonString),
            PropertyType::ReceiveMaximum => {
                let value = U16Data::decode(ba)?;
                if value.value() == 0 {
                    return Err(DecodeError::InvalidPropertyValue);
                }
                Ok(Self::ReceiveMaximum(value))
            }
            PropertyType::TopicAliasMaximum => U16Data::decode(ba).map(Self::TopicAliasMaximum),
            PropertyType::TopicAlias => {
                let value = U16Data::decode(ba)?;
                if value.value() == 0 {
                    return Err(DecodeError::InvalidPropertyValue);
                }
                Ok(Self::TopicAlias(value))
            }
            PropertyType::MaximumQoS => BoolData::decode(ba).map(Self::MaximumQoS),
            PropertyType::RetainAvailable => BoolData::decode(ba).map(Self::RetainAvailable),
            PropertyType::UserProperty => StringPairData::decode(ba).map(Self::UserProperty),
            PropertyType::MaximumPacketSize => {
                let value = U32Data::decode(ba)?;
                if value.value() == 0 {
                    return Err(DecodeError::InvalidPropertyValue);
                }
                Ok(Self::MaximumPacketSize(value))
            }
            PropertyType::WildcardSubscriptionAvailable => {
                BoolData::decode(ba).map(Self::WildcardSubscriptionAvailable)
            }
            PropertyType::SubscriptionIdentifierAvailable => {
                BoolData::decode(ba).map(Self::SubscriptionIdentifierAvailable)
            }
            PropertyType::SharedSubscriptionAvailable => {
                BoolData::decode(ba).map(Self::SharedSubscriptionAvailable)
            }
        }
    }
}

impl EncodePacket for Property {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        buf.push(self.property_type() as u8);
        let value_bytes = match self {
            Self::PayloadFormatIndicator(v)
            | Self::RequestProblemInformation(v)
            | Self::RequestResponseInformation(v)
            | Self::MaximumQoS(v)
            | Self::RetainAvailable(v)
            | Self::WildcardSubscriptionAvailable(v)
            | Self::SubscriptionIdentifierAvailable(v)
            | Self::SharedSubscriptionAvailable(v) => v.encode(buf)?,
            Self::MessageExpiryInterval(v)
            | Self::SessionExpiryInterval(v)
            | Self::WillDelayInterval(v)
            | Self::MaximumPacketSize(v) => v.encode(buf)?,
            Self::ServerKeepAlive(v)
            | Self::ReceiveMaximum(v)
            | Self::TopicAliasMaximum(v)
            | Self::TopicAlias(v) => v.encode(buf)?,
            Self::ContentType(v)
            | Self::AssignedClientIdentifier(v)
            | Self::AuthenticationMethod(v)
            | Self::ResponseInformation(v)
            | Self::ServerReference(v)
            | Self::ReasonString(v) => v.encode(buf)?,
            Self::ResponseTopic(v) => v.encode(buf)?,
            Self::CorrelationData(v) | Self::AuthenticationData(v) => v.encode(buf)?,
            Self::SubscriptionIdentifier(v) => v.encode(buf)?,
            Self::UserProperty(v) => v.encode(buf)?,
        };
        Ok(PropertyType::bytes() + value_bytes)
    }
}

/// A property list: a var int total length followed by the concatenation
/// of (identifier, value) pairs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Properties {
    props: Vec<Property>,
}

impl Properties {
    #[must_use]
    pub const fn new() -> Self {
        Self { props: Vec::new() }
    }

    #[must_use]
    pub fn props(&self) -> &[Property] {
        &self.props
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn push(&mut self, property: Property) {
        self.props.push(property);
    }

    /// Byte length in packet, the var int length prefix included.
    #[must_use]
    pub fn bytes(&self) -> usize {
        let payload = self.payload_bytes();
        // The payload length always fits: a packet cannot exceed the var
        // int range in the first place.
        VarInt::from(payload).map_or(1, |v| v.bytes()) + payload
    }

    fn payload_bytes(&self) -> usize {
        self.props.iter().map(Property::bytes).sum()
    }

    #[must_use]
    pub fn session_expiry_interval(&self) -> Option<u32> {
        self.props.iter().find_map(|p| match p {
            Property::SessionExpiryInterval(v) => Some(v.value()),
            _ => None,
        })
    }

    #[must_use]
    pub fn server_keep_alive(&self) -> Option<u16> {
        self.props.iter().find_map(|p| match p {
            Property::ServerKeepAlive(v) => Some(v.value()),
            _ => None,
        })
    }

    #[must_use]
    pub fn assigned_client_identifier(&self) -> Option<&str> {
        self.props.iter().find_map(|p| match p {
            Property::AssignedClientIdentifier(v) => Some(v.as_str()),
            _ => None,
        })
    }

    #[must_use]
    pub fn receive_maximum(&self) -> Option<u16> {
        self.props.iter().find_map(|p| match p {
            Property::ReceiveMaximum(v) => Some(v.value()),
            _ => None,
        })
    }

    #[must_use]
    pub fn maximum_packet_size(&self) -> Option<u32> {
        self.props.iter().find_map(|p| match p {
            Property::MaximumPacketSize(v) => Some(v.value()),
            _ => None,
        })
    }

    #[must_use]
    pub fn subscription_identifier(&self) -> Option<usize> {
        self.props.iter().find_map(|p| match p {
            Property::SubscriptionIdentifier(v) => Some(v.value()),
            _ => None,
        })
    }

    #[must_use]
    pub fn authentication_method(&self) -> Option<&str> {
        self.props.iter().find_map(|p| match p {
            Property::AuthenticationMethod(v) => Some(v.as_str()),
            _ => None,
        })
    }
}

impl DecodePacket for Properties {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let total = VarInt::decode(ba)?.value();
        if ba.remaining_bytes() < total {
            return Err(DecodeError::InsufficientData);
        }

        let end = ba.offset() + total;
        let mut props = Vec::new();
        while ba.offset() < end {
            let property = Property::decode(ba)?;
            // A property must not extend past the declared region.
            if ba.offset() > end {
                return Err(DecodeError::InvalidRemainingLength);
            }
            props.push(property);
        }

        Ok(Self { props })
    }
}

impl EncodePacket for Properties {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let payload = self.payload_bytes();
        let len = VarInt::from(payload).map_err(|_| EncodeError::InvalidVarInt)?;
        let mut written = len.encode(buf)?;
        for property in &self.props {
            written += property.encode(buf)?;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_round_trip() {
        let mut properties = Properties::new();
        properties.push(Property::SessionExpiryInterval(U32Data::new(3600)));
        properties.push(Property::ReceiveMaximum(U16Data::new(20)));
        properties.push(Property::UserProperty(
            StringPairData::new("region", "eu").unwrap(),
        ));

        let mut buf = Vec::new();
        let written = properties.encode(&mut buf).unwrap();
        assert_eq!(written, properties.bytes());

        let mut ba = ByteArray::new(&buf);
        let decoded = Properties::decode(&mut ba).unwrap();
        assert_eq!(decoded, properties);
    }

    #[test]
    fn test_property_overruns_declared_length() {
        // Declared length 2, but a session-expiry-interval needs 5 bytes.
        let buf = [0x02, 0x11, 0x00, 0x00, 0x0e, 0x10];
        let mut ba = ByteArray::new(&buf);
        assert!(Properties::decode(&mut ba).is_err());
    }

    #[test]
    fn test_duplicate_singleton_rejected() {
        let mut properties = Properties::new();
        properties.push(Property::SessionExpiryInterval(U32Data::new(1)));
        properties.push(Property::SessionExpiryInterval(U32Data::new(2)));
        assert_eq!(
            check_property_type_list(
                properties.props(),
                &[PropertyType::SessionExpiryInterval]
            ),
            Err(PropertyType::SessionExpiryInterval)
        );
    }

    #[test]
    fn test_repeated_user_property_allowed() {
        let mut properties = Properties::new();
        properties.push(Property::UserProperty(
            StringPairData::new("a", "1").unwrap(),
        ));
        properties.push(Property::UserProperty(
            StringPairData::new("a", "2").unwrap(),
        ));
        assert!(
            check_property_type_list(properties.props(), &[PropertyType::UserProperty]).is_ok()
        );
    }

    #[test]
    fn test_zero_receive_maximum_rejected() {
        let buf = [0x03, 0x21, 0x00, 0x00];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            Properties::decode(&mut ba),
            Err(DecodeError::InvalidPropertyValue)
        );
    }
}
