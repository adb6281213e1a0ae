// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::convert::TryFrom;

use crate::{ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket};

/// A Reason Code is a one byte unsigned value that indicates the result of
/// an operation.
///
/// Reason Codes less than 0x80 indicate successful completion of an
/// operation. Values of 0x80 or greater indicate failure.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasonCode {
    /// Success, also normal disconnection and granted QoS 0.
    #[default]
    Success = 0x00,

    /// Granted QoS 1 in SUBACK.
    GrantedQoS1 = 0x01,

    /// Granted QoS 2 in SUBACK.
    GrantedQoS2 = 0x02,

    /// The message is accepted but there are no subscribers.
    NoMatchingSubscribers = 0x10,

    /// No matching Topic Filter is being used by the Client.
    NoSubscriptionExisted = 0x11,

    /// Continue the authentication with another step.
    ContinueAuthentication = 0x18,

    /// Initiate a re-authentication.
    ReAuthenticate = 0x19,

    /// The server does not wish to reveal the reason for the failure.
    UnspecifiedError = 0x80,

    /// Data within the packet could not be correctly parsed.
    MalformedPacket = 0x81,

    /// Data in the packet does not conform to this specification.
    ProtocolError = 0x82,

    /// The packet is valid but is not accepted by this server.
    ImplementationSpecificError = 0x83,

    /// The server does not support the requested protocol version.
    UnsupportedProtocolVersion = 0x84,

    /// The Client Identifier is a valid string but is not allowed.
    ClientIdentifierNotValid = 0x85,

    /// The server does not accept the user name or password.
    BadUserNameOrPassword = 0x86,

    /// The request is not authorized.
    NotAuthorized = 0x87,

    /// The server is not available.
    ServerUnavailable = 0x88,

    /// The server is busy, try again later.
    ServerBusy = 0x89,

    /// The Client has been banned by administrative action.
    Banned = 0x8a,

    /// The server is shutting down.
    ServerShuttingDown = 0x8b,

    /// The authentication method is not supported.
    BadAuthenticationMethod = 0x8c,

    /// The connection is closed because no packet has been received for
    /// 1.5 times the keep alive time.
    KeepAliveTimeout = 0x8d,

    /// Another connection using the same ClientID has connected, causing
    /// this connection to be closed.
    SessionTakenOver = 0x8e,

    /// The Topic Filter is correctly formed but is not accepted.
    TopicFilterInvalid = 0x8f,

    /// The Topic Name is correctly formed but is not accepted.
    TopicNameInvalid = 0x90,

    /// The specified Packet Identifier is already in use.
    PacketIdentifierInUse = 0x91,

    /// The Packet Identifier is not known.
    PacketIdentifierNotFound = 0x92,

    /// More publications were received than Receive Maximum allows.
    ReceiveMaximumExceeded = 0x93,

    /// The Topic Alias is invalid.
    TopicAliasInvalid = 0x94,

    /// The packet exceeded the maximum permissible size.
    PacketTooLarge = 0x95,

    /// The received data rate is too high.
    MessageRateTooHigh = 0x96,

    /// An implementation or administrative imposed limit has been exceeded.
    QuotaExceeded = 0x97,

    /// The connection is closed due to an administrative action.
    AdministrativeAction = 0x98,

    /// The payload format does not match the Payload Format Indicator.
    PayloadFormatInvalid = 0x99,

    /// The server does not support retained messages.
    RetainNotSupported = 0x9a,

    /// The Client specified a QoS greater than the maximum QoS.
    QoSNotSupported = 0x9b,

    /// The Client should temporarily use another server.
    UseAnotherServer = 0x9c,

    /// The Client should permanently use another server.
    ServerMoved = 0x9d,

    /// The server does not support Shared Subscriptions.
    SharedSubscriptionsNotSupported = 0x9e,

    /// The connection rate limit has been exceeded.
    ConnectionRateExceeded = 0x9f,

    /// The maximum connection time authorized for this connection has been
    /// exceeded.
    MaximumConnectTime = 0xa0,

    /// The server does not support Subscription Identifiers.
    SubscriptionIdentifiersNotSupported = 0xa1,

    /// The server does not support Wildcard Subscriptions.
    WildcardSubscriptionsNotSupported = 0xa2,
}

impl ReasonCode {
    /// Byte length in packet.
    #[must_use]
    pub const fn bytes() -> usize {
        1
    }

    /// Whether this code reports an error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        (*self as u8) >= 0x80
    }
}

impl TryFrom<u8> for ReasonCode {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0x00 => Ok(Self::Success),
            0x01 => Ok(Self::GrantedQoS1),
            0x02 => Ok(Self::GrantedQoS2),
            0x10 => Ok(Self::NoMatchingSubscribers),
            0x11 => Ok(Self::NoSubscriptionExisted),
            0x18 => Ok(Self::ContinueAuthentication),
            0x19 => Ok(Self::ReAuthenticate),
            0x80 => Ok(Self::UnspecifiedError),
            0x81 => Ok(Self::MalformedPacket),
            0x82 => Ok(Self::ProtocolError),
            0x83 => Ok(Self::ImplementationSpecificError),
            0x84 => Ok(Self::UnsupportedProtocolVersion),
            0x85 => Ok(Self::ClientIdentifierNotValid),
            0x86 => Ok(Self::BadUserNameOrPassword),
            0x87 => Ok(Self::NotAuthorized),
            0x88 => Ok(Self::ServerUnavailable),
            0x89 => Ok(Self::ServerBusy),
            0x8a => Ok(Self::Banned),
            0x8b => Ok(Self::ServerShuttingDown),
            0x8c => Ok(Self::BadAuthenticationMethod),
            0x8d => Ok(Self::KeepAliveTimeout),
            0x8e => Ok(Self::SessionTakenOver),
            0x8f => Ok(Self::TopicFilterInvalid),
            0x90 => Ok(Self::TopicNameInvalid),
            0x91 => Ok(Self::PacketIdentifierInUse),
            0x92 => Ok(Self::PacketIdentifierNotFound),
            0x93 => Ok(Self::ReceiveMaximumExceeded),
            0x94 => Ok(Self::TopicAliasInvalid),
            0x95 => Ok(Self::PacketTooLarge),
            0x96 => Ok(Self::MessageRateTooHigh),
            0x97 => Ok(Self::QuotaExceeded),
            0x98 => Ok(Self::AdministrativeAction),
            0x99 => Ok(Self::PayloadFormatInvalid),
            0x9a => Ok(Self::RetainNotSupported),
            0x9b => Ok(Self::QoSNotSupported),
            0x9c => Ok(Self::UseAnotherServer),
            0x9d => Ok(Self::ServerMoved),
            0x9e => Ok(Self::SharedSubscriptionsNotSupported),
            0x9f => Ok(Self::ConnectionRateExceeded),
            0xa0 => Ok(Self::MaximumConnectTime),
            0xa1 => Ok(Self::SubscriptionIdentifiersNotSupported),
            0xa2 => Ok(Self::WildcardSubscriptionsNotSupported),
            _ => Err(DecodeError::InvalidReasonCode),
        }
    }
}

impl DecodePacket for ReasonCode {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let byte = ba.read_byte()?;
        Self::try_from(byte)
    }
}

impl EncodePacket for ReasonCode {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        buf.push(*self as u8);
        Ok(Self::bytes())
    }
}
