// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use bytes::{Buf, BytesMut};
use codec::{check_frame, DecodeError, EncodePacket, FrameStatus, Packet, ReasonCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::{self, Duration, Instant};

use crate::commands::{ChannelToListenerCmd, ListenerToChannelCmd};
use crate::error::{Error, ErrorKind};
use crate::stream::Stream;
use crate::types::ChannelId;

mod client;
mod config;
mod listener;

pub use config::ChannelConfig;

/// Keep alive grace factor: the server waits one and a half times the
/// negotiated interval before declaring the client dead [MQTT-3.1.2-22].
const KEEP_ALIVE_FACTOR_MS: u64 = 1500;

/// Seconds a closing connection may take to drain its final packets.
const CLOSE_GRACE_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Waiting for the CONNECT packet.
    Init,

    /// CONNECT forwarded, waiting for the session manager's verdict.
    Connecting,

    /// Handshake finished, normal packet exchange.
    Connected,

    /// Closing after the write buffer drains.
    Disconnecting,

    /// Terminal.
    Disconnected,
}

/// One accepted socket: buffers, timers and the per-connection protocol
/// state machine.
///
/// A channel is driven exclusively by its `run_loop`; events are strictly
/// serialized. The session (subscriptions, queued messages) lives in the
/// dispatcher and survives the channel when the session expiry interval
/// permits.
#[derive(Debug)]
pub struct Channel {
    id: ChannelId,
    config: ChannelConfig,

    reader: ReadHalf<Stream>,
    writer: WriteHalf<Stream>,
    read_buf: BytesMut,
    write_buf: BytesMut,

    status: Status,
    client_id: String,

    /// Effective keep alive seconds after negotiation; 0 disables the
    /// timer.
    keep_alive: u16,

    /// Set when the client asked for more than the broker allows; echoed
    /// in the CONNACK.
    server_keep_alive: Option<u16>,

    /// Set when the broker generated the client id; echoed in the
    /// CONNACK.
    assigned_client_id: Option<String>,

    /// Negotiated session expiry, and whether it differs from the
    /// client's request.
    session_expiry: u32,
    echo_session_expiry: bool,

    /// Read or connect deadline; None disables the timer branch.
    deadline: Option<Instant>,

    sender: Sender<ChannelToListenerCmd>,
    receiver: Receiver<ListenerToChannelCmd>,
}

impl Channel {
    #[must_use]
    pub fn new(
        id: ChannelId,
        config: ChannelConfig,
        stream: Stream,
        sender: Sender<ChannelToListenerCmd>,
        receiver: Receiver<ListenerToChannelCmd>,
    ) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        let deadline = if config.connect_timeout() > 0 {
            Some(Instant::now() + Duration::from_secs(config.connect_timeout()))
        } else {
            None
        };
        Self {
            id,
            config,
            reader,
            writer,
            read_buf: BytesMut::with_capacity(4096),
            write_buf: BytesMut::new(),
            status: Status::Init,
            client_id: String::new(),
            keep_alive: 0,
            server_keep_alive: None,
            assigned_client_id: None,
            session_expiry: 0,
            echo_session_expiry: false,
            deadline,
            sender,
            receiver,
        }
    }

    pub async fn run_loop(mut self) {
        loop {
            if self.status == Status::Disconnected {
                break;
            }

            let deadline = self
                .deadline
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
            let readable = matches!(
                self.status,
                Status::Init | Status::Connecting | Status::Connected
            );

            tokio::select! {
                ret = self.reader.read_buf(&mut self.read_buf), if readable => {
                    match ret {
                        Ok(n_recv) => {
                            if let Err(err) = self.on_read(n_recv).await {
                                log::error!("channel {}: read handling failed: {err}", self.id);
                                self.status = Status::Disconnected;
                            }
                        }
                        Err(err) => {
                            log::info!("channel {}: socket read error: {err}", self.id);
                            self.status = Status::Disconnected;
                        }
                    }
                }

                Some(cmd) = self.receiver.recv() => {
                    if let Err(err) = self.handle_listener_cmd(cmd).await {
                        log::error!("channel {}: listener cmd failed: {err}", self.id);
                    }
                }

                ret = self.writer.write(&self.write_buf), if !self.write_buf.is_empty() => {
                    match ret {
                        Ok(n_sent) => {
                            self.write_buf.advance(n_sent);
                            if self.write_buf.is_empty() && self.status == Status::Disconnecting {
                                self.status = Status::Disconnected;
                            }
                        }
                        Err(err) => {
                            log::info!("channel {}: socket write error: {err}", self.id);
                            self.status = Status::Disconnected;
                        }
                    }
                }

                () = time::sleep_until(deadline), if self.deadline.is_some() => {
                    self.on_timeout().await;
                }
            }
        }

        let _ret = self.writer.shutdown().await;

        if let Err(err) = self
            .sender
            .send(ChannelToListenerCmd::Closed(self.id))
            .await
        {
            log::error!(
                "channel {}: failed to send closed cmd to listener: {err:?}",
                self.id
            );
        }
    }

    /// Bytes arrived: re-arm the keep alive timer and run the framer over
    /// the accumulated buffer.
    async fn on_read(&mut self, n_recv: usize) -> Result<(), Error> {
        if n_recv == 0 {
            log::info!("channel {}: connection closed by peer", self.id);
            self.status = Status::Disconnected;
            return Ok(());
        }

        self.reset_deadline();

        loop {
            if !matches!(
                self.status,
                Status::Init | Status::Connecting | Status::Connected
            ) {
                break;
            }
            match check_frame(&self.read_buf, self.config.max_packet_size()) {
                Ok(FrameStatus::Partial) => break,
                Ok(FrameStatus::Complete(len)) => {
                    let frame = self.read_buf.split_to(len);
                    self.handle_client_frame(&frame).await?;
                }
                Err(err) => {
                    self.on_decode_error(err).await?;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Map a malformed or protocol violating byte sequence to the wire
    /// behaviour of [MQTT-4.13]: one DISCONNECT with the most specific
    /// reason code, then close. Before the handshake nothing is sent at
    /// all.
    pub(super) async fn on_decode_error(&mut self, err: DecodeError) -> Result<(), Error> {
        log::error!("channel {}: decode error: {err}", self.id);
        if self.status == Status::Init {
            self.status = Status::Disconnected;
            return Ok(());
        }

        let reason_code = match err {
            DecodeError::PacketTooLarge => ReasonCode::PacketTooLarge,
            DecodeError::InvalidTopicName => ReasonCode::TopicNameInvalid,
            DecodeError::InvalidTopicFilter => ReasonCode::TopicFilterInvalid,
            DecodeError::InvalidPropertyType
            | DecodeError::DuplicateProperty
            | DecodeError::InvalidPropertyValue
            | DecodeError::InvalidPacketId => ReasonCode::ProtocolError,
            _ => ReasonCode::MalformedPacket,
        };
        self.disconnect_with(reason_code).await
    }

    /// Queue `packet` for delivery and enforce the write buffer cap.
    pub(super) async fn send<P: EncodePacket + Packet>(&mut self, packet: P) -> Result<(), Error> {
        if self.status == Status::Disconnected {
            return Err(Error::from_string(
                ErrorKind::SocketError,
                format!(
                    "channel {}: cannot send {:?} after disconnect",
                    self.id,
                    packet.packet_type()
                ),
            ));
        }

        let mut buf = Vec::new();
        packet.encode(&mut buf)?;
        self.write_buf.extend_from_slice(&buf);

        if self.write_buf.len() > self.config.max_write_buffer() {
            // The peer stopped reading; shed it instead of growing
            // without bound.
            log::warn!(
                "channel {}: write buffer over limit ({} bytes), closing",
                self.id,
                self.write_buf.len()
            );
            return self.disconnect_with(ReasonCode::ReceiveMaximumExceeded).await;
        }
        Ok(())
    }

    /// Send DISCONNECT with `reason_code`, then close once the write
    /// buffer drains.
    pub(super) async fn disconnect_with(&mut self, reason_code: ReasonCode) -> Result<(), Error> {
        if matches!(self.status, Status::Disconnecting | Status::Disconnected) {
            return Ok(());
        }
        let packet = codec::DisconnectPacket::with_reason(reason_code);
        let mut buf = Vec::new();
        packet.encode(&mut buf)?;
        self.write_buf.extend_from_slice(&buf);
        self.close_after_drain();
        Ok(())
    }

    /// Close once the write buffer drains, or after a grace period if the
    /// peer never reads it.
    pub(super) fn close_after_drain(&mut self) {
        self.status = Status::Disconnecting;
        self.deadline = Some(Instant::now() + Duration::from_secs(CLOSE_GRACE_SECS));
    }

    /// Keep alive or connect timeout fired.
    async fn on_timeout(&mut self) {
        match self.status {
            Status::Init | Status::Connecting => {
                log::info!("channel {}: no CONNECT in time, closing", self.id);
                self.status = Status::Disconnected;
            }
            Status::Connected => {
                log::info!(
                    "channel {}: keep alive expired for client {}, closing",
                    self.id,
                    self.client_id
                );
                let _ret = self.disconnect_with(ReasonCode::KeepAliveTimeout).await;
            }
            Status::Disconnecting | Status::Disconnected => {
                self.status = Status::Disconnected;
            }
        }
    }

    /// Re-arm the read deadline after inbound bytes.
    pub(super) fn reset_deadline(&mut self) {
        self.deadline = match self.status {
            Status::Init | Status::Connecting => {
                if self.config.connect_timeout() > 0 {
                    Some(Instant::now() + Duration::from_secs(self.config.connect_timeout()))
                } else {
                    None
                }
            }
            _ => {
                if self.keep_alive > 0 {
                    Some(
                        Instant::now()
                            + Duration::from_millis(
                                u64::from(self.keep_alive) * KEEP_ALIVE_FACTOR_MS,
                            ),
                    )
                } else {
                    None
                }
            }
        };
    }
}
