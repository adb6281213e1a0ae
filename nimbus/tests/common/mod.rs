// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! In-process broker plus a tiny packet-level test client.

#![allow(dead_code)]

use bytes::{Buf, BytesMut};
use codec::{
    check_frame, ByteArray, ConnectAckPacket, ConnectFlags, ConnectPacket, DecodePacket,
    EncodePacket, FrameStatus, MqttPacket, Property, U32Data,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_PACKET_SIZE: usize = 1024 * 1024;

/// Start a broker on `port` with default limits.
///
/// `init_modules` finishes binding before it returns, so clients may
/// connect as soon as this completes.
pub async fn start_broker(port: u16) {
    let config_text = format!(
        r#"
[[listeners]]
protocol = "mqtt"
address = "127.0.0.1:{port}"
"#
    );
    start_broker_with_config(&config_text).await;
}

/// Start a broker from a TOML snippet.
pub async fn start_broker_with_config(config_text: &str) {
    let config = toml::from_str(config_text).expect("invalid test config");
    let _handles = nimbus::server::run::run_with_config(config)
        .await
        .expect("failed to start broker");
}

/// A packet-level MQTT client speaking through the public codec.
pub struct TestClient {
    stream: TcpStream,
    read_buf: BytesMut,
}

impl TestClient {
    pub async fn dial(port: u16) -> Self {
        let stream = TcpStream::connect(("127.0.0.1", port))
            .await
            .expect("failed to connect to broker");
        Self {
            stream,
            read_buf: BytesMut::new(),
        }
    }

    /// Dial and complete a CONNECT/CONNACK handshake.
    pub async fn connect(port: u16, client_id: &str, clean_start: bool) -> Self {
        let (client, _ack) =
            Self::connect_with(port, client_id, clean_start, 30, None).await;
        client
    }

    /// Dial and run the handshake with full control over the CONNECT
    /// fields; returns the CONNACK for inspection.
    pub async fn connect_with(
        port: u16,
        client_id: &str,
        clean_start: bool,
        keep_alive: u16,
        session_expiry: Option<u32>,
    ) -> (Self, ConnectAckPacket) {
        let mut client = Self::dial(port).await;
        let mut packet = ConnectPacket::new(client_id).unwrap();
        packet.set_connect_flags(ConnectFlags::new(clean_start));
        packet.set_keep_alive(keep_alive);
        if let Some(expiry) = session_expiry {
            packet
                .properties_mut()
                .push(Property::SessionExpiryInterval(U32Data::new(expiry)));
        }
        client.send(packet).await;

        let ack = match client.recv().await {
            MqttPacket::ConnectAck(ack) => ack,
            other => panic!("expected CONNACK, got {other:?}"),
        };
        (client, ack)
    }

    pub async fn send<P: EncodePacket>(&mut self, packet: P) {
        let mut buf = Vec::new();
        packet.encode(&mut buf).expect("failed to encode packet");
        self.stream
            .write_all(&buf)
            .await
            .expect("failed to write packet");
    }

    /// Receive the next packet, panicking after a timeout.
    pub async fn recv(&mut self) -> MqttPacket {
        match timeout(RECV_TIMEOUT, self.recv_inner()).await {
            Ok(Some(packet)) => packet,
            Ok(None) => panic!("connection closed while waiting for a packet"),
            Err(_) => panic!("timed out waiting for a packet"),
        }
    }

    /// Receive the next packet or None on clean close.
    pub async fn recv_or_close(&mut self) -> Option<MqttPacket> {
        timeout(RECV_TIMEOUT, self.recv_inner())
            .await
            .expect("timed out waiting for a packet or close")
    }

    /// True if nothing arrives within `wait`.
    pub async fn silent_for(&mut self, wait: Duration) -> bool {
        timeout(wait, self.recv_inner()).await.is_err()
    }

    async fn recv_inner(&mut self) -> Option<MqttPacket> {
        loop {
            if let FrameStatus::Complete(len) =
                check_frame(&self.read_buf, MAX_PACKET_SIZE).expect("broker sent malformed bytes")
            {
                let frame = self.read_buf.copy_to_bytes(len);
                let mut ba = ByteArray::new(&frame);
                return Some(MqttPacket::decode(&mut ba).expect("broker sent malformed packet"));
            }

            let n_recv = self
                .stream
                .read_buf(&mut self.read_buf)
                .await
                .expect("failed to read from broker");
            if n_recv == 0 {
                return None;
            }
        }
    }
}
