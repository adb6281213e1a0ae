// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Connection handshake behaviours.

use codec::{ConnectFlags, ConnectPacket, MqttPacket, PingRequestPacket, ReasonCode};

mod common;
use common::TestClient;

#[tokio::test]
async fn test_connect_ack() {
    const PORT: u16 = 18831;
    common::start_broker(PORT).await;

    let (_client, ack) = TestClient::connect_with(PORT, "c1", true, 30, None).await;
    assert_eq!(ack.reason_code(), ReasonCode::Success);
    assert!(!ack.session_present());
}

#[tokio::test]
async fn test_ping() {
    const PORT: u16 = 18832;
    common::start_broker(PORT).await;

    let mut client = TestClient::connect(PORT, "pinger", true).await;
    client.send(PingRequestPacket::new()).await;
    assert!(matches!(client.recv().await, MqttPacket::PingResponse(_)));
}

#[tokio::test]
async fn test_keepalive_override() {
    const PORT: u16 = 18833;
    common::start_broker(PORT).await;

    // Keep alive above the broker cap comes back in server-keep-alive.
    let (_client, ack) = TestClient::connect_with(PORT, "k1", true, 1000, None).await;
    assert_eq!(ack.reason_code(), ReasonCode::Success);
    assert_eq!(ack.properties().server_keep_alive(), Some(600));

    // A modest keep alive is accepted as is.
    let (_client, ack) = TestClient::connect_with(PORT, "k2", true, 30, None).await;
    assert_eq!(ack.properties().server_keep_alive(), None);
}

#[tokio::test]
async fn test_assigned_client_id() {
    const PORT: u16 = 18834;
    common::start_broker(PORT).await;

    let (_client, ack) = TestClient::connect_with(PORT, "", true, 30, None).await;
    assert_eq!(ack.reason_code(), ReasonCode::Success);
    let assigned = ack
        .properties()
        .assigned_client_identifier()
        .expect("server must assign a client id");
    assert!(!assigned.is_empty());
    assert!(assigned.len() <= 23);
}

#[tokio::test]
async fn test_second_connect_is_protocol_error() {
    const PORT: u16 = 18835;
    common::start_broker(PORT).await;

    let mut client = TestClient::connect(PORT, "twice", true).await;
    let mut packet = ConnectPacket::new("twice").unwrap();
    packet.set_connect_flags(ConnectFlags::new(true));
    client.send(packet).await;

    match client.recv_or_close().await {
        Some(MqttPacket::Disconnect(disconnect)) => {
            assert_eq!(disconnect.reason_code(), ReasonCode::ProtocolError);
        }
        Some(other) => panic!("expected DISCONNECT, got {other:?}"),
        // Closing without a response is also conformant here.
        None => {}
    }
}

#[tokio::test]
async fn test_session_expiry_capped() {
    const PORT: u16 = 18836;
    common::start_broker(PORT).await;

    // Request beyond the cap: the negotiated value is echoed back.
    let (_client, ack) =
        TestClient::connect_with(PORT, "long-expiry", true, 30, Some(1_000_000)).await;
    assert_eq!(ack.properties().session_expiry_interval(), Some(7200));

    // Within the cap: nothing to echo.
    let (_client, ack) =
        TestClient::connect_with(PORT, "short-expiry", true, 30, Some(60)).await;
    assert_eq!(ack.properties().session_expiry_interval(), None);
}
