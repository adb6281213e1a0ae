// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Session takeover semantics.

use codec::{MqttPacket, PacketId, PublishPacket, QoS, ReasonCode, SubscribePacket};

mod common;
use common::TestClient;

#[tokio::test]
async fn test_takeover_disconnects_old_connection() {
    const PORT: u16 = 18861;
    common::start_broker(PORT).await;

    let (mut first, _ack) =
        TestClient::connect_with(PORT, "c1", false, 30, Some(3600)).await;
    first
        .send(SubscribePacket::new("a/b", QoS::AtLeastOnce, PacketId::new(1)).unwrap())
        .await;
    let _suback = first.recv().await;

    // Second connection with the same id, no clean start.
    let (_second, ack) = TestClient::connect_with(PORT, "c1", false, 30, Some(3600)).await;
    assert!(ack.session_present(), "session state must be resumed");

    // The displaced connection gets DISCONNECT 0x8E, then the close.
    match first.recv_or_close().await {
        Some(MqttPacket::Disconnect(disconnect)) => {
            assert_eq!(disconnect.reason_code(), ReasonCode::SessionTakenOver);
            assert_eq!(first.recv_or_close().await, None);
        }
        Some(other) => panic!("expected DISCONNECT, got {other:?}"),
        None => panic!("expected DISCONNECT before the close"),
    }
}

#[tokio::test]
async fn test_takeover_keeps_subscriptions() {
    const PORT: u16 = 18862;
    common::start_broker(PORT).await;

    let (mut first, _ack) =
        TestClient::connect_with(PORT, "c1", false, 30, Some(3600)).await;
    first
        .send(SubscribePacket::new("a/b", QoS::AtLeastOnce, PacketId::new(1)).unwrap())
        .await;
    let _suback = first.recv().await;

    let (mut second, ack) = TestClient::connect_with(PORT, "c1", false, 30, Some(3600)).await;
    assert!(ack.session_present());
    let _disconnect = first.recv_or_close().await;

    // The old subscription still routes to the new connection.
    let mut publisher = TestClient::connect(PORT, "pub", true).await;
    publisher
        .send(PublishPacket::new("a/b", QoS::AtMostOnce, b"still-there").unwrap())
        .await;

    match second.recv().await {
        MqttPacket::Publish(publish) => {
            assert_eq!(publish.topic(), "a/b");
            assert_eq!(publish.message(), b"still-there");
        }
        other => panic!("expected PUBLISH, got {other:?}"),
    }
}

#[tokio::test]
async fn test_clean_start_discards_session() {
    const PORT: u16 = 18863;
    common::start_broker(PORT).await;

    let (mut first, _ack) =
        TestClient::connect_with(PORT, "c1", false, 30, Some(3600)).await;
    first
        .send(SubscribePacket::new("a/b", QoS::AtLeastOnce, PacketId::new(1)).unwrap())
        .await;
    let _suback = first.recv().await;

    // Clean start evicts and starts fresh: no session present, no
    // surviving subscriptions.
    let (mut second, ack) = TestClient::connect_with(PORT, "c1", true, 30, None).await;
    assert!(!ack.session_present());
    let _disconnect = first.recv_or_close().await;

    let mut publisher = TestClient::connect(PORT, "pub", true).await;
    publisher
        .send(PublishPacket::new("a/b", QoS::AtMostOnce, b"gone").unwrap())
        .await;
    assert!(
        second
            .silent_for(tokio::time::Duration::from_millis(300))
            .await,
        "discarded subscription still delivered"
    );
}
