// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Offline QoS 1 retention and redelivery.

use codec::{
    DisconnectPacket, MqttPacket, PacketId, PublishAckPacket, PublishPacket, Property, QoS,
    SubscribePacket, U32Data,
};

mod common;
use common::TestClient;

async fn publish_qos1(publisher: &mut TestClient, topic: &str, payload: &[u8], id: u16) {
    let mut packet = PublishPacket::new(topic, QoS::AtLeastOnce, payload).unwrap();
    packet.set_packet_id(PacketId::new(id));
    publisher.send(packet).await;
    match publisher.recv().await {
        MqttPacket::PublishAck(ack) => assert_eq!(ack.packet_id(), PacketId::new(id)),
        other => panic!("expected PUBACK, got {other:?}"),
    }
}

#[tokio::test]
async fn test_offline_qos1_retention() {
    const PORT: u16 = 18871;
    common::start_broker(PORT).await;

    // Subscribe with a one hour session expiry, then drop off.
    let (mut sub, _ack) = TestClient::connect_with(PORT, "c1", true, 30, Some(3600)).await;
    sub.send(SubscribePacket::new("t", QoS::AtLeastOnce, PacketId::new(1)).unwrap())
        .await;
    let _suback = sub.recv().await;
    sub.send(DisconnectPacket::new()).await;
    drop(sub);

    // Three publishes while the subscriber is away.
    let mut publisher = TestClient::connect(PORT, "c2", true).await;
    publish_qos1(&mut publisher, "t", b"one", 11).await;
    publish_qos1(&mut publisher, "t", b"two", 12).await;
    publish_qos1(&mut publisher, "t", b"three", 13).await;

    // Reconnect without clean start: the backlog arrives in order,
    // DUP=0, before anything else.
    let (mut sub, ack) = TestClient::connect_with(PORT, "c1", false, 30, Some(3600)).await;
    assert!(ack.session_present());

    for expected in [&b"one"[..], b"two", b"three"] {
        match sub.recv().await {
            MqttPacket::Publish(publish) => {
                assert_eq!(publish.message(), expected);
                assert_eq!(publish.qos(), QoS::AtLeastOnce);
                assert!(!publish.dup(), "first attempt must not carry DUP");
                sub.send(PublishAckPacket::new(publish.packet_id())).await;
            }
            other => panic!("expected PUBLISH, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_session_expiry_zero_drops_state() {
    const PORT: u16 = 18872;
    common::start_broker(PORT).await;

    // No session expiry: the subscription dies with the connection.
    let mut sub = TestClient::connect(PORT, "c1", true).await;
    sub.send(SubscribePacket::new("t", QoS::AtLeastOnce, PacketId::new(1)).unwrap())
        .await;
    let _suback = sub.recv().await;
    sub.send(DisconnectPacket::new()).await;
    drop(sub);

    let mut publisher = TestClient::connect(PORT, "c2", true).await;
    publish_qos1(&mut publisher, "t", b"lost", 21).await;

    let (mut sub, ack) = TestClient::connect_with(PORT, "c1", false, 30, None).await;
    assert!(!ack.session_present());
    assert!(
        sub.silent_for(tokio::time::Duration::from_millis(300)).await,
        "message should not have been retained"
    );
}

#[tokio::test]
async fn test_disconnect_expiry_override() {
    const PORT: u16 = 18873;
    common::start_broker(PORT).await;

    // Connect with an expiry, then override it to 0 at DISCONNECT time:
    // the session is destroyed at once.
    let (mut sub, _ack) = TestClient::connect_with(PORT, "c1", true, 30, Some(3600)).await;
    sub.send(SubscribePacket::new("t", QoS::AtLeastOnce, PacketId::new(1)).unwrap())
        .await;
    let _suback = sub.recv().await;

    let mut disconnect = DisconnectPacket::new();
    disconnect
        .properties_mut()
        .push(Property::SessionExpiryInterval(U32Data::new(0)));
    sub.send(disconnect).await;
    drop(sub);

    let mut publisher = TestClient::connect(PORT, "c2", true).await;
    publish_qos1(&mut publisher, "t", b"gone", 31).await;

    let (_sub, ack) = TestClient::connect_with(PORT, "c1", false, 30, None).await;
    assert!(!ack.session_present());
}
