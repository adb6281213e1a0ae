// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Publish routing and QoS 1 acknowledgement flows.

use codec::{
    MqttPacket, PacketId, PublishAckPacket, PublishPacket, QoS, ReasonCode, SubscribePacket,
};

mod common;
use common::TestClient;

#[tokio::test]
async fn test_qos0_delivery() {
    const PORT: u16 = 18841;
    common::start_broker(PORT).await;

    let mut sub = TestClient::connect(PORT, "c1", true).await;
    sub.send(SubscribePacket::new("a/b", QoS::AtLeastOnce, PacketId::new(1)).unwrap())
        .await;
    match sub.recv().await {
        MqttPacket::SubscribeAck(ack) => {
            assert_eq!(ack.reason_codes(), &[ReasonCode::GrantedQoS1]);
        }
        other => panic!("expected SUBACK, got {other:?}"),
    }

    let mut publisher = TestClient::connect(PORT, "c2", true).await;
    publisher
        .send(PublishPacket::new("a/b", QoS::AtMostOnce, b"hi").unwrap())
        .await;

    match sub.recv().await {
        MqttPacket::Publish(publish) => {
            assert_eq!(publish.topic(), "a/b");
            assert_eq!(publish.qos(), QoS::AtMostOnce);
            assert_eq!(publish.message(), b"hi");
            assert!(!publish.dup());
        }
        other => panic!("expected PUBLISH, got {other:?}"),
    }
}

#[tokio::test]
async fn test_qos1_acknowledge_cycle() {
    const PORT: u16 = 18842;
    common::start_broker(PORT).await;

    let mut sub = TestClient::connect(PORT, "c1", true).await;
    sub.send(SubscribePacket::new("a/b", QoS::AtLeastOnce, PacketId::new(1)).unwrap())
        .await;
    let _suback = sub.recv().await;

    let mut publisher = TestClient::connect(PORT, "c2", true).await;
    let mut packet = PublishPacket::new("a/b", QoS::AtLeastOnce, b"x").unwrap();
    packet.set_packet_id(PacketId::new(7));
    publisher.send(packet).await;

    // The publisher gets its PUBACK with the same id after routing.
    match publisher.recv().await {
        MqttPacket::PublishAck(ack) => {
            assert_eq!(ack.packet_id(), PacketId::new(7));
            assert_eq!(ack.reason_code(), ReasonCode::Success);
        }
        other => panic!("expected PUBACK, got {other:?}"),
    }

    // The subscriber sees a broker-allocated packet id.
    let first_id = match sub.recv().await {
        MqttPacket::Publish(publish) => {
            assert_eq!(publish.qos(), QoS::AtLeastOnce);
            assert_eq!(publish.message(), b"x");
            publish.packet_id()
        }
        other => panic!("expected PUBLISH, got {other:?}"),
    };
    assert_eq!(first_id, PacketId::new(1));
    sub.send(PublishAckPacket::new(first_id)).await;

    // After the ack releases the id, the next delivery takes a fresh one.
    let mut packet = PublishPacket::new("a/b", QoS::AtLeastOnce, b"y").unwrap();
    packet.set_packet_id(PacketId::new(8));
    publisher.send(packet).await;
    let _puback = publisher.recv().await;

    match sub.recv().await {
        MqttPacket::Publish(publish) => {
            assert_eq!(publish.packet_id(), PacketId::new(2));
        }
        other => panic!("expected PUBLISH, got {other:?}"),
    }
}

#[tokio::test]
async fn test_qos_downgraded_to_subscription() {
    const PORT: u16 = 18843;
    common::start_broker(PORT).await;

    let mut sub = TestClient::connect(PORT, "c1", true).await;
    sub.send(SubscribePacket::new("t", QoS::AtMostOnce, PacketId::new(1)).unwrap())
        .await;
    match sub.recv().await {
        MqttPacket::SubscribeAck(ack) => {
            assert_eq!(ack.reason_codes(), &[ReasonCode::Success]);
        }
        other => panic!("expected SUBACK, got {other:?}"),
    }

    let mut publisher = TestClient::connect(PORT, "c2", true).await;
    let mut packet = PublishPacket::new("t", QoS::AtLeastOnce, b"m").unwrap();
    packet.set_packet_id(PacketId::new(3));
    publisher.send(packet).await;
    let _puback = publisher.recv().await;

    // QoS 1 publish, QoS 0 subscription: delivered at QoS 0.
    match sub.recv().await {
        MqttPacket::Publish(publish) => {
            assert_eq!(publish.qos(), QoS::AtMostOnce);
            assert_eq!(publish.packet_id(), PacketId::new(0));
        }
        other => panic!("expected PUBLISH, got {other:?}"),
    }
}

#[tokio::test]
async fn test_qos2_publish_rejected() {
    const PORT: u16 = 18844;
    common::start_broker(PORT).await;

    let mut client = TestClient::connect(PORT, "c1", true).await;
    let mut packet = PublishPacket::new("t", QoS::ExactOnce, b"m").unwrap();
    packet.set_packet_id(PacketId::new(5));
    client.send(packet).await;

    match client.recv_or_close().await {
        Some(MqttPacket::Disconnect(disconnect)) => {
            assert_eq!(disconnect.reason_code(), ReasonCode::QoSNotSupported);
        }
        Some(other) => panic!("expected DISCONNECT, got {other:?}"),
        None => {}
    }
}
