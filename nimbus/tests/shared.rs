// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Shared subscription fan-out.

use codec::{MqttPacket, PacketId, PublishPacket, QoS, ReasonCode, SubscribePacket};

mod common;
use common::TestClient;

#[tokio::test]
async fn test_shared_subscription_round_robin() {
    const PORT: u16 = 18881;
    common::start_broker(PORT).await;

    let mut member_a = TestClient::connect(PORT, "a", true).await;
    member_a
        .send(SubscribePacket::new("$share/g/x", QoS::AtMostOnce, PacketId::new(1)).unwrap())
        .await;
    match member_a.recv().await {
        MqttPacket::SubscribeAck(ack) => {
            assert_eq!(ack.reason_codes(), &[ReasonCode::Success]);
        }
        other => panic!("expected SUBACK, got {other:?}"),
    }

    let mut member_b = TestClient::connect(PORT, "b", true).await;
    member_b
        .send(SubscribePacket::new("$share/g/x", QoS::AtMostOnce, PacketId::new(1)).unwrap())
        .await;
    let _suback = member_b.recv().await;

    let mut publisher = TestClient::connect(PORT, "p", true).await;
    for i in 0..4_u8 {
        publisher
            .send(PublishPacket::new("x", QoS::AtMostOnce, &[i]).unwrap())
            .await;
    }

    // Four publishes split 2/2 between the two members, and the topic is
    // the real topic name, not the shared filter.
    for expected in [&[0_u8][..], &[2]] {
        match member_a.recv().await {
            MqttPacket::Publish(publish) => {
                assert_eq!(publish.topic(), "x");
                assert_eq!(publish.message(), expected);
            }
            other => panic!("expected PUBLISH, got {other:?}"),
        }
    }
    for expected in [&[1_u8][..], &[3]] {
        match member_b.recv().await {
            MqttPacket::Publish(publish) => {
                assert_eq!(publish.message(), expected);
            }
            other => panic!("expected PUBLISH, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_shared_and_plain_subscriptions_are_distinct() {
    const PORT: u16 = 18882;
    common::start_broker(PORT).await;

    // One shared member and one plain subscriber: every publish reaches
    // the plain subscriber, the group sees each exactly once too.
    let mut member = TestClient::connect(PORT, "m", true).await;
    member
        .send(SubscribePacket::new("$share/g/x", QoS::AtMostOnce, PacketId::new(1)).unwrap())
        .await;
    let _suback = member.recv().await;

    let mut plain = TestClient::connect(PORT, "q", true).await;
    plain
        .send(SubscribePacket::new("x", QoS::AtMostOnce, PacketId::new(1)).unwrap())
        .await;
    let _suback = plain.recv().await;

    let mut publisher = TestClient::connect(PORT, "p", true).await;
    for i in 0..2_u8 {
        publisher
            .send(PublishPacket::new("x", QoS::AtMostOnce, &[i]).unwrap())
            .await;
    }

    for expected in [&[0_u8][..], &[1]] {
        match plain.recv().await {
            MqttPacket::Publish(publish) => assert_eq!(publish.message(), expected),
            other => panic!("expected PUBLISH, got {other:?}"),
        }
        match member.recv().await {
            MqttPacket::Publish(publish) => assert_eq!(publish.message(), expected),
            other => panic!("expected PUBLISH, got {other:?}"),
        }
    }
}
