// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! SUBSCRIBE and UNSUBSCRIBE acknowledgement rules.

use codec::{
    MqttPacket, PacketId, QoS, ReasonCode, SubscribeOptions, SubscribePacket, SubscribeTopic,
    UnsubscribePacket,
};

mod common;
use common::TestClient;

#[tokio::test]
async fn test_suback_mirrors_filters_in_order() {
    const PORT: u16 = 18851;
    common::start_broker(PORT).await;

    let mut client = TestClient::connect(PORT, "c1", true).await;
    let topics = vec![
        SubscribeTopic::new("ok/one", SubscribeOptions::new(QoS::AtLeastOnce)).unwrap(),
        SubscribeTopic::new("bad/#/filter", SubscribeOptions::new(QoS::AtMostOnce)).unwrap(),
        SubscribeTopic::new("ok/two", SubscribeOptions::new(QoS::AtMostOnce)).unwrap(),
    ];
    client
        .send(SubscribePacket::with_topics(PacketId::new(9), topics))
        .await;

    match client.recv().await {
        MqttPacket::SubscribeAck(ack) => {
            assert_eq!(ack.packet_id(), PacketId::new(9));
            assert_eq!(
                ack.reason_codes(),
                &[
                    ReasonCode::GrantedQoS1,
                    ReasonCode::TopicFilterInvalid,
                    ReasonCode::Success,
                ]
            );
        }
        other => panic!("expected SUBACK, got {other:?}"),
    }
}

#[tokio::test]
async fn test_requested_qos2_granted_qos1() {
    const PORT: u16 = 18852;
    common::start_broker(PORT).await;

    let mut client = TestClient::connect(PORT, "c1", true).await;
    client
        .send(SubscribePacket::new("t", QoS::ExactOnce, PacketId::new(2)).unwrap())
        .await;

    match client.recv().await {
        MqttPacket::SubscribeAck(ack) => {
            assert_eq!(ack.reason_codes(), &[ReasonCode::GrantedQoS1]);
        }
        other => panic!("expected SUBACK, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unsuback_reports_missing_subscription() {
    const PORT: u16 = 18853;
    common::start_broker(PORT).await;

    let mut client = TestClient::connect(PORT, "c1", true).await;
    client
        .send(SubscribePacket::new("have", QoS::AtMostOnce, PacketId::new(3)).unwrap())
        .await;
    let _suback = client.recv().await;

    client
        .send(UnsubscribePacket::new("have", PacketId::new(4)).unwrap())
        .await;
    match client.recv().await {
        MqttPacket::UnsubscribeAck(ack) => {
            assert_eq!(ack.packet_id(), PacketId::new(4));
            assert_eq!(ack.reason_codes(), &[ReasonCode::Success]);
        }
        other => panic!("expected UNSUBACK, got {other:?}"),
    }

    client
        .send(UnsubscribePacket::new("have-not", PacketId::new(5)).unwrap())
        .await;
    match client.recv().await {
        MqttPacket::UnsubscribeAck(ack) => {
            assert_eq!(ack.reason_codes(), &[ReasonCode::NoSubscriptionExisted]);
        }
        other => panic!("expected UNSUBACK, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unsubscribed_topic_stops_delivering() {
    const PORT: u16 = 18854;
    common::start_broker(PORT).await;

    let mut sub = TestClient::connect(PORT, "c1", true).await;
    sub.send(SubscribePacket::new("t", QoS::AtMostOnce, PacketId::new(1)).unwrap())
        .await;
    let _suback = sub.recv().await;
    sub.send(UnsubscribePacket::new("t", PacketId::new(2)).unwrap())
        .await;
    let _unsuback = sub.recv().await;

    let mut publisher = TestClient::connect(PORT, "c2", true).await;
    publisher
        .send(codec::PublishPacket::new("t", QoS::AtMostOnce, b"m").unwrap())
        .await;

    assert!(
        sub.silent_for(tokio::time::Duration::from_millis(300)).await,
        "message delivered after unsubscribe"
    );
}
