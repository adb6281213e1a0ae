// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Dispatcher cmd handlers.

use super::Listener;
use crate::commands::{DispatcherToListenerCmd, ListenerToChannelCmd};
use crate::error::Error;
use crate::types::ChannelId;

impl Listener {
    pub(super) async fn handle_dispatcher_cmd(
        &mut self,
        cmd: DispatcherToListenerCmd,
    ) -> Result<(), Error> {
        let (channel_id, cmd) = match cmd {
            DispatcherToListenerCmd::ConnectAck(channel_id, decision) => {
                (channel_id, ListenerToChannelCmd::ConnectAck(decision))
            }
            DispatcherToListenerCmd::Publish(channel_id, packet) => {
                (channel_id, ListenerToChannelCmd::Publish(packet))
            }
            DispatcherToListenerCmd::PublishAck(channel_id, packet) => {
                (channel_id, ListenerToChannelCmd::PublishAck(packet))
            }
            DispatcherToListenerCmd::SubscribeAck(channel_id, packet) => {
                (channel_id, ListenerToChannelCmd::SubscribeAck(packet))
            }
            DispatcherToListenerCmd::UnsubscribeAck(channel_id, packet) => {
                (channel_id, ListenerToChannelCmd::UnsubscribeAck(packet))
            }
            DispatcherToListenerCmd::Disconnect(channel_id, reason_code) => {
                (channel_id, ListenerToChannelCmd::Disconnect(reason_code))
            }
        };
        self.send_to_channel(channel_id, cmd).await
    }

    async fn send_to_channel(
        &mut self,
        channel_id: ChannelId,
        cmd: ListenerToChannelCmd,
    ) -> Result<(), Error> {
        if let Some(channel_sender) = self.channel_senders.get(&channel_id) {
            channel_sender.send(cmd).await.map_err(Into::into)
        } else {
            Err(Error::channel_error(channel_id))
        }
    }
}
