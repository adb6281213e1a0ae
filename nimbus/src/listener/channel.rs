// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Channel cmd handlers.

use super::Listener;
use crate::commands::{ChannelToListenerCmd, ListenerToDispatcherCmd};
use crate::error::Error;
use crate::types::{ChannelGid, ChannelId};

impl Listener {
    pub(super) fn next_channel_id(&mut self) -> ChannelId {
        self.current_channel_id += 1;
        self.current_channel_id
    }

    const fn gid(&self, channel_id: ChannelId) -> ChannelGid {
        ChannelGid::new(self.id, channel_id)
    }

    /// Forward a channel event to the dispatcher, stamped with this
    /// listener's id.
    pub(super) async fn handle_channel_cmd(
        &mut self,
        cmd: ChannelToListenerCmd,
    ) -> Result<(), Error> {
        let cmd = match cmd {
            ChannelToListenerCmd::Connect(channel_id, request) => {
                ListenerToDispatcherCmd::Connect(self.gid(channel_id), request)
            }
            ChannelToListenerCmd::Publish(channel_id, packet) => {
                ListenerToDispatcherCmd::Publish(self.gid(channel_id), packet)
            }
            ChannelToListenerCmd::PublishAck(channel_id, packet_id) => {
                ListenerToDispatcherCmd::PublishAck(self.gid(channel_id), packet_id)
            }
            ChannelToListenerCmd::Subscribe(channel_id, packet) => {
                ListenerToDispatcherCmd::Subscribe(self.gid(channel_id), packet)
            }
            ChannelToListenerCmd::Unsubscribe(channel_id, packet) => {
                ListenerToDispatcherCmd::Unsubscribe(self.gid(channel_id), packet)
            }
            ChannelToListenerCmd::Disconnect(channel_id, expiry_override) => {
                ListenerToDispatcherCmd::Offline(self.gid(channel_id), expiry_override)
            }
            ChannelToListenerCmd::Closed(channel_id) => {
                // The channel task is gone for good.
                if self.channel_senders.remove(&channel_id).is_none() {
                    log::warn!(
                        "listener {}: closed cmd for unknown channel {}",
                        self.id,
                        channel_id
                    );
                }
                ListenerToDispatcherCmd::Offline(self.gid(channel_id), None)
            }
        };
        self.dispatcher_sender.send(cmd).await.map_err(Into::into)
    }
}
