// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Handles commands and new connections.

use tokio::sync::mpsc;

use super::{Listener, CHANNEL_CAPACITY};
use crate::channel::{Channel, ChannelConfig};
use crate::stream::Stream;

impl Listener {
    /// # Panics
    ///
    /// Raise panic if called more than once: the channel receivers are
    /// taken out of their options here.
    pub async fn run_loop(&mut self) -> ! {
        let mut channel_receiver = self
            .channel_receiver
            .take()
            .expect("Invalid channel receiver");
        let mut dispatcher_receiver = self
            .dispatcher_receiver
            .take()
            .expect("Invalid dispatcher receiver");

        loop {
            tokio::select! {
                ret = self.accept() => {
                    match ret {
                        Ok(stream) => self.new_connection(stream),
                        Err(err) => log::error!(
                            "listener {}: failed to accept connection: {err}", self.id
                        ),
                    }
                },

                Some(cmd) = channel_receiver.recv() => {
                    if let Err(err) = self.handle_channel_cmd(cmd).await {
                        log::error!("listener {}: handle channel cmd failed: {err}", self.id);
                    }
                },

                Some(cmd) = dispatcher_receiver.recv() => {
                    if let Err(err) = self.handle_dispatcher_cmd(cmd).await {
                        log::error!("listener {}: handle dispatcher cmd failed: {err}", self.id);
                    }
                }
            }
        }
    }

    fn new_connection(&mut self, stream: Stream) {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let channel_id = self.next_channel_id();
        self.channel_senders.insert(channel_id, sender);

        let mut channel_config = ChannelConfig::new();
        channel_config
            .set_connect_timeout(self.config.connect_timeout())
            .set_allow_empty_client_id(self.config.allow_empty_client_id())
            .set_max_keepalive(self.general.max_keepalive())
            .set_max_packet_size(self.general.max_packet_size())
            .set_max_write_buffer(self.general.max_write_buffer())
            .set_session_expiry_cap(self.general.session_expiry_cap());

        let channel = Channel::new(
            channel_id,
            channel_config,
            stream,
            self.channel_sender.clone(),
            receiver,
        );
        tokio::spawn(channel.run_loop());
    }
}
