// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::collections::HashMap;
use std::fmt;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_rustls::TlsAcceptor;

use crate::commands::{
    ChannelToListenerCmd, DispatcherToListenerCmd, ListenerToChannelCmd, ListenerToDispatcherCmd,
};
use crate::config;
use crate::types::{ChannelId, ListenerId};

mod channel;
mod dispatcher;
mod init;
mod run;

const CHANNEL_CAPACITY: usize = 16;

/// The bound socket plus an optional TLS wrapper.
pub(crate) enum Binding {
    Mqtt(TcpListener),
    Mqtts(TcpListener, TlsAcceptor),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Mqtt(..) => "Mqtt",
            Self::Mqtts(..) => "Mqtts",
        };
        write!(f, "{msg}")
    }
}

/// One accepting endpoint.
///
/// Accepts sockets, spawns a channel actor per connection and relays
/// commands between its channels and the dispatcher.
#[derive(Debug)]
pub struct Listener {
    id: ListenerId,
    binding: Binding,
    config: config::Listener,
    general: config::General,
    current_channel_id: ChannelId,

    channel_senders: HashMap<ChannelId, Sender<ListenerToChannelCmd>>,

    channel_sender: Sender<ChannelToListenerCmd>,
    channel_receiver: Option<Receiver<ChannelToListenerCmd>>,

    dispatcher_sender: Sender<ListenerToDispatcherCmd>,
    dispatcher_receiver: Option<Receiver<DispatcherToListenerCmd>>,
}
