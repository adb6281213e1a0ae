// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Wire up and spawn the internal modules.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{ServerContext, CHANNEL_CAPACITY};
use crate::dispatcher::Dispatcher;
use crate::error::Error;
use crate::listener::Listener;

impl ServerContext {
    /// Bind all listeners and spawn the dispatcher and listener tasks
    /// onto the current runtime.
    ///
    /// # Errors
    ///
    /// Returns error if a listener address cannot be bound.
    pub async fn init_modules(&mut self) -> Result<Vec<JoinHandle<()>>, Error> {
        log::info!("ServerContext::init_modules()");
        let mut handles = Vec::new();

        let (listeners_to_dispatcher_sender, listeners_to_dispatcher_receiver) =
            mpsc::channel(CHANNEL_CAPACITY);
        let mut dispatcher_to_listener_senders = Vec::new();

        let mut listener_objs = Vec::new();
        for (listener_id, listener_config) in (0_u32..).zip(self.config.listeners().iter()) {
            let (dispatcher_to_listener_sender, dispatcher_to_listener_receiver) =
                mpsc::channel(CHANNEL_CAPACITY);
            dispatcher_to_listener_senders.push((listener_id, dispatcher_to_listener_sender));

            let listener = Listener::bind(
                listener_id,
                listener_config.clone(),
                self.config.general().clone(),
                listeners_to_dispatcher_sender.clone(),
                dispatcher_to_listener_receiver,
            )
            .await?;
            listener_objs.push(listener);
        }

        for mut listener in listener_objs {
            let handle = tokio::spawn(async move {
                listener.run_loop().await;
            });
            handles.push(handle);
        }

        let mut dispatcher = Dispatcher::new(
            self.config.general().clone(),
            dispatcher_to_listener_senders,
            listeners_to_dispatcher_receiver,
        );
        let dispatcher_handle = tokio::spawn(async move {
            dispatcher.run_loop().await;
        });
        handles.push(dispatcher_handle);

        Ok(handles)
    }
}
