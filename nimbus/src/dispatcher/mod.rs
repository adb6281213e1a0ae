// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::collections::HashMap;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::{self, Duration, Instant};

use crate::commands::{DispatcherToListenerCmd, ListenerToDispatcherCmd};
use crate::config;
use crate::types::{ChannelGid, ListenerId};

mod listener;
mod router;
mod sessions;

use router::Router;
use sessions::SessionStore;

/// How often offline sessions are checked against their expiry deadline.
const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Sweep ticks between two counter reports.
const COUNTER_REPORT_TICKS: u64 = 60;

/// Running totals, reported through the log on a slow cadence.
#[derive(Debug, Default)]
struct Counters {
    sessions_created: u64,
    sessions_expired: u64,
    sessions_taken_over: u64,
    publish_routed: u64,
    publish_dropped: u64,
    queue_overflows: u64,
}

/// The message router and session manager.
///
/// One dispatcher exists per process. It owns the client-id → session
/// registry and the subscription router; processing its mailbox serially
/// is what makes session takeover atomic with CONNECT handling.
#[derive(Debug)]
pub struct Dispatcher {
    general: config::General,

    store: SessionStore,
    router: Router,
    counters: Counters,

    listener_senders: HashMap<ListenerId, Sender<DispatcherToListenerCmd>>,
    listener_receiver: Receiver<ListenerToDispatcherCmd>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        general: config::General,
        listener_senders: Vec<(ListenerId, Sender<DispatcherToListenerCmd>)>,
        listener_receiver: Receiver<ListenerToDispatcherCmd>,
    ) -> Self {
        Self {
            general,
            store: SessionStore::new(),
            router: Router::new(),
            counters: Counters::default(),
            listener_senders: listener_senders.into_iter().collect(),
            listener_receiver,
        }
    }

    pub async fn run_loop(&mut self) {
        let mut sweep = time::interval(EXPIRY_SWEEP_INTERVAL);
        let mut ticks: u64 = 0;

        loop {
            tokio::select! {
                Some(cmd) = self.listener_receiver.recv() => {
                    if let Err(err) = self.handle_listener_cmd(cmd).await {
                        log::error!("dispatcher: handle listener cmd failed: {err}");
                    }
                },

                _instant = sweep.tick() => {
                    self.sweep_expired_sessions();
                    ticks += 1;
                    if ticks % COUNTER_REPORT_TICKS == 0 {
                        self.report_counters();
                    }
                }
            }
        }
    }

    /// Destroy sessions whose expiry deadline has passed.
    fn sweep_expired_sessions(&mut self) {
        let now = Instant::now();
        for client_id in self.store.expired_sessions(now) {
            log::info!("dispatcher: session {client_id} expired");
            self.destroy_session(&client_id);
            self.counters.sessions_expired += 1;
        }
    }

    /// Remove a session and its router state.
    pub(super) fn destroy_session(&mut self, client_id: &str) {
        self.router.remove_session(client_id);
        let _session = self.store.remove(client_id);
    }

    fn report_counters(&self) {
        log::debug!(
            "dispatcher: sessions={} created={} expired={} taken_over={} \
             routed={} dropped={} overflows={}",
            self.store.len(),
            self.counters.sessions_created,
            self.counters.sessions_expired,
            self.counters.sessions_taken_over,
            self.counters.publish_routed,
            self.counters.publish_dropped,
            self.counters.queue_overflows,
        );
    }

    /// Send `cmd` to the listener owning `gid`.
    async fn send_to_listener(
        &mut self,
        gid: ChannelGid,
        cmd: DispatcherToListenerCmd,
    ) -> Result<(), crate::Error> {
        if let Some(sender) = self.listener_senders.get(&gid.listener_id()) {
            sender.send(cmd).await.map_err(Into::into)
        } else {
            Err(crate::Error::from_string(
                crate::error::ErrorKind::ChannelError,
                format!("dispatcher: no listener with id {}", gid.listener_id()),
            ))
        }
    }
}
