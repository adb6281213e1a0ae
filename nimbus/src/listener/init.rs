// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Initialize Listener.

use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio_rustls::{rustls, TlsAcceptor};

use super::{Binding, Listener, CHANNEL_CAPACITY};
use crate::commands::{DispatcherToListenerCmd, ListenerToDispatcherCmd};
use crate::config;
use crate::error::{Error, ErrorKind};
use crate::socket::new_tcp_listener;
use crate::stream::Stream;
use crate::types::ListenerId;

impl Listener {
    fn new(
        id: ListenerId,
        binding: Binding,
        listener_config: config::Listener,
        general: config::General,
        dispatcher_sender: Sender<ListenerToDispatcherCmd>,
        dispatcher_receiver: Receiver<DispatcherToListenerCmd>,
    ) -> Self {
        let (channel_sender, channel_receiver) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            id,
            binding,
            config: listener_config,
            general,
            current_channel_id: 0,

            channel_senders: HashMap::new(),

            channel_sender,
            channel_receiver: Some(channel_receiver),

            dispatcher_sender,
            dispatcher_receiver: Some(dispatcher_receiver),
        }
    }

    fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, Error> {
        let mut reader = BufReader::new(File::open(path)?);
        rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                Error::from_string(
                    ErrorKind::CertError,
                    format!("Failed to load cert file at {path:?}, got: {err:?}"),
                )
            })
    }

    fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, Error> {
        let mut reader = BufReader::new(File::open(path)?);
        rustls_pemfile::private_key(&mut reader)
            .map_err(|err| {
                Error::from_string(
                    ErrorKind::CertError,
                    format!("Failed to load key file at {path:?}, got: {err:?}"),
                )
            })?
            .ok_or_else(|| {
                Error::from_string(
                    ErrorKind::CertError,
                    format!("No private key found in {path:?}"),
                )
            })
    }

    fn get_cert_config(listener_config: &config::Listener) -> Result<rustls::ServerConfig, Error> {
        let cert_file = listener_config
            .cert_file()
            .ok_or_else(|| Error::new(ErrorKind::CertError, "cert_file is required"))?;
        let key_file = listener_config
            .key_file()
            .ok_or_else(|| Error::new(ErrorKind::CertError, "key_file is required"))?;

        let certs = Self::load_certs(cert_file)?;
        let key = Self::load_key(key_file)?;

        rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(Into::into)
    }

    /// Bind to the address in `listener_config`.
    ///
    /// # Errors
    ///
    /// Returns error if the address is in use or the TLS material cannot
    /// be loaded.
    pub async fn bind(
        id: ListenerId,
        listener_config: config::Listener,
        general: config::General,
        dispatcher_sender: Sender<ListenerToDispatcherCmd>,
        dispatcher_receiver: Receiver<DispatcherToListenerCmd>,
    ) -> Result<Self, Error> {
        let address = listener_config.address();
        let binding = match listener_config.protocol() {
            config::Protocol::Mqtt => {
                log::info!("bind mqtt://{address}");
                Binding::Mqtt(new_tcp_listener(address).await?)
            }
            config::Protocol::Mqtts => {
                log::info!("bind mqtts://{address}");
                let cert_config = Self::get_cert_config(&listener_config)?;
                let acceptor = TlsAcceptor::from(Arc::new(cert_config));
                Binding::Mqtts(new_tcp_listener(address).await?, acceptor)
            }
        };
        Ok(Self::new(
            id,
            binding,
            listener_config,
            general,
            dispatcher_sender,
            dispatcher_receiver,
        ))
    }

    pub(super) async fn accept(&mut self) -> Result<Stream, Error> {
        match &mut self.binding {
            Binding::Mqtt(listener) => {
                let (tcp_stream, _address) = listener.accept().await?;
                Ok(Stream::Mqtt(tcp_stream))
            }
            Binding::Mqtts(listener, acceptor) => {
                let (tcp_stream, _address) = listener.accept().await?;
                let tls_stream = acceptor.accept(tcp_stream).await?;
                Ok(Stream::Mqtts(Box::new(tls_stream)))
            }
        }
    }
}
