// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

#![allow(clippy::module_name_repetitions)]

use tokio::net::TcpListener;

use crate::error::Error;

/// Create a tcp server socket bound to `address`.
///
/// # Errors
///
/// Returns error if the address cannot be bound.
pub async fn new_tcp_listener(address: &str) -> Result<TcpListener, Error> {
    let listener = TcpListener::bind(address).await?;
    Ok(listener)
}
