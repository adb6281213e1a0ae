// Copyright (c) 2025 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::DecodeError;

/// Length of client identifiers generated by the server.
pub const RANDOM_CLIENT_ID_LENGTH: usize = 16;

/// Generate a random client id on behalf of a client which connected with
/// an empty one.
///
/// Server generated ids stay within the 1..=23 characters of
/// [MQTT-3.1.3-5] so any conformant peer accepts them.
#[must_use]
pub fn random_client_id() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_CLIENT_ID_LENGTH)
        .map(char::from)
        .collect();
    format!("auto-{suffix}")
}

/// Check client id from a CONNECT packet.
///
/// Client chosen ids may exceed the 23 character suggestion; only empty
/// strings and U+0000 are rejected here. Empty ids are handled separately
/// because the server may assign one.
///
/// # Errors
///
/// Returns error if `client_id` is empty or contains U+0000.
pub fn validate_client_id(client_id: &str) -> Result<(), DecodeError> {
    if client_id.is_empty() || client_id.contains('\u{0000}') {
        return Err(DecodeError::InvalidClientId);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_client_id_length() {
        let id = random_client_id();
        assert!(id.len() <= 23);
        assert!(validate_client_id(&id).is_ok());
    }
}
