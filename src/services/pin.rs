// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Unlock PIN hashing and checks.
//!
//! Only the SHA-256 hex digest is stored on the user document.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const PIN_LENGTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PinError {
    #[error("PIN must be 4 digits")]
    Malformed,

    #[error("PINs do not match. Please try again.")]
    Mismatch,

    #[error("Incorrect PIN. Please try again.")]
    Incorrect,
}

/// Lowercase hex SHA-256 of the PIN.
pub fn hash_pin(pin: &str) -> String {
    hex::encode(Sha256::digest(pin.as_bytes()))
}

fn is_well_formed(pin: &str) -> bool {
    pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Check the confirmation entry and return the digest to store.
pub fn confirm_pin(first: &str, second: &str) -> Result<String, PinError> {
    if !is_well_formed(first) {
        return Err(PinError::Malformed);
    }
    if first.as_bytes().ct_eq(second.as_bytes()).unwrap_u8() != 1 {
        return Err(PinError::Mismatch);
    }
    Ok(hash_pin(first))
}

/// Check an unlock attempt against the stored digest.
///
/// Accounts created before PINs existed have no digest and unlock freely.
pub fn verify_pin(entered: &str, stored_hash: Option<&str>) -> Result<(), PinError> {
    let Some(stored) = stored_hash else {
        return Ok(());
    };
    let entered = hash_pin(entered);
    if entered.as_bytes().ct_eq(stored.as_bytes()).into() {
        Ok(())
    } else {
        Err(PinError::Incorrect)
    }
}
