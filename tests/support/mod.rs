//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod fake_transport;
pub mod socket_guard;

/// Deterministic, non-repeating-looking test payload.
#[must_use]
pub fn payload(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| u8::try_from((i * 31 + i / 251) % 256).unwrap_or(0))
        .collect()
}
