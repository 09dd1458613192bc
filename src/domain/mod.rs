//! Domain types for the key management backend.
//!
//! Audit vocabulary lives in [`events`]; local key generation lives in [`keys`].

pub mod events;
pub mod keys;
