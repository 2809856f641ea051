//! Encryption operator runtime
//!
//! Drives an [`encryption_provider::EncryptionProvider`] on a fixed interval
//! against a live cluster.

#![deny(missing_docs)]

pub mod poller;
