//! Non-blocking TCP transport primitives for a cooperative firmware loop.
//!
//! This crate wraps the platform's BSD-socket surface into the minimal set of
//! operations a single-threaded firmware dispatcher needs: one listening
//! socket, accepted client connections, zero-timeout readiness polling, and
//! byte-level non-blocking I/O. No operation ever blocks the caller; the
//! steady state between incoming connections or pending bytes is reported as
//! [`net::Progress::Pending`] so the polling loop simply tries again on its
//! next tick.
//!
//! When a device runs more than one Wi-Fi interface at once (station and
//! access point), an accepted connection is attributed to the interface whose
//! subnet contains the peer address. The Wi-Fi subsystem itself is reached
//! through the [`net::InterfaceProvider`] capability so it can be substituted
//! in tests.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

#[cfg(not(target_os = "linux"))]
compile_error!(
    "This crate is only compatible with Linux systems that provide BSD sockets and the poll interface."
);

pub mod error;
pub mod log;
pub mod net;

pub use error::{Error, Result};
pub use net::Progress;
