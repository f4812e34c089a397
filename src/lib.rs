#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

/// The command line interface.
pub mod cli;

/// Relates to config files.
pub mod config;

/// Possible errors in this library.
pub mod error;

/// The path by which client-issued writes reach the device.
pub mod gateway;

/// Fan-out of records to subscribed clients.
pub mod hub;

/// The serial link: connection, framing and the single-writer pump.
pub mod link;

/// Logging/tracing setup.
pub mod logging;

/// The messages crossing between server and clients.
pub mod protocol;

/// Code relating to setting up the server which accepts subscribers
/// and command submissions.
pub mod server;

/// Handles incoming websockets.
pub(crate) mod websocket;
