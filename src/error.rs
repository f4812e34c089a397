use thiserror::Error;

use crate::link::error::LinkError;

/// Errors that may occur in this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The serial device could not be opened.
    /// Fatal: the process cannot perform its purpose without the link.
    #[error("The link at `{path}` could not be opened: {source}")]
    LinkUnavailable {
        /// The device path that was attempted.
        path: String,

        /// The underlying open failure.
        #[source]
        source: tokio_serial::Error,
    },

    /// A write to the device failed.
    /// Reported to the caller which issued the write, nobody else.
    #[error("Writing to the link failed: {source}")]
    WriteFailed {
        /// The underlying write failure.
        #[source]
        source: LinkError,
    },

    /// A write was submitted after the link pump terminated.
    #[error("The link is closed")]
    LinkClosed,

    /// A command arrived without a payload.
    /// Rejected before touching the link.
    #[error("The command carried no payload")]
    MissingPayload,

    /// The configuration did not validate.
    #[error("Bad configuration: {0}")]
    BadConfig(String),
}

impl Error {
    /// Borrow the bad config message, if this is that variant.
    pub fn try_into_bad_config(self) -> Result<String, Self> {
        if let Self::BadConfig(message) = self {
            Ok(message)
        } else {
            Err(self)
        }
    }
}
