use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Link related errors.
pub mod error;

/// The link channel: owns the device connection and its single-writer pump.
pub mod channel;

/// Codec for splitting the inbound byte stream into records.
pub mod codec;

/// One line of telemetry as read from the device, delimiter stripped.
///
/// Produced once per delimiter occurrence, forwarded and never stored.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Deserialize, Serialize)]
pub struct Record(String);

impl Record {
    /// Create a record from bytes, replacing any bad utf8.
    pub fn new_lossy<B: AsRef<[u8]>>(bytes: B) -> Self {
        Self(String::from_utf8_lossy(bytes.as_ref()).to_string())
    }

    /// Borrowed form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The record's text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl<T: AsRef<str>> From<T> for Record {
    fn from(string_like: T) -> Self {
        Self(string_like.as_ref().into())
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.0.chars().take(48).collect::<String>();

        write!(f, "{}", s.trim())
    }
}
