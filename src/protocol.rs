use serde::{Deserialize, Serialize};

use crate::link::Record;

/// One broadcast event, as sent to every subscribed client.
///
/// Each record from the device becomes exactly one of these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    /// The record's text.
    pub data: String,
}

impl From<Record> for Event {
    fn from(record: Record) -> Self {
        Self {
            data: record.into_string(),
        }
    }
}

impl Event {
    /// An example of an event as a subscribed client receives it.
    pub fn example() -> Self {
        Self { data: "12.5".into() }
    }

    /// Turn the event into serialized json.
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).expect("Should serialize well")
    }
}

/// A command submission, as posted by clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandRequest {
    /// The payload to write to the device, verbatim.
    #[serde(default)]
    pub data: Option<String>,
}

impl CommandRequest {
    /// The payload as bytes, if one was given.
    pub fn into_payload(self) -> Option<Vec<u8>> {
        self.data.map(String::into_bytes)
    }

    /// An example of a command submission.
    pub fn example() -> Self {
        Self {
            data: Some("LED1:ON".into()),
        }
    }

    /// Turn the request into serialized json.
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).expect("Should serialize well")
    }
}
