use tracing::debug;

use crate::{error::Error, link::channel::LinkChannel};

/// The path by which a client-issued write reaches the device.
///
/// Validates that a payload is actually present, forwards it to the
/// link channel and reports the outcome to the submitting caller only.
/// Concurrent submissions are serialized by the link's single writer,
/// in arrival order.
///
/// Cheap to clone; all clones reach the same link.
#[derive(Debug, Clone)]
pub struct CommandGateway {
    link: LinkChannel,
}

impl CommandGateway {
    /// A gateway writing through the given link.
    pub fn new(link: LinkChannel) -> Self {
        Self { link }
    }

    /// Write the payload to the device.
    ///
    /// A missing or empty payload is a caller error, rejected before
    /// touching the link. Success means the payload was put on wire.
    pub async fn submit(&self, payload: Option<Vec<u8>>) -> Result<(), Error> {
        let payload = match payload {
            Some(payload) if !payload.is_empty() => payload,
            _ => return Err(Error::MissingPayload),
        };

        debug!(len = payload.len(), "Submitting command");

        self.link.write(payload).await
    }
}
