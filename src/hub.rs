use std::{
    collections::HashMap,
    fmt::Display,
    sync::{Arc, Mutex},
};

use tokio::sync::broadcast;
use tracing::{info, trace};
use uuid::Uuid;

use crate::link::Record;

pub use broadcast::error::RecvError;

/// How many records a subscriber may fall behind before it starts
/// losing them.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Identifies one subscriber for the duration of its subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct Shared {
    tx: broadcast::Sender<Record>,

    /// Who is subscribed right now. Only bookkeeping: delivery goes
    /// through the broadcast channel, membership here is for join/leave
    /// logging and counting.
    subscribers: Mutex<HashMap<SubscriberId, String>>,
}

/// Relays each published [`Record`] to every current subscriber.
///
/// Fire-and-forget: publishing never blocks on any individual subscriber.
/// Each subscriber owns a bounded queue of the channel's capacity; one
/// that stops draining lags and eventually observes [`RecvError::Lagged`]
/// instead of stalling the pipeline.
///
/// Records published while nobody is subscribed are dropped, and a
/// subscriber joining later never sees them.
///
/// Cheap to clone; all clones are the same hub.
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    shared: Arc<Shared>,
}

impl BroadcastHub {
    /// A new hub whose subscribers may each buffer up to `capacity`
    /// records before lagging.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);

        Self {
            shared: Arc::new(Shared {
                tx,
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Join the hub. The description is only used for operational logging.
    ///
    /// Dropping the returned [`Subscription`] leaves the hub.
    pub fn subscribe(&self, description: &str) -> Subscription {
        let id = SubscriberId(Uuid::new_v4());
        let rx = self.shared.tx.subscribe();

        let subscribers = {
            let mut subscribers = self.lock_subscribers();
            subscribers.insert(id, description.to_string());
            subscribers.len()
        };

        info!(%id, %description, %subscribers, "Subscribed");

        Subscription {
            id,
            rx,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Relay a record to every current subscriber.
    /// Returns how many subscribers it reached.
    pub fn publish(&self, record: Record) -> usize {
        match self.shared.tx.send(record) {
            Ok(reached) => {
                trace!(%reached, "Record broadcast");
                reached
            }
            // Nobody is listening; the record is dropped, never replayed.
            Err(_) => {
                trace!("Record dropped, no subscribers");
                0
            }
        }
    }

    /// How many subscribers are currently joined.
    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, HashMap<SubscriberId, String>> {
        self.shared
            .subscribers
            .lock()
            .expect("Subscriber registry lock should not be poisoned")
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// One subscriber's membership of the hub.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: broadcast::Receiver<Record>,
    shared: Arc<Shared>,
}

impl Subscription {
    /// The next record, in publish order.
    ///
    /// [`RecvError::Lagged`] means this subscriber fell more than the
    /// hub's capacity behind and records were dropped for it; the caller
    /// decides whether to continue or disconnect.
    pub async fn recv(&mut self) -> Result<Record, RecvError> {
        self.rx.recv().await
    }

    /// This subscriber's id.
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let subscribers = {
            let mut subscribers = self
                .shared
                .subscribers
                .lock()
                .expect("Subscriber registry lock should not be poisoned");
            subscribers.remove(&self.id);
            subscribers.len()
        };

        info!(id = %self.id, %subscribers, "Unsubscribed");
    }
}
