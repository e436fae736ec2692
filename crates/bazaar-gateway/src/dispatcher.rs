use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{error, warn};
use uuid::Uuid;

use bazaar_types::events::ChatEvent;

/// Broadcast buffer size. A connection that falls further behind skips events.
const BROADCAST_CAPACITY: usize = 1024;

/// Who receives a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatScope {
    /// Only connections that joined the message's product conversation
    #[default]
    Product,
    /// Every connected client, whatever conversation it joined
    Global,
}

impl FromStr for ChatScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" => Ok(Self::Product),
            "global" => Ok(Self::Global),
            other => Err(format!("unknown chat scope '{}' (expected product or global)", other)),
        }
    }
}

/// A serialized event plus the conversation it belongs to, so each
/// connection can filter without re-parsing.
#[derive(Debug, Clone)]
struct Envelope {
    product_id: Option<Uuid>,
    json: Arc<str>,
}

/// Fans chat events out to connected clients.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<Envelope>,
    scope: ChatScope,
    /// product_id -> number of open connections in that conversation
    participants: Mutex<HashMap<Uuid, usize>>,
}

impl Dispatcher {
    pub fn new(scope: ChatScope) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                scope,
                participants: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn scope(&self) -> ChatScope {
        self.inner.scope
    }

    /// Join a product conversation. The membership lasts as long as the returned subscription.
    pub fn join(&self, product_id: Uuid) -> Subscription {
        *self.inner.participants().entry(product_id).or_default() += 1;
        Subscription {
            product_id,
            rx: self.inner.broadcast_tx.subscribe(),
            inner: self.inner.clone(),
        }
    }

    /// Number of open connections in a product conversation.
    pub fn participant_count(&self, product_id: Uuid) -> usize {
        self.inner
            .participants()
            .get(&product_id)
            .copied()
            .unwrap_or(0)
    }

    /// Hand an event to every current subscriber. Returns how many subscribers
    /// were live at send time; scoping is applied on the receiving side.
    pub fn publish(&self, event: &ChatEvent) -> usize {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize chat event: {}", e);
                return 0;
            }
        };

        let envelope = Envelope {
            product_id: event.product_id(),
            json: json.into(),
        };
        self.inner.broadcast_tx.send(envelope).unwrap_or(0)
    }
}

impl DispatcherInner {
    fn participants(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, usize>> {
        self.participants.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn leave(&self, product_id: Uuid) {
        let mut participants = self.participants();
        if let Some(count) = participants.get_mut(&product_id) {
            *count -= 1;
            if *count == 0 {
                participants.remove(&product_id);
            }
        }
    }
}

/// One connection's view of the event stream.
pub struct Subscription {
    product_id: Uuid,
    rx: broadcast::Receiver<Envelope>,
    inner: Arc<DispatcherInner>,
}

impl Subscription {
    /// Next serialized event this connection should see, or `None` once the
    /// dispatcher is gone.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) => {
                    if self.accepts(&envelope) {
                        return Some(envelope.json);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Chat subscriber for {} lagged by {} events", self.product_id, n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn accepts(&self, envelope: &Envelope) -> bool {
        match (self.inner.scope, envelope.product_id) {
            (ChatScope::Global, _) | (_, None) => true,
            (ChatScope::Product, Some(product_id)) => product_id == self.product_id,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.inner.leave(self.product_id);
    }
}
