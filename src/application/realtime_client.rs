// Session-scoped realtime client
//
// Owns at most one push-channel connection. Handlers are kept here rather
// than on the transport, so every (re)connect delivers to the full set and
// callers never re-subscribe.
use crate::application::push_channel::{PushConnector, PushEvent};
use crate::domain::session::Session;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Identity of one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    /// Failed attempts tolerated after the first one before giving up
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

struct Registration {
    id: SubscriptionId,
    handler: Handler,
}

type Registry = HashMap<String, Vec<Registration>>;

struct Inner {
    state: ConnectionState,
    // Bumped on every new connection and on disconnect; a connection task
    // whose generation is stale must not touch shared state.
    generation: u64,
    pending: Registry,
    attached: Registry,
    task: Option<JoinHandle<()>>,
    next_id: u64,
}

impl Inner {
    fn attach_pending(&mut self) {
        for (topic, registrations) in self.pending.drain() {
            self.attached.entry(topic).or_default().extend(registrations);
        }
    }

    fn detach_all(&mut self) {
        for (topic, registrations) in self.attached.drain() {
            self.pending.entry(topic).or_default().extend(registrations);
        }
    }
}

#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<Mutex<Inner>>,
    connector: Arc<dyn PushConnector>,
    session: Session,
    policy: ReconnectPolicy,
}

impl RealtimeClient {
    pub fn new(connector: Arc<dyn PushConnector>, session: Session, policy: ReconnectPolicy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                generation: 0,
                pending: HashMap::new(),
                attached: HashMap::new(),
                task: None,
                next_id: 0,
            })),
            connector,
            session,
            policy,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Ensure a connection exists or is being established.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self) {
        let mut inner = self.lock();

        match inner.state {
            ConnectionState::Connected => {
                inner.attach_pending();
                return;
            }
            // The in-flight attempt attaches pending handlers when it lands
            ConnectionState::Connecting => return,
            ConnectionState::Disconnected => {}
        }

        let Some(token) = self.session.token() else {
            tracing::debug!("No session token; realtime connect deferred");
            return;
        };

        inner.generation += 1;
        inner.state = ConnectionState::Connecting;

        let generation = inner.generation;
        let client = self.clone();
        inner.task = Some(tokio::spawn(async move {
            client.run(generation, token).await;
        }));
    }

    /// Tear down the connection. Subscriptions survive and are re-attached
    /// by the next `connect()`.
    pub fn disconnect(&self) {
        let mut inner = self.lock();

        inner.generation += 1;
        inner.state = ConnectionState::Disconnected;
        inner.detach_all();

        if let Some(task) = inner.task.take() {
            task.abort();
            tracing::info!("Realtime connection closed");
        }
    }

    /// Register `handler` for `topic`, connecting if needed.
    pub fn subscribe<F>(&self, topic: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let (id, connected) = {
            let mut inner = self.lock();
            inner.next_id += 1;
            let id = SubscriptionId(inner.next_id);
            let registration = Registration {
                id,
                handler: Arc::new(handler),
            };

            let connected = inner.state == ConnectionState::Connected;
            let registry = if connected {
                &mut inner.attached
            } else {
                &mut inner.pending
            };
            registry.entry(topic.to_string()).or_default().push(registration);
            (id, connected)
        };

        if !connected {
            self.connect();
        }
        id
    }

    /// Remove every live handler for `topic`. Pending ones are kept.
    pub fn unsubscribe(&self, topic: &str) {
        self.lock().attached.remove(topic);
    }

    /// Remove exactly one handler, wherever it currently sits.
    pub fn unsubscribe_handler(&self, id: SubscriptionId) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        for registry in [&mut inner.pending, &mut inner.attached] {
            registry.retain(|_, registrations| {
                registrations.retain(|r| r.id != id);
                !registrations.is_empty()
            });
        }
    }

    async fn run(self, generation: u64, token: String) {
        let mut failures = 0u32;

        loop {
            match self.connector.open(&token).await {
                Ok(mut connection) => {
                    failures = 0;
                    if !self.mark_connected(generation) {
                        connection.close().await;
                        return;
                    }
                    tracing::info!("Realtime connected");

                    while let Some(event) = connection.next_event().await {
                        if !self.dispatch(generation, &event) {
                            connection.close().await;
                            return;
                        }
                    }

                    // Link lost; the transport policy governs recovery
                    if !self.set_state(generation, ConnectionState::Connecting) {
                        return;
                    }
                    tracing::debug!("Realtime link lost, reconnecting");
                }
                Err(e) => {
                    failures += 1;
                    tracing::debug!("Realtime connect attempt {} failed: {}", failures, e);

                    if failures > self.policy.attempts {
                        if self.set_state(generation, ConnectionState::Disconnected) {
                            self.lock().task = None;
                            tracing::warn!(
                                "Realtime unavailable after {} attempts; live updates paused",
                                failures
                            );
                        }
                        return;
                    }
                }
            }

            tokio::time::sleep(self.policy.delay).await;
        }
    }

    fn set_state(&self, generation: u64, state: ConnectionState) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.state = state;
        true
    }

    fn mark_connected(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.state = ConnectionState::Connected;
        inner.attach_pending();
        true
    }

    /// Deliver one event to the handlers attached for its topic.
    ///
    /// Handlers run outside the lock so they may call back into the client.
    fn dispatch(&self, generation: u64, event: &PushEvent) -> bool {
        let handlers: Vec<Handler> = {
            let inner = self.lock();
            if inner.generation != generation {
                return false;
            }
            inner
                .attached
                .get(&event.topic)
                .map(|regs| regs.iter().map(|r| r.handler.clone()).collect())
                .unwrap_or_default()
        };

        for handler in handlers {
            handler(&event.payload);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{wait_until, FakeConnector};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy {
            attempts: 2,
            delay: Duration::from_millis(10),
        }
    }

    fn client(connector: &Arc<FakeConnector>) -> RealtimeClient {
        RealtimeClient::new(
            connector.clone(),
            Session::with_token(Some("tok".to_string())),
            policy(),
        )
    }

    fn channel_handler(tx: mpsc::UnboundedSender<Value>) -> impl Fn(&Value) + Send + Sync {
        move |payload: &Value| {
            let _ = tx.send(payload.clone());
        }
    }

    #[tokio::test]
    async fn test_subscribe_before_connect_receives_messages() {
        let connector = Arc::new(FakeConnector::default());
        let client = client(&connector);
        let (tx, mut rx) = mpsc::unbounded_channel();

        client.subscribe("live_occupancy", channel_handler(tx));
        client.connect();
        wait_until(|| client.state() == ConnectionState::Connected).await;

        for n in 1..=3 {
            connector.emit("live_occupancy", json!({ "siteOccupancy": n }));
        }

        for n in 1..=3 {
            let payload = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
            assert_eq!(payload["siteOccupancy"], n);
        }
    }

    #[tokio::test]
    async fn test_subscribe_triggers_single_connection() {
        let connector = Arc::new(FakeConnector::default());
        let client = client(&connector);

        client.subscribe("alert", |_| {});
        client.subscribe("live_occupancy", |_| {});
        client.connect();
        wait_until(|| client.state() == ConnectionState::Connected).await;
        client.connect();

        assert_eq!(connector.open_count(), 1);
        assert_eq!(connector.tokens(), vec!["tok".to_string()]);
    }

    #[tokio::test]
    async fn test_multiple_handlers_each_get_one_delivery() {
        let connector = Arc::new(FakeConnector::default());
        let client = client(&connector);
        let hits = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let counter = hits.clone();
        client.subscribe("alert", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        client.connect();
        wait_until(|| client.state() == ConnectionState::Connected).await;
        // Attached directly while connected
        client.subscribe("alert", channel_handler(tx));

        connector.emit("alert", json!({ "id": "a" }));
        timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handlers_survive_reconnect() {
        let connector = Arc::new(FakeConnector::default());
        let client = client(&connector);
        let (tx, mut rx) = mpsc::unbounded_channel();

        client.subscribe("live_occupancy", channel_handler(tx));
        wait_until(|| client.state() == ConnectionState::Connected).await;

        connector.drop_link();
        wait_until(|| connector.open_count() == 2).await;
        wait_until(|| client.state() == ConnectionState::Connected).await;

        connector.emit("live_occupancy", json!({ "siteOccupancy": 7 }));
        let payload = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(payload["siteOccupancy"], 7);
    }

    #[tokio::test]
    async fn test_gives_up_after_bounded_attempts() {
        let connector = Arc::new(FakeConnector::failing(u32::MAX));
        let client = client(&connector);

        client.connect();
        wait_until(|| connector.open_count() == 3).await;
        wait_until(|| client.state() == ConnectionState::Disconnected).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(connector.open_count(), 3);
    }

    #[tokio::test]
    async fn test_recovers_within_attempt_budget() {
        let connector = Arc::new(FakeConnector::failing(2));
        let client = client(&connector);

        client.connect();
        wait_until(|| client.state() == ConnectionState::Connected).await;

        assert_eq!(connector.open_count(), 3);
    }

    #[tokio::test]
    async fn test_unsubscribe_topic_keeps_pending() {
        let connector = Arc::new(FakeConnector::default());
        let client = client(&connector);
        let (tx, mut rx) = mpsc::unbounded_channel();

        client.subscribe("alert", |_| panic!("removed handler was called"));
        wait_until(|| client.state() == ConnectionState::Connected).await;
        client.unsubscribe("alert");

        client.disconnect();
        // Registered while disconnected; stays pending until the next connect
        client.subscribe("alert", channel_handler(tx.clone()));
        client.unsubscribe("alert");
        wait_until(|| client.state() == ConnectionState::Connected).await;

        connector.emit("alert", json!({ "id": "b" }));
        let payload = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(payload["id"], "b");
    }

    #[tokio::test]
    async fn test_unsubscribe_handler_removes_only_that_handler() {
        let connector = Arc::new(FakeConnector::default());
        let client = client(&connector);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let doomed = client.subscribe("alert", |_| panic!("removed handler was called"));
        client.subscribe("alert", channel_handler(tx));
        client.unsubscribe_handler(doomed);
        wait_until(|| client.state() == ConnectionState::Connected).await;

        connector.emit("alert", json!({ "id": "c" }));
        let payload = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(payload["id"], "c");
    }

    #[tokio::test]
    async fn test_disconnect_then_connect_reattaches() {
        let connector = Arc::new(FakeConnector::default());
        let client = client(&connector);
        let (tx, mut rx) = mpsc::unbounded_channel();

        client.subscribe("live_occupancy", channel_handler(tx));
        wait_until(|| client.state() == ConnectionState::Connected).await;

        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);

        client.connect();
        wait_until(|| client.state() == ConnectionState::Connected).await;
        assert_eq!(connector.open_count(), 2);

        connector.emit("live_occupancy", json!({ "siteOccupancy": 3 }));
        let payload = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(payload["siteOccupancy"], 3);
    }

    #[tokio::test]
    async fn test_no_token_defers_connection() {
        let connector = Arc::new(FakeConnector::default());
        let session = Session::default();
        let client = RealtimeClient::new(connector.clone(), session.clone(), policy());

        client.subscribe("alert", |_| {});
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(connector.open_count(), 0);

        session.establish("later".to_string());
        client.connect();
        wait_until(|| client.state() == ConnectionState::Connected).await;
        assert_eq!(connector.tokens(), vec!["later".to_string()]);
    }
}
