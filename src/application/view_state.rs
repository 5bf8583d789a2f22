// Per-view fetch lifecycle with stale-response discarding
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "lowercase")]
pub enum ViewState<T> {
    Idle,
    Loading,
    Ready(T),
    Failed,
}

impl<T: Clone + Default> ViewState<T> {
    /// What the view renders: the data when ready, otherwise its empty form.
    pub fn display(&self) -> T {
        match self {
            ViewState::Ready(data) => data.clone(),
            _ => T::default(),
        }
    }
}

/// Monotonic tag of one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTag(u64);

struct Tracked<T> {
    latest: u64,
    state: ViewState<T>,
}

/// Tracks the lifecycle of one dashboard view.
///
/// Only the newest request may settle the view; older responses arriving
/// late are dropped.
pub struct ViewTracker<T> {
    name: &'static str,
    inner: Mutex<Tracked<T>>,
}

impl<T: Clone> ViewTracker<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(Tracked {
                latest: 0,
                state: ViewState::Idle,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tracked<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn begin(&self) -> RequestTag {
        let mut inner = self.lock();
        inner.latest += 1;
        inner.state = ViewState::Loading;
        RequestTag(inner.latest)
    }

    /// Settle the view with `outcome`; returns `false` if the tag is stale.
    pub fn complete<E: std::fmt::Display>(&self, tag: RequestTag, outcome: &Result<T, E>) -> bool {
        let mut inner = self.lock();
        if tag.0 != inner.latest {
            tracing::debug!(
                "Discarding stale {} response (request {} superseded by {})",
                self.name,
                tag.0,
                inner.latest
            );
            return false;
        }

        inner.state = match outcome {
            Ok(data) => ViewState::Ready(data.clone()),
            Err(e) => {
                tracing::warn!("{} view failed: {}", self.name, e);
                ViewState::Failed
            }
        };
        true
    }

    pub fn state(&self) -> ViewState<T> {
        self.lock().state.clone()
    }

    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.latest += 1;
        inner.state = ViewState::Idle;
    }
}
