use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender};

use crate::state::domain::app_state::{reduce, AppAction, AppState};
use crate::state::domain::state_store::StateStore;

/// Actions kept in the journal unless overridden.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 1024;

struct StoreInner {
    state: AppState,
    journal: VecDeque<AppAction>,
    journal_capacity: usize,
    subscribers: Vec<Sender<AppState>>,
}

/// Process-local state container.
///
/// Every dispatched action is appended to a bounded journal, dropping the
/// oldest entry once it is full, and each resulting state is pushed to all
/// live subscribers. Subscribers whose receiver has been
/// dropped are pruned on the next dispatch.
pub struct InMemoryStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_state(AppState::default())
    }

    /// Starts from an existing state, e.g. a gender count persisted by a
    /// previous run.
    pub fn with_state(state: AppState) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                state,
                journal: VecDeque::new(),
                journal_capacity: DEFAULT_JOURNAL_CAPACITY,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Keeps only the most recent `capacity` actions. Zero disables the
    /// journal.
    pub fn with_journal_capacity(self, capacity: usize) -> Self {
        {
            let mut inner = self.lock();
            inner.journal_capacity = capacity;
            while inner.journal.len() > capacity {
                inner.journal.pop_front();
            }
        }
        self
    }

    /// Receives every state produced from now on.
    pub fn subscribe(&self) -> Receiver<AppState> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.lock().subscribers.push(tx);
        rx
    }

    /// Most recent actions, oldest first.
    pub fn journal(&self) -> Vec<AppAction> {
        self.lock().journal.iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for InMemoryStore {
    fn dispatch(&self, action: AppAction) {
        let mut inner = self.lock();
        log::trace!("Dispatch {}", action.name());
        let next = reduce(&inner.state, &action);
        if inner.journal_capacity > 0 {
            if inner.journal.len() == inner.journal_capacity {
                inner.journal.pop_front();
            }
            inner.journal.push_back(action);
        }
        inner.subscribers.retain(|tx| tx.send(next.clone()).is_ok());
        inner.state = next;
    }

    fn snapshot(&self) -> AppState {
        self.lock().state.clone()
    }
}
