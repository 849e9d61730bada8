use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;

use crate::task::Tasks;

/// Lifecycle notifications a [`Tasks`] registry can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A task was started. Carries the task index.
    TaskStarted,
    /// A task stopped, either aborted or by reaching 100%. Carries the task index.
    TaskStopped,
    /// Every task has finished or the whole run was aborted. Carries `None`.
    AllComplete,
}

/// Callback invoked with the registry and the task index, or `None` when the
/// event is not about one task.
pub type Subscriber = Arc<dyn Fn(&Tasks, Option<usize>) + Send + Sync>;

/// One subscriber slot per [`EventKind`].
#[derive(Default)]
pub(crate) struct EventBus {
    slots: RwLock<IndexMap<EventKind, Subscriber>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_set().entries(slots.keys()).finish()
    }
}

impl EventBus {
    /// Installs `subscriber` for `kind`, returning the one it replaced.
    pub(crate) fn subscribe(&self, kind: EventKind, subscriber: Subscriber) -> Option<Subscriber> {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, subscriber)
    }

    pub(crate) fn unsubscribe(&self, kind: EventKind) -> Option<Subscriber> {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(&kind)
    }

    /// Calls the subscriber for `kind` if `index` is a valid task index or
    /// `None`. The slot lock is released before the callback runs.
    pub(crate) fn emit(&self, tasks: &Tasks, kind: EventKind, index: Option<usize>) {
        if !index.is_none_or(|i| i < tasks.len()) {
            return;
        }
        let subscriber = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned();
        if let Some(subscriber) = subscriber {
            subscriber(tasks, index);
        }
    }
}
