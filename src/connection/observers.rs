//! Registry of state-change callbacks.

use std::fmt;

/// Handle returned by [`StateObservers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Callback = Box<dyn FnMut() + Send>;

/// Callbacks fired synchronously, in subscription order, on each state change.
#[derive(Default)]
pub struct StateObservers {
    next_id: u64,
    observers: Vec<(ObserverId, Callback)>,
}

impl StateObservers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback and returns its id.
    pub fn subscribe(&mut self, callback: impl FnMut() + Send + 'static) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(callback)));
        id
    }

    /// Removes a callback. Returns false if the id was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Invokes every registered callback once.
    pub fn notify(&mut self) {
        for (_, callback) in self.observers.iter_mut() {
            callback();
        }
    }
}

impl fmt::Debug for StateObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateObservers")
            .field("count", &self.observers.len())
            .finish()
    }
}
