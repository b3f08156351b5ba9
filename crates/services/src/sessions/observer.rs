use std::fmt;

use super::state::SessionState;

/// Receives a snapshot after every transition that changed the session.
pub trait SessionObserver: Send {
    fn on_state_changed(&self, state: &SessionState);
}

impl<F> SessionObserver for F
where
    F: Fn(&SessionState) + Send,
{
    fn on_state_changed(&self, state: &SessionState) {
        self(state);
    }
}

/// Handle returned by `SessionService::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    entries: Vec<(ObserverId, Box<dyn SessionObserver>)>,
}

impl Observers {
    pub(crate) fn subscribe(&mut self, observer: Box<dyn SessionObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn notify(&self, state: &SessionState) {
        for (_, observer) in &self.entries {
            observer.on_state_changed(state);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.entries.len())
            .finish()
    }
}
