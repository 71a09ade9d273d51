use hydrosense_api::{CanonicalFragment, CanonicalState};

/// Current and previous canonical state.
///
/// Owned by the pipeline task, which is the only writer.
#[derive(Debug, Default)]
pub struct StateStore {
    current: CanonicalState,
    previous: CanonicalState,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the pre-merge state as `previous`, then sparse-merge the fragment.
    pub fn merge(&mut self, fragment: &CanonicalFragment) {
        self.previous = self.current.clone();
        self.current.apply(fragment);
    }

    pub fn current(&self) -> &CanonicalState {
        &self.current
    }

    pub fn previous(&self) -> &CanonicalState {
        &self.previous
    }

    /// Current state, or `None` until the first fragment was accepted.
    pub fn snapshot(&self) -> Option<&CanonicalState> {
        (!self.current.is_empty()).then_some(&self.current)
    }
}
