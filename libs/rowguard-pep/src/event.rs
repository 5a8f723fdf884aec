use crate::policy::Action;

/// Abort signal shared between a save/delete pipeline and its hooks.
///
/// The pipeline creates one event per write, runs the hooks, and commits
/// only if the event is still valid afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteEvent {
    action: Action,
    valid: bool,
}

impl WriteEvent {
    #[must_use]
    pub fn new(action: Action) -> Self {
        Self {
            action,
            valid: true,
        }
    }

    #[must_use]
    pub fn save() -> Self {
        Self::new(Action::Save)
    }

    #[must_use]
    pub fn delete() -> Self {
        Self::new(Action::Delete)
    }

    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Marks the write as rejected. There is no way back.
    pub fn veto(&mut self) {
        self.valid = false;
    }
}
