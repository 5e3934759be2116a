//! Dispatch table from [`ActionKind`] to handler.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{builtin, ActionHandler, ActionKind};

/// Maps each action to the handler that performs it.
///
/// Actions without a handler are legal in workflow definitions; invoking one
/// produces a step failure at execution time.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the stub handlers from [`builtin`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Install `handler` for `kind`, returning the handler it replaced.
    pub fn register(
        &mut self,
        kind: ActionKind,
        handler: Arc<dyn ActionHandler>,
    ) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.insert(kind, handler)
    }

    /// Remove the handler for `kind`.
    pub fn unregister(&mut self, kind: ActionKind) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.remove(&kind)
    }

    pub fn get(&self, kind: ActionKind) -> Option<&Arc<dyn ActionHandler>> {
        self.handlers.get(&kind)
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Registered actions, sorted.
    pub fn kinds(&self) -> Vec<ActionKind> {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAction;
    use serde_json::json;

    #[test]
    fn builtins_cover_the_stubbed_actions_only() {
        let registry = ActionRegistry::with_builtins();
        assert!(registry.contains(ActionKind::SendWelcomeEmail));
        assert!(registry.contains(ActionKind::GenerateInvoice));
        assert!(!registry.contains(ActionKind::SuspendService));
        assert_eq!(registry.kinds().len(), 9);
    }

    #[test]
    fn register_replaces_existing_handler() {
        let mut registry = ActionRegistry::with_builtins();
        let replaced = registry.register(
            ActionKind::AddToCrm,
            Arc::new(MockAction::returning("crm", json!({}))),
        );
        assert!(replaced.is_some());

        assert!(registry.unregister(ActionKind::AddToCrm).is_some());
        assert!(registry.get(ActionKind::AddToCrm).is_none());
    }
}
