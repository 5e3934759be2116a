//! `actions` crate: the boundary between the automation engine and the
//! systems that perform real-world side effects (email, CRM, invoicing, …).
//!
//! Every action handler, built-in stub or embedder-supplied, implements
//! [`ActionHandler`]. The engine dispatches through an [`ActionRegistry`]
//! keyed by [`ActionKind`].

pub mod error;
pub mod kind;
pub mod traits;
pub mod registry;
pub mod builtin;
pub mod mock;

pub use error::ActionError;
pub use kind::ActionKind;
pub use traits::{ActionContext, ActionHandler};
pub use registry::ActionRegistry;
