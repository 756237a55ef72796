//! Support-case messaging core.

pub mod caller;
pub mod conversation;
pub mod events;
pub mod lifecycle;
pub mod requests;
pub mod view;
pub mod visibility;

pub use caller::{Caller, CallerRole};
pub use events::{BroadcastError, Broadcaster, CaseEvent};
pub use lifecycle::{CaseLifecycle, SeenMode, SeenResult};
pub use view::CaseView;
pub use visibility::{CaseQuery, Origin};
