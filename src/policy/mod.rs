//! Role-based admin bar and admin area access policy.
//!
//! [`validator`] sanitizes redirect destinations, [`store`] applies
//! administrative changes to a [`types::PolicyConfiguration`], and
//! [`engine`] turns a configuration and a user into a decision.

pub mod engine;
pub mod errors;
pub mod hooks;
pub mod persist;
pub mod store;
pub mod types;
pub mod validator;
pub mod web;

pub use engine::{access_decision, admin_bar_visible, resolve};
pub use errors::{ConflictError, NotFoundError, Rejected, RejectedAssignment, StoreError};
pub use persist::{ConfigStore, JsonFileStore, MemoryStore};
pub use types::{
    Decision, PolicyConfiguration, RedirectTarget, RequestKind, RoleAssignment, RoleId, RoleSet,
    UserContext, ADMINISTRATOR_ROLE,
};
