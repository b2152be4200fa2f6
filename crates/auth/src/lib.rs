//! `portal-auth`: role hierarchy, session ownership and route gating.
//!
//! No HTTP here: the credential middleware
//! that reads the session lives in `portal-client`.

pub mod guard;
pub mod navigator;
pub mod roles;
pub mod session;
pub mod storage;
pub mod user;

pub use guard::{
    GuardConfig, GuardNotice, RouteGuard, RouteGuardDecision, RouteGuardRequest, evaluate,
};
pub use navigator::{Navigator, TracingNavigator};
pub use roles::{Role, has_minimum_role, level_of};
pub use session::{PersistedSession, SessionState, SessionStore, keys};
pub use storage::{DurableStorage, FileStorage, MemoryStorage, StorageError};
pub use user::{UserId, UserProfile};
