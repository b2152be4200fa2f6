//! `portal-core`: shared model primitives for the navigation engine.
//!
//! This crate contains **pure model** building blocks (no IO, no transport).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{MenuId, RequestId};
