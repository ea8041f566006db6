//! Tool invocation policy.
//!
//! Core principle: **absence of an explicit allow is a deny-by-default risk
//! boundary.** Authorization is scoped to named tools; lookup is total and
//! snapshots swap atomically on reload.

mod error;
mod policy;
mod store;

pub use error::{Error, Result};
pub use policy::{Decision, Policy, RuleSource};
pub use store::PolicyStore;
