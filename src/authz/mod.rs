//! Authorization module - permission catalog, policies and middleware
//!
//! This module implements the flat permission model:
//! - A closed [`Permission`] enum mirrored into storage by [`catalog::reconcile`]
//! - One policy per permission, registered at startup in a [`PolicyRegistry`]
//! - [`authenticate`] middleware plus a per-route [`RequirePermission`] layer

pub mod catalog;
mod evaluator;
mod layer;
mod permission;
mod principal;

pub use evaluator::{ClaimPolicyEvaluator, Decision, PermissionPolicy, PolicyEvaluator, PolicyRegistry};
pub use layer::{authenticate, RequirePermission, RequirePermissionService};
pub use permission::{Permission, UnknownPermission};
pub use principal::Principal;

/// Well-known role names
pub mod roles {
    pub const ADMIN: &str = "Admin";
    pub const USER: &str = "User";
}
