//! # Permissions System
//!
//! Decides whether a caller may view a catalog resource.
//!
//! ## Components
//!
//! * `identity` - Resolves and memoizes who is calling
//! * `extractor` - Normalizes restriction metadata from either storage format
//! * `organizations` - Looks up the caller's organization memberships
//! * `evaluator` - The tiered decision procedure
//! * `resource_gate` - Ties the above together per resource and per redaction pass
//! * `types` - Restriction levels, policies and verdicts
//!
//! ## Architecture
//!
//! Each resource declares a restriction level and an optional allow-list.
//! Levels run from `public` through `registered` and `any_organization` up
//! to `same_organization` and `only_allowed_users`. The allow-list admits
//! its users at every level. Anyone who may update the owning package sees
//! every resource in it, which the gate checks before evaluating.

pub mod evaluator;
pub mod extractor;
pub mod identity;
pub mod organizations;
pub mod resource_gate;
pub mod types;

pub use evaluator::PolicyEvaluator;
pub use extractor::{MetadataFormat, RestrictionExtractor};
pub use identity::{DirectoryError, IdentityResolver, UserDirectory, UserIdentity, UserRecord};
pub use organizations::{
    MembershipSource, MemoizedMembership, OrganizationDirectory, OrganizationLookup,
    OrganizationMembership, OrganizationSummary,
};
pub use resource_gate::{RedactionPass, ResourceGate, ResourceRef};
pub use types::policy::{AuthorizationVerdict, RestrictionLevel, RestrictionPolicy};
