//! # Restricted API
//!
//! Access control and result redaction for a dataset catalog. Every read
//! that would reveal a resource is routed through a restriction policy
//! check, and resources the caller may not view come back with their
//! hidden fields overwritten.
//!
//! ## Core Components
//!
//! * `actions` - Restricted replacements for the catalog's read actions
//! * `catalog` - Canonical package and resource types, and the catalog boundary
//! * `config` - Configuration loading and validation
//! * `context` - Per-request state
//! * `error` - Error types and handling
//! * `logging` - Logging setup with per-feature targets
//! * `memory` - In-memory collaborators backing the CLI and tests
//! * `notifier` - Access requests sent to resource maintainers
//! * `permissions` - Identity, restriction policies and their evaluation
//!
//! ## Architecture
//!
//! The catalog, the user and organization directories and the mailer are
//! collaborators behind traits. [`RestrictedApi`] owns a [`ResourceGate`]
//! that combines them into one visibility decision per resource, and runs
//! package reads through an ordered list of stages, redaction first.

pub mod actions;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod memory;
pub mod notifier;
pub mod permissions;

// Re-export main types for convenience
pub use actions::{PackageStage, RedactionStage, RestrictedApi};
pub use catalog::{Catalog, CatalogError, Package, PackageSummary, Resource, REDACTED};
pub use config::{load_config, RestrictedConfig};
pub use context::RequestContext;
pub use error::{RestrictedError, RestrictedResult};
pub use notifier::{AccessRequestEmail, AccessRequestNotifier, LogMailer, MailError, Mailer};
pub use permissions::{
    AuthorizationVerdict, IdentityResolver, ResourceGate, ResourceRef, RestrictionLevel,
    RestrictionPolicy, UserIdentity, UserRecord,
};
