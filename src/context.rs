//! Per-request state threaded through every restricted action.
//!
//! A host builds one `RequestContext` per incoming request and drops it
//! when the request ends. Nothing here is shared between requests.

use std::collections::HashMap;
use uuid::Uuid;

use crate::catalog::PackageSummary;
use crate::permissions::identity::{UserIdentity, UserRecord};

/// Typed request-scoped state.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Correlation id for log lines belonging to this request
    pub request_id: Uuid,
    /// Caller as reported by the web layer: a user id, a user name, or a
    /// network address for unauthenticated callers
    pub user: Option<String>,
    /// Authenticated user object attached by the web layer, used when `user` is empty
    pub auth_user_obj: Option<UserRecord>,
    /// Identity already loaded for the current request, reused to avoid a directory call
    pub current_user: Option<UserRecord>,
    /// Name of the request endpoint (for example `dataset.search`)
    pub endpoint: Option<String>,
    /// Drop the `resources` field from package payloads
    pub omit_resources: bool,
    /// Project resources down to always-safe fields without restriction checks
    pub lite_resources: bool,
    /// Resources in this request were already evaluated upstream; a payload
    /// carrying the redaction sentinel is denied without a second check
    pub pre_evaluated: bool,
    resolved_identity: Option<UserIdentity>,
    package_summaries: HashMap<String, PackageSummary>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            ..Default::default()
        }
    }

    /// Context for a caller identified by id, name or network address.
    pub fn for_user(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            ..Self::new()
        }
    }

    pub fn with_current_user(mut self, user: UserRecord) -> Self {
        self.current_user = Some(user);
        self
    }

    pub fn with_auth_user_obj(mut self, user: UserRecord) -> Self {
        self.auth_user_obj = Some(user);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// The memoized identity, if this request already resolved one.
    pub fn resolved_identity(&self) -> Option<&UserIdentity> {
        self.resolved_identity.as_ref()
    }

    pub(crate) fn remember_identity(&mut self, identity: UserIdentity) {
        self.resolved_identity = Some(identity);
    }

    /// Previously fetched restriction-relevant fields of a package.
    pub fn cached_package(&self, package_id: &str) -> Option<&PackageSummary> {
        self.package_summaries.get(package_id)
    }

    /// Remember a package summary for the rest of the request.
    pub fn remember_package(&mut self, summary: PackageSummary) {
        self.package_summaries.insert(summary.id.clone(), summary);
    }

    /// Context for nested package reads made on behalf of this request.
    ///
    /// Keeps the identity and package memos, so nested reads never resolve
    /// them again.
    pub fn derive(&self) -> Self {
        self.clone()
    }
}
