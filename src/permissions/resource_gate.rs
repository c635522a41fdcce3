use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::{Catalog, PackageSummary, Resource};
use crate::context::RequestContext;
use crate::error::RestrictedResult;
use crate::permissions::evaluator::PolicyEvaluator;
use crate::permissions::extractor::RestrictionExtractor;
use crate::permissions::identity::IdentityResolver;
use crate::permissions::organizations::{MembershipSource, MemoizedMembership, OrganizationLookup};
use crate::permissions::types::policy::AuthorizationVerdict;
use crate::{log_redaction_debug, log_redaction_warn};

pub const REASON_DENIED_UPSTREAM: &str = "Resource access was denied earlier in this request";

/// A resource to check: either its id, or a payload the caller already holds.
#[derive(Debug, Clone, Copy)]
pub enum ResourceRef<'a> {
    Id(&'a str),
    Fetched(&'a Resource),
}

/// Coordinates the pieces of a resource visibility decision.
///
/// For one resource the gate:
/// - honors an upstream decision when the context marks resources as pre-evaluated
/// - finds the owning package, from the caller, the request memo, or the catalog
/// - lets anyone with update rights on that package through
/// - otherwise extracts the restriction policy and asks the evaluator
pub struct ResourceGate {
    catalog: Arc<dyn Catalog>,
    identity: IdentityResolver,
    extractor: RestrictionExtractor,
    organizations: OrganizationLookup,
    evaluator: PolicyEvaluator,
}

impl ResourceGate {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        identity: IdentityResolver,
        extractor: RestrictionExtractor,
        organizations: OrganizationLookup,
    ) -> Self {
        Self {
            catalog,
            identity,
            extractor,
            organizations,
            evaluator: PolicyEvaluator::new(),
        }
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    pub fn extractor(&self) -> &RestrictionExtractor {
        &self.extractor
    }

    /// Decide whether the caller may view one resource.
    ///
    /// Fails only when the resource or its package cannot be fetched.
    pub fn check_resource(
        &self,
        ctx: &mut RequestContext,
        resource: ResourceRef<'_>,
        package: Option<&PackageSummary>,
    ) -> RestrictedResult<AuthorizationVerdict> {
        let fetched;
        let resource = match resource {
            ResourceRef::Fetched(resource) => resource,
            ResourceRef::Id(id) => {
                fetched = self.catalog.resource_show(ctx, id)?;
                &fetched
            }
        };

        if let Some(verdict) = pre_evaluated_verdict(ctx, resource) {
            log_redaction_debug!(
                "[{}] resource {} was denied earlier in the request",
                ctx.request_id,
                resource.id
            );
            return Ok(verdict);
        }

        let package = match package {
            Some(package) => package.clone(),
            None => self.package_for(ctx, resource)?,
        };

        if self.can_edit(ctx, &package) {
            return Ok(AuthorizationVerdict::allow());
        }

        let mut memberships = self.organizations.memoized();
        Ok(self.evaluate(ctx, resource, &package, &mut memberships))
    }

    /// Restriction-relevant fields of the package owning `resource`.
    ///
    /// Memoized on the request context by package id.
    pub fn package_for(
        &self,
        ctx: &mut RequestContext,
        resource: &Resource,
    ) -> RestrictedResult<PackageSummary> {
        let package_id = resource.package_id.as_deref().unwrap_or_default();
        if let Some(summary) = ctx.cached_package(package_id) {
            return Ok(summary.clone());
        }

        log_redaction_debug!("[{}] fetching package {}", ctx.request_id, package_id);
        let summary = self.catalog.package_summary(ctx, package_id)?;
        ctx.remember_package(summary.clone());
        Ok(summary)
    }

    /// Whether the caller holds update rights on the package.
    pub fn can_edit(&self, ctx: &mut RequestContext, package: &PackageSummary) -> bool {
        let identity = self.identity.resolve(ctx);
        let user = identity.user().map(|u| u.name.as_str());
        user.is_some() && self.catalog.can_update_package(user, package)
    }

    /// Extract the policy of `resource` and evaluate it. No edit bypass.
    pub fn evaluate(
        &self,
        ctx: &mut RequestContext,
        resource: &Resource,
        package: &PackageSummary,
        memberships: &mut dyn MembershipSource,
    ) -> AuthorizationVerdict {
        let identity = self.identity.resolve(ctx);
        let policy = self.extractor.extract(resource);
        self.evaluator
            .evaluate(&identity, &policy, package.owner_org.as_deref(), memberships)
    }

    /// Begin redacting a batch of resources within one request.
    pub fn redaction_pass(&self) -> RedactionPass<'_> {
        RedactionPass {
            gate: self,
            memberships: self.organizations.memoized(),
            edit_rights: HashMap::new(),
            redacted: 0,
        }
    }
}

/// Upstream denial for a resource, if the request carries one.
///
/// Only a payload already carrying the sentinel short-circuits. Anything
/// else is evaluated, since the flag covers the whole request.
fn pre_evaluated_verdict(
    ctx: &RequestContext,
    resource: &Resource,
) -> Option<AuthorizationVerdict> {
    (ctx.pre_evaluated && resource.is_redacted())
        .then(|| AuthorizationVerdict::deny(REASON_DENIED_UPSTREAM))
}

/// One redaction sweep over a list of resources.
///
/// Memberships and edit rights are computed at most once per user and per
/// package for the whole pass, and output order always matches input order.
pub struct RedactionPass<'a> {
    gate: &'a ResourceGate,
    memberships: MemoizedMembership<'a>,
    edit_rights: HashMap<String, bool>,
    redacted: usize,
}

impl RedactionPass<'_> {
    /// Redact resources that all belong to `package`, without refetching it.
    pub fn redact_package_resources(
        &mut self,
        ctx: &mut RequestContext,
        package: &PackageSummary,
        resources: Vec<Resource>,
    ) -> Vec<Resource> {
        ctx.remember_package(package.clone());
        resources
            .into_iter()
            .map(|resource| self.redact_one(ctx, Some(package), resource))
            .collect()
    }

    /// Redact resources that may belong to different packages.
    pub fn redact_resources(
        &mut self,
        ctx: &mut RequestContext,
        resources: Vec<Resource>,
    ) -> Vec<Resource> {
        resources
            .into_iter()
            .map(|resource| self.redact_one(ctx, None, resource))
            .collect()
    }

    /// Number of resources redacted so far
    pub fn redacted_count(&self) -> usize {
        self.redacted
    }

    fn redact_one(
        &mut self,
        ctx: &mut RequestContext,
        package: Option<&PackageSummary>,
        mut resource: Resource,
    ) -> Resource {
        if !self.is_allowed(ctx, package, &resource) {
            resource.redact();
            self.redacted += 1;
        }
        resource
    }

    fn is_allowed(
        &mut self,
        ctx: &mut RequestContext,
        package: Option<&PackageSummary>,
        resource: &Resource,
    ) -> bool {
        if let Some(verdict) = pre_evaluated_verdict(ctx, resource) {
            return verdict.allowed;
        }

        let package = match package {
            Some(package) => package.clone(),
            None => match self.gate.package_for(ctx, resource) {
                Ok(package) => package,
                Err(e) => {
                    log_redaction_warn!(
                        "[{}] cannot load package of resource {}, redacting: {}",
                        ctx.request_id,
                        resource.id,
                        e
                    );
                    return false;
                }
            },
        };

        let can_edit = match self.edit_rights.get(&package.id) {
            Some(can_edit) => *can_edit,
            None => {
                let can_edit = self.gate.can_edit(ctx, &package);
                self.edit_rights.insert(package.id.clone(), can_edit);
                can_edit
            }
        };
        if can_edit {
            return true;
        }

        self.gate
            .evaluate(ctx, resource, &package, &mut self.memberships)
            .allowed
    }
}
