//! # Restricted actions
//!
//! [`RestrictedApi`] wraps the catalog's read actions so that callers only
//! ever see resources their restriction policy lets them view. It is the
//! surface a host registers in place of the unrestricted actions.

pub mod stages;

pub use stages::{PackageStage, RedactionStage};

use std::sync::Arc;

use crate::catalog::{
    Catalog, Package, PackageSummary, Resource, ResourceViewConfig, SearchQuery, SearchResponse,
};
use crate::config::RestrictedConfig;
use crate::context::RequestContext;
use crate::error::{RestrictedError, RestrictedResult};
use crate::logging::features::{LogFeature, PerformanceTimer};
use crate::notifier::{AccessRequestNotifier, Mailer};
use crate::permissions::extractor::RestrictionExtractor;
use crate::permissions::identity::{IdentityResolver, UserDirectory};
use crate::permissions::organizations::{OrganizationDirectory, OrganizationLookup};
use crate::permissions::resource_gate::{ResourceGate, ResourceRef};
use crate::permissions::types::policy::AuthorizationVerdict;
use crate::{log_actions_debug, log_actions_info};

/// Restricted replacements for the catalog's read actions.
pub struct RestrictedApi {
    config: RestrictedConfig,
    gate: ResourceGate,
    notifier: AccessRequestNotifier,
    stages: Vec<Box<dyn PackageStage>>,
}

impl RestrictedApi {
    pub fn new(
        config: RestrictedConfig,
        catalog: Arc<dyn Catalog>,
        users: Arc<dyn UserDirectory>,
        organizations: Arc<dyn OrganizationDirectory>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let identity = IdentityResolver::new(users);
        let gate = ResourceGate::new(
            catalog.clone(),
            identity.clone(),
            RestrictionExtractor::from_config(&config),
            OrganizationLookup::new(organizations, config.organization_permission.clone()),
        );
        let notifier = AccessRequestNotifier::new(catalog, identity, mailer, config.mail.clone());

        Self {
            config,
            gate,
            notifier,
            stages: vec![Box::new(RedactionStage)],
        }
    }

    /// Append a stage that runs after redaction on every package read.
    pub fn with_package_stage(mut self, stage: Box<dyn PackageStage>) -> Self {
        log_actions_debug!("registered package stage '{}'", stage.stage_name());
        self.stages.push(stage);
        self
    }

    pub fn config(&self) -> &RestrictedConfig {
        &self.config
    }

    pub fn gate(&self) -> &ResourceGate {
        &self.gate
    }

    /// Visibility of one resource, by id.
    pub fn check_resource_visibility(
        &self,
        ctx: &mut RequestContext,
        resource_id: &str,
    ) -> RestrictedResult<AuthorizationVerdict> {
        self.gate.check_resource(ctx, ResourceRef::Id(resource_id), None)
    }

    /// Authorization check in the host's convention: a denial is an error.
    pub fn authorize_resource_show(
        &self,
        ctx: &mut RequestContext,
        resource: ResourceRef<'_>,
        package: Option<&PackageSummary>,
    ) -> RestrictedResult<()> {
        let verdict = self.gate.check_resource(ctx, resource, package)?;
        if verdict.allowed {
            return Ok(());
        }
        Err(RestrictedError::NotAuthorized(
            verdict.reason.unwrap_or_default(),
        ))
    }

    /// Whether the caller may view `resource_id` of `package_id`.
    ///
    /// Both ids are required. A denial is returned as a verdict, not an error.
    pub fn check_access(
        &self,
        ctx: &mut RequestContext,
        package_id: Option<&str>,
        resource_id: Option<&str>,
    ) -> RestrictedResult<AuthorizationVerdict> {
        let package_id = required(package_id, "package_id")?;
        let resource_id = required(resource_id, "resource_id")?;

        let package = self.gate.catalog().package_summary(ctx, package_id)?;
        let resource = self.gate.catalog().resource_show(ctx, resource_id)?;

        match self.authorize_resource_show(ctx, ResourceRef::Fetched(&resource), Some(&package)) {
            Ok(()) => Ok(AuthorizationVerdict::allow()),
            Err(RestrictedError::NotAuthorized(reason)) => Ok(AuthorizationVerdict::deny(reason)),
            Err(e) => Err(e),
        }
    }

    /// Views of a resource; empty when the caller may not view the resource.
    pub fn resource_view_list(
        &self,
        ctx: &mut RequestContext,
        resource_id: Option<&str>,
    ) -> RestrictedResult<Vec<ResourceViewConfig>> {
        let resource_id = required(resource_id, "id")?;
        let resource = self.gate.catalog().resource_show(ctx, resource_id)?;

        let verdict = self
            .gate
            .check_resource(ctx, ResourceRef::Fetched(&resource), None)?;
        if !verdict.allowed {
            log_actions_info!(
                "[{}] hiding views of {}: {}",
                ctx.request_id,
                resource_id,
                verdict.reason.as_deref().unwrap_or_default()
            );
            return Ok(Vec::new());
        }

        Ok(self.gate.catalog().resource_view_list(ctx, resource_id)?)
    }

    /// Read a package and pass it through every package stage.
    pub fn package_show(&self, ctx: &mut RequestContext, id: &str) -> RestrictedResult<Package> {
        let timer = PerformanceTimer::new(LogFeature::Actions, format!("package_show {id}"));
        let mut package = self.gate.catalog().package_show(ctx, id)?;
        for stage in &self.stages {
            package = stage.process(&self.gate, ctx, package)?;
        }
        timer.finish();
        Ok(package)
    }

    /// Resource search with denied results redacted in place.
    pub fn resource_search(
        &self,
        ctx: &mut RequestContext,
        query: &SearchQuery,
    ) -> RestrictedResult<SearchResponse<Resource>> {
        let response = self.gate.catalog().resource_search(ctx, query)?;

        let mut pass = self.gate.redaction_pass();
        let results = pass.redact_resources(ctx, response.results);
        log_actions_debug!(
            "[{}] resource search: {} of {} result(s) redacted",
            ctx.request_id,
            pass.redacted_count(),
            results.len()
        );

        Ok(SearchResponse {
            results,
            extra: response.extra,
        })
    }

    /// Package search with every result re-read through [`Self::package_show`].
    ///
    /// Listing endpoints get lite resources instead of full redaction.
    pub fn package_search(
        &self,
        ctx: &mut RequestContext,
        query: &SearchQuery,
    ) -> RestrictedResult<SearchResponse<Package>> {
        self.gate.identity().resolve(ctx);
        let response = self.gate.catalog().package_search(ctx, query)?;

        let mut nested = ctx.derive();
        if let Some(endpoint) = ctx.endpoint.as_deref() {
            if self.config.is_lite_endpoint(endpoint) {
                log_actions_debug!(
                    "[{}] {} lists packages, using lite resources",
                    ctx.request_id,
                    endpoint
                );
                nested.lite_resources = true;
            }
        }

        let results = response
            .results
            .iter()
            .map(|package| self.package_show(&mut nested, &package.id))
            .collect::<RestrictedResult<Vec<_>>>()?;

        Ok(SearchResponse {
            results,
            extra: response.extra,
        })
    }

    /// Ask the maintainer of a resource for access on the caller's behalf.
    pub fn request_access(
        &self,
        ctx: &mut RequestContext,
        resource_id: Option<&str>,
        package_id: Option<&str>,
    ) -> RestrictedResult<()> {
        self.notifier.request_access(ctx, resource_id, package_id)
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> RestrictedResult<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| RestrictedError::validation(field, format!("Missing {field}")))
}
