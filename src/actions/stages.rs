//! Package pipeline stages.
//!
//! A package read runs through an ordered list of stages. The built-in
//! [`RedactionStage`] always comes first; hosts append their own after it.

use crate::catalog::Package;
use crate::context::RequestContext;
use crate::error::RestrictedResult;
use crate::logging::features::{LogFeature, PerformanceTimer};
use crate::permissions::resource_gate::ResourceGate;
use crate::{log_actions_debug, log_redaction_debug};

/// Trait for implementing package pipeline stages
pub trait PackageStage: Send + Sync {
    /// Get the name of this stage
    fn stage_name(&self) -> &str;

    /// Transform a package on its way back to the caller
    fn process(
        &self,
        gate: &ResourceGate,
        ctx: &mut RequestContext,
        package: Package,
    ) -> RestrictedResult<Package>;
}

/// Removes what the caller may not see from a package's resources.
///
/// In order:
/// - callers with update rights on the package get it untouched
/// - `omit_resources` drops the resource list
/// - `lite_resources` projects each resource to its always-safe fields
/// - otherwise every resource is checked and denied ones are redacted
#[derive(Debug, Default, Clone, Copy)]
pub struct RedactionStage;

impl PackageStage for RedactionStage {
    fn stage_name(&self) -> &str {
        "redaction"
    }

    fn process(
        &self,
        gate: &ResourceGate,
        ctx: &mut RequestContext,
        mut package: Package,
    ) -> RestrictedResult<Package> {
        let summary = package.summary();
        ctx.remember_package(summary.clone());

        if gate.can_edit(ctx, &summary) {
            log_actions_debug!("[{}] caller may edit {}, no redaction", ctx.request_id, package.id);
            return Ok(package);
        }

        if ctx.omit_resources {
            package.resources = None;
            return Ok(package);
        }

        let Some(resources) = package.resources.take() else {
            return Ok(package);
        };

        if ctx.lite_resources {
            package.resources = Some(resources.iter().map(|r| r.lite_projection()).collect());
            return Ok(package);
        }

        let timer = PerformanceTimer::new(LogFeature::Redaction, format!("redact {}", package.id));
        let mut pass = gate.redaction_pass();
        let resources = pass.redact_package_resources(ctx, &summary, resources);
        log_redaction_debug!(
            "[{}] redacted {} of {} resource(s) in {}",
            ctx.request_id,
            pass.redacted_count(),
            resources.len(),
            package.id
        );
        timer.finish();

        package.resources = Some(resources);
        Ok(package)
    }
}
