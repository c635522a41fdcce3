mod common;

use common::{legacy_resource, Harness};
use restricted_api::catalog::{Package, ResourceViewConfig, LITE_RESOURCE_FIELDS};
use restricted_api::memory::MemoryCatalog;
use restricted_api::permissions::ResourceGate;
use restricted_api::{
    PackageStage, RequestContext, RestrictedError, RestrictedResult, ResourceRef, REDACTED,
};
use serde_json::{json, Map};
use std::collections::BTreeSet;

fn visible(package: &Package) -> Vec<&str> {
    package
        .resources
        .iter()
        .flatten()
        .filter(|r| !r.is_redacted())
        .map(|r| r.id.as_str())
        .collect()
}

fn ctx_for(user: Option<&str>) -> RequestContext {
    match user {
        Some(user) => RequestContext::for_user(user),
        None => RequestContext::new(),
    }
}

#[test]
fn test_package_show_redacts_per_caller() {
    let cases: [(Option<&str>, &[&str]); 5] = [
        (None, &["r-public"]),
        (Some("alice"), &["r-public", "r-registered"]),
        (Some("bob"), &["r-public", "r-registered", "r-any", "r-allowed"]),
        (Some("carol"), &["r-public", "r-registered", "r-any", "r-same"]),
        (Some("dave"), &["r-public", "r-registered", "r-any", "r-same", "r-allowed"]),
    ];

    for (user, expected) in cases {
        let h = Harness::standard();
        let package = h.api.package_show(&mut ctx_for(user), "p1").unwrap();
        assert_eq!(visible(&package), expected, "caller {:?}", user);
        assert_eq!(package.resources.as_ref().map(Vec::len), Some(5));
    }
}

#[test]
fn test_redaction_only_touches_url_and_restricted() {
    let h = Harness::standard();
    let package = h.api.package_show(&mut RequestContext::new(), "p1").unwrap();
    let original = h.catalog.package("p1").cloned().unwrap();

    for (redacted, original) in package.resources.unwrap().iter().zip(original.resources.unwrap()) {
        assert_eq!(redacted.id, original.id);
        assert_eq!(redacted.fields.get("name"), original.fields.get("name"));
        assert_eq!(redacted.fields.get("format"), original.fields.get("format"));
        if redacted.is_redacted() {
            assert_eq!(redacted.url.as_deref(), Some(REDACTED));
            assert_eq!(redacted.restricted, Some(json!(REDACTED)));
        } else {
            assert_eq!(redacted, &original);
        }
    }
}

#[test]
fn test_editor_gets_package_untouched_without_membership_lookup() {
    let h = Harness::standard();
    let package = h.api.package_show(&mut RequestContext::for_user("dave"), "p1").unwrap();
    assert_eq!(package, h.catalog.package("p1").cloned().unwrap());
    assert_eq!(h.directory.organization_lookups(), 0);
}

#[test]
fn test_memberships_looked_up_once_per_package_show() {
    let h = Harness::standard();
    h.api.package_show(&mut RequestContext::for_user("carol"), "p1").unwrap();
    assert_eq!(h.directory.organization_lookups(), 1);
}

#[test]
fn test_omit_resources_drops_the_list() {
    let h = Harness::standard();
    let mut ctx = RequestContext::new();
    ctx.omit_resources = true;
    let package = h.api.package_show(&mut ctx, "p1").unwrap();
    assert!(package.resources.is_none());
    let value = serde_json::to_value(&package).unwrap();
    assert!(value.get("resources").is_none());
    assert_eq!(value["title"], json!("River levels"));
}

#[test]
fn test_lite_resources_keep_only_safe_fields() {
    let h = Harness::standard();
    let mut ctx = RequestContext::new();
    ctx.lite_resources = true;
    let package = h.api.package_show(&mut ctx, "p1").unwrap();

    let expected: BTreeSet<&str> = LITE_RESOURCE_FIELDS.iter().copied().collect();
    for resource in package.resources.unwrap() {
        let value = serde_json::to_value(&resource).unwrap();
        let keys: BTreeSet<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, expected);
        assert_eq!(value["name"], json!(format!("Resource {}", resource.id)));
    }
    assert_eq!(h.directory.organization_lookups(), 0);
}

#[test]
fn test_redaction_preserves_order() {
    let catalog = MemoryCatalog::new().with_package(
        Package::new("p2", Some("org1"))
            .with_resource(legacy_resource("r1", "p2", None, ""))
            .with_resource(legacy_resource("r2", "p2", Some("registered"), ""))
            .with_resource(legacy_resource("r3", "p2", Some("public"), "")),
    );
    let h = Harness::new(catalog, common::standard_directory());
    let package = h.api.package_show(&mut RequestContext::new(), "p2").unwrap();

    let resources = package.resources.unwrap();
    let ids: Vec<&str> = resources.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["r1", "r2", "r3"]);
    let redacted: Vec<bool> = resources.iter().map(|r| r.is_redacted()).collect();
    assert_eq!(redacted, [false, true, false]);
}

#[test]
fn test_pre_evaluated_redaction_is_idempotent() {
    let h = Harness::standard();
    let package = h.api.package_show(&mut RequestContext::for_user("alice"), "p1").unwrap();
    let resources = package.resources.unwrap();
    let lookups = h.directory.organization_lookups();

    let mut ctx = RequestContext::for_user("alice");
    ctx.pre_evaluated = true;
    let mut pass = h.api.gate().redaction_pass();
    let again = pass.redact_resources(&mut ctx, resources.clone());

    assert_eq!(again, resources);
    assert_eq!(pass.redacted_count(), 3);
    // sentinel payloads are denied without consulting memberships
    assert_eq!(h.directory.organization_lookups(), lookups);
}

#[test]
fn test_pre_evaluated_flag_does_not_expose_fresh_payloads() {
    let h = Harness::standard();
    let mut ctx = RequestContext::new();
    ctx.pre_evaluated = true;

    let package = h.api.package_show(&mut ctx, "p1").unwrap();
    assert_eq!(visible(&package), ["r-public"]);
    for resource in package.resources.iter().flatten().filter(|r| r.id != "r-public") {
        assert_eq!(resource.url.as_deref(), Some(REDACTED));
    }
}

#[test]
fn test_pre_evaluated_sentinel_denies_single_check() {
    let h = Harness::standard();
    let mut resource = legacy_resource("r-public", "p1", None, "");
    resource.redact();

    let mut ctx = RequestContext::for_user("carol");
    ctx.pre_evaluated = true;
    let verdict = h
        .api
        .gate()
        .check_resource(&mut ctx, ResourceRef::Fetched(&resource), None)
        .unwrap();
    assert!(!verdict.allowed);
    assert_eq!(h.catalog.package_reads(), 0);
}

struct RedactionCountStage;

impl PackageStage for RedactionCountStage {
    fn stage_name(&self) -> &str {
        "redaction_count"
    }

    fn process(
        &self,
        _gate: &ResourceGate,
        _ctx: &mut RequestContext,
        mut package: Package,
    ) -> RestrictedResult<Package> {
        let count = package
            .resources
            .iter()
            .flatten()
            .filter(|r| r.is_redacted())
            .count();
        package.fields.insert("redacted_resources".to_string(), json!(count));
        Ok(package)
    }
}

#[test]
fn test_host_stages_run_after_redaction() {
    let h = Harness::standard();
    let api = h.api.with_package_stage(Box::new(RedactionCountStage));
    let package = api.package_show(&mut RequestContext::for_user("alice"), "p1").unwrap();
    assert_eq!(package.fields.get("redacted_resources"), Some(&json!(3)));
}

#[test]
fn test_missing_package_is_not_found() {
    let h = Harness::standard();
    let err = h.api.package_show(&mut RequestContext::new(), "nope").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_check_access_requires_both_ids_before_fetching() {
    let h = Harness::standard();
    let mut ctx = RequestContext::for_user("alice");

    let err = h.api.check_access(&mut ctx, None, Some("r-same")).unwrap_err();
    assert!(matches!(err, RestrictedError::Validation { ref field, .. } if field == "package_id"));

    let err = h.api.check_access(&mut ctx, Some("p1"), Some("  ")).unwrap_err();
    assert!(matches!(err, RestrictedError::Validation { ref field, .. } if field == "resource_id"));

    assert_eq!(h.catalog.package_reads(), 0);
    assert_eq!(h.catalog.resource_show_calls(), 0);
}

#[test]
fn test_check_access_returns_verdicts() {
    let h = Harness::standard();

    let verdict = h
        .api
        .check_access(&mut RequestContext::for_user("alice"), Some("p1"), Some("r-same"))
        .unwrap();
    assert!(!verdict.allowed);
    assert!(verdict.reason.unwrap().contains("same organization (org1)"));

    let verdict = h
        .api
        .check_access(&mut RequestContext::for_user("carol"), Some("p1"), Some("r-same"))
        .unwrap();
    assert!(verdict.allowed);

    let err = h
        .api
        .check_access(&mut RequestContext::for_user("carol"), Some("p1"), Some("r-missing"))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_anonymous_caller_sees_public_resource() {
    let h = Harness::standard();
    let verdict = h
        .api
        .check_resource_visibility(&mut RequestContext::new(), "r-public")
        .unwrap();
    assert!(verdict.allowed);
}

#[test]
fn test_authorize_resource_show_raises_on_denial() {
    let h = Harness::standard();
    let err = h
        .api
        .authorize_resource_show(&mut RequestContext::new(), ResourceRef::Id("r-registered"), None)
        .unwrap_err();
    match err {
        RestrictedError::NotAuthorized(reason) => assert!(reason.contains("registered users")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_view_list_is_empty_when_denied() {
    let view = ResourceViewConfig {
        id: "v1".to_string(),
        resource_id: "r-same".to_string(),
        view_type: "datatables_view".to_string(),
        title: Some("Table".to_string()),
        fields: Map::new(),
    };
    let h = Harness::new(common::standard_catalog().with_view(view), common::standard_directory());

    let views = h
        .api
        .resource_view_list(&mut RequestContext::for_user("carol"), Some("r-same"))
        .unwrap();
    assert_eq!(views.len(), 1);

    let views = h
        .api
        .resource_view_list(&mut RequestContext::for_user("alice"), Some("r-same"))
        .unwrap();
    assert!(views.is_empty());

    let err = h
        .api
        .resource_view_list(&mut RequestContext::new(), None)
        .unwrap_err();
    assert!(err.is_validation());

    let err = h
        .api
        .resource_view_list(&mut RequestContext::new(), Some("r-missing"))
        .unwrap_err();
    assert!(err.is_not_found());
}
