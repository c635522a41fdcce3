use restricted_api::catalog::Resource;
use restricted_api::permissions::{
    MetadataFormat, RestrictionExtractor, RestrictionLevel, RestrictionPolicy,
};
use restricted_api::RestrictedConfig;
use serde_json::json;
use std::collections::BTreeSet;

fn users(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn resource(value: serde_json::Value) -> Resource {
    Resource::from_value(value).expect("valid resource payload")
}

#[test]
fn test_format_follows_configuration() {
    let mut config = RestrictedConfig::default();
    assert_eq!(RestrictionExtractor::from_config(&config).format(), MetadataFormat::Legacy);
    config.scheming_enabled = true;
    assert_eq!(RestrictionExtractor::from_config(&config).format(), MetadataFormat::Extension);
}

#[test]
fn test_no_restriction_fields_is_public() {
    let resource = resource(json!({"id": "r1", "package_id": "p1", "name": "plain"}));
    for extractor in [RestrictionExtractor::new(true), RestrictionExtractor::new(false)] {
        let policy = extractor.extract(&resource);
        assert_eq!(policy, RestrictionPolicy::public());
        assert!(policy.allowed_users.is_empty());
    }
}

#[test]
fn test_extension_json_string_in_extras() {
    let resource = resource(json!({
        "id": "r1",
        "extras": {"restricted": "{\"level\":\"registered\",\"allowed_users\":\"a,b\"}"}
    }));
    let policy = RestrictionExtractor::new(true).extract(&resource);
    assert_eq!(policy.level, RestrictionLevel::Registered);
    assert_eq!(policy.allowed_users, users(&["a", "b"]));
}

#[test]
fn test_extension_same_organization_list_in_extras() {
    let resource = resource(json!({
        "id": "r1",
        "extras": {
            "restricted": "{\"level\":\"same_organization\",\"allowed_users\":[\"a\",\"b\"]}"
        }
    }));
    let policy = RestrictionExtractor::new(true).extract(&resource);
    assert_eq!(
        policy,
        RestrictionPolicy::new(RestrictionLevel::SameOrganization, ["a", "b"])
    );
}

#[test]
fn test_extension_structured_policy_on_resource() {
    let resource = resource(json!({
        "id": "r1",
        "restricted": {"level": "same_organization", "allowed_users": ["carol", " dave "]},
        "extras": {"restricted": {"level": "public"}}
    }));
    let policy = RestrictionExtractor::new(true).extract(&resource);
    assert_eq!(policy.level, RestrictionLevel::SameOrganization);
    assert_eq!(policy.allowed_users, users(&["carol", "dave"]));
}

#[test]
fn test_extension_malformed_json_degrades_to_public() {
    let resource = resource(json!({"id": "r1", "restricted": "{level: registered"}));
    assert_eq!(
        RestrictionExtractor::new(true).extract(&resource),
        RestrictionPolicy::public()
    );
}

#[test]
fn test_extension_ignores_flat_fields() {
    let resource = resource(json!({"id": "r1", "restricted_level": "registered"}));
    assert!(RestrictionExtractor::new(true).extract(&resource).is_public());
}

#[test]
fn test_legacy_flat_fields() {
    let resource = resource(json!({
        "id": "r1",
        "restricted_level": "only_allowed_users",
        "restricted_allowed_users": "alice,bob"
    }));
    let policy = RestrictionExtractor::new(false).extract(&resource);
    assert_eq!(policy.level, RestrictionLevel::OnlyAllowedUsers);
    assert_eq!(policy.allowed_users, users(&["alice", "bob"]));
}

#[test]
fn test_legacy_allowed_users_as_list() {
    let resource = resource(json!({
        "id": "r1",
        "restricted_level": "any_organization",
        "restricted_allowed_users": ["alice", ""]
    }));
    let policy = RestrictionExtractor::new(false).extract(&resource);
    assert_eq!(policy.level, RestrictionLevel::AnyOrganization);
    assert_eq!(policy.allowed_users, users(&["alice"]));
}

#[test]
fn test_unknown_level_is_kept_verbatim() {
    let resource = resource(json!({"id": "r1", "restricted_level": "friends_only"}));
    let policy = RestrictionExtractor::new(false).extract(&resource);
    assert_eq!(policy.level, RestrictionLevel::Unrecognized("friends_only".to_string()));
    assert_eq!(policy.level.to_string(), "friends_only");
}

#[test]
fn test_extras_round_trip_through_resource_payload() {
    let raw = json!({
        "id": "r1",
        "package_id": "p1",
        "format": "CSV",
        "extras": {"restricted": "{\"level\":\"registered\",\"allowed_users\":\"a,b\"}"}
    });
    let resource = resource(raw.clone());
    assert_eq!(serde_json::to_value(&resource).unwrap(), raw);
}
