mod common;

use common::{standard_directory, MAINTAINER_EMAIL};
use restricted_api::memory::MemoryDirectory;
use restricted_api::permissions::{IdentityResolver, UserIdentity, UserRecord};
use restricted_api::RequestContext;
use std::sync::Arc;

fn resolver() -> (IdentityResolver, Arc<MemoryDirectory>) {
    common::init_logging();
    let directory = Arc::new(standard_directory());
    (IdentityResolver::new(directory.clone()), directory)
}

#[test]
fn test_network_address_resolves_without_lookup() {
    let (resolver, directory) = resolver();
    for address in ["192.168.1.20", "::1"] {
        let mut ctx = RequestContext::for_user(address);
        let identity = resolver.resolve(&mut ctx);
        assert!(matches!(identity, UserIdentity::RawAddress(_)));
        assert!(!identity.is_authenticated());
        assert_eq!(resolver.username(&mut ctx).as_deref(), Some(address));
    }
    assert_eq!(directory.user_lookups(), 0);
}

#[test]
fn test_name_and_id_resolve_to_the_same_user() {
    let (resolver, _) = resolver();
    let by_name = resolver.resolve(&mut RequestContext::for_user("alice"));
    let by_id = resolver.resolve(&mut RequestContext::for_user("u-alice"));
    assert_eq!(by_name, by_id);

    let mut ctx = RequestContext::for_user("alice");
    assert_eq!(resolver.user_id(&mut ctx).as_deref(), Some("u-alice"));
    assert_eq!(resolver.username(&mut ctx).as_deref(), Some("alice"));
}

#[test]
fn test_identity_is_memoized_per_request() {
    let (resolver, directory) = resolver();
    let mut ctx = RequestContext::for_user("bob");
    for _ in 0..3 {
        assert!(resolver.resolve(&mut ctx).is_authenticated());
    }
    assert_eq!(directory.user_lookups(), 1);

    // A later change of the raw user does not re-resolve.
    ctx.user = Some("carol".to_string());
    assert_eq!(resolver.username(&mut ctx).as_deref(), Some("bob"));
    assert_eq!(directory.user_lookups(), 1);
}

#[test]
fn test_anonymous_result_is_memoized_too() {
    let (resolver, _) = resolver();
    let mut ctx = RequestContext::new();
    assert_eq!(resolver.resolve(&mut ctx), UserIdentity::Anonymous);

    ctx.auth_user_obj = Some(UserRecord::new("u-dave", "dave"));
    assert_eq!(resolver.resolve(&mut ctx), UserIdentity::Anonymous);
}

#[test]
fn test_opting_out_of_memoization() {
    let (resolver, directory) = resolver();
    let mut ctx = RequestContext::for_user("bob");
    resolver.resolve_with(&mut ctx, false);
    resolver.resolve_with(&mut ctx, false);
    assert!(ctx.resolved_identity().is_none());
    assert_eq!(directory.user_lookups(), 2);
}

#[test]
fn test_current_user_is_reused() {
    let (resolver, directory) = resolver();
    let current = UserRecord::new("u-carol", "carol");
    let mut ctx = RequestContext::for_user("carol").with_current_user(current.clone());
    assert_eq!(resolver.resolve(&mut ctx), UserIdentity::Authenticated(current));
    assert_eq!(directory.user_lookups(), 0);
}

#[test]
fn test_auth_user_obj_fallback() {
    let (resolver, directory) = resolver();
    let mut ctx = RequestContext::new().with_auth_user_obj(UserRecord::new("u-dave", "dave"));
    assert_eq!(resolver.username(&mut ctx).as_deref(), Some("dave"));
    assert_eq!(directory.user_lookups(), 0);
}

#[test]
fn test_unknown_user_keeps_raw_value() {
    let (resolver, _) = resolver();
    let mut ctx = RequestContext::for_user("zed");
    let identity = resolver.resolve(&mut ctx);
    assert!(identity.is_authenticated());
    assert_eq!(identity.label(), "zed");
}

#[test]
fn test_find_user_by_email_ignores_case() {
    let (resolver, _) = resolver();
    let found = resolver
        .find_user_by_email(&MAINTAINER_EMAIL.to_uppercase())
        .expect("maintainer is registered");
    assert_eq!(found.name, "maria");
    assert!(resolver.find_user_by_email("nobody@example.org").is_none());
}
