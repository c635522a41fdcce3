use crate::permissions::identity::UserIdentity;
use crate::permissions::organizations::MembershipSource;
use crate::permissions::types::policy::{AuthorizationVerdict, RestrictionLevel, RestrictionPolicy};
use crate::{log_policy_debug, log_policy_info};

pub const REASON_REGISTERED_ONLY: &str = "Resource access restricted to registered users";
pub const REASON_ALLOWED_USERS_ONLY: &str = "Resource access restricted to allowed users only";
pub const REASON_ORGANIZATION_MEMBERS_ONLY: &str =
    "Resource access restricted to members of an organization";

/// Denial reason for the same-organization tier.
pub fn same_organization_reason(owner_org: &str) -> String {
    format!("Resource access restricted to same organization ({owner_org}) members")
}

/// Decides whether an identity may view a resource under its restriction policy.
///
/// Tiers are checked from least to most restrictive and the first rule that
/// resolves wins:
///
/// 1. `public` allows everyone, anonymous callers included
/// 2. anonymous callers are denied every other tier
/// 3. `registered` allows any authenticated caller
/// 4. membership in the allow-list allows at any tier
/// 5. `only_allowed_users` denies everyone else
/// 6. organization tiers consult memberships, fetched only now; an empty
///    membership fails as "members of an organization", except at
///    `same_organization`, which always names the owning organization
/// 7. unrecognized levels deny
///
/// Edit rights on the owning package are checked by the caller before
/// evaluation and bypass it entirely.
#[derive(Debug, Default, Clone, Copy)]
pub struct PolicyEvaluator;

impl PolicyEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Evaluate `policy` for `identity`.
    ///
    /// # Arguments
    ///
    /// * `identity` - The resolved caller
    /// * `policy` - The resource's normalized restriction policy
    /// * `owner_org` - Organization owning the resource's package
    /// * `memberships` - Source of the caller's organizations, consulted lazily
    #[must_use]
    pub fn evaluate(
        &self,
        identity: &UserIdentity,
        policy: &RestrictionPolicy,
        owner_org: Option<&str>,
        memberships: &mut dyn MembershipSource,
    ) -> AuthorizationVerdict {
        if policy.level == RestrictionLevel::Public {
            return AuthorizationVerdict::allow();
        }

        let Some(user) = identity.user() else {
            log_policy_debug!(
                "{} denied: level {} requires a registered user",
                identity.label(),
                policy.level
            );
            return AuthorizationVerdict::deny(REASON_REGISTERED_ONLY);
        };

        if policy.level == RestrictionLevel::Registered {
            return AuthorizationVerdict::allow();
        }

        if policy.allowed_users.contains(&user.name) || policy.allowed_users.contains(&user.id) {
            log_policy_debug!("{} is on the allow-list", user.name);
            return AuthorizationVerdict::allow();
        }

        if policy.level == RestrictionLevel::OnlyAllowedUsers {
            log_policy_info!("{} denied: not on the allow-list", user.name);
            return AuthorizationVerdict::deny(REASON_ALLOWED_USERS_ONLY);
        }

        let membership = memberships.memberships(&user.name);
        if policy.level == RestrictionLevel::AnyOrganization {
            if membership.is_empty() {
                log_policy_info!("{} denied: member of no organization", user.name);
                return AuthorizationVerdict::deny(REASON_ORGANIZATION_MEMBERS_ONLY);
            }
            return AuthorizationVerdict::allow();
        }

        let owner_org = owner_org.unwrap_or_default();
        if membership.is_empty() && policy.level != RestrictionLevel::SameOrganization {
            log_policy_info!(
                "{} denied: member of no organization at level {}",
                user.name,
                policy.level
            );
            return AuthorizationVerdict::deny(REASON_ORGANIZATION_MEMBERS_ONLY);
        }

        if policy.level == RestrictionLevel::SameOrganization && membership.contains(owner_org) {
            return AuthorizationVerdict::allow();
        }

        if let RestrictionLevel::Unrecognized(level) = &policy.level {
            log_policy_info!("unrecognized restriction level '{}', denying", level);
        }
        log_policy_info!("{} denied: not a member of '{}'", user.name, owner_org);
        AuthorizationVerdict::deny(same_organization_reason(owner_org))
    }
}
