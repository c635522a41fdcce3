//! Organization membership lookup.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::permissions::identity::DirectoryError;
use crate::{log_organizations_debug, log_organizations_warn};

/// Organization as reported by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub id: String,
    pub name: String,
}

impl OrganizationSummary {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Organizations one user belongs to, keyed by organization id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationMembership {
    organizations: BTreeMap<String, String>,
}

impl OrganizationMembership {
    pub fn is_empty(&self) -> bool {
        self.organizations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.organizations.len()
    }

    pub fn contains(&self, organization_id: &str) -> bool {
        self.organizations.contains_key(organization_id)
    }

    pub fn name_of(&self, organization_id: &str) -> Option<&str> {
        self.organizations.get(organization_id).map(String::as_str)
    }
}

impl FromIterator<OrganizationSummary> for OrganizationMembership {
    /// Entries with an empty id or name are dropped.
    fn from_iter<I: IntoIterator<Item = OrganizationSummary>>(iter: I) -> Self {
        Self {
            organizations: iter
                .into_iter()
                .filter(|org| !org.id.is_empty() && !org.name.is_empty())
                .map(|org| (org.id, org.name))
                .collect(),
        }
    }
}

/// Directory of organization memberships
pub trait OrganizationDirectory: Send + Sync {
    fn organizations_for_user(
        &self,
        username: &str,
        permission: &str,
    ) -> Result<Vec<OrganizationSummary>, DirectoryError>;
}

/// Resolves a user's organizations through the directory. No caching.
#[derive(Clone)]
pub struct OrganizationLookup {
    directory: Arc<dyn OrganizationDirectory>,
    permission: String,
}

impl OrganizationLookup {
    pub fn new(directory: Arc<dyn OrganizationDirectory>, permission: impl Into<String>) -> Self {
        Self {
            directory,
            permission: permission.into(),
        }
    }

    /// Organizations `username` can read in.
    ///
    /// A failing directory yields no memberships, which denies every
    /// organization tier.
    pub fn lookup(&self, username: &str) -> OrganizationMembership {
        match self
            .directory
            .organizations_for_user(username, &self.permission)
        {
            Ok(organizations) => {
                let membership: OrganizationMembership = organizations.into_iter().collect();
                log_organizations_debug!(
                    "{} belongs to {} organization(s)",
                    username,
                    membership.len()
                );
                membership
            }
            Err(e) => {
                log_organizations_warn!(
                    "Organization lookup for {} failed: {}",
                    username,
                    e
                );
                OrganizationMembership::default()
            }
        }
    }

    /// Start a per-call-tree memo over this lookup.
    pub fn memoized(&self) -> MemoizedMembership<'_> {
        MemoizedMembership::new(self)
    }
}

/// Supplies memberships to the evaluator when a tier needs them.
pub trait MembershipSource {
    fn memberships(&mut self, username: &str) -> OrganizationMembership;
}

/// A fixed membership, whoever asks.
impl MembershipSource for OrganizationMembership {
    fn memberships(&mut self, _username: &str) -> OrganizationMembership {
        self.clone()
    }
}

/// Lookup memoized by username for the lifetime of one call tree, such as
/// one redaction pass.
pub struct MemoizedMembership<'a> {
    lookup: &'a OrganizationLookup,
    cache: HashMap<String, OrganizationMembership>,
}

impl<'a> MemoizedMembership<'a> {
    pub fn new(lookup: &'a OrganizationLookup) -> Self {
        Self {
            lookup,
            cache: HashMap::new(),
        }
    }
}

impl MembershipSource for MemoizedMembership<'_> {
    fn memberships(&mut self, username: &str) -> OrganizationMembership {
        let lookup = self.lookup;
        self.cache
            .entry(username.to_string())
            .or_insert_with(|| lookup.lookup(username))
            .clone()
    }
}
