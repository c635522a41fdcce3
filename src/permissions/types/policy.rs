use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// Tier controlling which identities may view a resource.
///
/// Tiers are only partially ordered: `SameOrganization` and
/// `OnlyAllowedUsers` both sit above `AnyOrganization` but neither is
/// stricter than the other. Unrecognized levels compare equal only to
/// themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum RestrictionLevel {
    #[default]
    Public,
    Registered,
    AnyOrganization,
    SameOrganization,
    OnlyAllowedUsers,
    Unrecognized(String),
}

impl RestrictionLevel {
    /// Parse a stored level name. Empty means public.
    pub fn parse(level: &str) -> Self {
        match level.trim() {
            "" | "public" => RestrictionLevel::Public,
            "registered" => RestrictionLevel::Registered,
            "any_organization" => RestrictionLevel::AnyOrganization,
            "same_organization" => RestrictionLevel::SameOrganization,
            "only_allowed_users" => RestrictionLevel::OnlyAllowedUsers,
            other => RestrictionLevel::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RestrictionLevel::Public => "public",
            RestrictionLevel::Registered => "registered",
            RestrictionLevel::AnyOrganization => "any_organization",
            RestrictionLevel::SameOrganization => "same_organization",
            RestrictionLevel::OnlyAllowedUsers => "only_allowed_users",
            RestrictionLevel::Unrecognized(level) => level,
        }
    }

    fn rank(&self) -> Option<u8> {
        match self {
            RestrictionLevel::Public => Some(0),
            RestrictionLevel::Registered => Some(1),
            RestrictionLevel::AnyOrganization => Some(2),
            RestrictionLevel::SameOrganization | RestrictionLevel::OnlyAllowedUsers => Some(3),
            RestrictionLevel::Unrecognized(_) => None,
        }
    }
}

impl PartialOrd for RestrictionLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) if a != b => Some(a.cmp(&b)),
            // distinct siblings on the top tier, or an unrecognized level
            _ => None,
        }
    }
}

impl fmt::Display for RestrictionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RestrictionLevel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RestrictionLevel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let level = String::deserialize(deserializer)?;
        Ok(RestrictionLevel::parse(&level))
    }
}

/// A resource's normalized restriction policy
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RestrictionPolicy {
    pub level: RestrictionLevel,
    pub allowed_users: BTreeSet<String>,
}

impl RestrictionPolicy {
    pub fn new<I, S>(level: RestrictionLevel, allowed_users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            level,
            allowed_users: allowed_users.into_iter().map(Into::into).collect(),
        }
    }

    pub fn public() -> Self {
        Self::default()
    }

    pub fn is_public(&self) -> bool {
        self.level == RestrictionLevel::Public
    }
}

/// Outcome of an access decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationVerdict {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuthorizationVerdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}
