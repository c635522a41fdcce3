//! Restriction metadata extraction.
//!
//! Where a resource keeps its restriction policy depends on whether the
//! schema extension is active. With it, the policy is a nested `restricted`
//! structure (possibly JSON-encoded, possibly under `extras`). Without it,
//! the policy is two flat fields, `restricted_level` and
//! `restricted_allowed_users`. Either way the output is one
//! [`RestrictionPolicy`], and malformed data degrades to public.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::catalog::Resource;
use crate::config::RestrictedConfig;
use crate::permissions::types::policy::{RestrictionLevel, RestrictionPolicy};

/// Where restriction metadata lives on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFormat {
    /// Nested `restricted` structure, as written by the schema extension
    Extension,
    /// Flat `restricted_level` / `restricted_allowed_users` fields
    Legacy,
}

#[derive(Debug, Clone, Copy)]
pub struct RestrictionExtractor {
    format: MetadataFormat,
}

impl RestrictionExtractor {
    pub fn new(scheming_enabled: bool) -> Self {
        let format = if scheming_enabled {
            MetadataFormat::Extension
        } else {
            MetadataFormat::Legacy
        };
        Self { format }
    }

    pub fn from_config(config: &RestrictedConfig) -> Self {
        Self::new(config.scheming_enabled)
    }

    pub fn format(&self) -> MetadataFormat {
        self.format
    }

    /// Normalize the restriction policy of `resource`. Never fails.
    pub fn extract(&self, resource: &Resource) -> RestrictionPolicy {
        match self.format {
            MetadataFormat::Extension => extract_nested(resource),
            MetadataFormat::Legacy => extract_flat(resource),
        }
    }
}

fn extract_nested(resource: &Resource) -> RestrictionPolicy {
    // A `restricted` key on the resource itself shadows the one in extras.
    let raw = match resource.restricted.as_ref().filter(|v| !v.is_null()) {
        Some(value) => Some(value),
        None => resource
            .field("extras")
            .and_then(|extras| extras.get("restricted")),
    };

    let restricted = match raw {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        },
        _ => Map::new(),
    };

    if restricted.is_empty() {
        return RestrictionPolicy::public();
    }

    let level = restricted
        .get("level")
        .and_then(Value::as_str)
        .map(RestrictionLevel::parse)
        .unwrap_or_default();

    RestrictionPolicy {
        level,
        allowed_users: restricted
            .get("allowed_users")
            .map(parse_allowed_users)
            .unwrap_or_default(),
    }
}

fn extract_flat(resource: &Resource) -> RestrictionPolicy {
    let level = resource
        .field("restricted_level")
        .and_then(Value::as_str)
        .map(RestrictionLevel::parse)
        .unwrap_or_default();

    RestrictionPolicy {
        level,
        allowed_users: resource
            .field("restricted_allowed_users")
            .map(parse_allowed_users)
            .unwrap_or_default(),
    }
}

/// Accepts a list of names or one comma-joined string.
fn parse_allowed_users(value: &Value) -> BTreeSet<String> {
    let names: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Value::String(joined) => joined.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };

    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
