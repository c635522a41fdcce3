use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RestrictedResult;

/// Value written over hidden fields of a resource the caller may not view.
pub const REDACTED: &str = "redacted";

/// Fields a lite resource keeps. None of them carry restricted content.
pub const LITE_RESOURCE_FIELDS: [&str; 9] = [
    "created",
    "last_modified",
    "metadata_modified",
    "format",
    "id",
    "package_id",
    "mimetype",
    "name",
    "state",
];

/// Canonical representation of a catalog resource.
///
/// The fields the decision layer reads or rewrites are typed; everything
/// else (name, format, description, schema-specific extras) rides along in
/// `fields` untouched and is written back out in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricted: Option<Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Resource {
    pub fn new(id: impl Into<String>, package_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            package_id: Some(package_id.into()),
            url: None,
            restricted: None,
            fields: Map::new(),
        }
    }

    /// Normalize a raw JSON resource into the canonical type.
    pub fn from_value(value: Value) -> RestrictedResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_restricted(mut self, restricted: Value) -> Self {
        self.restricted = Some(restricted);
        self
    }

    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    /// Untyped field lookup
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Whether the payload already carries the redaction sentinel.
    pub fn is_redacted(&self) -> bool {
        matches!(&self.restricted, Some(Value::String(s)) if s == REDACTED)
    }

    /// Overwrite the hidden fields with the sentinel, leaving everything else visible.
    pub fn redact(&mut self) {
        self.url = Some(REDACTED.to_string());
        self.restricted = Some(Value::String(REDACTED.to_string()));
    }

    /// Reduce to the fields that are always safe to expose.
    ///
    /// Missing fields come out as `null` so every lite resource has the same shape.
    pub fn lite_projection(&self) -> Resource {
        let mut fields = Map::new();
        for name in LITE_RESOURCE_FIELDS {
            if name == "id" || name == "package_id" {
                continue;
            }
            let value = self.fields.get(name).cloned().unwrap_or(Value::Null);
            fields.insert(name.to_string(), value);
        }
        Resource {
            id: self.id.clone(),
            package_id: self.package_id.clone(),
            url: None,
            restricted: None,
            fields,
        }
    }
}

/// Canonical representation of a catalog package (dataset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<Resource>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Package {
    pub fn new(id: impl Into<String>, owner_org: Option<&str>) -> Self {
        Self {
            id: id.into(),
            owner_org: owner_org.map(str::to_string),
            resources: Some(Vec::new()),
            fields: Map::new(),
        }
    }

    pub fn from_value(value: Value) -> RestrictedResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.get_or_insert_with(Vec::new).push(resource);
        self
    }

    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    /// Restriction-relevant view of this package
    pub fn summary(&self) -> PackageSummary {
        PackageSummary {
            id: self.id.clone(),
            owner_org: self.owner_org.clone(),
        }
    }

    /// Maintainer address, from a nested `maintainer.email` or the flat `maintainer_email`.
    pub fn maintainer_email(&self) -> Option<&str> {
        self.fields
            .get("maintainer")
            .and_then(|m| m.get("email"))
            .and_then(Value::as_str)
            .or_else(|| self.fields.get("maintainer_email").and_then(Value::as_str))
            .filter(|email| !email.trim().is_empty())
    }
}

/// The parts of a package the decision layer needs, without its resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSummary {
    pub id: String,
    #[serde(default)]
    pub owner_org: Option<String>,
}

/// Search response: a result list plus counts and facets passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse<T> {
    pub results: Vec<T>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<T> SearchResponse<T> {
    pub fn new(results: Vec<T>) -> Self {
        Self {
            results,
            extra: Map::new(),
        }
    }
}

/// Search parameters forwarded to the catalog as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
}

impl SearchQuery {
    pub fn text(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Default::default()
        }
    }
}

/// Display view configured for a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceViewConfig {
    pub id: String,
    pub resource_id: String,
    pub view_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
