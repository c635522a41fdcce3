//! In-memory collaborators.
//!
//! Backs the CLI with a JSON fixture and gives tests collaborators whose
//! calls can be counted.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::catalog::{
    Catalog, CatalogError, CatalogResult, Package, PackageSummary, Resource, ResourceViewConfig,
    SearchQuery, SearchResponse,
};
use crate::context::RequestContext;
use crate::error::RestrictedResult;
use crate::notifier::{AccessRequestEmail, MailError, Mailer};
use crate::permissions::identity::{DirectoryError, UserDirectory, UserRecord};
use crate::permissions::organizations::{OrganizationDirectory, OrganizationSummary};

/// Catalog contents loaded from JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFixture {
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    /// Organizations per user name
    #[serde(default)]
    pub memberships: HashMap<String, Vec<OrganizationSummary>>,
    /// User names with update rights, per package id
    #[serde(default)]
    pub editors: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub views: Vec<ResourceViewConfig>,
}

impl CatalogFixture {
    pub fn from_json(json: &str) -> RestrictedResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> RestrictedResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Split into a catalog and a directory serving users and memberships.
    pub fn into_parts(self) -> (MemoryCatalog, MemoryDirectory) {
        let mut catalog = MemoryCatalog::new();
        for package in self.packages {
            catalog = catalog.with_package(package);
        }
        for (package_id, users) in self.editors {
            for user in users {
                catalog = catalog.with_editor(&package_id, &user);
            }
        }
        for view in self.views {
            catalog = catalog.with_view(view);
        }

        let mut directory = MemoryDirectory::new();
        for user in self.users {
            directory = directory.with_user(user);
        }
        for (user, organizations) in self.memberships {
            for organization in organizations {
                directory = directory.with_membership(&user, organization);
            }
        }

        (catalog, directory)
    }
}

/// Catalog held in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    packages: Vec<Package>,
    editors: HashMap<String, HashSet<String>>,
    views: Vec<ResourceViewConfig>,
    unavailable_packages: HashSet<String>,
    package_show_calls: AtomicUsize,
    package_summary_calls: AtomicUsize,
    resource_show_calls: AtomicUsize,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package. Its resources are stamped with the package id.
    pub fn with_package(mut self, mut package: Package) -> Self {
        if let Some(resources) = package.resources.as_mut() {
            for resource in resources.iter_mut() {
                resource.package_id = Some(package.id.clone());
            }
        }
        self.packages.push(package);
        self
    }

    pub fn with_editor(mut self, package_id: &str, user: &str) -> Self {
        self.editors
            .entry(package_id.to_string())
            .or_default()
            .insert(user.to_string());
        self
    }

    pub fn with_view(mut self, view: ResourceViewConfig) -> Self {
        self.views.push(view);
        self
    }

    /// Reads of this package fail as if the backing store were down.
    pub fn with_unavailable_package(mut self, package_id: &str) -> Self {
        self.unavailable_packages.insert(package_id.to_string());
        self
    }

    /// Stored package, read without counting
    pub fn package(&self, id: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.id == id)
    }

    pub fn package_show_calls(&self) -> usize {
        self.package_show_calls.load(Ordering::SeqCst)
    }

    pub fn package_summary_calls(&self) -> usize {
        self.package_summary_calls.load(Ordering::SeqCst)
    }

    pub fn resource_show_calls(&self) -> usize {
        self.resource_show_calls.load(Ordering::SeqCst)
    }

    /// Package reads of any kind
    pub fn package_reads(&self) -> usize {
        self.package_show_calls() + self.package_summary_calls()
    }

    fn find_package(&self, id: &str) -> CatalogResult<&Package> {
        if self.unavailable_packages.contains(id) {
            return Err(CatalogError::Unavailable(format!("package {id} unavailable")));
        }
        self.packages
            .iter()
            .find(|p| p.id == id || p.fields.get("name").and_then(Value::as_str) == Some(id))
            .ok_or_else(|| CatalogError::NotFound(format!("package {id}")))
    }

    fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.packages
            .iter()
            .flat_map(|p| p.resources.iter().flatten())
    }
}

impl Catalog for MemoryCatalog {
    fn package_show(&self, _ctx: &RequestContext, id: &str) -> CatalogResult<Package> {
        self.package_show_calls.fetch_add(1, Ordering::SeqCst);
        self.find_package(id).cloned()
    }

    fn package_summary(&self, _ctx: &RequestContext, id: &str) -> CatalogResult<PackageSummary> {
        self.package_summary_calls.fetch_add(1, Ordering::SeqCst);
        self.find_package(id).map(Package::summary)
    }

    fn resource_show(&self, _ctx: &RequestContext, id: &str) -> CatalogResult<Resource> {
        self.resource_show_calls.fetch_add(1, Ordering::SeqCst);
        self.resources()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("resource {id}")))
    }

    fn resource_search(
        &self,
        _ctx: &RequestContext,
        query: &SearchQuery,
    ) -> CatalogResult<SearchResponse<Resource>> {
        let matches: Vec<Resource> = self
            .resources()
            .filter(|r| matches_query(&r.id, &r.fields, query))
            .cloned()
            .collect();
        Ok(paginate(matches, query))
    }

    fn package_search(
        &self,
        _ctx: &RequestContext,
        query: &SearchQuery,
    ) -> CatalogResult<SearchResponse<Package>> {
        let matches: Vec<Package> = self
            .packages
            .iter()
            .filter(|p| matches_query(&p.id, &p.fields, query))
            .cloned()
            .collect();
        Ok(paginate(matches, query))
    }

    fn resource_view_list(
        &self,
        _ctx: &RequestContext,
        resource_id: &str,
    ) -> CatalogResult<Vec<ResourceViewConfig>> {
        Ok(self
            .views
            .iter()
            .filter(|v| v.resource_id == resource_id)
            .cloned()
            .collect())
    }

    fn can_update_package(&self, user: Option<&str>, package: &PackageSummary) -> bool {
        match (user, self.editors.get(&package.id)) {
            (Some(user), Some(editors)) => editors.contains(user),
            _ => false,
        }
    }
}

fn matches_query(id: &str, fields: &Map<String, Value>, query: &SearchQuery) -> bool {
    let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
        return true;
    };
    let q = q.to_lowercase();
    id.to_lowercase().contains(&q)
        || ["name", "title"].iter().any(|key| {
            fields
                .get(*key)
                .and_then(Value::as_str)
                .is_some_and(|v| v.to_lowercase().contains(&q))
        })
}

fn paginate<T>(matches: Vec<T>, query: &SearchQuery) -> SearchResponse<T> {
    let count = matches.len();
    let results = matches
        .into_iter()
        .skip(query.start.unwrap_or(0))
        .take(query.rows.unwrap_or(usize::MAX))
        .collect();
    let mut response = SearchResponse::new(results);
    response.extra.insert("count".to_string(), json!(count));
    response
}

/// Users and organization memberships held in memory.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: Vec<UserRecord>,
    memberships: HashMap<String, Vec<OrganizationSummary>>,
    organizations_unavailable: bool,
    user_lookups: AtomicUsize,
    organization_lookups: AtomicUsize,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: UserRecord) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_membership(mut self, user: &str, organization: OrganizationSummary) -> Self {
        self.memberships
            .entry(user.to_string())
            .or_default()
            .push(organization);
        self
    }

    /// Organization lookups fail
    pub fn with_organizations_unavailable(mut self) -> Self {
        self.organizations_unavailable = true;
        self
    }

    pub fn user_lookups(&self) -> usize {
        self.user_lookups.load(Ordering::SeqCst)
    }

    pub fn organization_lookups(&self) -> usize {
        self.organization_lookups.load(Ordering::SeqCst)
    }
}

impl UserDirectory for MemoryDirectory {
    fn find_user_by_id(&self, id_or_name: &str) -> Result<Option<UserRecord>, DirectoryError> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.iter().find(|u| u.matches(id_or_name)).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .users
            .iter()
            .find(|u| {
                u.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .cloned())
    }
}

impl OrganizationDirectory for MemoryDirectory {
    fn organizations_for_user(
        &self,
        username: &str,
        _permission: &str,
    ) -> Result<Vec<OrganizationSummary>, DirectoryError> {
        self.organization_lookups.fetch_add(1, Ordering::SeqCst);
        if self.organizations_unavailable {
            return Err(DirectoryError::Unavailable("organization directory offline".into()));
        }
        Ok(self.memberships.get(username).cloned().unwrap_or_default())
    }
}

/// Mailer that keeps every message it is given.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<AccessRequestEmail>>,
    failing: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send fails
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<AccessRequestEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Mailer for RecordingMailer {
    fn send_access_request_email(&self, email: &AccessRequestEmail) -> Result<(), MailError> {
        if self.failing {
            return Err(MailError::Delivery("relay refused message".into()));
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| MailError::Delivery("mailbox poisoned".into()))?;
        sent.push(email.clone());
        Ok(())
    }
}
