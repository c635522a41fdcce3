//! Shared fixtures for the restricted action tests.
//!
//! The standard catalog has one package `p1` owned by `org1` with one
//! resource per restriction level, and these users:
//!
//! * `alice` - registered, member of no organization
//! * `bob` - member of `org2`, on the allow-list of `r-allowed`
//! * `carol` - member of `org1`
//! * `dave` - may edit `p1`
//! * `maria` - the maintainer of `p1`
#![allow(dead_code)]

use restricted_api::catalog::{Package, Resource};
use restricted_api::memory::{MemoryCatalog, MemoryDirectory, RecordingMailer};
use restricted_api::permissions::{OrganizationSummary, UserRecord};
use restricted_api::{RestrictedApi, RestrictedConfig};
use serde_json::json;
use std::sync::Arc;

pub const MAINTAINER_EMAIL: &str = "maria@example.org";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Resource carrying its policy in the flat legacy fields.
pub fn legacy_resource(id: &str, package_id: &str, level: Option<&str>, allowed: &str) -> Resource {
    let mut resource = Resource::new(id, package_id)
        .with_url(format!("https://data.example.org/{id}.csv"))
        .with_field("name", json!(format!("Resource {id}")))
        .with_field("format", json!("CSV"));
    if let Some(level) = level {
        resource = resource.with_field("restricted_level", json!(level));
    }
    if !allowed.is_empty() {
        resource = resource.with_field("restricted_allowed_users", json!(allowed));
    }
    resource
}

pub fn standard_package() -> Package {
    Package::new("p1", Some("org1"))
        .with_field("name", json!("river-levels"))
        .with_field("title", json!("River levels"))
        .with_field("maintainer_email", json!(MAINTAINER_EMAIL))
        .with_resource(legacy_resource("r-public", "p1", None, ""))
        .with_resource(legacy_resource("r-registered", "p1", Some("registered"), ""))
        .with_resource(legacy_resource("r-any", "p1", Some("any_organization"), ""))
        .with_resource(legacy_resource("r-same", "p1", Some("same_organization"), ""))
        .with_resource(legacy_resource("r-allowed", "p1", Some("only_allowed_users"), "bob"))
}

pub fn standard_catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_package(standard_package())
        .with_editor("p1", "dave")
}

pub fn standard_directory() -> MemoryDirectory {
    let mut maria = UserRecord::new("u-maria", "maria").with_email(MAINTAINER_EMAIL);
    maria.display_name = Some("Maria Maintainer".to_string());

    MemoryDirectory::new()
        .with_user(UserRecord::new("u-alice", "alice").with_email("alice@example.org"))
        .with_user(UserRecord::new("u-bob", "bob"))
        .with_user(UserRecord::new("u-carol", "carol"))
        .with_user(UserRecord::new("u-dave", "dave"))
        .with_user(maria)
        .with_membership("bob", OrganizationSummary::new("org2", "Org Two"))
        .with_membership("carol", OrganizationSummary::new("org1", "Org One"))
}

/// The API together with handles on its collaborators.
pub struct Harness {
    pub api: RestrictedApi,
    pub catalog: Arc<MemoryCatalog>,
    pub directory: Arc<MemoryDirectory>,
    pub mailer: Arc<RecordingMailer>,
}

impl Harness {
    pub fn new(catalog: MemoryCatalog, directory: MemoryDirectory) -> Self {
        Self::with_config(RestrictedConfig::default(), catalog, directory, RecordingMailer::new())
    }

    pub fn standard() -> Self {
        Self::new(standard_catalog(), standard_directory())
    }

    pub fn with_config(
        config: RestrictedConfig,
        catalog: MemoryCatalog,
        directory: MemoryDirectory,
        mailer: RecordingMailer,
    ) -> Self {
        init_logging();
        let catalog = Arc::new(catalog);
        let directory = Arc::new(directory);
        let mailer = Arc::new(mailer);
        let api = RestrictedApi::new(
            config,
            catalog.clone(),
            directory.clone(),
            directory.clone(),
            mailer.clone(),
        );
        Self {
            api,
            catalog,
            directory,
            mailer,
        }
    }
}
