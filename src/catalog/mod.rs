//! # Catalog boundary
//!
//! The catalog owns persistence and search. This crate only reads through
//! the [`Catalog`] trait and rewrites what comes back, so every payload is
//! normalized into the canonical [`Resource`] and [`Package`] types here,
//! before any decision logic runs.

pub mod types;

pub use types::{
    Package, PackageSummary, Resource, ResourceViewConfig, SearchQuery, SearchResponse,
    LITE_RESOURCE_FIELDS, REDACTED,
};

use crate::context::RequestContext;

/// Errors reported by the catalog collaborator
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Read operations of the underlying catalog.
///
/// Implementations are the unrestricted actions; the restricted actions in
/// [`crate::actions`] wrap them.
pub trait Catalog: Send + Sync {
    fn package_show(&self, ctx: &RequestContext, id: &str) -> CatalogResult<Package>;

    /// Fetch only the restriction-relevant fields of a package.
    ///
    /// Override when the backing store can skip loading resources.
    fn package_summary(&self, ctx: &RequestContext, id: &str) -> CatalogResult<PackageSummary> {
        self.package_show(ctx, id).map(|package| package.summary())
    }

    fn resource_show(&self, ctx: &RequestContext, id: &str) -> CatalogResult<Resource>;

    fn resource_search(
        &self,
        ctx: &RequestContext,
        query: &SearchQuery,
    ) -> CatalogResult<SearchResponse<Resource>>;

    fn package_search(
        &self,
        ctx: &RequestContext,
        query: &SearchQuery,
    ) -> CatalogResult<SearchResponse<Package>>;

    fn resource_view_list(
        &self,
        ctx: &RequestContext,
        resource_id: &str,
    ) -> CatalogResult<Vec<ResourceViewConfig>>;

    /// Whether `user` holds update rights on the package.
    fn can_update_package(&self, user: Option<&str>, package: &PackageSummary) -> bool;
}
