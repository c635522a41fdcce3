//! Access requests.
//!
//! A caller denied a resource can ask its maintainer for access. The
//! notifier finds the maintainer through the owning package and hands a
//! composed message to the [`Mailer`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::catalog::{Catalog, CatalogError, Package};
use crate::config::MailConfig;
use crate::context::RequestContext;
use crate::error::{RestrictedError, RestrictedResult};
use crate::permissions::identity::IdentityResolver;
use crate::{log_notifier_info, log_notifier_warn};

/// A composed access request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessRequestEmail {
    pub resource_id: String,
    pub package_id: String,
    /// Requester id, or a network address or "anonymous"
    pub requester: String,
    pub maintainer_email: String,
    pub maintainer_name: Option<String>,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub requested_at: DateTime<Utc>,
}

/// Mail delivery errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MailError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Outbound mail
pub trait Mailer: Send + Sync {
    fn send_access_request_email(&self, email: &AccessRequestEmail) -> Result<(), MailError>;
}

/// Mailer that only logs the message. Useful where no mail relay is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_access_request_email(&self, email: &AccessRequestEmail) -> Result<(), MailError> {
        log_notifier_info!(
            "access request for resource {} from {} to {}: {}",
            email.resource_id,
            email.requester,
            email.maintainer_email,
            email.subject
        );
        Ok(())
    }
}

pub struct AccessRequestNotifier {
    catalog: Arc<dyn Catalog>,
    identity: IdentityResolver,
    mailer: Arc<dyn Mailer>,
    mail: MailConfig,
}

impl AccessRequestNotifier {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        identity: IdentityResolver,
        mailer: Arc<dyn Mailer>,
        mail: MailConfig,
    ) -> Self {
        Self {
            catalog,
            identity,
            mailer,
            mail,
        }
    }

    /// Ask the maintainer of a resource's package to grant the caller access.
    ///
    /// `resource_id` is required and checked before anything is fetched.
    /// When `package_id` is omitted it is taken from the resource. Any
    /// failure retrieving the package is reported as not found.
    pub fn request_access(
        &self,
        ctx: &mut RequestContext,
        resource_id: Option<&str>,
        package_id: Option<&str>,
    ) -> RestrictedResult<()> {
        let resource_id = resource_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| RestrictedError::validation("resource_id", "missing resource_id"))?;

        let requester = self
            .identity
            .user_id(ctx)
            .unwrap_or_else(|| "anonymous".to_string());

        let package = self.package_for_request(ctx, resource_id, package_id)?;
        let maintainer_email = package.maintainer_email().ok_or_else(|| {
            RestrictedError::NotFound(format!("maintainer email for package {}", package.id))
        })?;

        let maintainer_name = self
            .identity
            .find_user_by_email(maintainer_email)
            .map(|user| user.display_name.unwrap_or(user.name));

        let email = self.compose(
            resource_id,
            &package.id,
            &requester,
            maintainer_email,
            maintainer_name,
        );
        self.mailer.send_access_request_email(&email)?;

        log_notifier_info!(
            "[{}] access request for {} sent to {}",
            ctx.request_id,
            resource_id,
            email.maintainer_email
        );
        Ok(())
    }

    fn package_for_request(
        &self,
        ctx: &RequestContext,
        resource_id: &str,
        package_id: Option<&str>,
    ) -> RestrictedResult<Package> {
        let package_id = match package_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id.to_string(),
            None => self
                .catalog
                .resource_show(ctx, resource_id)
                .ok()
                .and_then(|resource| resource.package_id)
                .ok_or_else(|| RestrictedError::NotFound("Package not found".to_string()))?,
        };

        self.catalog
            .package_show(ctx, &package_id)
            .map_err(|e| match e {
                CatalogError::NotFound(_) => {
                    RestrictedError::NotFound("Package not found".to_string())
                }
                CatalogError::Unavailable(msg) => {
                    log_notifier_warn!("package fetch for access request failed: {}", msg);
                    RestrictedError::NotFound(
                        "Exception retrieving package to send mail".to_string(),
                    )
                }
            })
    }

    fn compose(
        &self,
        resource_id: &str,
        package_id: &str,
        requester: &str,
        maintainer_email: &str,
        maintainer_name: Option<String>,
    ) -> AccessRequestEmail {
        let greeting = maintainer_name.as_deref().unwrap_or(maintainer_email);
        let body = format!(
            "Dear {greeting},\n\n\
             User {requester} has requested access to resource {resource_id} \
             of dataset {package_id} on {site}.\n\n\
             If you approve, add the user to the resource's allowed users.\n",
            site = self.mail.site_title,
        );

        AccessRequestEmail {
            resource_id: resource_id.to_string(),
            package_id: package_id.to_string(),
            requester: requester.to_string(),
            maintainer_email: maintainer_email.to_string(),
            maintainer_name,
            sender: self.mail.sender.clone(),
            subject: format!(
                "{} Access request for resource {}",
                self.mail.subject_prefix, resource_id
            ),
            body,
            requested_at: Utc::now(),
        }
    }
}
