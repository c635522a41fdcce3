//! Identity resolution.
//!
//! The web layer reports the caller in several shapes: a user id, a user
//! name, a bare network address for anonymous callers, or an attached user
//! object. [`IdentityResolver`] turns whichever is present into one
//! [`UserIdentity`] and memoizes it on the request context.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::{log_identity_debug, log_identity_warn};

/// A registered catalog user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl UserRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            display_name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Whether `candidate` names this user by id or by name.
    pub fn matches(&self, candidate: &str) -> bool {
        self.id == candidate || self.name == candidate
    }
}

/// Who is making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIdentity {
    Anonymous,
    /// Unauthenticated caller known only by network address
    RawAddress(IpAddr),
    Authenticated(UserRecord),
}

impl UserIdentity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, UserIdentity::Authenticated(_))
    }

    pub fn user(&self) -> Option<&UserRecord> {
        match self {
            UserIdentity::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// Name (or id) of the caller; the address for anonymous-with-address callers.
    pub fn value(&self, want_name: bool) -> Option<String> {
        match self {
            UserIdentity::Anonymous => None,
            UserIdentity::RawAddress(addr) => Some(addr.to_string()),
            UserIdentity::Authenticated(user) if want_name => Some(user.name.clone()),
            UserIdentity::Authenticated(user) => Some(user.id.clone()),
        }
    }

    /// Label for messages and logs
    pub fn label(&self) -> String {
        self.value(true).unwrap_or_else(|| "anonymous".to_string())
    }
}

/// Errors reported by the user and organization directories
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Lookup of registered users
pub trait UserDirectory: Send + Sync {
    /// Find a user by id or by name.
    fn find_user_by_id(&self, id_or_name: &str) -> Result<Option<UserRecord>, DirectoryError>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError>;
}

/// Resolves and memoizes the caller's identity for a request.
#[derive(Clone)]
pub struct IdentityResolver {
    directory: Arc<dyn UserDirectory>,
}

impl IdentityResolver {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve the caller and memoize the result on `ctx`.
    pub fn resolve(&self, ctx: &mut RequestContext) -> UserIdentity {
        self.resolve_with(ctx, true)
    }

    /// Resolve the caller, optionally leaving the context memo untouched.
    ///
    /// A memoized identity always wins, including a memoized anonymous one.
    pub fn resolve_with(&self, ctx: &mut RequestContext, memoize: bool) -> UserIdentity {
        if memoize {
            if let Some(identity) = ctx.resolved_identity() {
                return identity.clone();
            }
        }

        let identity = self.resolve_uncached(ctx);
        if memoize {
            ctx.remember_identity(identity.clone());
        }
        identity
    }

    /// Caller id (or address), memoizing on first use.
    pub fn user_id(&self, ctx: &mut RequestContext) -> Option<String> {
        self.resolve(ctx).value(false)
    }

    /// Caller name (or address), memoizing on first use.
    pub fn username(&self, ctx: &mut RequestContext) -> Option<String> {
        self.resolve(ctx).value(true)
    }

    /// Find a registered user by email, case-insensitively.
    pub fn find_user_by_email(&self, email: &str) -> Option<UserRecord> {
        let email = email.trim().to_lowercase();
        match self.directory.find_user_by_email(&email) {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                log_identity_debug!("No matching users found for email: {}", email);
                None
            }
            Err(e) => {
                log_identity_warn!("User lookup by email failed: {}", e);
                None
            }
        }
    }

    fn resolve_uncached(&self, ctx: &RequestContext) -> UserIdentity {
        if let Some(user) = ctx.user.as_deref().filter(|u| !u.is_empty()) {
            if let Ok(addr) = user.parse::<IpAddr>() {
                log_identity_debug!("[{}] context carries address {}", ctx.request_id, addr);
                return UserIdentity::RawAddress(addr);
            }

            if let Some(current) = ctx.current_user.as_ref().filter(|c| c.matches(user)) {
                log_identity_debug!(
                    "[{}] reusing current request user {}",
                    ctx.request_id,
                    current.name
                );
                return UserIdentity::Authenticated(current.clone());
            }

            return match self.directory.find_user_by_id(user) {
                Ok(Some(record)) => UserIdentity::Authenticated(record),
                Ok(None) => {
                    // The web layer vouched for this caller; keep the raw value.
                    log_identity_warn!("[{}] user '{}' not in directory", ctx.request_id, user);
                    UserIdentity::Authenticated(UserRecord::new(user, user))
                }
                Err(e) => {
                    log_identity_warn!(
                        "[{}] directory lookup for '{}' failed: {}",
                        ctx.request_id,
                        user,
                        e
                    );
                    UserIdentity::Authenticated(UserRecord::new(user, user))
                }
            };
        }

        if let Some(user) = ctx.auth_user_obj.as_ref() {
            log_identity_debug!("[{}] using attached auth user {}", ctx.request_id, user.name);
            return UserIdentity::Authenticated(user.clone());
        }

        log_identity_debug!("[{}] no user present in context", ctx.request_id);
        UserIdentity::Anonymous
    }
}
