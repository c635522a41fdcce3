//! Feature-specific logging macros and utilities
//!
//! Each decision stage logs to its own target so a single stage can be
//! turned up without drowning in the others.

/// Feature categories for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFeature {
    Identity,
    Policy,
    Organizations,
    Redaction,
    Actions,
    Notifier,
    Config,
}

impl LogFeature {
    pub const ALL: [LogFeature; 7] = [
        LogFeature::Identity,
        LogFeature::Policy,
        LogFeature::Organizations,
        LogFeature::Redaction,
        LogFeature::Actions,
        LogFeature::Notifier,
        LogFeature::Config,
    ];

    /// Get the target string for this feature
    pub fn target(&self) -> &'static str {
        match self {
            LogFeature::Identity => "restricted_api::identity",
            LogFeature::Policy => "restricted_api::policy",
            LogFeature::Organizations => "restricted_api::organizations",
            LogFeature::Redaction => "restricted_api::redaction",
            LogFeature::Actions => "restricted_api::actions",
            LogFeature::Notifier => "restricted_api::notifier",
            LogFeature::Config => "restricted_api::config",
        }
    }

    /// Name used as the key in `LogConfig::features`
    pub fn name(&self) -> &'static str {
        match self {
            LogFeature::Identity => "identity",
            LogFeature::Policy => "policy",
            LogFeature::Organizations => "organizations",
            LogFeature::Redaction => "redaction",
            LogFeature::Actions => "actions",
            LogFeature::Notifier => "notifier",
            LogFeature::Config => "config",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

// Identity resolution logging macros
#[macro_export]
macro_rules! log_identity_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "restricted_api::identity", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_identity_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "restricted_api::identity", $($arg)*)
    };
}

// Policy evaluation logging macros
#[macro_export]
macro_rules! log_policy_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "restricted_api::policy", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_policy_info {
    ($($arg:tt)*) => {
        log::info!(target: "restricted_api::policy", $($arg)*)
    };
}

// Redaction logging macros
#[macro_export]
macro_rules! log_redaction_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "restricted_api::redaction", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_redaction_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "restricted_api::redaction", $($arg)*)
    };
}

// Action logging macros
#[macro_export]
macro_rules! log_actions_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "restricted_api::actions", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_actions_info {
    ($($arg:tt)*) => {
        log::info!(target: "restricted_api::actions", $($arg)*)
    };
}

// Organization lookup logging macros
#[macro_export]
macro_rules! log_organizations_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "restricted_api::organizations", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_organizations_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "restricted_api::organizations", $($arg)*)
    };
}

// Access request logging macros
#[macro_export]
macro_rules! log_notifier_info {
    ($($arg:tt)*) => {
        log::info!(target: "restricted_api::notifier", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_notifier_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "restricted_api::notifier", $($arg)*)
    };
}

// Configuration logging macros
#[macro_export]
macro_rules! log_config_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "restricted_api::config", $($arg)*)
    };
}

// Performance monitoring helper
pub struct PerformanceTimer {
    start: std::time::Instant,
    feature: LogFeature,
    operation: String,
}

impl PerformanceTimer {
    pub fn new(feature: LogFeature, operation: String) -> Self {
        log::debug!(target: feature.target(), "Starting timed operation: {}", operation);
        Self {
            start: std::time::Instant::now(),
            feature,
            operation,
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        log::debug!(
            target: self.feature.target(),
            "Operation '{}' completed in {:?}",
            self.operation,
            duration
        );
    }
}
