//! Declarative authorization check consumed by presentation code. The gate
//! answers allow/deny plus the reason, so the caller can render the right
//! message without re-deriving policy.

use serde::{Deserialize, Serialize};

use super::principal::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    NoSession,
    RoleMismatch,
    PermissionMismatch,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// Empty means any role is acceptable.
    #[serde(default)]
    pub allowed_roles: Vec<String>,
    #[serde(default)]
    pub required_permissions: Vec<String>,
    /// true = must hold ALL permissions, false = ANY is enough.
    #[serde(default)]
    pub require_all: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
    message: String,
}

impl AccessDecision {
    pub fn message(&self) -> &str { &self.message }

    fn allow() -> Self {
        Self { allowed: true, reason: None, message: String::new() }
    }

    fn deny(reason: DenyReason, message: String) -> Self {
        Self { allowed: false, reason: Some(reason), message }
    }
}

impl AccessPolicy {
    pub fn roles<I: IntoIterator<Item = S>, S: Into<String>>(roles: I) -> Self {
        Self { allowed_roles: roles.into_iter().map(Into::into).collect(), ..Default::default() }
    }

    pub fn permissions<I: IntoIterator<Item = S>, S: Into<String>>(perms: I) -> Self {
        Self { required_permissions: perms.into_iter().map(Into::into).collect(), ..Default::default() }
    }

    pub fn require_all(mut self) -> Self {
        self.require_all = true;
        self
    }

    /// The role check runs before the permission check, so a logged-in actor
    /// with the wrong role is reported as a role mismatch, never as missing
    /// a session.
    pub fn evaluate(&self, identity: Option<&Identity>) -> AccessDecision {
        let Some(id) = identity else {
            return AccessDecision::deny(
                DenyReason::NoSession,
                "Please log in to access this feature.".to_string(),
            );
        };

        if !self.allowed_roles.is_empty() && !self.allowed_roles.iter().any(|r| id.has_role(r)) {
            return AccessDecision::deny(
                DenyReason::RoleMismatch,
                format!(
                    "Required role: {}. Your role: {}",
                    self.allowed_roles.join(" or "),
                    id.role
                ),
            );
        }

        if !self.required_permissions.is_empty() {
            let ok = if self.require_all {
                self.required_permissions.iter().all(|p| id.has_permission(p))
            } else {
                self.required_permissions.iter().any(|p| id.has_permission(p))
            };
            if !ok {
                let joiner = if self.require_all { " and " } else { " or " };
                return AccessDecision::deny(
                    DenyReason::PermissionMismatch,
                    format!("Required permission: {}", self.required_permissions.join(joiner)),
                );
            }
        }

        AccessDecision::allow()
    }
}
