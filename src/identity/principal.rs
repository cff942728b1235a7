use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::roles;

/// The authenticated actor. `subject_id` is the wallet principal or a
/// simulated principal and is immutable once created; `permissions` default
/// to the role table but a remote profile payload may override them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: String,
    pub role: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub issued_at: DateTime<Utc>,
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Identity {
    /// Build an identity for `role` with table-derived name, title and
    /// permissions. Used by the simulated login and the wallet fallback path.
    pub fn for_role(subject_id: impl Into<String>, role: &str) -> Self {
        Self {
            subject_id: subject_id.into(),
            role: role.to_string(),
            display_name: roles::display_name_for(role).to_string(),
            title: roles::title_for(role).to_string(),
            permissions: roles::permissions_for(role),
            issued_at: Utc::now(),
            extra: serde_json::Map::new(),
        }
    }

    /// An identity with an empty subject or role must not be persisted.
    pub fn is_valid(&self) -> bool {
        !self.subject_id.is_empty() && !self.role.is_empty()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    // Capability predicates project over `permissions`, never over `role`,
    // so a remote-profile override is respected everywhere.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn can_manage_budgets(&self) -> bool { self.has_permission("budget_control") }
    pub fn can_allocate_budgets(&self) -> bool { self.has_permission("budget_allocation") }
    pub fn can_submit_claims(&self) -> bool { self.has_permission("claim_submission") }
    pub fn can_report_corruption(&self) -> bool { self.has_permission("corruption_reporting") }
    pub fn can_oversee_region(&self) -> bool { self.has_permission("regional_oversight") }
}
