//! Closed role vocabulary and the table-driven role/permission mappings.
//! The tables are data, not branching logic, so the enumeration stays
//! exhaustive and easy to test.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Granted to any role string outside the closed vocabulary.
pub const BASIC_ACCESS: &str = "basic_access";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    MainGovernment,
    StateHead,
    Deputy,
    Vendor,
    SubSupplier,
    Citizen,
    Auditor,
    NgoHead,
    NgoProgramManager,
    NgoFieldOfficer,
    NgoVolunteerCoordinator,
    NgoAdmin,
}

impl Role {
    pub const ALL: [Role; 12] = [
        Role::MainGovernment,
        Role::StateHead,
        Role::Deputy,
        Role::Vendor,
        Role::SubSupplier,
        Role::Citizen,
        Role::Auditor,
        Role::NgoHead,
        Role::NgoProgramManager,
        Role::NgoFieldOfficer,
        Role::NgoVolunteerCoordinator,
        Role::NgoAdmin,
    ];

    /// Wire-format token used by the backend and persisted sessions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::MainGovernment => "main_government",
            Role::StateHead => "state_head",
            Role::Deputy => "deputy",
            Role::Vendor => "vendor",
            Role::SubSupplier => "sub_supplier",
            Role::Citizen => "citizen",
            Role::Auditor => "auditor",
            Role::NgoHead => "ngo_head",
            Role::NgoProgramManager => "ngo_program_manager",
            Role::NgoFieldOfficer => "ngo_field_officer",
            Role::NgoVolunteerCoordinator => "ngo_volunteer_coordinator",
            Role::NgoAdmin => "ngo_admin",
        }
    }

    /// Unknown strings are not an error: callers degrade to `basic_access`.
    pub fn parse(s: &str) -> Option<Role> {
        Role::ALL.iter().copied().find(|r| r.as_str() == s)
    }
}

struct RoleRow {
    permissions: &'static [&'static str],
    display_name: &'static str,
    title: &'static str,
}

static ROLE_TABLE: Lazy<HashMap<&'static str, RoleRow>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("main_government", RoleRow {
        permissions: &["budget_control", "role_management", "fraud_oversight", "system_administration"],
        display_name: "Government Admin",
        title: "Secretary, Ministry of Finance",
    });
    m.insert("state_head", RoleRow {
        permissions: &["budget_allocation", "deputy_management", "regional_oversight"],
        display_name: "State Head",
        title: "Regional Director",
    });
    m.insert("deputy", RoleRow {
        permissions: &["vendor_selection", "project_management", "claim_review"],
        display_name: "Deputy Officer",
        title: "District Manager",
    });
    m.insert("vendor", RoleRow {
        permissions: &["claim_submission", "payment_tracking", "supplier_management"],
        display_name: "Vendor Manager",
        title: "Project Contractor",
    });
    m.insert("sub_supplier", RoleRow {
        permissions: &["delivery_submission", "quality_assurance", "vendor_coordination"],
        display_name: "Sub-Supplier",
        title: "Supply Chain Manager",
    });
    m.insert("citizen", RoleRow {
        permissions: &["transparency_access", "corruption_reporting", "community_verification"],
        display_name: "Citizen User",
        title: "Community Observer",
    });
    m.insert("auditor", RoleRow {
        permissions: &["audit_access", "fraud_oversight", "transparency_access"],
        display_name: "Independent Auditor",
        title: "Audit Officer",
    });
    m.insert("ngo_head", RoleRow {
        permissions: &["program_oversight", "fund_utilization", "report_approval"],
        display_name: "NGO Head",
        title: "Overall lead for the NGO",
    });
    m.insert("ngo_program_manager", RoleRow {
        permissions: &["program_management", "budget_tracking", "field_coordination"],
        display_name: "Program Manager",
        title: "Manages specific programs",
    });
    m.insert("ngo_field_officer", RoleRow {
        permissions: &["field_reporting", "beneficiary_verification", "delivery_confirmation"],
        display_name: "Field Officer",
        title: "Operates on the ground",
    });
    m.insert("ngo_volunteer_coordinator", RoleRow {
        permissions: &["volunteer_management", "event_coordination", "community_outreach"],
        display_name: "Volunteer Coordinator",
        title: "Manages volunteers",
    });
    m.insert("ngo_admin", RoleRow {
        permissions: &["record_management", "compliance_reporting", "document_administration"],
        display_name: "NGO Admin",
        title: "Administrative tasks",
    });
    m
});

/// Pure role -> permission-set mapping. Unknown role degrades to the minimal
/// set, never an error and never elevated privilege.
pub fn permissions_for(role: &str) -> Vec<String> {
    match ROLE_TABLE.get(role) {
        Some(row) => row.permissions.iter().map(|p| p.to_string()).collect(),
        None => vec![BASIC_ACCESS.to_string()],
    }
}

pub fn display_name_for(role: &str) -> &'static str {
    ROLE_TABLE.get(role).map(|r| r.display_name).unwrap_or("System User")
}

pub fn title_for(role: &str) -> &'static str {
    ROLE_TABLE.get(role).map(|r| r.title).unwrap_or("Demo Role")
}

/// Government-side group check used by consumers that render official-only
/// surfaces.
pub fn is_government_official(role: &str) -> bool {
    matches!(role, "auditor" | "main_government" | "state_head" | "deputy")
}

// Fixed rotation used when a wallet principal must be mapped to a role
// without backend help. The byte-sum hash keeps the mapping stable per
// principal across restarts.
const FALLBACK_ROTATION: [&str; 5] = ["main_government", "vendor", "citizen", "state_head", "deputy"];

pub fn fallback_role_for_principal(principal: &str) -> &'static str {
    let hash: u64 = principal.bytes().map(|b| b as u64).sum();
    FALLBACK_ROTATION[(hash % FALLBACK_ROTATION.len() as u64) as usize]
}
