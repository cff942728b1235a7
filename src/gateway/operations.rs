//! Role-gated platform operations. Policy lives here, at the layer that
//! assembles per-role operation lists; the transport client below never
//! checks roles.

use serde_json::json;

use super::calls::{execute, CallResult};
use super::client::BackendClient;
use crate::identity::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    LockBudget,
    AllocateBudget,
    ProposeStateHead,
    ConfirmStateHead,
    ProposeVendor,
    ApproveVendor,
    UpdateFraudScore,
    ApproveClaimByAi,
    AddFraudAlert,
    GetHighRiskClaims,
    SubmitClaim,
    StakeChallenge,
    GetClaim,
    GetAllClaims,
    GetBudgetTransparency,
    GetSystemStats,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::LockBudget => "lock_budget",
            OperationKind::AllocateBudget => "allocate_budget",
            OperationKind::ProposeStateHead => "propose_state_head",
            OperationKind::ConfirmStateHead => "confirm_state_head",
            OperationKind::ProposeVendor => "propose_vendor",
            OperationKind::ApproveVendor => "approve_vendor",
            OperationKind::UpdateFraudScore => "update_fraud_score",
            OperationKind::ApproveClaimByAi => "approve_claim_by_ai",
            OperationKind::AddFraudAlert => "add_fraud_alert",
            OperationKind::GetHighRiskClaims => "get_high_risk_claims",
            OperationKind::SubmitClaim => "submit_claim",
            OperationKind::StakeChallenge => "stake_challenge",
            OperationKind::GetClaim => "get_claim",
            OperationKind::GetAllClaims => "get_all_claims",
            OperationKind::GetBudgetTransparency => "get_budget_transparency",
            OperationKind::GetSystemStats => "get_system_stats",
        }
    }
}

const ADMIN_OPS: [OperationKind; 10] = [
    OperationKind::LockBudget,
    OperationKind::ProposeStateHead,
    OperationKind::ConfirmStateHead,
    OperationKind::ProposeVendor,
    OperationKind::ApproveVendor,
    OperationKind::UpdateFraudScore,
    OperationKind::ApproveClaimByAi,
    OperationKind::AddFraudAlert,
    OperationKind::GetHighRiskClaims,
    OperationKind::AllocateBudget,
];

const QUERY_OPS: [OperationKind; 4] = [
    OperationKind::GetClaim,
    OperationKind::GetAllClaims,
    OperationKind::GetBudgetTransparency,
    OperationKind::GetSystemStats,
];

/// Operations available to a role. Every authenticated role gets the query
/// set; write operations follow the platform's role split.
pub fn catalog_for(role: &str) -> Vec<OperationKind> {
    let mut ops: Vec<OperationKind> = Vec::new();
    match role {
        "main_government" => ops.extend(ADMIN_OPS),
        "state_head" => ops.push(OperationKind::AllocateBudget),
        "vendor" => ops.push(OperationKind::SubmitClaim),
        "citizen" => ops.push(OperationKind::StakeChallenge),
        _ => {}
    }
    ops.extend(QUERY_OPS);
    ops
}

/// High-level platform calls assembled for one identity. Each call is checked
/// against the role catalog before it touches the network, and each returns
/// its own independently-owned `CallResult`.
#[derive(Clone)]
pub struct PlatformOps {
    client: BackendClient,
    role: String,
}

impl PlatformOps {
    pub fn for_identity(client: BackendClient, identity: &Identity) -> Self {
        Self { client, role: identity.role.clone() }
    }

    pub fn available(&self) -> Vec<OperationKind> {
        catalog_for(&self.role)
    }

    pub fn can_perform(&self, op: OperationKind) -> bool {
        catalog_for(&self.role).contains(&op)
    }

    fn denied(&self, op: OperationKind) -> CallResult<serde_json::Value> {
        CallResult::err(format!("operation {} is not available for role {}", op.as_str(), self.role))
    }

    pub async fn lock_budget(&self, amount: u64, purpose: &str) -> CallResult<serde_json::Value> {
        if !self.can_perform(OperationKind::LockBudget) {
            return self.denied(OperationKind::LockBudget);
        }
        let body = json!({ "amount": amount, "purpose": purpose });
        execute(self.client.post_json("/government/budget/create", &body), "budget creation failed").await
    }

    pub async fn allocate_budget(
        &self,
        budget_id: u64,
        amount: u64,
        area: &str,
        deputy: &str,
    ) -> CallResult<serde_json::Value> {
        if !self.can_perform(OperationKind::AllocateBudget) {
            return self.denied(OperationKind::AllocateBudget);
        }
        let body = json!({ "amount": amount, "area": area, "deputy": deputy });
        execute(
            self.client.post_json(&format!("/government/budget/{}/allocate", budget_id), &body),
            "budget allocation failed",
        )
        .await
    }

    pub async fn submit_claim(
        &self,
        budget_id: u64,
        allocation_id: u64,
        amount: u64,
        description: &str,
        work_details: &str,
    ) -> CallResult<serde_json::Value> {
        if !self.can_perform(OperationKind::SubmitClaim) {
            return self.denied(OperationKind::SubmitClaim);
        }
        let body = json!({
            "budget_id": budget_id,
            "allocation_id": allocation_id,
            "amount": amount,
            "description": description,
            "work_details": work_details,
        });
        execute(self.client.post_json("/vendor/claim/submit", &body), "claim submission failed").await
    }

    pub async fn stake_challenge(
        &self,
        invoice_hash: &str,
        reason: &str,
        evidence: &str,
    ) -> CallResult<serde_json::Value> {
        if !self.can_perform(OperationKind::StakeChallenge) {
            return self.denied(OperationKind::StakeChallenge);
        }
        let body = json!({ "invoice_hash": invoice_hash, "reason": reason, "evidence": evidence });
        execute(self.client.post_json("/citizen/challenge/stake", &body), "challenge staking failed").await
    }

    pub async fn all_claims(&self) -> CallResult<serde_json::Value> {
        if !self.can_perform(OperationKind::GetAllClaims) {
            return self.denied(OperationKind::GetAllClaims);
        }
        execute(self.client.get_json("/government/claims/all"), "claim listing failed").await
    }

    pub async fn high_risk_claims(&self) -> CallResult<serde_json::Value> {
        if !self.can_perform(OperationKind::GetHighRiskClaims) {
            return self.denied(OperationKind::GetHighRiskClaims);
        }
        execute(self.client.get_json("/government/fraud/alerts/high-risk"), "fraud alert fetch failed").await
    }

    pub async fn budget_transparency(&self) -> CallResult<serde_json::Value> {
        if !self.can_perform(OperationKind::GetBudgetTransparency) {
            return self.denied(OperationKind::GetBudgetTransparency);
        }
        execute(self.client.get_json("/government/budget/transparency"), "transparency fetch failed").await
    }

    pub async fn system_stats(&self) -> CallResult<serde_json::Value> {
        if !self.can_perform(OperationKind::GetSystemStats) {
            return self.denied(OperationKind::GetSystemStats);
        }
        execute(self.client.get_json("/government/stats/system"), "stats fetch failed").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_catalog_is_a_superset() {
        let admin = catalog_for("main_government");
        assert!(admin.contains(&OperationKind::LockBudget));
        assert!(admin.contains(&OperationKind::AllocateBudget));
        assert!(admin.contains(&OperationKind::GetSystemStats));
        assert!(!admin.contains(&OperationKind::SubmitClaim));
    }

    #[test]
    fn vendor_and_citizen_catalogs_are_disjoint_on_writes() {
        let vendor = catalog_for("vendor");
        let citizen = catalog_for("citizen");
        assert!(vendor.contains(&OperationKind::SubmitClaim));
        assert!(!vendor.contains(&OperationKind::StakeChallenge));
        assert!(citizen.contains(&OperationKind::StakeChallenge));
        assert!(!citizen.contains(&OperationKind::SubmitClaim));
    }

    #[test]
    fn every_role_can_query() {
        for role in ["main_government", "state_head", "deputy", "vendor", "citizen", "auditor", "ngo_head"] {
            let ops = catalog_for(role);
            assert!(ops.contains(&OperationKind::GetAllClaims), "{} should query claims", role);
            assert!(ops.contains(&OperationKind::GetBudgetTransparency));
        }
    }
}
