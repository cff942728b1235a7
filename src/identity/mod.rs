//! Central identity and session management for the transparency platform.
//! Keep the public surface thin and split implementation across sub-modules.

mod gate;
mod manager;
mod principal;
mod provider;
mod roles;
mod session;

pub use gate::{AccessDecision, AccessPolicy, DenyReason};
pub use manager::{AuthManager, RefreshOutcome, SessionPhase};
pub use principal::Identity;
pub use provider::{
    AuthMethod, CredentialAdapter, PlaceholderProver, SignatureProver, SimulatedWallet,
    WalletProvider,
};
pub use roles::{
    display_name_for, fallback_role_for_principal, is_government_official, permissions_for,
    title_for, Role, BASIC_ACCESS,
};
pub use session::{FileKv, KvStore, MemoryKv, Session, SessionStore};
