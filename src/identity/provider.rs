use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::warn;

use crate::error::AppResult;
use crate::gateway::{AuthResponse, BackendClient};

use super::principal::Identity;
use super::roles;
use super::session::Session;

/// How the caller wants to authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// Decentralized wallet identity via the external provider.
    Wallet,
    /// Simulated identity for the given role; works with zero network access.
    Demo { role: String },
}

/// External decentralized identity provider. The provider's callback-style
/// login surface is modelled as plain awaitable calls here.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Whether a wallet session is already established.
    async fn is_authenticated(&self) -> bool;
    /// Principal of the established session, if any.
    async fn principal(&self) -> Option<String>;
    /// Drive the provider's login flow; resolves to the principal string.
    async fn login(&self) -> AppResult<String>;
    /// Best-effort provider-side logout.
    async fn logout(&self);
}

/// Produces the proof accompanying a wallet principal in the backend
/// exchange. The default is the platform's historical placeholder token;
/// implement this trait to supply a real delegation proof.
pub trait SignatureProver: Send + Sync {
    fn prove(&self, principal: &str) -> String;
}

pub struct PlaceholderProver;

impl SignatureProver for PlaceholderProver {
    fn prove(&self, _principal: &str) -> String {
        "ii_delegation_signature".to_string()
    }
}

/// Deterministic in-process wallet used for demos and tests: `login`
/// establishes the configured principal, nothing leaves the process.
pub struct SimulatedWallet {
    principal: String,
    authed: RwLock<bool>,
}

impl SimulatedWallet {
    pub fn new(principal: impl Into<String>) -> Self {
        Self { principal: principal.into(), authed: RwLock::new(false) }
    }
}

#[async_trait]
impl WalletProvider for SimulatedWallet {
    async fn is_authenticated(&self) -> bool {
        *self.authed.read()
    }

    async fn principal(&self) -> Option<String> {
        if *self.authed.read() { Some(self.principal.clone()) } else { None }
    }

    async fn login(&self) -> AppResult<String> {
        *self.authed.write() = true;
        Ok(self.principal.clone())
    }

    async fn logout(&self) {
        *self.authed.write() = false;
    }
}

/// Produces a canonical session from either authentication method. Backend
/// failures on either path degrade to a client-only identity; only a broken
/// wallet provider is surfaced as an error.
pub struct CredentialAdapter {
    client: BackendClient,
    wallet: Box<dyn WalletProvider>,
    prover: Box<dyn SignatureProver>,
}

impl CredentialAdapter {
    pub fn new(client: BackendClient, wallet: Box<dyn WalletProvider>) -> Self {
        Self { client, wallet, prover: Box::new(PlaceholderProver) }
    }

    pub fn with_prover(mut self, prover: Box<dyn SignatureProver>) -> Self {
        self.prover = prover;
        self
    }

    pub async fn authenticate(&self, method: &AuthMethod) -> AppResult<Session> {
        match method {
            AuthMethod::Wallet => {
                let principal = self.wallet.login().await?;
                Ok(self.wallet_exchange(&principal).await)
            }
            AuthMethod::Demo { role } => Ok(self.demo_exchange(role).await),
        }
    }

    /// Re-derive a session from an already-established wallet identity, if
    /// the provider reports one. Used at process start.
    pub async fn established_session(&self) -> Option<Session> {
        if !self.wallet.is_authenticated().await {
            return None;
        }
        let principal = self.wallet.principal().await?;
        Some(self.wallet_exchange(&principal).await)
    }

    pub async fn provider_logout(&self) {
        self.wallet.logout().await;
    }

    /// Exchange a wallet principal with the backend; any backend failure
    /// falls back to a client-only identity. This path never fails.
    async fn wallet_exchange(&self, principal: &str) -> Session {
        let signature = self.prover.prove(principal);
        match self.client.login_internet_identity(principal, &signature).await {
            Ok(resp) => session_from_response(resp),
            Err(e) => {
                warn!(target: "fundgate", "backend wallet exchange failed, using client-side identity: {}", e);
                fallback_wallet_session(principal)
            }
        }
    }

    async fn demo_exchange(&self, role: &str) -> Session {
        match self.client.demo_login(role).await {
            Ok(resp) => session_from_response(resp),
            Err(e) => {
                warn!(target: "fundgate", "backend demo login failed, synthesizing locally: {}", e);
                local_demo_session(role)
            }
        }
    }
}

/// Normalize a backend auth reply into a session. Profile-supplied name,
/// title and permissions win; role tables fill the gaps.
pub fn session_from_response(resp: AuthResponse) -> Session {
    let info = &resp.user_info;
    let display_name = info
        .get("name")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| roles::display_name_for(&resp.role).to_string());
    let title = info
        .get("title")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| roles::title_for(&resp.role).to_string());
    let permissions = info
        .get("permissions")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|p| p.as_str().map(|s| s.to_string())).collect::<Vec<_>>())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| roles::permissions_for(&resp.role));
    let issued_at = info
        .get("authenticated_at")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
        .unwrap_or_else(Utc::now);
    let expires_at = (resp.expires_in > 0).then(|| Utc::now() + Duration::seconds(resp.expires_in));

    let identity = Identity {
        subject_id: resp.principal_id,
        role: resp.role,
        display_name,
        title,
        permissions,
        issued_at,
        extra: resp.user_info,
    };
    Session { token: resp.access_token, identity, expires_at }
}

/// Client-only wallet identity: role drawn from the fixed rotation by a
/// stable hash of the principal.
fn fallback_wallet_session(principal: &str) -> Session {
    let role = roles::fallback_role_for_principal(principal);
    let mut identity = Identity::for_role(principal, role);
    identity.extra.insert("demo_mode".into(), serde_json::Value::Bool(true));
    let token = format!("ii_dev_{}_{}", principal, Utc::now().timestamp_millis());
    Session { token, identity, expires_at: None }
}

/// Fully local demo identity for the given role.
fn local_demo_session(role: &str) -> Session {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let principal = format!("demo-principal-{}-{}", role, &suffix[..8]);
    let mut identity = Identity::for_role(principal, role);
    identity.extra.insert("demo_mode".into(), serde_json::Value::Bool(true));
    let token = format!("demo_token_{}_{}", role, Utc::now().timestamp_millis());
    Session { token, identity, expires_at: None }
}
