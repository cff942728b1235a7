use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::gateway::{BackendClient, PlatformOps, TokenCell, TokenSource};

use super::gate::{AccessDecision, AccessPolicy};
use super::principal::Identity;
use super::provider::{AuthMethod, CredentialAdapter, WalletProvider};
use super::session::{KvStore, Session, SessionStore};
use super::{provider, roles};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Refreshing,
}

/// Comparison result of a completed refresh. A role change means the
/// consuming application should reload its authorization-dependent state;
/// the core only reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// False when the refresh was superseded by a login/logout and its
    /// result was discarded.
    pub applied: bool,
    pub role_changed: bool,
    pub previous_role: String,
    pub current_role: String,
}

struct State {
    phase: SessionPhase,
    session: Option<Session>,
}

struct Inner {
    config: Config,
    store: SessionStore,
    adapter: CredentialAdapter,
    client: BackendClient,
    tokens: TokenCell,
    state: RwLock<State>,
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Bumped under the state lock whenever the session is swapped; a
    /// refresh whose snapshot no longer matches discards its result
    /// (last writer wins).
    epoch: AtomicU64,
    refresh_inflight: AtomicBool,
}

/// Owner of the session lifecycle: login, logout, timed refresh and
/// profile reconciliation. Constructed once at process start and passed by
/// handle; cloning is cheap.
#[derive(Clone)]
pub struct AuthManager {
    inner: Arc<Inner>,
}

impl AuthManager {
    pub fn new(config: Config, kv: Arc<dyn KvStore>, wallet: Box<dyn WalletProvider>) -> Self {
        let tokens = TokenCell::new();
        let client = BackendClient::new(&config.api_base, Arc::new(tokens.clone()));
        let adapter = CredentialAdapter::new(client.clone(), wallet);
        Self {
            inner: Arc::new(Inner {
                config,
                store: SessionStore::new(kv),
                adapter,
                client,
                tokens,
                state: RwLock::new(State { phase: SessionPhase::Unauthenticated, session: None }),
                timer: Mutex::new(None),
                epoch: AtomicU64::new(0),
                refresh_inflight: AtomicBool::new(false),
            }),
        }
    }

    /// Process-start restoration: an established wallet identity wins over a
    /// persisted session; either arms the refresh timer.
    pub async fn init(&self) {
        if let Some(sess) = self.inner.adapter.established_session().await {
            if self.inner.store.save(&sess).is_ok() {
                self.set_session(Some(sess), SessionPhase::Authenticated);
                self.arm_timer();
                self.reconcile_profile().await;
                return;
            }
        }
        if let Some(sess) = self.inner.store.load() {
            info!(target: "fundgate", "restored persisted session for {}", sess.identity.subject_id);
            self.set_session(Some(sess), SessionPhase::Authenticated);
            self.arm_timer();
            self.reconcile_profile().await;
        }
    }

    pub async fn login(&self, method: AuthMethod) -> AppResult<Identity> {
        let prior_phase = self.inner.state.read().phase;
        self.inner.state.write().phase = SessionPhase::Authenticating;

        match self.inner.adapter.authenticate(&method).await {
            Ok(sess) => {
                if let Err(e) = self.inner.store.save(&sess) {
                    self.inner.state.write().phase = prior_phase;
                    return Err(e);
                }
                let identity = sess.identity.clone();
                self.set_session(Some(sess), SessionPhase::Authenticated);
                self.arm_timer();
                info!(target: "fundgate", "login ok subject={} role={}", identity.subject_id, identity.role);
                Ok(identity)
            }
            Err(e) => {
                // Adapter errors leave the prior session untouched.
                self.inner.state.write().phase = prior_phase;
                Err(e)
            }
        }
    }

    /// Best-effort remote logout; local clearing is unconditional and this
    /// never reports an error. Safe to call repeatedly.
    pub async fn logout(&self) {
        let had_token = self.inner.tokens.bearer().is_some();

        if had_token {
            if let Err(e) = self.inner.client.logout().await {
                warn!(target: "fundgate", "remote logout failed (ignored): {}", e);
            }
        }
        self.inner.adapter.provider_logout().await;

        self.cancel_timer();
        self.inner.store.clear();
        self.set_session(None, SessionPhase::Unauthenticated);
        info!(target: "fundgate", "logged out");
    }

    /// Re-exchange the bearer for a fresh one. If the exchange or its
    /// persistence fails the manager forces a full logout: a failed refresh
    /// must not leave a stale, unverifiable session active.
    pub async fn refresh(&self) -> AppResult<RefreshOutcome> {
        let previous_role = match self.inner.state.read().session.as_ref() {
            Some(s) => s.identity.role.clone(),
            None => return Err(AppError::session("no_token", "no token to refresh")),
        };
        if self.inner.refresh_inflight.swap(true, Ordering::SeqCst) {
            return Err(AppError::session("refresh_in_flight", "a refresh is already running"));
        }
        let guard = InflightGuard(&self.inner.refresh_inflight);

        let snapshot = self.inner.epoch.load(Ordering::SeqCst);
        self.inner.state.write().phase = SessionPhase::Refreshing;

        let result = self.inner.client.refresh().await;

        if self.inner.epoch.load(Ordering::SeqCst) != snapshot {
            // A login/logout superseded this refresh; that operation already
            // swapped the session, so drop this result without touching
            // state or storage.
            return Ok(RefreshOutcome {
                applied: false,
                role_changed: false,
                previous_role: previous_role.clone(),
                current_role: previous_role,
            });
        }

        // Any failure past this point, backend or storage, falls through to
        // the forced logout below.
        let failure = match result {
            Ok(resp) => {
                let sess = provider::session_from_response(resp);
                match self.inner.store.save(&sess) {
                    Ok(()) => {
                        let current_role = sess.identity.role.clone();
                        if !self.apply_refreshed(sess, snapshot) {
                            return Ok(RefreshOutcome {
                                applied: false,
                                role_changed: false,
                                previous_role: previous_role.clone(),
                                current_role: previous_role,
                            });
                        }
                        let role_changed = current_role != previous_role;
                        if role_changed {
                            info!(target: "fundgate", "role changed on refresh: {} -> {}", previous_role, current_role);
                        }
                        return Ok(RefreshOutcome { applied: true, role_changed, previous_role, current_role });
                    }
                    Err(e) => e,
                }
            }
            Err(e) => e,
        };
        warn!(target: "fundgate", "token refresh failed, forcing logout: {}", failure);
        drop(guard);
        self.logout().await;
        Err(failure)
    }

    /// Swap in a refreshed session, but only if no login/logout happened
    /// since `snapshot`. The check and the swap share the state lock so a
    /// stale result can never land after a newer operation.
    fn apply_refreshed(&self, session: Session, snapshot: u64) -> bool {
        let mut state = self.inner.state.write();
        if self.inner.epoch.load(Ordering::SeqCst) != snapshot {
            return false;
        }
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.tokens.set(Some(session.token.clone()));
        state.session = Some(session);
        state.phase = SessionPhase::Authenticated;
        true
    }

    /// Optional reconciliation against `GET /auth/profile`. A reachable
    /// backend may override name, title, permissions or role; an unreachable
    /// one is logged and ignored — the session continues on local data.
    pub async fn reconcile_profile(&self) {
        if self.inner.tokens.bearer().is_none() {
            return;
        }
        let profile = match self.inner.client.profile().await {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(target: "fundgate", "profile fetch skipped: {}", e);
                return;
            }
        };
        let mut state = self.inner.state.write();
        let Some(sess) = state.session.as_mut() else { return };
        let id = &mut sess.identity;
        if let Some(role) = profile.get("role").and_then(|v| v.as_str()) {
            if !role.is_empty() && role != id.role {
                info!(target: "fundgate", "profile role override: {} -> {}", id.role, role);
                id.role = role.to_string();
                id.permissions = roles::permissions_for(role);
            }
        }
        if let Some(name) = profile.get("name").and_then(|v| v.as_str()) {
            id.display_name = name.to_string();
        }
        if let Some(title) = profile.get("title").and_then(|v| v.as_str()) {
            id.title = title.to_string();
        }
        if let Some(perms) = profile.get("permissions").and_then(|v| v.as_array()) {
            let perms: Vec<String> =
                perms.iter().filter_map(|p| p.as_str().map(|s| s.to_string())).collect();
            if !perms.is_empty() {
                id.permissions = perms;
            }
        }
        let snapshot = sess.clone();
        drop(state);
        if let Err(e) = self.inner.store.save(&snapshot) {
            warn!(target: "fundgate", "profile reconciliation not persisted: {}", e);
        }
    }

    // --- timer ---

    /// Clear-before-set: repeated logins never leave two timers running.
    fn arm_timer(&self) {
        self.cancel_timer();
        let period = self.inner.config.refresh_interval;
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                let Some(inner) = weak.upgrade() else { break };
                let mgr = AuthManager { inner };
                match mgr.refresh().await {
                    Ok(outcome) if outcome.applied => {}
                    Ok(_) => break, // superseded; a newer operation owns state now
                    // A collision with a manual refresh errors without a
                    // logout; the session is still live, so keep ticking.
                    Err(_) if mgr.is_authenticated() => {}
                    Err(_) => break, // refresh forced the logout
                }
            }
        });
        *self.inner.timer.lock() = Some(handle);
    }

    fn cancel_timer(&self) {
        if let Some(handle) = self.inner.timer.lock().take() {
            handle.abort();
        }
    }

    /// Whether the background refresh task is currently armed.
    pub fn timer_armed(&self) -> bool {
        self.inner.timer.lock().as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    // --- read surface ---

    /// Swap the session and bump the epoch under one state-lock hold, so an
    /// in-flight refresh observing the old epoch can never apply over this.
    fn set_session(&self, session: Option<Session>, phase: SessionPhase) {
        let mut state = self.inner.state.write();
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.tokens.set(session.as_ref().map(|s| s.token.clone()));
        state.session = session;
        state.phase = phase;
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.state.read().phase
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.state.read().session.as_ref().map(|s| s.identity.clone())
    }

    pub fn current_token(&self) -> Option<String> {
        self.inner.tokens.bearer()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.read().session.is_some()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.current_identity().map(|id| id.has_role(role)).unwrap_or(false)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.current_identity().map(|id| id.has_permission(permission)).unwrap_or(false)
    }

    pub fn can_manage_budgets(&self) -> bool { self.has_permission("budget_control") }
    pub fn can_allocate_budgets(&self) -> bool { self.has_permission("budget_allocation") }
    pub fn can_submit_claims(&self) -> bool { self.has_permission("claim_submission") }
    pub fn can_report_corruption(&self) -> bool { self.has_permission("corruption_reporting") }
    pub fn can_oversee_region(&self) -> bool { self.has_permission("regional_oversight") }

    pub fn check_access(&self, policy: &AccessPolicy) -> AccessDecision {
        let identity = self.current_identity();
        policy.evaluate(identity.as_ref())
    }

    /// Role-gated platform operations bound to the current identity, if any.
    pub fn platform_ops(&self) -> Option<PlatformOps> {
        self.current_identity()
            .map(|id| PlatformOps::for_identity(self.inner.client.clone(), &id))
    }

    /// Transport-level client for consumers with bespoke endpoints.
    pub fn client(&self) -> BackendClient {
        self.inner.client.clone()
    }
}

struct InflightGuard<'a>(&'a AtomicBool);

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
