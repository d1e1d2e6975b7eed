//! The session state machine behind the app-wide auth context.
//!
//! `AuthController` coordinates login, logout, and token verification
//! over the `AuthApi` collaborator, owns the persisted credential
//! record and the expiry timer, and exposes the current session as a
//! read-only snapshot plus a stream of `SessionEvent`s for the hosting
//! shell (redirects, expiry).
//!
//! Concurrency model: operations suspend at network calls; the
//! at-most-one-in-flight rule for `check_auth_status` is a
//! compare-and-swap on an atomic flag, and `dispose()` turns every
//! later state write into a no-op so late-arriving results cannot
//! touch a torn-down session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::AuthApi;
use crate::models::{Credentials, UserRecord};

use super::{CredentialStore, SessionTimer};

/// Session lifetime when the user record does not configure one.
pub const DEFAULT_SESSION_TIMEOUT_MINUTES: i64 = 60;

/// Errors surfaced by `login`. The `Display` text doubles as the
/// user-facing `error` field of the session snapshot.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend rejected the attempt (bad credentials, unverified
    /// account, ...). Carries the server-provided message.
    #[error("{0}")]
    Rejected(String),

    /// A login attempt is already in flight on this controller.
    #[error("Another login attempt is already in progress")]
    LoginInProgress,

    /// The request itself failed (network, malformed response).
    #[error("{0}")]
    Transport(anyhow::Error),
}

/// Options for `logout`.
#[derive(Debug, Clone, Copy)]
pub struct LogoutOptions {
    /// Suppress the redirect event and any user-visible error.
    pub silent: bool,
    /// Request navigation to the login destination afterwards.
    pub redirect_to_login: bool,
}

impl Default for LogoutOptions {
    fn default() -> Self {
        Self {
            silent: false,
            redirect_to_login: true,
        }
    }
}

impl LogoutOptions {
    /// The options used for expiry and failed verification: clear the
    /// session without bothering the user.
    pub fn silent() -> Self {
        Self {
            silent: true,
            redirect_to_login: false,
        }
    }
}

/// Notifications for the hosting shell. The controller never performs
/// navigation itself; it only reports that the session ended or that a
/// redirect was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session timer elapsed; a silent logout follows.
    SessionExpired,
    /// A non-silent logout asked for navigation to the login page.
    /// The shell decides whether it is already there.
    RedirectRequested { path: String },
}

/// Read-only view of the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<UserRecord>,
    pub loading: bool,
    pub error: Option<String>,
}

impl SessionSnapshot {
    /// Holds exactly when a user is loaded
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn user_role(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.role.as_str())
    }

    pub fn permissions(&self) -> impl Iterator<Item = &str> {
        self.user
            .iter()
            .flat_map(|u| u.permissions.iter().map(String::as_str))
    }

    pub fn is_email_verified(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.email_verified)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    user: Option<UserRecord>,
    loading: bool,
    error: Option<String>,
}

pub struct AuthController<A: AuthApi> {
    api: A,
    store: CredentialStore,
    login_path: String,

    state: RwLock<SessionState>,
    timer: Mutex<SessionTimer>,

    checked_once: AtomicBool,
    check_in_progress: AtomicBool,
    login_in_progress: AtomicBool,
    disposed: AtomicBool,

    events_tx: mpsc::UnboundedSender<SessionEvent>,

    // Handed to the expiry task so it never keeps the controller alive
    weak_self: Weak<AuthController<A>>,
}

impl<A: AuthApi> AuthController<A> {
    /// Create a controller and the event stream the hosting shell
    /// subscribes to.
    pub fn new(
        api: A,
        store: CredentialStore,
        login_path: impl Into<String>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let login_path = login_path.into();
        let controller = Arc::new_cyclic(|weak| Self {
            api,
            store,
            login_path,
            state: RwLock::new(SessionState::default()),
            timer: Mutex::new(SessionTimer::new()),
            checked_once: AtomicBool::new(false),
            check_in_progress: AtomicBool::new(false),
            login_in_progress: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            events_tx,
            weak_self: weak.clone(),
        });
        (controller, events_rx)
    }

    // =========================================================================
    // Consumer-facing state
    // =========================================================================

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().expect("session state lock poisoned");
        SessionSnapshot {
            user: state.user.clone(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    /// True if the permission is in the user's set, or the user is an admin
    pub fn has_permission(&self, permission: &str) -> bool {
        let state = self.state.read().expect("session state lock poisoned");
        state.user.as_ref().is_some_and(|u| u.has_permission(permission))
    }

    /// True if the role matches exactly, or the user is an admin
    pub fn has_role(&self, role: &str) -> bool {
        let state = self.state.read().expect("session state lock poisoned");
        state.user.as_ref().is_some_and(|u| u.has_role(role))
    }

    pub fn clear_error(&self) {
        self.update_state(|state| state.error = None);
    }

    /// Tear down the controller: stop the timer and make every further
    /// state mutation a no-op. Late-arriving operation results become
    /// harmless instead of mutating a dead session.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("session controller disposed");
        self.timer.lock().expect("session timer lock poisoned").stop();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Establish the session from persisted credentials, verifying with
    /// the backend when only a token is stored.
    ///
    /// Without `force`, a call is a no-op while another check is in
    /// flight or once a check has already completed (e.g. on remount).
    pub async fn check_auth_status(&self, force: bool) {
        if self.is_disposed() {
            return;
        }

        if force {
            self.check_in_progress.store(true, Ordering::SeqCst);
        } else {
            if self.checked_once.load(Ordering::SeqCst) {
                debug!("auth already checked, skipping");
                return;
            }
            // Losing the swap means another check is in flight.
            if self
                .check_in_progress
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                debug!("auth check already in progress, skipping");
                return;
            }
        }

        self.update_state(|state| {
            state.loading = true;
            state.error = None;
        });

        self.run_check().await;

        self.checked_once.store(true, Ordering::SeqCst);
        self.check_in_progress.store(false, Ordering::SeqCst);
        self.update_state(|state| state.loading = false);
    }

    async fn run_check(&self) {
        let token = self.store.token();
        let stored_user = self.store.user_info();

        match (token, stored_user) {
            // A stored user without a token is a token-less session
            // (mock/demo accounts); adopt it directly.
            (None, Some(user)) => {
                debug!(user_id = user.id, "adopting stored token-less session");
                let timeout = Self::session_timeout(&user);
                self.adopt_user(user);
                self.start_session_timer(timeout);
            }
            (None, None) => {
                self.update_state(|state| state.user = None);
            }
            (Some(token), stored_user) => {
                if CredentialStore::is_token_expired(&token) {
                    debug!("stored token expired, clearing session");
                    self.logout(LogoutOptions::silent()).await;
                    return;
                }

                if let Some(user) = stored_user {
                    let timeout = Self::session_timeout(&user);
                    self.adopt_user(user);
                    self.start_session_timer(timeout);
                    return;
                }

                // Token but no cached user: ask the backend.
                match self.api.verify_token(&token).await {
                    Ok(response) if response.success => match response.data {
                        Some(data) => {
                            if let Err(e) = self.store.set_user_info(&data.user) {
                                warn!(error = %e, "Failed to persist verified user");
                            }
                            let timeout = Self::session_timeout(&data.user);
                            self.adopt_user(data.user);
                            self.start_session_timer(timeout);
                        }
                        None => {
                            self.fail_check("Token verification returned no user".to_string())
                                .await;
                        }
                    },
                    Ok(response) => {
                        let message = response
                            .message
                            .unwrap_or_else(|| "Token verification failed".to_string());
                        self.fail_check(message).await;
                    }
                    Err(e) => {
                        warn!(error = %e, "Token verification request failed");
                        self.fail_check(e.to_string()).await;
                    }
                }
            }
        }
    }

    /// Failed verification: clear the session quietly, then surface the
    /// message so an interactive check can display it.
    async fn fail_check(&self, message: String) {
        self.logout(LogoutOptions::silent()).await;
        self.update_state(|state| state.error = Some(message));
    }

    /// Authenticate with the backend and establish a session.
    ///
    /// A second call while one is in flight is rejected with
    /// `AuthError::LoginInProgress` rather than racing on the
    /// credential record.
    pub async fn login(&self, credentials: Credentials) -> Result<UserRecord, AuthError> {
        if self
            .login_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AuthError::LoginInProgress);
        }

        self.update_state(|state| {
            state.loading = true;
            state.error = None;
        });

        let result = self.run_login(&credentials).await;

        self.update_state(|state| state.loading = false);
        self.login_in_progress.store(false, Ordering::SeqCst);
        result
    }

    async fn run_login(&self, credentials: &Credentials) -> Result<UserRecord, AuthError> {
        match self.api.login(credentials).await {
            Ok(response) if response.success => {
                let Some(user) = response.user else {
                    let message = "Login response did not include a user".to_string();
                    self.update_state(|state| state.error = Some(message.clone()));
                    return Err(AuthError::Rejected(message));
                };

                if let Some(ref token) = response.token {
                    if let Err(e) = self.store.set_token(token) {
                        warn!(error = %e, "Failed to persist token");
                    }
                }
                if let Err(e) = self.store.set_user_info(&user) {
                    warn!(error = %e, "Failed to persist user info");
                }

                let timeout = Self::session_timeout(&user);
                self.adopt_user(user.clone());
                self.start_session_timer(timeout);
                info!(user_id = user.id, role = %user.role, "login successful");
                Ok(user)
            }
            Ok(response) => {
                let message = response
                    .message
                    .unwrap_or_else(|| "Login failed".to_string());
                self.update_state(|state| state.error = Some(message.clone()));
                Err(AuthError::Rejected(message))
            }
            Err(e) => {
                error!(error = %e, "Login request failed");
                let message = e.to_string();
                self.update_state(|state| state.error = Some(message));
                Err(AuthError::Transport(e))
            }
        }
    }

    /// End the session. The backend call is best-effort; local cleanup
    /// always runs, so calling this when already logged out reproduces
    /// the same end state without error.
    pub async fn logout(&self, options: LogoutOptions) {
        debug!(
            silent = options.silent,
            redirect = options.redirect_to_login,
            "logging out"
        );

        let token = self.store.token();
        if let Err(e) = self.api.logout(token.as_deref()).await {
            warn!(error = %e, "Logout request failed, clearing local session anyway");
        }

        if let Err(e) = self.store.clear_all() {
            warn!(error = %e, "Failed to clear stored credentials");
        }

        self.update_state(|state| {
            state.user = None;
            state.error = None;
            state.loading = false;
        });

        self.timer.lock().expect("session timer lock poisoned").stop();

        // The next mount/check starts fresh.
        self.checked_once.store(false, Ordering::SeqCst);
        self.check_in_progress.store(false, Ordering::SeqCst);

        if !options.silent && options.redirect_to_login {
            let _ = self.events_tx.send(SessionEvent::RedirectRequested {
                path: self.login_path.clone(),
            });
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Apply a state mutation unless the controller has been torn down.
    fn update_state(&self, mutate: impl FnOnce(&mut SessionState)) {
        if self.is_disposed() {
            return;
        }
        let mut state = self.state.write().expect("session state lock poisoned");
        mutate(&mut state);
    }

    /// Replace the session user wholesale; never a partial mutation.
    fn adopt_user(&self, user: UserRecord) {
        self.update_state(|state| {
            state.user = Some(user);
            state.error = None;
        });
    }

    fn session_timeout(user: &UserRecord) -> i64 {
        user.session_timeout_minutes
            .unwrap_or(DEFAULT_SESSION_TIMEOUT_MINUTES)
    }

    /// (Re)arm the expiry timer. The task holds only a weak reference,
    /// so a dropped or disposed controller never gets logged out from
    /// the grave.
    fn start_session_timer(&self, timeout_minutes: i64) {
        let weak = self.weak_self.clone();
        let mut timer = self.timer.lock().expect("session timer lock poisoned");
        timer.start(timeout_minutes, async move {
            let Some(controller) = weak.upgrade() else {
                return;
            };
            if controller.is_disposed() {
                return;
            }
            info!("session timeout reached, ending session");
            let _ = controller.events_tx.send(SessionEvent::SessionExpired);
            controller.logout(LogoutOptions::silent()).await;
        });
    }
}

impl<A: AuthApi> Drop for AuthController<A> {
    fn drop(&mut self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}
