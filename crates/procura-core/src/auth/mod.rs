//! Authentication module: the session controller and its supporting parts.
//!
//! This module provides:
//! - `AuthController`: the state machine coordinating login, logout, and
//!   token verification, exposing the session as read-only snapshots
//! - `CredentialStore`: persisted token + user record with joint clearing
//! - `SessionTimer`: the single cancellable automatic-logout countdown
//!
//! Sessions end through one path regardless of cause: timer expiry,
//! detected token expiry, and explicit logout all funnel into
//! `AuthController::logout`.

pub mod controller;
pub mod credentials;
pub mod timer;

pub use controller::{
    AuthController, AuthError, LogoutOptions, SessionEvent, SessionSnapshot,
    DEFAULT_SESSION_TIMEOUT_MINUTES,
};
pub use credentials::{CredentialRecord, CredentialStore};
pub use timer::SessionTimer;
