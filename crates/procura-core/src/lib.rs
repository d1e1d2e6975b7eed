//! Core library for Procura - session management over the procurement
//! platform's REST backend.
//!
//! The centerpiece is [`auth::AuthController`], the state machine behind
//! the app-wide auth context: token validation on startup, login/logout,
//! automatic session expiry, and lifecycle-safe state updates. Frontends
//! (web shell, CLI) consume it through snapshots and session events and
//! own all navigation themselves.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, AuthApi};
pub use auth::{
    AuthController, AuthError, CredentialStore, LogoutOptions, SessionEvent, SessionSnapshot,
};
pub use config::Config;
pub use models::{Credentials, UserRecord};
