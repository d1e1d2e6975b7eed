//! Data models for the Procura session core.
//!
//! This module contains the data structures shared between the API
//! client and the session controller:
//!
//! - `UserRecord`: the authenticated user snapshot with role/permissions
//! - `Credentials`: the login form payload

pub mod user;

pub use user::{Credentials, UserRecord, ADMIN_ROLE};
