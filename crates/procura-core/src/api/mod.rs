//! REST API client module for the Procura backend.
//!
//! This module provides the `AuthApi` collaborator trait consumed by
//! the session controller, the reqwest-backed `ApiClient`, and the
//! shared `ApiError` taxonomy.
//!
//! The backend uses JWT bearer token authentication; the token itself
//! is owned and persisted by the `auth` module.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthApi, LoginResponse, VerifyData, VerifyResponse};
pub use error::ApiError;
