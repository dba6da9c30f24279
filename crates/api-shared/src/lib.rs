//! # API Shared
//!
//! Shared definitions for the CardCrafter HTTP API.
//!
//! Contains:
//! - Request and response bodies with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//! - Authentication utilities (bearer token parsing)
//!
//! Used by `api-rest`. Nothing here depends on the core crate; handlers convert between these
//! bodies and the domain types.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{parse_bearer_token, AuthError};
pub use dto::*;
pub use health::HealthService;
