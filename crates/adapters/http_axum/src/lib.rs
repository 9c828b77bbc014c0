//! # coverctl-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Accept user commands per cover (manual override, forced shading,
//!   forced open/close, automation switches, external-move reports,
//!   immediate evaluation)
//! - Ingest sensor values pushed by the home-automation side
//! - Toggle the global automation switch
//! - Stream every diagnostics record as Server-Sent Events
//!
//! ## Dependency rule
//! Depends on `coverctl-app` (services) and `coverctl-domain` (types used in
//! request/response mapping). Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
