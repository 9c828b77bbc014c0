//! Application services: use-case implementations.
//!
//! Adapters (HTTP, virtual devices) talk to the running controllers only
//! through these services.

pub mod cover_service;
pub mod diagnostics_board;
