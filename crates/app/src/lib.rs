//! # coverctl-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `Actuator`: move a cover to a position
//!   - `DiagnosticsPublisher`: publish the record of each evaluation
//!   - `Clock`: current time
//! - Provide the **runtime** around the pure decision engine:
//!   - `SensorStore`: latest reading per sensor entity, shared by all covers
//!   - `ActionDispatcher`: idempotent, time-bounded actuator calls
//!   - `CoverController`: one task per cover, serialising its evaluations
//!   - `CoverService`: the fleet of controllers, inbound commands and events
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `coverctl-domain` only (plus `tokio` for tasks, timers and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod controller;
pub mod dispatcher;
pub mod event_bus;
pub mod ports;
pub mod sensor_store;
pub mod services;
