//! # coverctl-domain
//!
//! Pure domain model for the coverctl cover automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **cover configuration** (positions, windows, shading thresholds,
//!   gate sources, contacts, presence sources, manual-override settings)
//! - Capture an **environment snapshot** from the latest sensor readings
//! - Hold per-cover **overrides** (gates, manual pause, one-shot force shading)
//! - Evaluate **schedules** (opening / closing / ventilation windows with
//!   fixed-time and sun-relative anchors)
//! - Produce one **decision** per evaluation with a strict precedence order
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod action;
pub mod config;
pub mod decision;
pub mod diagnostics;
pub mod environment;
pub mod overrides;
pub mod schedule;
pub mod sensor;
pub mod site;
pub mod sun;
