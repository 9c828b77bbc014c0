//! # coverctl-adapter-virtual
//!
//! Virtual/demo adapters for running the engine without hardware.
//!
//! | Adapter | Role | Behaviour |
//! |---------|------|-----------|
//! | [`VirtualActuator`] | driven ([`Actuator`](coverctl_app::ports::Actuator)) | Remembers the last position per cover, can be told to fail |
//! | [`VirtualSun`] | driving | Feeds the sun entity from the ephemeris of the site location |
//!
//! ## Dependency rule
//!
//! Depends on `coverctl-app` (port traits, services) and `coverctl-domain` only.

mod actuator;
mod sun;

pub use actuator::VirtualActuator;
pub use sun::VirtualSun;
