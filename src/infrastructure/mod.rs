//! Infrastructure layer.
//!
//! Provides technical concerns that support the application without containing
//! business logic: configuration, wiring, connection management and the
//! runtime loops.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root for runtime wiring
//! - [`config`] - Configuration loading and validation
//! - [`orchestration`] - Polling and subscription loops
//! - [`source`] - Reconnection for push-based sources

pub mod bootstrap;
pub mod config;
pub mod orchestration;
pub mod source;
