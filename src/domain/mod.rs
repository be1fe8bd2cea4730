//! Domain layer - lifecycle port and domain types
//!
//! This module defines the trait the HTTP layer calls and the types flowing
//! across that boundary, following hexagonal architecture principles.

pub mod ports;

pub use ports::*;
