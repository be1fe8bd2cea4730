//! API Module
//!
//! The Open Service Broker HTTP surface consumed by the platform.

pub mod rest;
pub mod server;

pub use rest::*;
pub use server::*;
