//! ONTAP SMB Service Broker
//!
//! An Open Service Broker provisioning SMB shares on a NetApp ONTAP array.
//! The array exposes two heterogeneous control surfaces: a REST control plane
//! whose mutations complete asynchronously through job records, and an
//! interactive clustershell CLI (over SSH) that is the only way to manage
//! CIFS local user accounts. The broker drives both behind the five OSB
//! lifecycle operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │               Broker API (axum, OSB v2)                 │
//! │   catalog · provision · deprovision · bind · unbind     │
//! ├─────────────────────────────────────────────────────────┤
//! │           Lifecycle Orchestrator (SmbBroker)            │
//! │   naming · size validation · error classification       │
//! ├────────────────────────────┬────────────────────────────┤
//! │     REST control plane     │     Clustershell (SSH)     │
//! │   volumes · jobs · ACLs    │    CIFS local accounts     │
//! └────────────────────────────┴────────────────────────────┘
//! ```
//!
//! No state is cached or persisted between calls. Volume names are re-derived
//! from instance ids, and in-flight jobs travel as opaque tokens held by the
//! platform.
//!
//! # Modules
//!
//! - [`broker`]: Lifecycle orchestrator and the OSB HTTP surface
//! - [`ontap`]: REST client, job abstraction, and clustershell automation
//! - [`domain`]: The lifecycle port and its types
//! - [`catalog`]: Static service catalog
//! - [`config`]: Environment-driven configuration
//! - [`error`]: Error types and classification

pub mod broker;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod ontap;

// Re-export commonly used types
pub use broker::{
    ApiServer, ApiServerConfig, OsbRouter, SmbBroker, SmbBrokerConfig,
};

pub use catalog::{Plan, Service, ServiceMetadata};

pub use config::{Args, BrokerConfig};

pub use domain::ports::{
    BindParameters, Binding, MountConfig, OperationState, OperationStatus, OperationToken,
    ProvisionParameters, ServiceLifecycle, ServiceLifecycleRef, SharedDevice, VolumeMount,
};

pub use error::{Error, ErrorClass, Result};

pub use ontap::{JobState, RestClient, ShellAutomation, ShellConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
