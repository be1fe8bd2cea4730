//! ONTAP Backend Module
//!
//! Adapters for the array's two control surfaces: the REST control plane
//! (volumes, applications, jobs, share ACLs) and the clustershell CLI
//! (CIFS local user accounts).

pub mod client;
pub mod job;
pub mod shell;
pub mod types;

pub use client::RestClient;
pub use job::JobState;
pub use shell::{ShellAutomation, ShellConfig};
