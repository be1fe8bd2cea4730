//! Volume name derivation
//!
//! Instance ids arrive as UUIDs, but ONTAP volume names cannot begin with a
//! digit and cannot contain hyphens. The derived name is the only correlation
//! between an instance and its volume: deprovision and bind recompute it from
//! the instance id instead of storing a mapping.

/// Derive the backend volume name for a service instance.
///
/// Deterministic: the same prefix and instance id always yield the same name.
/// The configured prefix must start with a letter (enforced at startup), so
/// the result never leads with a digit.
pub fn volume_name(prefix: &str, instance_id: &str) -> String {
    format!("{}{}", prefix, instance_id.replace('-', "_"))
}
