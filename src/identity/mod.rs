//! Deterministic resource identity.
//!
//! Resource ids have the shape `prefix-xxxxxxxx` where the suffix is a short
//! content hash of an arbitrary serializable value. They are stable across
//! process runs and can be reduced back to their prefix with
//! [`extract_resource`]. [`to_dns_label`] turns any id into a valid
//! DNS-1035 label for use as a Kubernetes object name.

mod dns;
mod resource;

pub use dns::{MAX_LABEL_LEN, to_dns_label};
pub use resource::{
    HASH_LEN, RESERVED_IDS, UNKNOWN_ID, extract_resource, is_short_hash, resource_id, short_hash,
};
