//! Recognition of controller resource identifiers.
//!
//! Controller ids look like `urn:storageos:<Type>:<uuid>:<vdc>`, where the
//! trailing vdc segment may be empty. Anything else is treated as a display
//! name rather than an id.

const URN_PREFIX: &str = "urn";
const URN_NAMESPACE: &str = "storageos";

/// True when `id` has the shape of a controller URN. Purely syntactic; no
/// remote call is made.
pub fn is_well_formed_id(id: &str) -> bool {
    let parts: Vec<&str> = id.split(':').collect();
    if parts.len() != 5 {
        return false;
    }
    parts[0] == URN_PREFIX
        && parts[1] == URN_NAMESPACE
        && !parts[2].is_empty()
        && parts[2].chars().all(|c| c.is_ascii_alphanumeric())
        && !parts[3].is_empty()
        && parts[4].chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
