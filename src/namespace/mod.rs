//! Namespace codec
//!
//! Keys under a namespace live in the store as `/namespace/key`. The session
//! computes the scoped prefix once with [`wrap`] and strips it from every
//! received key with [`unwrap`].

/// Canonical scoped prefix for a namespace: `"/" + trim(namespace, "/") + "/"`.
///
/// Meant to be applied once, to the bare namespace, when a session is built.
pub fn wrap(namespace: &str) -> String {
    format!("/{}/", namespace.trim_matches('/'))
}

/// Strips exactly `prefix.len()` leading bytes from `raw_key`.
///
/// Keys that are not longer than the prefix are returned unchanged. No check
/// is made that `raw_key` actually starts with `prefix`.
pub fn unwrap<'a>(
    prefix: &str,
    raw_key: &'a [u8],
) -> &'a [u8] {
    let prefix_len = prefix.len();
    if raw_key.len() > prefix_len {
        &raw_key[prefix_len..]
    } else {
        raw_key
    }
}
